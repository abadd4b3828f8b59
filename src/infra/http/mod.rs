pub mod middleware;

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::{error::AppError, syndication};
use crate::infra::store::FeedStore;

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<FeedStore>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/news/{tag}/rss", get(tag_feed))
        .route("/_health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// `GET /news/{tag}/rss` — re-renders the Atom document from the current
/// store snapshot on every request.
async fn tag_feed(State(state): State<HttpState>, Path(tag): Path<String>) -> Response {
    match render_feed(&state, &tag) {
        Ok(body) => ([(CONTENT_TYPE, syndication::ATOM_CONTENT_TYPE)], body).into_response(),
        Err(err) => err.into_response(),
    }
}

fn render_feed(state: &HttpState, tag: &str) -> Result<String, AppError> {
    let posts = state.store.posts_for_tag(tag)?;
    Ok(syndication::atom_feed(tag, &posts)?)
}

async fn health() -> &'static str {
    "ok"
}
