//! Feed endpoint tests over the full public router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use http_body_util::BodyExt;
use tower::ServiceExt;

use feedrelay::domain::entities::PostRecord;
use feedrelay::infra::http::{HttpState, build_router};
use feedrelay::infra::store::FeedStore;

fn post(id: &str, title: &str, url: &str, meta: &str) -> PostRecord {
    PostRecord {
        id: id.to_string(),
        html_title: title.to_string(),
        url: url.to_string(),
        meta_description: meta.to_string(),
        ..PostRecord::default()
    }
}

async fn get(store: Arc<FeedStore>, uri: &str) -> (StatusCode, Option<String>, String) {
    let router = build_router(HttpState { store });
    let response = router
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("router response");

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();

    (status, content_type, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn unknown_tag_returns_404() {
    let store = Arc::new(FeedStore::new());

    let (status, _, body) = get(store, "/news/launch/rss").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "not found");
}

#[tokio::test]
async fn cached_tag_returns_atom_feed_with_entries_in_cached_order() {
    let store = Arc::new(FeedStore::new());
    store.set_posts_for_tag(
        "launch",
        vec![
            post("1", "first", "http://x/1", "m1"),
            post("2", "second", "http://x/2", "m2"),
        ],
    );

    let (status, content_type, body) = get(store, "/news/launch/rss").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        content_type.as_deref(),
        Some("application/atom+xml; charset=utf-8")
    );
    assert_eq!(body.matches("<entry>").count(), 2);
    assert!(body.contains("<id>urn:feedrelay:tag:launch</id>"));

    let first = body.find("<title>first</title>").expect("first entry");
    let second = body.find("<title>second</title>").expect("second entry");
    assert!(first < second);
}

#[tokio::test]
async fn tag_with_empty_cached_list_returns_entryless_feed_not_404() {
    let store = Arc::new(FeedStore::new());
    store.set_posts_for_tag("launch", Vec::new());

    let (status, _, body) = get(store, "/news/launch/rss").await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("<entry>"));
}

#[tokio::test]
async fn health_endpoint_responds_ok() {
    let store = Arc::new(FeedStore::new());

    let (status, _, body) = get(store, "/_health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}
