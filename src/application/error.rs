use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::application::poller::PollError;
use crate::application::syndication::SyndicationError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;

/// Diagnostic payload attached to error responses so the logging middleware
/// can report the full cause chain without exposing it to clients.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("feed rendering failed: {0}")]
    Render(#[from] SyndicationError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("polling failed: {0}")]
    Poll(#[from] PollError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Render(_)
            | AppError::Infra(_)
            | AppError::Poll(_)
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short plain-text body shown to clients; never the internal cause chain.
    fn public_message(&self) -> String {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) => "not found".to_string(),
            AppError::Render(err) => err.to_string(),
            AppError::Infra(_) | AppError::Poll(_) | AppError::Unexpected(_) => {
                "internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.public_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}
