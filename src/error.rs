use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;
use std::fmt::Display;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("BadRequest error: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Payment session expired or unknown {0}")]
    SessionExpired(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Gateway(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SessionExpired(_) => StatusCode::UNAUTHORIZED,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Same envelope as every other endpoint so the page only has one shape to read
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error_message": self.to_string(),
        }))
    }
}


pub trait TraceErr<T, E> {
    #[track_caller]
    fn trace_err(self, context: &'static str) -> std::result::Result<T, E>;
}

impl<T, E: Display> TraceErr<T, E> for std::result::Result<T, E> {
    #[track_caller]
    fn trace_err(self, context: &'static str) -> std::result::Result<T, E> {
        if let Err(ref e) = self {
            let location = std::panic::Location::caller();
            error!(
                "{}:{}: error in {}: {}",
                location.file(),
                location.line(),
                context,
                e
            );
        }
        self
    }

}
