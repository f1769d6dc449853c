use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use terminal_relay::TerminalError;

/// Caller-facing failure envelope: `{"error": {"message": "..."}}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = "request failed".to_string();
        }
        Self {
            error: ErrorMessage { message },
        }
    }
}

#[derive(Debug)]
pub enum RelayError {
    /// Remote call failed, or a required parameter was missing
    Terminal {
        operation: &'static str,
        source: TerminalError,
    },
    /// Request body or query string could not be parsed
    BadRequest(String),
}

impl RelayError {
    pub fn terminal(operation: &'static str, source: TerminalError) -> Self {
        RelayError::Terminal { operation, source }
    }

    pub fn message(&self) -> String {
        match self {
            RelayError::Terminal { source, .. } => source.message(),
            RelayError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Terminal { operation, source } => write!(f, "{}: {}", operation, source),
            RelayError::BadRequest(msg) => write!(f, "bad request: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {}

impl ResponseError for RelayError {
    // Every failure, whatever its kind, is a 400 with the same envelope.
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            RelayError::Terminal { operation, source } => {
                tracing::warn!(operation = %operation, kind = source.kind(), error = %source, "relay call failed");
            }
            RelayError::BadRequest(msg) => {
                tracing::debug!("rejected request: {}", msg);
            }
        }
        HttpResponse::build(self.status_code()).json(ErrorEnvelope::new(self.message()))
    }
}
