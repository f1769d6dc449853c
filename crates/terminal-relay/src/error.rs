use thiserror::Error;

/// Errors returned by remote payment service operations.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// A required identifier or amount was absent. No request was sent.
    #[error("missing required param: {0}")]
    MissingParameter(&'static str),

    /// The remote service rejected the call.
    #[error("{message}")]
    Api {
        status: u16,
        kind: Option<String>,
        code: Option<String>,
        message: String,
    },

    #[error("http error: {0}")]
    Http(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl TerminalError {
    /// Human-readable description suitable for the caller-facing envelope.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TerminalError::MissingParameter(_) => "missing_parameter",
            TerminalError::Api { .. } => "api",
            TerminalError::Http(_) => "http",
            TerminalError::Decode(_) => "decode",
        }
    }
}

impl From<reqwest::Error> for TerminalError {
    fn from(e: reqwest::Error) -> Self {
        TerminalError::Http(e.to_string())
    }
}
