use crate::config::GatewayConfig;
use std::sync::Arc;
use terminal_relay::{TerminalApi, TerminalClient, TerminalError};

/// Shared application state
pub struct AppState<T> {
    pub config: Arc<GatewayConfig>,
    pub terminal: Arc<T>,
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            terminal: Arc::clone(&self.terminal),
        }
    }
}

impl<T: TerminalApi> AppState<T> {
    pub fn with_terminal(config: GatewayConfig, terminal: T) -> Self {
        Self {
            config: Arc::new(config),
            terminal: Arc::new(terminal),
        }
    }
}

impl AppState<TerminalClient> {
    /// State backed by a real client built from the config.
    pub fn new(config: GatewayConfig) -> Result<Self, TerminalError> {
        let client = match config.api_base {
            Some(ref base) => TerminalClient::with_base_url(config.secret_key.clone(), base)?,
            None => TerminalClient::new(config.secret_key.clone())?,
        };
        Ok(Self::with_terminal(config, client))
    }
}
