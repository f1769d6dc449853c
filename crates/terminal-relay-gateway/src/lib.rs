pub mod config;
pub mod cors;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::{ErrorEnvelope, RelayError};
pub use state::AppState;
