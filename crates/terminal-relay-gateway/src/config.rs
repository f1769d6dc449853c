use std::env;
use url::Url;

const DEFAULT_PORT: u16 = 4242;
const DEFAULT_RATE_LIMIT_RPM: u32 = 120;

#[derive(Clone)]
pub struct GatewayConfig {
    /// Secret key used to authenticate to the remote payment service
    pub secret_key: String,
    /// Override for the remote API base (None = production)
    pub api_base: Option<String>,
    /// Directory holding index.html, reader.html and their assets (None = API only)
    pub static_dir: Option<String>,
    /// Server port
    pub port: u16,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u32,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("static_dir", &self.static_dir)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        // Required: secret key
        let secret_key =
            var("STRIPE_SECRET_KEY").ok_or(ConfigError::MissingRequired("STRIPE_SECRET_KEY"))?;

        // Optional: API base override
        let api_base = var("STRIPE_API_BASE");
        if let Some(ref base) = api_base {
            Url::parse(base).map_err(|_| ConfigError::InvalidUrl(base.clone()))?;
        }

        let static_dir = var("STATIC_DIR");

        let port = match var("PORT") {
            Some(s) => s.parse().map_err(|_| ConfigError::InvalidNumber("PORT", s))?,
            None => DEFAULT_PORT,
        };

        let allowed_origins: Vec<String> = var("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    format!("http://localhost:{port}"),
                    format!("http://127.0.0.1:{port}"),
                ]
            });

        let rate_limit_rpm = match var("RATE_LIMIT_RPM") {
            Some(s) => s
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("RATE_LIMIT_RPM", s))?,
            None => DEFAULT_RATE_LIMIT_RPM,
        };
        if rate_limit_rpm == 0 {
            return Err(ConfigError::InvalidNumber(
                "RATE_LIMIT_RPM",
                "0".to_string(),
            ));
        }

        let metrics_token = var("METRICS_TOKEN");

        if !secret_key.starts_with("sk_") && !secret_key.starts_with("rk_") {
            tracing::warn!("STRIPE_SECRET_KEY does not look like a secret or restricted key");
        }
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set: /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            secret_key,
            api_base,
            static_dir,
            port,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid number for {0}: {1}")]
    InvalidNumber(&'static str, String),
}
