/// Base URL of the remote payment service.
pub const API_BASE: &str = "https://api.stripe.com";

/// API version pinned on every outbound call.
pub const API_VERSION: &str = "2020-08-27";

/// Currency for every payment intent created through the relay.
pub const CURRENCY: &str = "usd";

/// In-person payments must be collected with a physical card.
pub const PAYMENT_METHOD_TYPE: &str = "card_present";

/// Card-present intents are authorized first and captured explicitly.
pub const CAPTURE_METHOD: &str = "manual";

/// App identity reported to the remote service in the User-Agent header.
pub const APP_NAME: &str = "terminal-relay/server-driven";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_URL: &str = "https://github.com/stripe-samples";

/// Default timeout for a single outbound round trip, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// `User-Agent` value sent on every outbound call.
pub fn user_agent() -> String {
    format!("{APP_NAME}/{APP_VERSION} ({APP_URL})")
}
