//! Typed client for payment intents and in-person card readers.
//!
//! Every operation is a single round trip to the remote payment service.
//! Reader state and payment intent lifecycles are owned remotely; this crate
//! only transports identifiers and relays the records it gets back.
//!
//! # Quick example
//!
//! ```no_run
//! use terminal_relay::{CreatePaymentIntentParams, TerminalApi, TerminalClient};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = TerminalClient::new("sk_test_...").unwrap();
//! let intent = client
//!     .create_payment_intent(&CreatePaymentIntentParams { amount: 1000 })
//!     .await
//!     .unwrap();
//! println!("{}", intent["id"]);
//! # }
//! ```

pub mod client;
pub mod constants;
pub mod error;
pub mod params;

pub use client::{TerminalApi, TerminalClient};
pub use error::TerminalError;
pub use params::{
    CreatePaymentIntentParams, PresentPaymentMethodParams, ProcessPaymentIntentParams,
    ReaderListParams,
};
