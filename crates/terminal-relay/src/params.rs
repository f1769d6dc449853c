//! Request parameters for remote operations.
//!
//! Each type flattens into the form-encoded key/value pairs the remote
//! service expects, using its bracket notation for arrays and nested maps.

use serde::Deserialize;

use crate::constants::{CAPTURE_METHOD, CURRENCY, PAYMENT_METHOD_TYPE};

pub type FormPairs = Vec<(String, String)>;

fn push_opt(pairs: &mut FormPairs, key: &str, value: Option<impl ToString>) {
    if let Some(v) = value {
        pairs.push((key.to_string(), v.to_string()));
    }
}

/// Optional filters for listing readers. All are validated remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReaderListParams {
    pub limit: Option<u32>,
    pub location: Option<String>,
    pub device_type: Option<String>,
    pub status: Option<String>,
}

impl ReaderListParams {
    pub fn to_form(&self) -> FormPairs {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "limit", self.limit);
        push_opt(&mut pairs, "location", self.location.as_deref());
        push_opt(&mut pairs, "device_type", self.device_type.as_deref());
        push_opt(&mut pairs, "status", self.status.as_deref());
        pairs
    }
}

/// Create a card-present payment intent.
///
/// Only the amount comes from the caller. Currency, payment method type and
/// capture method are fixed for in-person collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatePaymentIntentParams {
    /// Amount in the smallest currency unit.
    pub amount: i64,
}

impl CreatePaymentIntentParams {
    pub fn to_form(&self) -> FormPairs {
        vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), CURRENCY.to_string()),
            (
                "payment_method_types[]".to_string(),
                PAYMENT_METHOD_TYPE.to_string(),
            ),
            ("capture_method".to_string(), CAPTURE_METHOD.to_string()),
        ]
    }
}

/// Hand a payment intent to a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPaymentIntentParams {
    pub payment_intent: String,
}

impl ProcessPaymentIntentParams {
    pub fn to_form(&self) -> FormPairs {
        vec![("payment_intent".to_string(), self.payment_intent.clone())]
    }
}

/// Describes the simulated card-present event. Empty means the remote
/// service's default test card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentPaymentMethodParams {
    /// Test card number, e.g. a decline card to simulate a failed payment.
    pub card_present_number: Option<String>,
    /// Simulated payment method type (`card_present` or `interac_present`).
    pub kind: Option<String>,
}

impl PresentPaymentMethodParams {
    pub fn to_form(&self) -> FormPairs {
        let mut pairs = Vec::new();
        push_opt(
            &mut pairs,
            "card_present[number]",
            self.card_present_number.as_deref(),
        );
        push_opt(&mut pairs, "type", self.kind.as_deref());
        pairs
    }
}
