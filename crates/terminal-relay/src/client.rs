//! HTTP client for the remote payment service.
//!
//! [`TerminalApi`] is the seam the gateway depends on; [`TerminalClient`] is
//! the `reqwest` implementation. Records are relayed as opaque JSON since
//! their schema is owned by the remote service.

use std::future::Future;
use std::time::Duration;

use reqwest::{Method, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::constants::{user_agent, API_BASE, API_VERSION, DEFAULT_TIMEOUT_SECS};
use crate::error::TerminalError;
use crate::params::{
    CreatePaymentIntentParams, FormPairs, PresentPaymentMethodParams, ProcessPaymentIntentParams,
    ReaderListParams,
};

/// Remote payment-intent and reader operations.
pub trait TerminalApi: Send + Sync {
    /// List readers registered with the account.
    fn list_readers(
        &self,
        params: &ReaderListParams,
    ) -> impl Future<Output = Result<Vec<Value>, TerminalError>> + Send;

    /// Create a card-present, manually captured payment intent.
    fn create_payment_intent(
        &self,
        params: &CreatePaymentIntentParams,
    ) -> impl Future<Output = Result<Value, TerminalError>> + Send;

    fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> impl Future<Output = Result<Value, TerminalError>> + Send;

    /// Hand a payment intent to a reader. Returns the reader's new state.
    fn process_payment_intent(
        &self,
        reader_id: &str,
        params: &ProcessPaymentIntentParams,
    ) -> impl Future<Output = Result<Value, TerminalError>> + Send;

    /// Test-mode only: emulate a customer presenting a card to the reader.
    fn present_payment_method(
        &self,
        reader_id: &str,
        params: &PresentPaymentMethodParams,
    ) -> impl Future<Output = Result<Value, TerminalError>> + Send;

    fn retrieve_reader(
        &self,
        reader_id: &str,
    ) -> impl Future<Output = Result<Value, TerminalError>> + Send;

    /// Capture funds for an authorized, uncaptured payment intent.
    fn capture_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> impl Future<Output = Result<Value, TerminalError>> + Send;

    /// Reset the reader to its idle screen.
    ///
    /// The remote service rejects this once a card has been presented and
    /// the payment is processing. It never cancels an in-flight payment.
    fn cancel_reader_action(
        &self,
        reader_id: &str,
    ) -> impl Future<Output = Result<Value, TerminalError>> + Send;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ListBody {
    data: Vec<Value>,
}

/// Reject empty identifiers and percent-encode the rest for use as a path segment.
fn path_id(value: &str, param: &'static str) -> Result<String, TerminalError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TerminalError::MissingParameter(param));
    }
    Ok(urlencoding::encode(trimmed).into_owned())
}

/// `reqwest`-backed [`TerminalApi`] authenticated with a secret key.
#[derive(Clone)]
pub struct TerminalClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl std::fmt::Debug for TerminalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalClient")
            .field("base_url", &self.base_url)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl TerminalClient {
    /// Client against the production API base.
    pub fn new(secret_key: impl Into<String>) -> Result<Self, TerminalError> {
        Self::with_base_url(secret_key, API_BASE)
    }

    /// Client against an alternate base URL (e.g. a local mock).
    pub fn with_base_url(
        secret_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, TerminalError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(user_agent())
            .build()?;
        Ok(Self::from_parts(http, secret_key, base_url))
    }

    /// Reuse an existing `reqwest::Client`.
    pub fn from_parts(
        http: reqwest::Client,
        secret_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        form: &FormPairs,
    ) -> Result<Value, TerminalError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", API_VERSION);

        request = if method == Method::GET {
            request.query(form)
        } else {
            request.form(form)
        };

        let result = match request.send().await {
            Ok(resp) => read_response(resp).await,
            Err(e) => Err(TerminalError::from(e)),
        };

        match &result {
            Ok(_) => tracing::debug!(operation, "remote call succeeded"),
            Err(e) => tracing::debug!(operation, kind = e.kind(), error = %e, "remote call failed"),
        }
        result
    }
}

async fn read_response(resp: Response) -> Result<Value, TerminalError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if status.is_success() {
        return serde_json::from_slice(&bytes).map_err(|e| TerminalError::Decode(e.to_string()));
    }

    let detail = serde_json::from_slice::<ErrorBody>(&bytes).ok().map(|b| b.error);
    let (kind, code, message) = match detail {
        Some(d) => (d.kind, d.code, d.message),
        None => (None, None, None),
    };
    let message = message.filter(|m| !m.is_empty()).unwrap_or_else(|| {
        format!(
            "remote service returned {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("error")
        )
    });

    Err(TerminalError::Api {
        status: status.as_u16(),
        kind,
        code,
        message,
    })
}

impl TerminalApi for TerminalClient {
    async fn list_readers(&self, params: &ReaderListParams) -> Result<Vec<Value>, TerminalError> {
        let body = self
            .call(
                "list_readers",
                Method::GET,
                "/v1/terminal/readers",
                &params.to_form(),
            )
            .await?;
        let list: ListBody =
            serde_json::from_value(body).map_err(|e| TerminalError::Decode(e.to_string()))?;
        Ok(list.data)
    }

    async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntentParams,
    ) -> Result<Value, TerminalError> {
        self.call(
            "create_payment_intent",
            Method::POST,
            "/v1/payment_intents",
            &params.to_form(),
        )
        .await
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<Value, TerminalError> {
        let id = path_id(payment_intent_id, "payment_intent_id")?;
        self.call(
            "retrieve_payment_intent",
            Method::GET,
            &format!("/v1/payment_intents/{id}"),
            &Vec::new(),
        )
        .await
    }

    async fn process_payment_intent(
        &self,
        reader_id: &str,
        params: &ProcessPaymentIntentParams,
    ) -> Result<Value, TerminalError> {
        let id = path_id(reader_id, "reader_id")?;
        if params.payment_intent.trim().is_empty() {
            return Err(TerminalError::MissingParameter("payment_intent_id"));
        }
        self.call(
            "process_payment_intent",
            Method::POST,
            &format!("/v1/terminal/readers/{id}/process_payment_intent"),
            &params.to_form(),
        )
        .await
    }

    async fn present_payment_method(
        &self,
        reader_id: &str,
        params: &PresentPaymentMethodParams,
    ) -> Result<Value, TerminalError> {
        let id = path_id(reader_id, "reader_id")?;
        self.call(
            "present_payment_method",
            Method::POST,
            &format!("/v1/test_helpers/terminal/readers/{id}/present_payment_method"),
            &params.to_form(),
        )
        .await
    }

    async fn retrieve_reader(&self, reader_id: &str) -> Result<Value, TerminalError> {
        let id = path_id(reader_id, "reader_id")?;
        self.call(
            "retrieve_reader",
            Method::GET,
            &format!("/v1/terminal/readers/{id}"),
            &Vec::new(),
        )
        .await
    }

    async fn capture_payment_intent(&self, payment_intent_id: &str) -> Result<Value, TerminalError> {
        let id = path_id(payment_intent_id, "payment_intent_id")?;
        self.call(
            "capture_payment_intent",
            Method::POST,
            &format!("/v1/payment_intents/{id}/capture"),
            &Vec::new(),
        )
        .await
    }

    async fn cancel_reader_action(&self, reader_id: &str) -> Result<Value, TerminalError> {
        let id = path_id(reader_id, "reader_id")?;
        self.call(
            "cancel_reader_action",
            Method::POST,
            &format!("/v1/terminal/readers/{id}/cancel_action"),
            &Vec::new(),
        )
        .await
    }
}
