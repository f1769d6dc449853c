//! The relayed operations. Each handler extracts its parameters, performs
//! exactly one remote call and wraps the record under a single key.

use std::future::Future;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use terminal_relay::{
    CreatePaymentIntentParams, PresentPaymentMethodParams, ProcessPaymentIntentParams,
    ReaderListParams, TerminalApi, TerminalError,
};

use crate::error::RelayError;
use crate::metrics::{RELAY_REQUESTS_TOTAL, UPSTREAM_LATENCY};
use crate::state::AppState;

/// Request bodies are a handful of identifiers.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub amount: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProcessPaymentIntentRequest {
    pub payment_intent_id: Option<String>,
    pub reader_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SimulatePaymentRequest {
    pub reader_id: Option<String>,
    pub card_present: Option<CardPresent>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CardPresent {
    pub number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReaderRequest {
    pub reader_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentIntentRequest {
    pub payment_intent_id: Option<String>,
}

/// Unwrap the extracted body. Oversized or unreadable payloads become the envelope.
fn read_body<B: DeserializeOwned + Default>(
    body: Result<web::Bytes, actix_web::Error>,
) -> Result<B, RelayError> {
    let body = body.map_err(|e| RelayError::BadRequest(format!("invalid request body: {e}")))?;
    parse_body(&body)
}

/// Parse a JSON body. An empty body is treated as `{}`.
fn parse_body<B: DeserializeOwned + Default>(body: &[u8]) -> Result<B, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(B::default());
    }
    serde_json::from_slice(body).map_err(|e| RelayError::BadRequest(format!("invalid JSON body: {e}")))
}

fn parse_query<Q: DeserializeOwned>(req: &HttpRequest) -> Result<Q, RelayError> {
    web::Query::<Q>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .map_err(|e| RelayError::BadRequest(format!("invalid query string: {e}")))
}

fn required(value: Option<String>, param: &'static str) -> Result<String, TerminalError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(TerminalError::MissingParameter(param))
}

/// Fail a request before any remote call. Counted, but not timed.
fn check<V>(operation: &'static str, result: Result<V, TerminalError>) -> Result<V, RelayError> {
    result.map_err(|e| {
        RELAY_REQUESTS_TOTAL
            .with_label_values(&[operation, "rejected"])
            .inc();
        RelayError::terminal(operation, e)
    })
}

/// Run one remote call, recording its latency and outcome.
async fn relay<V, F>(operation: &'static str, call: F) -> Result<V, RelayError>
where
    F: Future<Output = Result<V, TerminalError>>,
{
    let timer = UPSTREAM_LATENCY
        .with_label_values(&[operation])
        .start_timer();
    let result = call.await;
    timer.observe_duration();

    let outcome = if result.is_ok() { "ok" } else { "error" };
    RELAY_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();

    result.map_err(|e| RelayError::terminal(operation, e))
}

/// GET /list-readers - List readers, optionally filtered
pub async fn list_readers<T: TerminalApi + 'static>(
    req: HttpRequest,
    state: web::Data<AppState<T>>,
) -> Result<HttpResponse, RelayError> {
    let params: ReaderListParams = parse_query(&req)?;
    let readers = relay("list_readers", state.terminal.list_readers(&params)).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "readers": readers })))
}

/// POST /create-payment-intent - Create a card-present, manual-capture intent
pub async fn create_payment_intent<T: TerminalApi + 'static>(
    body: Result<web::Bytes, actix_web::Error>,
    state: web::Data<AppState<T>>,
) -> Result<HttpResponse, RelayError> {
    let request: CreatePaymentIntentRequest = read_body(body)?;
    let amount = check(
        "create_payment_intent",
        request.amount.ok_or(TerminalError::MissingParameter("amount")),
    )?;
    let intent = relay(
        "create_payment_intent",
        state
            .terminal
            .create_payment_intent(&CreatePaymentIntentParams { amount }),
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "payment_intent_id": intent["id"] })))
}

/// GET /retrieve-payment-intent?payment_intent_id=...
pub async fn retrieve_payment_intent<T: TerminalApi + 'static>(
    req: HttpRequest,
    state: web::Data<AppState<T>>,
) -> Result<HttpResponse, RelayError> {
    let query: PaymentIntentRequest = parse_query(&req)?;
    let id = check(
        "retrieve_payment_intent",
        required(query.payment_intent_id, "payment_intent_id"),
    )?;
    let intent = relay(
        "retrieve_payment_intent",
        state.terminal.retrieve_payment_intent(&id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "payment_intent": intent })))
}

/// POST /process-payment-intent - Hand an intent to a reader
pub async fn process_payment_intent<T: TerminalApi + 'static>(
    body: Result<web::Bytes, actix_web::Error>,
    state: web::Data<AppState<T>>,
) -> Result<HttpResponse, RelayError> {
    let request: ProcessPaymentIntentRequest = read_body(body)?;
    let payment_intent = check(
        "process_payment_intent",
        required(request.payment_intent_id, "payment_intent_id"),
    )?;
    let reader_id = check(
        "process_payment_intent",
        required(request.reader_id, "reader_id"),
    )?;
    let reader = relay(
        "process_payment_intent",
        state
            .terminal
            .process_payment_intent(&reader_id, &ProcessPaymentIntentParams { payment_intent }),
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "reader_state": reader })))
}

/// POST /simulate-payment - Present a test card to a simulated reader
pub async fn simulate_payment<T: TerminalApi + 'static>(
    body: Result<web::Bytes, actix_web::Error>,
    state: web::Data<AppState<T>>,
) -> Result<HttpResponse, RelayError> {
    let request: SimulatePaymentRequest = read_body(body)?;
    let reader_id = check("simulate_payment", required(request.reader_id, "reader_id"))?;
    let params = PresentPaymentMethodParams {
        card_present_number: request.card_present.and_then(|c| c.number),
        kind: request.kind,
    };
    let reader = relay(
        "simulate_payment",
        state.terminal.present_payment_method(&reader_id, &params),
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "reader_state": reader })))
}

/// GET /retrieve-reader?reader_id=...
pub async fn retrieve_reader<T: TerminalApi + 'static>(
    req: HttpRequest,
    state: web::Data<AppState<T>>,
) -> Result<HttpResponse, RelayError> {
    let query: ReaderRequest = parse_query(&req)?;
    let reader_id = check("retrieve_reader", required(query.reader_id, "reader_id"))?;
    let reader = relay("retrieve_reader", state.terminal.retrieve_reader(&reader_id)).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "reader_state": reader })))
}

/// POST /capture-payment-intent - Capture an authorized intent
pub async fn capture_payment_intent<T: TerminalApi + 'static>(
    body: Result<web::Bytes, actix_web::Error>,
    state: web::Data<AppState<T>>,
) -> Result<HttpResponse, RelayError> {
    let request: PaymentIntentRequest = read_body(body)?;
    let id = check(
        "capture_payment_intent",
        required(request.payment_intent_id, "payment_intent_id"),
    )?;
    let intent = relay(
        "capture_payment_intent",
        state.terminal.capture_payment_intent(&id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "payment_intent": intent })))
}

/// POST /cancel-reader-action - Reset the reader to idle.
/// Fails once a card has been presented; never cancels an in-flight payment.
pub async fn cancel_reader_action<T: TerminalApi + 'static>(
    body: Result<web::Bytes, actix_web::Error>,
    state: web::Data<AppState<T>>,
) -> Result<HttpResponse, RelayError> {
    let request: ReaderRequest = read_body(body)?;
    let reader_id = check(
        "cancel_reader_action",
        required(request.reader_id, "reader_id"),
    )?;
    let reader = relay(
        "cancel_reader_action",
        state.terminal.cancel_reader_action(&reader_id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "reader_state": reader })))
}

pub fn configure<T: TerminalApi + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/list-readers", web::get().to(list_readers::<T>))
        .route(
            "/create-payment-intent",
            web::post().to(create_payment_intent::<T>),
        )
        .route(
            "/retrieve-payment-intent",
            web::get().to(retrieve_payment_intent::<T>),
        )
        .route(
            "/process-payment-intent",
            web::post().to(process_payment_intent::<T>),
        )
        .route("/simulate-payment", web::post().to(simulate_payment::<T>))
        .route("/retrieve-reader", web::get().to(retrieve_reader::<T>))
        .route(
            "/capture-payment-intent",
            web::post().to(capture_payment_intent::<T>),
        )
        .route(
            "/cancel-reader-action",
            web::post().to(cancel_reader_action::<T>),
        );
}
