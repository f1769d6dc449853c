use std::sync::Mutex;

use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::middleware::from_fn;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use relay_gateway::middleware::envelope_errors;
use relay_gateway::routes::relay::MAX_BODY_BYTES;
use relay_gateway::{routes, AppState, GatewayConfig};
use terminal_relay::{
    CreatePaymentIntentParams, PresentPaymentMethodParams, ProcessPaymentIntentParams,
    ReaderListParams, TerminalApi, TerminalError,
};

/// Remote call as observed by the fake service.
#[derive(Debug, Clone, PartialEq)]
enum Call {
    ListReaders(ReaderListParams),
    CreatePaymentIntent(i64),
    RetrievePaymentIntent(String),
    ProcessPaymentIntent(String, String),
    PresentPaymentMethod(String, PresentPaymentMethodParams),
    RetrieveReader(String),
    CapturePaymentIntent(String),
    CancelReaderAction(String),
}

/// In-memory stand-in for the remote payment service.
#[derive(Default)]
struct FakeTerminal {
    calls: Mutex<Vec<Call>>,
    /// Message to fail every call with
    fail_with: Option<String>,
    /// Reader that is mid-transaction and rejects cancellation
    busy_reader: Option<String>,
}

impl FakeTerminal {
    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn record(&self, call: Call) -> Result<(), TerminalError> {
        self.calls.lock().unwrap().push(call);
        match self.fail_with {
            Some(ref message) => Err(TerminalError::Api {
                status: 400,
                kind: Some("invalid_request_error".to_string()),
                code: None,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn reader(id: &str, action: Value) -> Value {
        json!({ "id": id, "object": "terminal.reader", "status": "online", "action": action })
    }
}

impl TerminalApi for FakeTerminal {
    async fn list_readers(&self, params: &ReaderListParams) -> Result<Vec<Value>, TerminalError> {
        self.record(Call::ListReaders(params.clone()))?;
        Ok(vec![
            Self::reader("tmr_1", Value::Null),
            Self::reader("tmr_2", Value::Null),
        ])
    }

    async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntentParams,
    ) -> Result<Value, TerminalError> {
        self.record(Call::CreatePaymentIntent(params.amount))?;
        Ok(json!({ "id": "pi_new", "amount": params.amount, "currency": "usd" }))
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<Value, TerminalError> {
        self.record(Call::RetrievePaymentIntent(id.to_string()))?;
        Ok(json!({ "id": id, "status": "requires_payment_method" }))
    }

    async fn process_payment_intent(
        &self,
        reader_id: &str,
        params: &ProcessPaymentIntentParams,
    ) -> Result<Value, TerminalError> {
        self.record(Call::ProcessPaymentIntent(
            reader_id.to_string(),
            params.payment_intent.clone(),
        ))?;
        Ok(Self::reader(
            reader_id,
            json!({ "status": "in_progress", "type": "process_payment_intent" }),
        ))
    }

    async fn present_payment_method(
        &self,
        reader_id: &str,
        params: &PresentPaymentMethodParams,
    ) -> Result<Value, TerminalError> {
        self.record(Call::PresentPaymentMethod(
            reader_id.to_string(),
            params.clone(),
        ))?;
        Ok(Self::reader(reader_id, json!({ "status": "succeeded" })))
    }

    async fn retrieve_reader(&self, reader_id: &str) -> Result<Value, TerminalError> {
        self.record(Call::RetrieveReader(reader_id.to_string()))?;
        Ok(Self::reader(reader_id, Value::Null))
    }

    async fn capture_payment_intent(&self, id: &str) -> Result<Value, TerminalError> {
        self.record(Call::CapturePaymentIntent(id.to_string()))?;
        Ok(json!({ "id": id, "status": "succeeded" }))
    }

    async fn cancel_reader_action(&self, reader_id: &str) -> Result<Value, TerminalError> {
        self.record(Call::CancelReaderAction(reader_id.to_string()))?;
        if self.busy_reader.as_deref() == Some(reader_id) {
            return Err(TerminalError::Api {
                status: 400,
                kind: Some("invalid_request_error".to_string()),
                code: Some("terminal_reader_busy".to_string()),
                message: "Reader is currently busy processing another request".to_string(),
            });
        }
        Ok(Self::reader(reader_id, Value::Null))
    }
}

fn test_config() -> GatewayConfig {
    GatewayConfig::from_vars(|k| match k {
        "STRIPE_SECRET_KEY" => Some("sk_test_relay".to_string()),
        _ => None,
    })
    .unwrap()
}

macro_rules! relay_app {
    ($fake:expr) => {{
        let state = web::Data::new(AppState::with_terminal(test_config(), $fake));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(routes::relay::configure::<FakeTerminal>),
        )
        .await;
        (app, state)
    }};
}

fn calls(state: &web::Data<AppState<FakeTerminal>>) -> Vec<Call> {
    state.terminal.calls.lock().unwrap().clone()
}

fn post(uri: &str, body: Value) -> actix_http::Request {
    test::TestRequest::post()
        .uri(uri)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
        .to_request()
}

fn keys(body: &Value) -> Vec<String> {
    body.as_object().unwrap().keys().cloned().collect()
}

#[actix_rt::test]
async fn test_list_readers_wraps_records() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let req = test::TestRequest::get().uri("/list-readers").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(keys(&body), vec!["readers"]);
    assert_eq!(body["readers"].as_array().unwrap().len(), 2);
    assert_eq!(calls(&state), vec![Call::ListReaders(ReaderListParams::default())]);
}

#[actix_rt::test]
async fn test_list_readers_forwards_filters() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let req = test::TestRequest::get()
        .uri("/list-readers?limit=1&location=tml_9&device_type=simulated_wisepos_e")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        calls(&state),
        vec![Call::ListReaders(ReaderListParams {
            limit: Some(1),
            location: Some("tml_9".to_string()),
            device_type: Some("simulated_wisepos_e".to_string()),
            status: None,
        })]
    );
}

#[actix_rt::test]
async fn test_create_payment_intent_returns_only_id() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let resp = test::call_service(
        &app,
        post(
            "/create-payment-intent",
            json!({ "amount": 1000, "currency": "eur", "capture_method": "automatic" }),
        ),
    )
    .await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "payment_intent_id": "pi_new" }));
    // Only the amount crosses the boundary; the rest is fixed by the client.
    assert_eq!(calls(&state), vec![Call::CreatePaymentIntent(1000)]);
}

#[actix_rt::test]
async fn test_create_payment_intent_without_amount_fails_locally() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let resp = test::call_service(&app, post("/create-payment-intent", json!({}))).await;

    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({ "error": { "message": "missing required param: amount" } })
    );
    assert!(calls(&state).is_empty());
}

#[actix_rt::test]
async fn test_retrieve_payment_intent_by_query() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let req = test::TestRequest::get()
        .uri("/retrieve-payment-intent?payment_intent_id=pi_42")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(keys(&body), vec!["payment_intent"]);
    assert_eq!(body["payment_intent"]["id"], "pi_42");
    assert_eq!(
        calls(&state),
        vec![Call::RetrievePaymentIntent("pi_42".to_string())]
    );
}

#[actix_rt::test]
async fn test_retrieve_routes_missing_id_return_envelope() {
    let (app, state) = relay_app!(FakeTerminal::default());

    for (uri, param) in [
        ("/retrieve-payment-intent", "payment_intent_id"),
        ("/retrieve-reader", "reader_id"),
        ("/retrieve-reader?reader_id=", "reader_id"),
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({ "error": { "message": format!("missing required param: {param}") } })
        );
    }
    assert!(calls(&state).is_empty());
}

#[actix_rt::test]
async fn test_process_payment_intent_hands_intent_to_reader() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let resp = test::call_service(
        &app,
        post(
            "/process-payment-intent",
            json!({ "payment_intent_id": "pi_1", "reader_id": "tmr_1" }),
        ),
    )
    .await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(keys(&body), vec!["reader_state"]);
    assert_eq!(body["reader_state"]["id"], "tmr_1");
    assert_eq!(body["reader_state"]["action"]["status"], "in_progress");
    assert_eq!(
        calls(&state),
        vec![Call::ProcessPaymentIntent(
            "tmr_1".to_string(),
            "pi_1".to_string()
        )]
    );
}

#[actix_rt::test]
async fn test_process_payment_intent_requires_both_ids() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let resp = test::call_service(
        &app,
        post("/process-payment-intent", json!({ "payment_intent_id": "pi_1" })),
    )
    .await;

    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "missing required param: reader_id");
    assert!(calls(&state).is_empty());
}

#[actix_rt::test]
async fn test_simulate_payment_with_and_without_card() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let resp = test::call_service(&app, post("/simulate-payment", json!({ "reader_id": "tmr_1" }))).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reader_state"]["action"]["status"], "succeeded");

    let resp = test::call_service(
        &app,
        post(
            "/simulate-payment",
            json!({ "reader_id": "tmr_1", "card_present": { "number": "4000000000000002" } }),
        ),
    )
    .await;
    assert_eq!(resp.status(), 200);

    assert_eq!(
        calls(&state),
        vec![
            Call::PresentPaymentMethod("tmr_1".to_string(), PresentPaymentMethodParams::default()),
            Call::PresentPaymentMethod(
                "tmr_1".to_string(),
                PresentPaymentMethodParams {
                    card_present_number: Some("4000000000000002".to_string()),
                    kind: None,
                }
            ),
        ]
    );
}

#[actix_rt::test]
async fn test_retrieve_reader_has_no_side_effects() {
    let (app, state) = relay_app!(FakeTerminal::default());

    for _ in 0..3 {
        let req = test::TestRequest::get()
            .uri("/retrieve-reader?reader_id=tmr_1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["reader_state"]["id"], "tmr_1");
    }

    assert_eq!(calls(&state), vec![Call::RetrieveReader("tmr_1".to_string()); 3]);
}

#[actix_rt::test]
async fn test_retrieve_payment_intent_has_no_side_effects() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let mut bodies = Vec::new();
    for _ in 0..3 {
        let req = test::TestRequest::get()
            .uri("/retrieve-payment-intent?payment_intent_id=pi_42")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        bodies.push(body);
    }

    assert!(bodies.iter().all(|b| *b == bodies[0]));
    assert_eq!(
        calls(&state),
        vec![Call::RetrievePaymentIntent("pi_42".to_string()); 3]
    );
}

#[actix_rt::test]
async fn test_capture_payment_intent() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let resp = test::call_service(
        &app,
        post("/capture-payment-intent", json!({ "payment_intent_id": "pi_9" })),
    )
    .await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(keys(&body), vec!["payment_intent"]);
    assert_eq!(body["payment_intent"]["status"], "succeeded");
    assert_eq!(
        calls(&state),
        vec![Call::CapturePaymentIntent("pi_9".to_string())]
    );
}

#[actix_rt::test]
async fn test_cancel_reader_action_resets_idle_reader() {
    let (app, _state) = relay_app!(FakeTerminal::default());

    let resp = test::call_service(&app, post("/cancel-reader-action", json!({ "reader_id": "tmr_1" }))).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["reader_state"]["action"].is_null());
}

#[actix_rt::test]
async fn test_cancel_reader_action_surfaces_busy_reader() {
    let fake = FakeTerminal {
        busy_reader: Some("tmr_busy".to_string()),
        ..Default::default()
    };
    let (app, state) = relay_app!(fake);

    let resp = test::call_service(
        &app,
        post("/cancel-reader-action", json!({ "reader_id": "tmr_busy" })),
    )
    .await;

    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({ "error": { "message": "Reader is currently busy processing another request" } })
    );
    // Cancellation is the only call made; no payment operation is touched.
    assert_eq!(
        calls(&state),
        vec![Call::CancelReaderAction("tmr_busy".to_string())]
    );
}

#[actix_rt::test]
async fn test_every_route_flattens_remote_failure() {
    let (app, _state) = relay_app!(FakeTerminal::failing("No such reader: 'tmr_x'"));

    let gets = [
        "/list-readers",
        "/retrieve-payment-intent?payment_intent_id=pi_x",
        "/retrieve-reader?reader_id=tmr_x",
    ];
    for uri in gets {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), 400, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": { "message": "No such reader: 'tmr_x'" } }), "{uri}");
    }

    let posts = [
        ("/create-payment-intent", json!({ "amount": 1000 })),
        (
            "/process-payment-intent",
            json!({ "payment_intent_id": "pi_x", "reader_id": "tmr_x" }),
        ),
        ("/simulate-payment", json!({ "reader_id": "tmr_x" })),
        ("/capture-payment-intent", json!({ "payment_intent_id": "pi_x" })),
        ("/cancel-reader-action", json!({ "reader_id": "tmr_x" })),
    ];
    for (uri, payload) in posts {
        let resp = test::call_service(&app, post(uri, payload)).await;
        assert_eq!(resp.status(), 400, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": { "message": "No such reader: 'tmr_x'" } }), "{uri}");
    }
}

#[actix_rt::test]
async fn test_malformed_input_uses_envelope() {
    let (app, state) = relay_app!(FakeTerminal::default());

    let req = test::TestRequest::post()
        .uri("/capture-payment-intent")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("invalid JSON body"));

    let req = test::TestRequest::get()
        .uri("/list-readers?limit=many")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("invalid query string"));

    assert!(calls(&state).is_empty());
}

#[actix_rt::test]
async fn test_empty_post_body_reports_missing_param() {
    let (app, _state) = relay_app!(FakeTerminal::default());

    let req = test::TestRequest::post().uri("/simulate-payment").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "missing required param: reader_id");
}

#[actix_rt::test]
async fn test_oversize_body_uses_envelope() {
    let state = web::Data::new(AppState::with_terminal(
        test_config(),
        FakeTerminal::default(),
    ));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .configure(routes::relay::configure::<FakeTerminal>),
    )
    .await;

    let padding = "x".repeat(MAX_BODY_BYTES + 1024);
    let resp = test::call_service(
        &app,
        post(
            "/cancel-reader-action",
            json!({ "reader_id": "tmr_1", "padding": padding }),
        ),
    )
    .await;

    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(keys(&body), vec!["error"]);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("invalid request body"));
    assert!(calls(&state).is_empty());
}

#[actix_rt::test]
async fn test_rate_limited_request_uses_envelope() {
    let state = web::Data::new(AppState::with_terminal(
        test_config(),
        FakeTerminal::default(),
    ));
    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(1)
        .burst_size(1)
        .finish()
        .unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .wrap(Governor::new(&governor_conf))
            .wrap(from_fn(envelope_errors))
            .configure(routes::relay::configure::<FakeTerminal>),
    )
    .await;

    let request = || {
        test::TestRequest::get()
            .uri("/retrieve-reader?reader_id=tmr_1")
            .peer_addr("127.0.0.1:40000".parse().unwrap())
            .to_request()
    };

    let resp = test::call_service(&app, request()).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, request()).await;
    assert_eq!(resp.status(), 429);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": { "message": "too many requests" } }));
    assert_eq!(calls(&state), vec![Call::RetrieveReader("tmr_1".to_string())]);
}
