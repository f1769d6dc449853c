//! Keeps failures raised outside the handlers in the relay's error envelope.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::Next;
use actix_web::{Error, HttpResponse};

use crate::error::ErrorEnvelope;

const RATE_LIMITED: &str = "too many requests";

/// Render a middleware-level error as the envelope, keeping its status.
pub fn envelope_response(err: &Error) -> HttpResponse {
    let status = err.as_response_error().status_code();
    let message = if status == StatusCode::TOO_MANY_REQUESTS {
        RATE_LIMITED.to_string()
    } else {
        err.to_string()
    };
    HttpResponse::build(status).json(ErrorEnvelope::new(message))
}

/// Outermost middleware. Rate-limit rejections and errors returned by inner
/// middleware are rewritten into `{"error": {"message": ...}}`.
pub async fn envelope_errors(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let http_req = req.request().clone();
    match next.call(req).await {
        Ok(res) if res.status() == StatusCode::TOO_MANY_REQUESTS => {
            let (req, _) = res.into_parts();
            let response =
                HttpResponse::TooManyRequests().json(ErrorEnvelope::new(RATE_LIMITED));
            Ok(ServiceResponse::new(req, response).map_into_right_body())
        }
        Ok(res) => Ok(res.map_into_left_body()),
        Err(e) => {
            tracing::debug!(error = %e, "middleware rejected request");
            Ok(ServiceResponse::new(http_req, envelope_response(&e)).map_into_right_body())
        }
    }
}
