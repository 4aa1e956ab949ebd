//! Mapping of domain errors to HTTP responses
//!
//! Every error is sent in the `{status, message, data}` envelope. Lock and
//! mismatch errors carry the attempt counters so clients can render a
//! wait-and-retry message; the secret is never included.

use actix_web::{
    error::{InternalError, UrlencodedError},
    http::StatusCode,
    HttpRequest, HttpResponse,
};
use validator::ValidationErrors;

use og_core::errors::DomainError;
use og_shared::ApiResponse;

/// HTTP status for a domain error
pub fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::NotExist
        | DomainError::IncorrectOtp(_)
        | DomainError::InvalidAddress(_)
        | DomainError::InvalidInput { .. }
        | DomainError::UnknownProvider(_)
        | DomainError::NotVerified => StatusCode::BAD_REQUEST,
        DomainError::TooManyAttempts(_) => StatusCode::TOO_MANY_REQUESTS,
        DomainError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::DeliveryFailure(_) | DomainError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Message sent to clients; infrastructure details stay in the logs
fn public_message(error: &DomainError) -> String {
    match error {
        DomainError::UnknownProvider(_) => "Unknown provider.".to_string(),
        DomainError::DeliveryFailure(_) => "Error sending OTP.".to_string(),
        DomainError::StoreUnavailable(_) => "Unable to reach store.".to_string(),
        DomainError::Internal { .. } => "Internal Server Error.".to_string(),
        other => other.to_string(),
    }
}

/// Handle domain errors and convert them to appropriate HTTP responses
pub fn handle_domain_error(error: DomainError) -> HttpResponse {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, "Request failed");
    } else {
        tracing::debug!(error = %error, "Request rejected");
    }

    let message = public_message(&error);
    match error.attempt_info() {
        Some(info) => HttpResponse::build(status).json(ApiResponse::error_with_data(message, info)),
        None => HttpResponse::build(status).json(ApiResponse::error(message)),
    }
}

/// 400 response for a form that failed `validator` checks
pub fn handle_validation_error(errors: ValidationErrors) -> HttpResponse {
    let field = errors
        .field_errors()
        .keys()
        .next()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "request".to_string());

    HttpResponse::BadRequest().json(ApiResponse::error_with_data(
        format!("Invalid `{}` value.", field),
        errors,
    ))
}

/// `FormConfig` error handler that keeps the response envelope
pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest()
        .json(ApiResponse::error(format!("Invalid request body: {}", err)));
    InternalError::from_response(err, response).into()
}
