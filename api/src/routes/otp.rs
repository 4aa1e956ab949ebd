//! Authenticated OTP API

use actix_web::{http::Method, web, HttpRequest, HttpResponse};
use validator::Validate;

use og_core::repositories::OtpStore;
use og_shared::ApiResponse;

use crate::app::AppState;
use crate::dto::{IssueForm, VerifyForm};
use crate::handlers::{handle_domain_error, handle_validation_error};
use crate::middleware::Namespace;

/// Handler for PUT /api/otp/{id}
///
/// Issues an OTP under the caller's namespace and pushes it when `to` is
/// given.
///
/// ## Success (200 OK)
/// ```json
/// {"status": "success", "data": {"namespace": "myapp", "id": "uid123", "attempts": 1, "url": "..."}}
/// ```
///
/// ## Errors
/// - 400 Bad Request: Unknown provider, invalid address or input
/// - 429 Too Many Requests: An existing record with this id is locked
/// - 500 Internal Server Error: The push failed; the record was stored
pub async fn issue<S: OtpStore + 'static>(
    state: web::Data<AppState<S>>,
    namespace: Namespace,
    path: web::Path<String>,
    form: web::Form<IssueForm>,
) -> HttpResponse {
    issue_otp(&state, &namespace, Some(path.into_inner()), form.into_inner()).await
}

/// Handler for PUT /api/otp; the id is generated
pub async fn issue_generated<S: OtpStore + 'static>(
    state: web::Data<AppState<S>>,
    namespace: Namespace,
    form: web::Form<IssueForm>,
) -> HttpResponse {
    issue_otp(&state, &namespace, None, form.into_inner()).await
}

async fn issue_otp<S: OtpStore + 'static>(
    state: &AppState<S>,
    namespace: &Namespace,
    id: Option<String>,
    form: IssueForm,
) -> HttpResponse {
    if let Err(errors) = form.validate() {
        return handle_validation_error(errors);
    }

    let request = match form.into_request(id) {
        Ok(request) => request,
        Err(error) => return handle_domain_error(error),
    };

    match state.service.issue(namespace.as_str(), request).await {
        Ok(issued) => HttpResponse::Ok().json(ApiResponse::success(issued)),
        Err(error) => handle_domain_error(error),
    }
}

/// Handler for POST /api/otp/{id}
///
/// Every call consumes an attempt. Unless `skip_delete` is true the record
/// is deleted once verified.
///
/// ## Errors
/// - 400 Bad Request: Wrong OTP (with attempt counters) or no such record
/// - 429 Too Many Requests: Attempts exhausted
pub async fn verify<S: OtpStore + 'static>(
    state: web::Data<AppState<S>>,
    namespace: Namespace,
    path: web::Path<String>,
    form: web::Form<VerifyForm>,
) -> HttpResponse {
    let id = path.into_inner();
    let result = state
        .service
        .verify(namespace.as_str(), &id, &form.otp, form.delete_on_success())
        .await;

    match result {
        Ok(otp) => HttpResponse::Ok().json(ApiResponse::success(otp)),
        Err(error) => handle_domain_error(error),
    }
}

/// Handler for POST|DELETE /api/otp/{id}/status
///
/// Succeeds only for a verified record. DELETE removes the record after a
/// successful read.
pub async fn check_status<S: OtpStore + 'static>(
    req: HttpRequest,
    state: web::Data<AppState<S>>,
    namespace: Namespace,
    path: web::Path<String>,
) -> HttpResponse {
    let delete_on_read = req.method() == Method::DELETE;
    let result = state
        .service
        .check_status(namespace.as_str(), &path, delete_on_read)
        .await;

    match result {
        Ok(otp) => HttpResponse::Ok().json(ApiResponse::success(otp)),
        Err(error) => handle_domain_error(error),
    }
}
