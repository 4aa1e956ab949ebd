//! Browser views driving the verification flow
//!
//! These pages are addressed by namespace in the path and need no
//! credentials: possession of the record id is the capability.

pub mod html;

use actix_web::{http::header::LOCATION, web, HttpResponse};

use og_core::domain::{Otp, OtpState};
use og_core::errors::DomainError;
use og_core::repositories::OtpStore;
use og_core::services::RegisteredProvider;
use og_shared::ApiResponse;

use crate::app::AppState;
use crate::dto::{AddressForm, OtpViewForm};

use self::html::FormView;

const ACTION_RESEND: &str = "resend";

const SESSION_EXPIRED: &str = "Your session has expired. Please re-initiate the verification.";

fn page(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn message(title: &str, description: &str) -> HttpResponse {
    page(html::message_page(title, description))
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location))
        .finish()
}

fn otp_uri(otp: &Otp) -> String {
    format!("/otp/{}/{}", otp.namespace, otp.id)
}

fn address_uri(otp: &Otp) -> String {
    format!("/otp/{}/{}/address", otp.namespace, otp.id)
}

fn too_many_attempts(ttl_seconds: f64) -> HttpResponse {
    message(
        "Too many attempts",
        &format!("Please retry after {} seconds.", ttl_seconds as u64),
    )
}

fn provider_missing() -> HttpResponse {
    message("Internal error", "The provider for this OTP was not found.")
}

/// GET /otp/{namespace}/{id}
///
/// Without an action the record is shown without consuming an attempt;
/// the one-click link in messages arrives here with `action=check`.
pub async fn otp_view_get<S: OtpStore + 'static>(
    state: web::Data<AppState<S>>,
    path: web::Path<(String, String)>,
    query: web::Query<OtpViewForm>,
) -> HttpResponse {
    let (namespace, id) = path.into_inner();
    otp_view(&state, &namespace, &id, query.into_inner()).await
}

/// POST /otp/{namespace}/{id}
pub async fn otp_view_post<S: OtpStore + 'static>(
    state: web::Data<AppState<S>>,
    path: web::Path<(String, String)>,
    form: web::Form<OtpViewForm>,
) -> HttpResponse {
    let (namespace, id) = path.into_inner();
    otp_view(&state, &namespace, &id, form.into_inner()).await
}

async fn otp_view<S: OtpStore + 'static>(
    state: &AppState<S>,
    namespace: &str,
    id: &str,
    form: OtpViewForm,
) -> HttpResponse {
    let service = &state.service;

    let result = match form.action.as_str() {
        "" => service.peek(namespace, id).await,
        ACTION_RESEND => service.resend(namespace, id).await,
        _ => service.verify(namespace, id, &form.otp, false).await,
    };

    let (otp, note) = match result {
        Ok(otp) => {
            let resent = form.action == ACTION_RESEND && otp.state() == OtpState::PendingAwaiting;
            (otp, if resent { "OTP resent".to_string() } else { String::new() })
        }
        Err(DomainError::NotExist) => return message("Session expired", SESSION_EXPIRED),
        Err(DomainError::TooManyAttempts(info)) => return too_many_attempts(info.ttl_seconds),
        Err(error @ (DomainError::IncorrectOtp(_)
        | DomainError::InvalidInput { .. }
        | DomainError::DeliveryFailure(_))) => {
            let note = match error {
                DomainError::DeliveryFailure(_) => "Error resending OTP.".to_string(),
                other => other.to_string(),
            };
            // Re-read without consuming another attempt.
            match service.peek(namespace, id).await {
                Ok(otp) => (otp, note),
                Err(DomainError::NotExist) => return message("Session expired", SESSION_EXPIRED),
                Err(error) => return internal_error(error),
            }
        }
        Err(error) => return internal_error(error),
    };

    let registered = match service.provider(&otp.provider) {
        Ok(registered) => registered,
        Err(_) => return provider_missing(),
    };
    let provider = &registered.provider;

    match otp.state() {
        OtpState::Closed => message(
            &format!("{} verified", provider.channel_name()),
            &format!(
                "Your {} is verified. This page can be closed now.",
                provider.channel_name()
            ),
        ),
        OtpState::Locked => too_many_attempts(otp.ttl_seconds()),
        OtpState::PendingNoAddress => redirect(address_uri(&otp)),
        OtpState::PendingAwaiting => page(html::otp_page(&form_view(
            &otp,
            registered,
            provider.max_otp_len(),
            &note,
        ))),
    }
}

/// GET /otp/{namespace}/{id}/status
///
/// Polled by the OTP page to notice verification done elsewhere.
pub async fn closed_status<S: OtpStore + 'static>(
    state: web::Data<AppState<S>>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (namespace, id) = path.into_inner();

    match state.service.closed_status(&namespace, &id).await {
        Ok(closed) => HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
            "closed": closed
        }))),
        Err(DomainError::NotExist) => {
            HttpResponse::BadRequest().json(ApiResponse::error("Session expired."))
        }
        Err(error) => {
            tracing::error!(error = %error, "Error checking OTP status");
            HttpResponse::InternalServerError().json(ApiResponse::error("Error checking status."))
        }
    }
}

/// GET /otp/{namespace}/{id}/address
pub async fn address_view_get<S: OtpStore + 'static>(
    state: web::Data<AppState<S>>,
    path: web::Path<(String, String)>,
    query: web::Query<AddressForm>,
) -> HttpResponse {
    let (namespace, id) = path.into_inner();
    address_view(&state, &namespace, &id, &query.to).await
}

/// POST /otp/{namespace}/{id}/address
pub async fn address_view_post<S: OtpStore + 'static>(
    state: web::Data<AppState<S>>,
    path: web::Path<(String, String)>,
    form: web::Form<AddressForm>,
) -> HttpResponse {
    let (namespace, id) = path.into_inner();
    address_view(&state, &namespace, &id, &form.to).await
}

async fn address_view<S: OtpStore + 'static>(
    state: &AppState<S>,
    namespace: &str,
    id: &str,
    to: &str,
) -> HttpResponse {
    let service = &state.service;

    let otp = match service.peek(namespace, id).await {
        Ok(otp) => otp,
        Err(DomainError::NotExist) => return message("Session expired", SESSION_EXPIRED),
        Err(error) => {
            tracing::error!(error = %error, "Error checking OTP");
            return message("Internal error", "Please try later.");
        }
    };

    if !otp.to.is_empty() {
        return redirect(otp_uri(&otp));
    }

    let registered = match service.provider(&otp.provider) {
        Ok(registered) => registered,
        Err(_) => return provider_missing(),
    };

    let mut note = String::new();
    if !to.is_empty() {
        match service.set_address(namespace, id, to).await {
            Ok(outcome) => return redirect(otp_uri(outcome.otp())),
            Err(DomainError::DeliveryFailure(_)) => note = "Error sending OTP.".to_string(),
            Err(DomainError::NotExist) => return message("Session expired", SESSION_EXPIRED),
            Err(error) => note = error.to_string(),
        }
    }

    page(html::address_page(&form_view(
        &otp,
        registered,
        registered.provider.max_address_len(),
        &note,
    )))
}

fn form_view<'a>(
    otp: &'a Otp,
    registered: &'a RegisteredProvider,
    max_len: usize,
    note: &'a str,
) -> FormView<'a> {
    let provider = &registered.provider;
    FormView {
        otp,
        channel_name: provider.channel_name(),
        channel_desc: provider.channel_desc(),
        address_name: provider.address_name(),
        address_desc: provider.address_desc(),
        max_len,
        message: note,
    }
}

fn internal_error(error: DomainError) -> HttpResponse {
    tracing::error!(error = %error, "Error rendering OTP view");
    message("Internal error", "Please try later.")
}
