//! Unauthenticated service endpoints

use actix_web::{web, HttpResponse};

use og_core::repositories::OtpStore;
use og_shared::ApiResponse;

use crate::app::AppState;

/// GET /
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("otp-gateway")
}

/// GET /api/providers
pub async fn providers<S: OtpStore + 'static>(state: web::Data<AppState<S>>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(state.service.provider_ids()))
}

/// GET /api/health
pub async fn health<S: OtpStore + 'static>(state: web::Data<AppState<S>>) -> HttpResponse {
    match state.service.health().await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success("OK")),
        Err(error) => {
            tracing::error!(error = %error, event = "health_check_failed", "Store health check failed");
            HttpResponse::ServiceUnavailable().json(ApiResponse::error("Unable to reach store."))
        }
    }
}

/// Default 404 handler
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error("Not found."))
}
