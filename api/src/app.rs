//! Application state and factory
//!
//! This module holds the shared application state and builds the
//! Actix-web application with every route wired to it.

use actix_web::{web, App};
use std::collections::HashMap;
use std::sync::Arc;

use og_core::repositories::OtpStore;
use og_core::services::VerificationService;

use crate::handlers::form_error_handler;
use crate::middleware::NamespaceAuth;
use crate::routes::{otp, system, views};

/// Application state that holds shared services
pub struct AppState<S: OtpStore> {
    pub service: Arc<VerificationService<S>>,
}

impl<S: OtpStore> AppState<S> {
    pub fn new(service: Arc<VerificationService<S>>) -> Self {
        Self { service }
    }
}

/// Register every route
///
/// `/api/otp` requires namespace credentials; the health check, provider
/// list and browser views do not.
pub fn configure<S: OtpStore + 'static>(
    credentials: Arc<HashMap<String, String>>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::FormConfig::default().error_handler(form_error_handler))
            .route("/", web::get().to(system::index))
            .route("/api/providers", web::get().to(system::providers::<S>))
            .route("/api/health", web::get().to(system::health::<S>))
            .service(
                web::scope("/api/otp")
                    .wrap(NamespaceAuth::new(credentials))
                    .route("", web::put().to(otp::issue_generated::<S>))
                    .route("/{id}", web::put().to(otp::issue::<S>))
                    .route("/{id}", web::post().to(otp::verify::<S>))
                    .route("/{id}/status", web::post().to(otp::check_status::<S>))
                    .route("/{id}/status", web::delete().to(otp::check_status::<S>)),
            )
            .service(
                web::scope("/otp/{namespace}/{id}")
                    .route("", web::get().to(views::otp_view_get::<S>))
                    .route("", web::post().to(views::otp_view_post::<S>))
                    .route("/status", web::get().to(views::closed_status::<S>))
                    .route("/address", web::get().to(views::address_view_get::<S>))
                    .route("/address", web::post().to(views::address_view_post::<S>)),
            )
            .default_service(web::route().to(system::not_found));
    }
}

/// Create and configure the application with all dependencies
pub fn create_app<S: OtpStore + 'static>(
    app_state: web::Data<AppState<S>>,
    credentials: Arc<HashMap<String, String>>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(app_state)
        .configure(configure::<S>(credentials))
}
