//! Namespace authentication middleware for the `/api/otp` endpoints.
//!
//! Callers authenticate with HTTP Basic auth where the username is the
//! namespace and the password is its secret. On success the namespace is
//! injected into the request extensions and handlers read it through the
//! [`Namespace`] extractor.

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    http::header::AUTHORIZATION,
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use constant_time_eq::constant_time_eq;
use futures_util::future::LocalBoxFuture;
use std::{
    collections::HashMap,
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use og_shared::ApiResponse;

/// Authenticated namespace injected into requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace(pub String);

impl Namespace {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reasons a request is rejected, with the messages sent to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingHeader,
    InvalidBase64,
    InvalidValue,
    InvalidCredentials,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::MissingHeader => "Missing Basic Authorization header.",
            AuthFailure::InvalidBase64 => "Invalid Base64 value in Basic Authorization header.",
            AuthFailure::InvalidValue => "Invalid value in Basic Authorization header.",
            AuthFailure::InvalidCredentials => "Invalid API credentials.",
        }
    }
}

/// Namespace authentication middleware factory
#[derive(Clone)]
pub struct NamespaceAuth {
    /// Namespace to secret
    credentials: Arc<HashMap<String, String>>,
}

impl NamespaceAuth {
    pub fn new(credentials: Arc<HashMap<String, String>>) -> Self {
        Self { credentials }
    }
}

impl<S, B> Transform<S, ServiceRequest> for NamespaceAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = NamespaceAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(NamespaceAuthMiddleware {
            service: Rc::new(service),
            credentials: Arc::clone(&self.credentials),
        }))
    }
}

/// Namespace authentication middleware service
pub struct NamespaceAuthMiddleware<S> {
    service: Rc<S>,
    credentials: Arc<HashMap<String, String>>,
}

impl<S, B> Service<ServiceRequest> for NamespaceAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let outcome = authenticate(
            req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok()),
            &self.credentials,
        );

        Box::pin(async move {
            match outcome {
                Ok(namespace) => {
                    req.extensions_mut().insert(Namespace(namespace));
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(failure) => {
                    tracing::warn!(
                        path = %req.path(),
                        reason = ?failure,
                        event = "auth_rejected",
                        "Rejected API request"
                    );
                    let response = HttpResponse::Unauthorized()
                        .json(ApiResponse::error(failure.message()));
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

/// Resolve the namespace from an `Authorization` header value
pub fn authenticate(
    header: Option<&str>,
    credentials: &HashMap<String, String>,
) -> Result<String, AuthFailure> {
    let encoded = header
        .and_then(|h| h.strip_prefix("Basic"))
        .ok_or(AuthFailure::MissingHeader)?;

    let payload = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthFailure::InvalidBase64)?;
    let payload = String::from_utf8(payload).map_err(|_| AuthFailure::InvalidValue)?;

    let (namespace, secret) = payload
        .split_once(':')
        .ok_or(AuthFailure::InvalidValue)?;

    match credentials.get(namespace) {
        Some(expected) if constant_time_eq(expected.as_bytes(), secret.as_bytes()) => {
            Ok(namespace.to_string())
        }
        _ => Err(AuthFailure::InvalidCredentials),
    }
}

/// Extractor for the authenticated namespace
impl FromRequest for Namespace {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = req
            .extensions()
            .get::<Namespace>()
            .cloned()
            .ok_or_else(|| ErrorUnauthorized("Authentication required"));

        ready(result)
    }
}
