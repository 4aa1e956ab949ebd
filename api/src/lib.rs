//! HTTP surface of the OTP gateway
//!
//! Exposes the namespace-authenticated JSON API under `/api` and the
//! browser views under `/otp/{namespace}/{id}`.

pub mod app;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod telemetry;

pub use app::{configure, create_app, AppState};
