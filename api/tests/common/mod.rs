//! Shared fixtures for the API integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::web;
use og_api::AppState;
use og_core::domain::Otp;
use og_core::errors::ProviderError;
use og_core::repositories::InMemoryOtpStore;
use og_core::services::{
    MessageTemplate, Provider, ProviderRegistry, VerificationService, VerificationServiceConfig,
};

pub const NAMESPACE: &str = "myapp";
pub const SECRET: &str = "s3cret";

/// E-mail-like provider that records every push
#[derive(Default)]
pub struct RecordingProvider {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingProvider {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    fn id(&self) -> &str {
        "email"
    }

    fn channel_name(&self) -> &str {
        "E-mail"
    }

    fn channel_desc(&self) -> &str {
        "We have sent a code to your e-mail."
    }

    fn address_name(&self) -> &str {
        "E-mail ID"
    }

    fn address_desc(&self) -> &str {
        "Enter your e-mail ID"
    }

    fn validate_address(&self, to: &str) -> Result<(), ProviderError> {
        if !to.contains('@') {
            return Err(ProviderError::InvalidAddress("invalid e-mail".to_string()));
        }
        Ok(())
    }

    async fn push(&self, otp: &Otp, _subject: &str, _body: &[u8]) -> Result<(), ProviderError> {
        self.sent
            .lock()
            .unwrap()
            .push((otp.to.clone(), otp.otp.clone()));
        Ok(())
    }

    fn max_address_len(&self) -> usize {
        100
    }

    fn max_otp_len(&self) -> usize {
        6
    }

    fn max_body_len(&self) -> usize {
        1024
    }
}

pub struct Fixture {
    pub state: web::Data<AppState<InMemoryOtpStore>>,
    pub credentials: Arc<HashMap<String, String>>,
    pub provider: Arc<RecordingProvider>,
}

pub fn fixture() -> Fixture {
    let provider = Arc::new(RecordingProvider::default());
    let mut registry = ProviderRegistry::new();
    registry.register(provider.clone(), MessageTemplate::new("Your code", "{{otp}}"));

    let service = VerificationService::new(
        Arc::new(InMemoryOtpStore::new()),
        Arc::new(registry),
        VerificationServiceConfig::default(),
    );

    Fixture {
        state: web::Data::new(AppState::new(Arc::new(service))),
        credentials: Arc::new(HashMap::from([(NAMESPACE.to_string(), SECRET.to_string())])),
        provider,
    }
}

pub fn basic_auth(namespace: &str, secret: &str) -> (&'static str, String) {
    (
        "Authorization",
        format!("Basic {}", STANDARD.encode(format!("{}:{}", namespace, secret))),
    )
}

pub fn auth() -> (&'static str, String) {
    basic_auth(NAMESPACE, SECRET)
}
