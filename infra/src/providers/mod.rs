//! Channel provider implementations
//!
//! Providers are built once at start-up from `[providers.<id>]` sections
//! and registered under their configured id together with their message
//! templates.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use og_core::services::{MessageTemplate, Provider, ProviderRegistry};
use og_shared::{ProviderConfig, ProviderKind};

use crate::InfrastructureError;

pub mod log;
pub mod sms;
pub mod smtp;
pub mod webhook;

pub use log::{LogProvider, LogSettings};
pub use sms::{SmsProvider, SmsSettings};
pub use smtp::{SmtpProvider, SmtpSettings};
pub use webhook::{WebhookProvider, WebhookSettings};

/// Build a single provider from its configuration
pub fn build_provider(
    id: &str,
    config: &ProviderConfig,
) -> Result<Arc<dyn Provider>, InfrastructureError> {
    let provider: Arc<dyn Provider> = match config.kind {
        ProviderKind::Smtp => Arc::new(SmtpProvider::new(id, config.settings_as()?)?),
        ProviderKind::Webhook => Arc::new(WebhookProvider::new(id, config.settings_as()?)?),
        ProviderKind::Sms => Arc::new(SmsProvider::new(id, config.settings_as()?)?),
        ProviderKind::Log => Arc::new(LogProvider::new(id, config.settings_as()?)),
    };
    Ok(provider)
}

/// Build the registry of every configured provider
///
/// # Returns
/// * `Err(InfrastructureError::Config)` - A provider's settings or template are invalid
pub fn build_registry(
    providers: &HashMap<String, ProviderConfig>,
) -> Result<ProviderRegistry, InfrastructureError> {
    let mut registry = ProviderRegistry::new();

    for (id, config) in providers {
        let provider = build_provider(id, config)
            .map_err(|e| InfrastructureError::Config(format!("provider `{}`: {}", id, e)))?;
        let template = MessageTemplate::new(config.subject.clone(), config.body_template()?);

        info!(provider = %id, kind = ?config.kind, "Registered provider");
        registry.register(provider, template);
    }

    Ok(registry)
}
