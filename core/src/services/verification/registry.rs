//! Runtime registry of configured providers

use std::collections::HashMap;
use std::sync::Arc;

use super::render::MessageTemplate;
use super::traits::Provider;

/// A provider together with its message template
#[derive(Clone)]
pub struct RegisteredProvider {
    pub provider: Arc<dyn Provider>,
    pub template: MessageTemplate,
}

/// Map from provider id to provider, populated at startup
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, RegisteredProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own id, replacing any previous entry
    pub fn register(&mut self, provider: Arc<dyn Provider>, template: MessageTemplate) {
        let id = provider.id().to_string();
        self.providers
            .insert(id, RegisteredProvider { provider, template });
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredProvider> {
        self.providers.get(id)
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
