//! Name-keyed registry of service factories

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{ClientParams, InvokeError, ServiceClient, ServiceFactory};

/// Selects a [`ServiceFactory`] by service name (ASCII case-insensitive).
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    factories: HashMap<String, Arc<dyn ServiceFactory>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one with the same name.
    pub fn register(&mut self, factory: Arc<dyn ServiceFactory>) {
        let key = factory.service_name().to_ascii_lowercase();
        debug!(service = %key, "Registered service");
        self.factories.insert(key, factory);
    }

    pub fn with_service(mut self, factory: Arc<dyn ServiceFactory>) -> Self {
        self.register(factory);
        self
    }

    pub fn contains(&self, service: &str) -> bool {
        self.factories.contains_key(&service.to_ascii_lowercase())
    }

    /// Registered service names, sorted
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build a fresh client for `service` bound to `params`.
    pub fn client(
        &self,
        service: &str,
        params: &ClientParams,
    ) -> Result<Arc<dyn ServiceClient>, InvokeError> {
        let factory = self
            .factories
            .get(&service.to_ascii_lowercase())
            .ok_or_else(|| InvokeError::UnknownService(service.to_string()))?;

        factory.create(params).map_err(|source| InvokeError::Client {
            service: service.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services())
            .finish()
    }
}
