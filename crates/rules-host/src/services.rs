//! Service registry with async handlers

use async_trait::async_trait;
use dashmap::DashMap;
use rules_core::{ServiceCaller, ServiceError, ServiceRef};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Future type for async service handlers
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<(), ServiceError>> + Send>>;

/// Service handler function type
pub type ServiceHandler = Arc<dyn Fn(serde_json::Value) -> ServiceFuture + Send + Sync>;

/// Routes service calls to registered handlers
///
/// Stands in for the host's service layer: control actions (charger
/// stop/start) and notify targets are both plain `domain/service` entries.
pub struct ServiceRegistry {
    services: DashMap<ServiceRef, ServiceHandler>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a handler, replacing any previous one for the same service
    #[instrument(skip(self, handler), fields(service = %service))]
    pub fn register<F, Fut>(&self, service: ServiceRef, handler: F)
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        debug!("Registering service");
        let handler: ServiceHandler = Arc::new(move |data| Box::pin(handler(data)) as ServiceFuture);
        self.services.insert(service, handler);
    }

    /// Call a registered service
    #[instrument(skip(self, data), fields(service = %service))]
    pub async fn call(&self, service: &ServiceRef, data: serde_json::Value) -> Result<(), ServiceError> {
        let handler = self
            .services
            .get(service)
            .map(|h| h.clone())
            .ok_or_else(|| {
                warn!("Service not found");
                ServiceError::NotFound(service.clone())
            })?;

        debug!("Calling service");
        handler(data).await
    }

    pub fn has_service(&self, service: &ServiceRef) -> bool {
        self.services.contains_key(service)
    }

    /// All registered services, sorted for stable output
    pub fn services(&self) -> Vec<ServiceRef> {
        let mut all: Vec<_> = self.services.iter().map(|e| e.key().clone()).collect();
        all.sort_by_key(|s| s.to_string());
        all
    }

    pub fn unregister(&self, service: &ServiceRef) -> bool {
        self.services.remove(service).is_some()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceCaller for ServiceRegistry {
    async fn call_service(
        &self,
        service: &ServiceRef,
        data: serde_json::Value,
    ) -> Result<(), ServiceError> {
        self.call(service, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn service(raw: &str) -> ServiceRef {
        raw.parse().unwrap()
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let registry = ServiceRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        registry.register(service("button/press"), move |data| {
            let seen = seen.clone();
            async move {
                assert_eq!(data["device_id"], "charger-1");
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        assert!(registry.has_service(&service("button/press")));
        assert_ok!(
            registry
                .call(&service("button/press"), json!({"device_id": "charger-1"}))
                .await
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_service() {
        let registry = ServiceRegistry::new();
        let err = assert_err!(registry.call(&service("notify/nobody"), json!({})).await);
        assert_eq!(err, ServiceError::NotFound(service("notify/nobody")));
    }

    #[tokio::test]
    async fn test_handler_error_is_returned() {
        let registry = ServiceRegistry::new();
        registry.register(service("button/press"), |_| async {
            Err(ServiceError::CallFailed("charger offline".into()))
        });

        let caller: &dyn ServiceCaller = &registry;
        let err = assert_err!(caller.call_service(&service("button/press"), json!({})).await);
        assert!(matches!(err, ServiceError::CallFailed(_)));
    }

    #[test]
    fn test_services_listing_and_unregister() {
        let registry = ServiceRegistry::new();
        registry.register(service("notify/mobile_app"), |_| async { Ok(()) });
        registry.register(service("button/press"), |_| async { Ok(()) });

        assert_eq!(
            registry.services(),
            vec![service("button/press"), service("notify/mobile_app")]
        );
        assert!(registry.unregister(&service("button/press")));
        assert!(!registry.unregister(&service("button/press")));
    }
}
