//! Messenger port and the host-service implementation

use async_trait::async_trait;
use rules_core::{ServiceCaller, ServiceError, ServiceRef};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Errors that can occur during message delivery
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notify service failed: {0}")]
    Service(#[from] ServiceError),

    #[error("channel rejected message: {0}")]
    Channel(String),
}

/// Outbound text channel
///
/// Receives text that is already escaped for the channel.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "notify/mobile_app")
    fn channel_name(&self) -> String;
}

/// Delivers messages by calling a host `notify/<target>` service with
/// `{"message": text}`
pub struct ServiceMessenger {
    caller: Arc<dyn ServiceCaller>,
    service: ServiceRef,
}

impl ServiceMessenger {
    pub fn new(caller: Arc<dyn ServiceCaller>, service: ServiceRef) -> Self {
        Self { caller, service }
    }
}

#[async_trait]
impl Messenger for ServiceMessenger {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        debug!(service = %self.service, "Sending notification");
        self.caller
            .call_service(&self.service, json!({ "message": text }))
            .await?;
        Ok(())
    }

    fn channel_name(&self) -> String {
        self.service.to_string()
    }
}
