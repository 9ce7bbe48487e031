//! Domain event publishing

use async_trait::async_trait;

use crate::domain::events::{DomainEvent, EventPublisher};

/// Publishes each event as JSON on its own subject.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub async fn connect(url: &str) -> Result<Self, async_nats::ConnectError> {
        let client = async_nats::connect(url).await?;
        tracing::info!(url, "connected to NATS");
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::error!(subject = %subject, error = %err, "failed to encode event");
                    continue;
                }
            };
            if let Err(err) = self.client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(subject = %subject, error = %err, "failed to publish event");
            }
        }
    }
}

/// Used when no broker is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) {
        for event in &events {
            tracing::debug!(subject = %event.subject(), "event dropped, no publisher configured");
        }
    }
}
