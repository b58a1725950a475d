//! Domain event publishing over NATS.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    /// Connects when a URL is configured. A failed connection degrades to log-only publishing.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::default() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self { nats: Some(client) }
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable, events will only be logged");
                Self::default()
            }
        }
    }

    pub fn is_connected(&self) -> bool { self.nats.is_some() }

    /// Publishes after the owning transaction committed; failures are logged, never returned.
    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            tracing::debug!(%subject, ?event, "domain event");
            let Some(client) = &self.nats else { continue };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!(%subject, error = %e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(%subject, error = %e, "failed to publish event");
            }
        }
    }
}
