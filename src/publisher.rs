//! Publishes domain events to NATS.
//!
//! Publishing is best-effort: a broker outage is logged and never fails the
//! request that produced the events.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    /// Connects when `url` is set; otherwise events are only logged.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else {
            tracing::info!("NATS_URL not set, domain events will not be published");
            return Self::default();
        };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "Connected to NATS");
                Self { nats: Some(client) }
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "Could not connect to NATS, continuing without events");
                Self::default()
            }
        }
    }

    pub fn disabled() -> Self { Self::default() }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(&event).await;
        }
    }

    pub async fn publish(&self, event: &DomainEvent) {
        let subject = event.subject();
        let Some(client) = &self.nats else {
            tracing::debug!(%subject, ?event, "Domain event (not published)");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "Could not serialize domain event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %e, "Failed to publish domain event");
        }
    }
}
