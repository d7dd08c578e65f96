//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StoreSettings;
use crate::publisher::EventPublisher;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub events: EventPublisher,
    pub settings: Arc<StoreSettings>,
}

impl AppState {
    pub fn new(db: PgPool, events: EventPublisher, settings: StoreSettings) -> Self {
        Self { db, events, settings: Arc::new(settings) }
    }
}
