use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The most recently published dashboard document.
#[derive(Debug, Clone)]
pub struct PublishedView {
    pub json: Arc<str>,
    pub generated_at: DateTime<Utc>,
}

/// Shared slot the pipeline publishes into and the HTTP server reads from.
#[derive(Debug, Clone, Default)]
pub struct LiveView {
    latest: Arc<RwLock<Option<PublishedView>>>,
}

impl LiveView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, json: &[u8], generated_at: DateTime<Utc>) {
        let json: Arc<str> = Arc::from(String::from_utf8_lossy(json).as_ref());
        let mut latest = self.latest.write().await;
        *latest = Some(PublishedView { json, generated_at });
    }

    pub async fn latest(&self) -> Option<PublishedView> {
        self.latest.read().await.clone()
    }
}
