//! Fire-and-forget usage pings.
//!
//! Pings are strictly best-effort: no retry, no buffering, failures are
//! logged at debug level and dropped. Nothing in the synchronization or
//! launch path ever waits on one.

use std::time::Duration;

#[derive(Clone)]
pub struct UsagePing {
    client: reqwest::Client,
    url: Option<String>,
    guid: String,
    game_name: String,
}

impl UsagePing {
    pub fn new(url: Option<String>, guid: impl Into<String>, game_name: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url,
            guid: guid.into(),
            game_name: game_name.into(),
        }
    }

    /// Post an event marker ("launch", "install", ...) in the background.
    /// A missing ping URL disables telemetry entirely.
    pub fn send(&self, event: &str) {
        let Some(url) = self.url.clone() else {
            return;
        };
        let client = self.client.clone();
        let body = serde_json::json!({
            "guid": self.guid,
            "game": self.game_name,
            "event": event,
        });
        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::debug!("usage ping rejected with HTTP {}", response.status());
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!("usage ping failed: {err}");
                }
            }
        });
    }
}
