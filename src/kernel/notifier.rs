//! Notifier — buffered, fire-and-forget push notification sink (spec §2.3).
//!
//! Batches outbound messages to an Expo-compatible endpoint (spec §6
//! "Notification transport") and retries transport failures a bounded
//! number of times; failures are logged, never propagated (spec §7
//! "the notification step itself is best-effort").

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// One outbound push notification intent, built by the engine after a
/// transaction commits (spec §9 "build a batch of notification intents").
#[derive(Debug, Clone, Serialize)]
pub struct NotificationIntent {
    pub push_token: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait PushNotificationService: Send + Sync {
    async fn send_batch(&self, notifications: Vec<NotificationIntent>);
}

#[derive(Debug, Serialize)]
struct ExpoMessage {
    to: String,
    title: String,
    body: String,
    data: serde_json::Value,
    sound: &'static str,
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Vec<ExpoTicket>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
}

/// Expo-compatible push client (spec §6: array of `{to, sound:"default",
/// title, body, data}`, batched up to 100 per request — spec §5).
pub struct ExpoNotifier {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    max_attempts: u32,
}

impl ExpoNotifier {
    const BATCH_SIZE: usize = 100;

    pub fn new(endpoint: String, access_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            access_token,
            max_attempts: 3,
        }
    }

    async fn send_one_batch(&self, batch: &[NotificationIntent]) -> anyhow::Result<()> {
        let messages: Vec<ExpoMessage> = batch
            .iter()
            .map(|n| ExpoMessage {
                to: n.push_token.clone(),
                title: n.title.clone(),
                body: n.body.clone(),
                data: n.data.clone(),
                sound: "default",
            })
            .collect();

        let mut request = self.client.post(&self.endpoint).json(&messages);
        if let Some(token) = &self.access_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Expo push API error {status}: {body}");
        }

        let parsed: ExpoResponse = response.json().await?;
        let errors = parsed.data.iter().filter(|t| t.status == "error").count();
        if errors > 0 {
            anyhow::bail!("{errors} of {} Expo tickets reported errors", parsed.data.len());
        }
        Ok(())
    }

    async fn send_batch_with_retry(&self, batch: &[NotificationIntent]) {
        let mut delay = Duration::from_millis(100);
        for attempt in 1..=self.max_attempts {
            match self.send_one_batch(batch).await {
                Ok(()) => {
                    info!(count = batch.len(), "push batch delivered");
                    return;
                }
                Err(err) if attempt < self.max_attempts => {
                    warn!(attempt, error = %err, "push batch failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 3;
                }
                Err(err) => {
                    error!(attempts = attempt, error = %err, "push batch failed permanently");
                }
            }
        }
    }
}

#[async_trait]
impl PushNotificationService for ExpoNotifier {
    async fn send_batch(&self, notifications: Vec<NotificationIntent>) {
        if notifications.is_empty() {
            return;
        }
        for chunk in notifications.chunks(Self::BATCH_SIZE) {
            self.send_batch_with_retry(chunk).await;
        }
    }
}

/// In-memory notifier for tests: records every batch instead of calling out.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<NotificationIntent>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<NotificationIntent> {
        self.sent.lock().expect("mock notifier poisoned").clone()
    }
}

#[async_trait]
impl PushNotificationService for MockNotifier {
    async fn send_batch(&self, notifications: Vec<NotificationIntent>) {
        self.sent
            .lock()
            .expect("mock notifier poisoned")
            .extend(notifications);
    }
}
