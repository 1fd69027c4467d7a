//! Webhook notification module
//!
//! Posts dossier status transitions to the requester's callback URL
//! and pings the review-team webhook when a dossier escalates to a
//! human. Delivery is best-effort: a failed webhook is logged and the
//! dossier outcome stands.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Request(String),

    #[error("Webhook returned status {0}")]
    Status(u16),
}

/// Payload posted to the requester's callback on every transition.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusNotification {
    pub message: String,
    pub data: NotificationData,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationData {
    pub id: String,
    pub status: String,
    pub create: String,
}

impl StatusNotification {
    pub fn new(dossier_id: uuid::Uuid, status: &str, created_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            message: "Status do dossie atualizado".to_string(),
            data: NotificationData {
                id: dossier_id.to_string(),
                status: status.to_string(),
                create: created_at.to_rfc3339(),
            },
        }
    }
}

/// Outbound webhook delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a status notification to the given callback URL.
    async fn notify(&self, url: &str, notification: &StatusNotification) -> Result<(), NotifyError>;

    /// Ping the review-team channel with a link to the dossier.
    async fn ping_review(&self, url: &str, message: &str) -> Result<(), NotifyError>;
}

/// Production notifier backed by reqwest with a bounded timeout.
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, url: &str, notification: &StatusNotification) -> Result<(), NotifyError> {
        self.post_json(url, notification).await
    }

    async fn ping_review(&self, url: &str, message: &str) -> Result<(), NotifyError> {
        // Discord-compatible payload shape
        self.post_json(url, &serde_json::json!({ "content": message }))
            .await
    }
}

/// Recording notifier for tests: captures every delivery attempt and
/// can be scripted to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    calls: std::sync::Mutex<Vec<(String, StatusNotification)>>,
    pings: std::sync::Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, StatusNotification)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pings(&self) -> Vec<(String, String)> {
        self.pings.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, url: &str, notification: &StatusNotification) -> Result<(), NotifyError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), notification.clone()));
        if self.fail {
            return Err(NotifyError::Status(502));
        }
        Ok(())
    }

    async fn ping_review(&self, url: &str, message: &str) -> Result<(), NotifyError> {
        self.pings
            .lock()
            .unwrap()
            .push((url.to_string(), message.to_string()));
        if self.fail {
            return Err(NotifyError::Status(502));
        }
        Ok(())
    }
}
