//! Log Sender Implementation
//!
//! A development sender that records messages instead of sending them.
//! The destination is logged masked and the token is never logged; the last
//! token per number is kept in memory so tests and demos can read it back.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use mv_core::domain::{PlainToken, Subject};
use mv_core::errors::SendError;
use mv_core::services::MessageSender;

use super::template::MessageTemplate;

/// Sender for development and testing
pub struct LogSender {
    template: MessageTemplate,
    /// Last delivered token per E.164 number
    deliveries: RwLock<HashMap<String, String>>,
    /// Counter for tracking number of messages sent
    message_count: AtomicU64,
    /// Whether to simulate failures (for testing)
    simulate_failure: AtomicBool,
}

impl LogSender {
    pub fn new(template: MessageTemplate) -> Self {
        Self {
            template,
            deliveries: RwLock::new(HashMap::new()),
            message_count: AtomicU64::new(0),
            simulate_failure: AtomicBool::new(false),
        }
    }

    /// Token most recently delivered to `phone` (E.164)
    pub async fn last_token(&self, phone: &str) -> Option<String> {
        self.deliveries.read().await.get(phone).cloned()
    }

    /// Get the total number of messages sent
    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::SeqCst)
    }

    /// Enable or disable failure simulation
    pub fn set_simulate_failure(&self, simulate: bool) {
        self.simulate_failure.store(simulate, Ordering::SeqCst);
    }

    /// Render the message a user would receive
    pub fn render(&self, token: &PlainToken) -> String {
        self.template.render(token)
    }
}

impl Default for LogSender {
    fn default() -> Self {
        Self::new(MessageTemplate::default())
    }
}

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, subject: &Subject, token: &PlainToken) -> Result<String, SendError> {
        if self.simulate_failure.load(Ordering::SeqCst) {
            warn!(
                phone = %subject.masked(),
                "Log sender simulating delivery failure"
            );
            return Err(SendError::new("log", "simulated delivery failure"));
        }

        let body = self.template.render(token);
        let message_id = format!("log_{}", Uuid::new_v4());

        self.deliveries
            .write()
            .await
            .insert(subject.as_str().to_string(), token.expose().to_string());
        let count = self.message_count.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            target: "sms_service",
            provider = "log",
            phone = %subject.masked(),
            message_id = %message_id,
            message_length = body.len(),
            message_number = count,
            "SMS recorded by log sender"
        );

        Ok(message_id)
    }

    fn provider_name(&self) -> &'static str {
        "log"
    }
}
