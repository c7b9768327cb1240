//! Twilio Sender Implementation
//!
//! Delivers verification tokens through the Twilio Messaging API.
//!
//! ## Features
//!
//! - Automatic retry with exponential backoff, capped at [`MAX_BACKOFF`]
//! - Client errors (bad number, bad request) fail without retry
//! - Security: phone numbers masked and tokens never logged

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use twilio::{Client, OutboundMessage};

use mv_core::domain::{PlainToken, Subject};
use mv_core::errors::SendError;
use mv_core::services::MessageSender;
use mv_shared::phone::mask_phone_number;
use mv_shared::TwilioConfig;

use super::template::MessageTemplate;
use crate::InfrastructureError;

/// Twilio limit for a single message body
pub const MAX_MESSAGE_LENGTH: usize = 1600;

const PROVIDER: &str = "twilio";

/// Longest pause between two send attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Delay before the attempt after one that waited `delay`
pub fn next_delay(delay: Duration) -> Duration {
    delay.saturating_mul(2).min(MAX_BACKOFF)
}

/// How a failed Twilio call should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Rate limited; back off and try again
    RateLimited,
    /// Provider-side failure; try again
    ServerError,
    /// The request itself is wrong; retrying cannot help
    Fatal,
    /// Unknown failure (network and the like); try again
    Transient,
}

/// Classify a Twilio error message
pub fn classify_failure(message: &str) -> RetryDecision {
    let lower = message.to_ascii_lowercase();
    if lower.contains("429") || lower.contains("rate") {
        RetryDecision::RateLimited
    } else if ["500", "502", "503", "504"].iter().any(|code| lower.contains(code)) {
        RetryDecision::ServerError
    } else if lower.contains("400") || lower.contains("invalid") {
        RetryDecision::Fatal
    } else {
        RetryDecision::Transient
    }
}

/// Sender backed by Twilio
pub struct TwilioSender {
    client: Client,
    config: TwilioConfig,
    template: MessageTemplate,
}

impl TwilioSender {
    /// Create a new Twilio sender; credentials are checked up front
    pub fn new(config: TwilioConfig, template: MessageTemplate) -> Result<Self, InfrastructureError> {
        config.validate()?;

        let client = Client::new(&config.account_sid, &config.auth_token);

        info!(
            from = %mask_phone_number(&config.from_number),
            max_retries = config.max_retries,
            "Twilio sender initialized"
        );

        Ok(Self {
            client,
            config,
            template,
        })
    }

    /// Send SMS with retry logic
    async fn send_with_retry(&self, to: &str, body: &str) -> Result<String, SendError> {
        let mut attempts = 0;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms).min(MAX_BACKOFF);

        loop {
            attempts += 1;

            debug!(
                phone = %mask_phone_number(to),
                attempt = attempts,
                max_attempts = self.config.max_retries,
                "Sending SMS via Twilio"
            );

            let msg = OutboundMessage::new(&self.config.from_number, to, body);

            match self.client.send_message(msg).await {
                Ok(response) => {
                    info!(
                        target: "sms_service",
                        provider = PROVIDER,
                        phone = %mask_phone_number(to),
                        message_id = %response.sid,
                        attempts,
                        "SMS sent"
                    );
                    return Ok(response.sid);
                }
                Err(e) => {
                    let error_msg = e.to_string();
                    error!(
                        phone = %mask_phone_number(to),
                        attempt = attempts,
                        error = %error_msg,
                        "Twilio send failed"
                    );

                    if attempts >= self.config.max_retries {
                        return Err(SendError::new(
                            PROVIDER,
                            format!("failed after {} attempts: {}", attempts, error_msg),
                        ));
                    }

                    match classify_failure(&error_msg) {
                        RetryDecision::Fatal => {
                            return Err(SendError::new(
                                PROVIDER,
                                format!("invalid request: {}", error_msg),
                            ));
                        }
                        RetryDecision::RateLimited => {
                            warn!(delay_ms = delay.as_millis() as u64, "Rate limit detected, backing off");
                        }
                        RetryDecision::ServerError | RetryDecision::Transient => {
                            warn!(delay_ms = delay.as_millis() as u64, "Retrying Twilio send");
                        }
                    }

                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay);
                }
            }
        }
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send(&self, subject: &Subject, token: &PlainToken) -> Result<String, SendError> {
        let body = self.template.render(token);

        if body.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(SendError::new(
                PROVIDER,
                format!("message exceeds maximum length of {} characters", MAX_MESSAGE_LENGTH),
            ));
        }

        self.send_with_retry(subject.as_str(), &body).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
