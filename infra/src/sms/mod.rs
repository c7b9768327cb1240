//! SMS Module
//!
//! Message senders that deliver verification tokens.
//!
//! - **Log**: records messages in memory and the log, for development
//! - **Twilio**: production delivery via the Twilio API (feature `twilio-sms`)
//!
//! The sender is chosen once at startup from [`SmsConfig`]; a misconfigured
//! provider fails startup instead of silently falling back.

use async_trait::async_trait;
use std::time::Duration;

use mv_core::domain::{PlainToken, Subject};
use mv_core::errors::SendError;
use mv_core::services::MessageSender;
use mv_shared::{SmsConfig, SmsProvider};

use crate::InfrastructureError;

pub mod log_sender;
pub mod template;

#[cfg(feature = "twilio-sms")]
pub mod twilio;

pub use log_sender::LogSender;
pub use template::MessageTemplate;

#[cfg(feature = "twilio-sms")]
pub use twilio::TwilioSender;

#[cfg(test)]
mod tests;

/// Sender selected by configuration
pub enum SmsSender {
    Log(LogSender),
    #[cfg(feature = "twilio-sms")]
    Twilio(TwilioSender),
}

impl SmsSender {
    /// Build the configured sender
    ///
    /// `token_lifetime` fills the `{minutes}` placeholder of the template.
    pub fn from_config(config: &SmsConfig, token_lifetime: Duration) -> Result<Self, InfrastructureError> {
        config.validate()?;
        let template = MessageTemplate::new(config.message_template.clone(), token_lifetime);

        match config.provider {
            SmsProvider::Log => {
                tracing::info!(provider = "log", "Using log sender, messages are not delivered");
                Ok(SmsSender::Log(LogSender::new(template)))
            }
            #[cfg(feature = "twilio-sms")]
            SmsProvider::Twilio => Ok(SmsSender::Twilio(TwilioSender::new(
                config.twilio.clone(),
                template,
            )?)),
            #[cfg(not(feature = "twilio-sms"))]
            SmsProvider::Twilio => Err(InfrastructureError::Config(
                "sms.provider is twilio but the twilio-sms feature is not enabled".to_string(),
            )),
        }
    }

    /// The log sender, when that is the active provider
    pub fn as_log(&self) -> Option<&LogSender> {
        match self {
            SmsSender::Log(sender) => Some(sender),
            #[cfg(feature = "twilio-sms")]
            _ => None,
        }
    }
}

#[async_trait]
impl MessageSender for SmsSender {
    async fn send(&self, subject: &Subject, token: &PlainToken) -> Result<String, SendError> {
        match self {
            SmsSender::Log(sender) => sender.send(subject, token).await,
            #[cfg(feature = "twilio-sms")]
            SmsSender::Twilio(sender) => sender.send(subject, token).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            SmsSender::Log(sender) => sender.provider_name(),
            #[cfg(feature = "twilio-sms")]
            SmsSender::Twilio(sender) => sender.provider_name(),
        }
    }
}
