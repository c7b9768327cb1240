//! SMS delivery configuration

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default text of a verification message
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Your mobile verification code is: {token}";

/// Upper bound for `sms.twilio.max_retries`
pub const MAX_SEND_ATTEMPTS: u32 = 10;

/// Message sender implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsProvider {
    /// Writes messages to the log instead of sending them
    Log,
    /// Twilio Programmable Messaging
    Twilio,
}

impl Default for SmsProvider {
    fn default() -> Self {
        SmsProvider::Log
    }
}

/// Twilio credentials and retry policy
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TwilioConfig {
    /// Twilio Account SID
    #[serde(default)]
    pub account_sid: String,
    /// Twilio Auth Token
    #[serde(default)]
    pub auth_token: String,
    /// From phone number (must be a Twilio phone number)
    #[serde(default)]
    pub from_number: String,
    /// Maximum send attempts per message
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial retry delay in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl TwilioConfig {
    /// Check that credentials are present and the sender number is E.164
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_sid.is_empty() {
            return Err(ConfigError::invalid("sms.twilio.account_sid", "not set"));
        }
        if self.auth_token.is_empty() {
            return Err(ConfigError::invalid("sms.twilio.auth_token", "not set"));
        }
        if !self.from_number.starts_with('+') {
            return Err(ConfigError::invalid(
                "sms.twilio.from_number",
                "must be in E.164 format (starting with '+')",
            ));
        }
        if !(1..=MAX_SEND_ATTEMPTS).contains(&self.max_retries) {
            return Err(ConfigError::invalid(
                "sms.twilio.max_retries",
                format!("must be between 1 and {}, got {}", MAX_SEND_ATTEMPTS, self.max_retries),
            ));
        }
        Ok(())
    }
}

/// SMS delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmsConfig {
    /// Which sender delivers tokens
    #[serde(default)]
    pub provider: SmsProvider,

    /// Message text; `{token}` is replaced by the code and `{minutes}` by its lifetime
    #[serde(default = "default_message_template")]
    pub message_template: String,

    /// Twilio settings, required when `provider = "twilio"`
    #[serde(default)]
    pub twilio: TwilioConfig,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            provider: SmsProvider::default(),
            message_template: default_message_template(),
            twilio: TwilioConfig {
                max_retries: default_max_retries(),
                retry_delay_ms: default_retry_delay_ms(),
                ..Default::default()
            },
        }
    }
}

impl SmsConfig {
    /// The template must carry the token placeholder
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.message_template.contains("{token}") {
            return Err(ConfigError::invalid(
                "sms.message_template",
                "must contain the {token} placeholder",
            ));
        }
        Ok(())
    }
}

fn default_message_template() -> String {
    String::from(DEFAULT_MESSAGE_TEMPLATE)
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}
