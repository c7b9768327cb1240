//! Verification message text

use std::time::Duration;

use mv_core::domain::PlainToken;

/// Message text with `{token}` and `{minutes}` placeholders
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    template: String,
    lifetime_minutes: u64,
}

impl MessageTemplate {
    /// `token_lifetime` fills `{minutes}`, rounded up to whole minutes
    pub fn new(template: impl Into<String>, token_lifetime: Duration) -> Self {
        let secs = token_lifetime.as_secs();
        Self {
            template: template.into(),
            lifetime_minutes: (secs + 59) / 60,
        }
    }

    pub fn render(&self, token: &PlainToken) -> String {
        self.template
            .replace("{token}", token.expose())
            .replace("{minutes}", &self.lifetime_minutes.to_string())
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self::new(
            mv_shared::config::sms::DEFAULT_MESSAGE_TEMPLATE,
            Duration::from_secs(300),
        )
    }
}
