//! Message delivery capability consumed by the broker

use async_trait::async_trait;

use crate::domain::{PlainToken, Subject};
use crate::errors::SendError;

/// Delivers a plaintext token to a mobile number
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send the token and return the provider's message id
    async fn send(&self, subject: &Subject, token: &PlainToken) -> Result<String, SendError>;

    /// Short provider name used in logs
    fn provider_name(&self) -> &'static str;
}
