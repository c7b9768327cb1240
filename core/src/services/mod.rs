//! Business services containing the verification protocol and its collaborators.

pub mod broker;
pub mod cleanup;
pub mod clock;
pub mod generator;
pub mod hasher;
pub mod sender;

// Re-export commonly used types
pub use broker::{BrokerConfig, IssuedToken, TokenBroker, VerifiedSubject};
pub use cleanup::{SweepResult, TokenSweeper};
pub use clock::{Clock, ManualClock, SystemClock};
pub use generator::TokenGenerator;
pub use hasher::TokenHasher;
pub use sender::MessageSender;
