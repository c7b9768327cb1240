//! Unit tests for the token broker

use std::sync::Arc;

use chrono::{Duration, Utc};

use mv_shared::{DeliveryFailurePolicy, TokenCharset};

use crate::domain::Subject;
use crate::errors::VerificationError;
use crate::repositories::{InMemoryTokenStore, TokenStore};
use crate::services::broker::{BrokerConfig, TokenBroker};
use crate::services::clock::{Clock, ManualClock};
use crate::services::hasher::TokenHasher;

use super::mocks::{FailingStore, RecordingSender, StalledStore};

const PHONE: &str = "+15551234567";

struct Harness {
    broker: TokenBroker<InMemoryTokenStore, RecordingSender>,
    store: Arc<InMemoryTokenStore>,
    sender: Arc<RecordingSender>,
    clock: Arc<ManualClock>,
}

fn config() -> BrokerConfig {
    BrokerConfig {
        token_length: 6,
        token_lifetime: Duration::minutes(5),
        resend_throttle: Duration::seconds(60),
        ..BrokerConfig::default()
    }
}

fn harness(config: BrokerConfig) -> Harness {
    let store = Arc::new(InMemoryTokenStore::new());
    let sender = Arc::new(RecordingSender::new());
    let clock = Arc::new(ManualClock::starting_now());
    let broker = TokenBroker::new(
        store.clone(),
        sender.clone(),
        TokenHasher::new("test-key").unwrap(),
        config,
    )
    .unwrap()
    .with_clock(clock.clone());

    Harness {
        broker,
        store,
        sender,
        clock,
    }
}

fn subject() -> Subject {
    Subject::parse(PHONE, None).unwrap()
}

#[tokio::test]
async fn test_request_stores_hash_and_sends_plaintext() {
    let h = harness(config());

    let issued = h.broker.request_token(PHONE).await.unwrap();
    assert_eq!(issued.subject.as_str(), PHONE);
    assert_eq!(issued.message_id, "mock-msg-1");
    assert_eq!(issued.expires_at, h.clock.now() + Duration::minutes(5));
    assert_eq!(issued.next_resend_at, h.clock.now() + Duration::seconds(60));

    let token = h.sender.last_token(PHONE).unwrap();
    assert_eq!(token.len(), 6);

    let record = h.store.find(&subject()).await.unwrap().unwrap();
    assert_ne!(record.token_hash.as_str(), token);
    assert!(!record.token_hash.as_str().contains(&token));
}

#[tokio::test]
async fn test_verify_succeeds_once() {
    let h = harness(config());
    h.broker.request_token(PHONE).await.unwrap();
    let token = h.sender.last_token(PHONE).unwrap();

    let verified = h.broker.verify_token(PHONE, &token).await.unwrap();
    assert_eq!(verified.subject, subject());
    assert_eq!(verified.verified_at, h.clock.now());
    assert!(h.store.is_empty().await);

    let second = h.broker.verify_token(PHONE, &token).await;
    assert_eq!(second, Err(VerificationError::TokenNotFound));
}

#[tokio::test]
async fn test_verify_without_request_is_not_found() {
    let h = harness(config());
    let result = h.broker.verify_token(PHONE, "123456").await;
    assert_eq!(result, Err(VerificationError::TokenNotFound));
}

#[tokio::test]
async fn test_wrong_token_leaves_record_untouched() {
    let h = harness(config());
    h.broker.request_token(PHONE).await.unwrap();
    let token = h.sender.last_token(PHONE).unwrap();
    let before = h.store.find(&subject()).await.unwrap().unwrap();

    let wrong = if token == "000000" { "000001" } else { "000000" };
    let result = h.broker.verify_token(PHONE, wrong).await;
    assert_eq!(result, Err(VerificationError::InvalidToken));

    let after = h.store.find(&subject()).await.unwrap().unwrap();
    assert_eq!(before, after);

    assert!(h.broker.verify_token(PHONE, &token).await.is_ok());
}

#[tokio::test]
async fn test_expired_token_reports_expiry_not_mismatch() {
    let h = harness(config());
    h.broker.request_token(PHONE).await.unwrap();
    let token = h.sender.last_token(PHONE).unwrap();

    h.clock.advance(Duration::minutes(6));

    let result = h.broker.verify_token(PHONE, &token).await;
    assert_eq!(result, Err(VerificationError::TokenExpired));

    // Expired record is cleaned up lazily
    assert!(h.store.is_empty().await);
    let result = h.broker.verify_token(PHONE, &token).await;
    assert_eq!(result, Err(VerificationError::TokenNotFound));
}

#[tokio::test]
async fn test_expired_wrong_token_also_reports_expiry() {
    let h = harness(config());
    h.broker.request_token(PHONE).await.unwrap();
    h.clock.advance(Duration::minutes(6));

    let result = h.broker.verify_token(PHONE, "not-the-token").await;
    assert_eq!(result, Err(VerificationError::TokenExpired));
}

#[tokio::test]
async fn test_token_verifies_at_end_of_lifetime() {
    let h = harness(config());
    h.broker.request_token(PHONE).await.unwrap();
    let token = h.sender.last_token(PHONE).unwrap();

    h.clock.advance(Duration::minutes(5));
    assert!(h.broker.verify_token(PHONE, &token).await.is_ok());
}

#[tokio::test]
async fn test_resend_within_window_is_throttled() {
    let h = harness(config());
    h.broker.request_token(PHONE).await.unwrap();
    let first = h.sender.last_token(PHONE).unwrap();

    let result = h.broker.request_token(PHONE).await;
    assert_eq!(result.unwrap_err(), VerificationError::Throttled { retry_after_secs: 60 });

    h.clock.advance(Duration::seconds(45));
    let result = h.broker.request_token(PHONE).await;
    assert_eq!(result.unwrap_err(), VerificationError::Throttled { retry_after_secs: 15 });

    // No new message, first token still valid
    assert_eq!(h.sender.sent_count(), 1);
    assert!(h.broker.verify_token(PHONE, &first).await.is_ok());
}

#[tokio::test]
async fn test_resend_after_window_replaces_token() {
    let h = harness(config());
    h.broker.request_token(PHONE).await.unwrap();
    let first = h.sender.last_token(PHONE).unwrap();

    h.clock.advance(Duration::seconds(60));
    h.broker.request_token(PHONE).await.unwrap();
    let second = h.sender.last_token(PHONE).unwrap();
    assert_eq!(h.store.len().await, 1);

    if first != second {
        let result = h.broker.verify_token(PHONE, &first).await;
        assert_eq!(result, Err(VerificationError::InvalidToken));
    }
    assert!(h.broker.verify_token(PHONE, &second).await.is_ok());
}

#[tokio::test]
async fn test_zero_throttle_disables_resend_window() {
    let h = harness(BrokerConfig {
        resend_throttle: Duration::zero(),
        ..config()
    });

    h.broker.request_token(PHONE).await.unwrap();
    h.broker.request_token(PHONE).await.unwrap();
    assert_eq!(h.sender.sent_count(), 2);
}

#[tokio::test]
async fn test_delivery_failure_keeps_record_by_default() {
    let h = harness(config());
    h.sender.set_failure(true);

    let result = h.broker.request_token(PHONE).await;
    match result {
        Err(VerificationError::DeliveryFailed { reason }) => {
            assert!(reason.contains("simulated gateway outage"));
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(h.store.len().await, 1);

    // The kept record still counts for the resend window
    h.sender.set_failure(false);
    let result = h.broker.request_token(PHONE).await;
    assert!(matches!(result, Err(VerificationError::Throttled { .. })));
}

#[tokio::test]
async fn test_delivery_failure_rolls_back_when_configured() {
    let h = harness(BrokerConfig {
        delivery_failure: DeliveryFailurePolicy::RollBack,
        ..config()
    });
    h.sender.set_failure(true);

    let result = h.broker.request_token(PHONE).await;
    assert!(matches!(result, Err(VerificationError::DeliveryFailed { .. })));
    assert!(h.store.is_empty().await);

    h.sender.set_failure(false);
    assert!(h.broker.request_token(PHONE).await.is_ok());
}

#[tokio::test]
async fn test_invalid_subject_is_rejected_before_store() {
    let h = harness(config());

    let result = h.broker.request_token("not a phone").await;
    assert!(matches!(result, Err(VerificationError::InvalidSubject { .. })));

    let result = h.broker.verify_token("12", "123456").await;
    assert!(matches!(result, Err(VerificationError::InvalidSubject { .. })));

    assert_eq!(h.sender.sent_count(), 0);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_formatting_variants_share_one_record() {
    let h = harness(BrokerConfig {
        default_country_code: Some("1".to_string()),
        ..config()
    });

    h.broker.request_token("(555) 123-4567").await.unwrap();
    let token = h.sender.last_token(PHONE).unwrap();

    let result = h.broker.request_token("+1 555 123 4567").await;
    assert!(matches!(result, Err(VerificationError::Throttled { .. })));

    let verified = h.broker.verify_token("001-555-123-4567", &token).await.unwrap();
    assert_eq!(verified.subject.as_str(), PHONE);
}

#[tokio::test]
async fn test_submission_is_trimmed_and_case_folded() {
    let h = harness(BrokerConfig {
        charset: TokenCharset::Alphanumeric,
        ..config()
    });

    h.broker.request_token(PHONE).await.unwrap();
    let token = h.sender.last_token(PHONE).unwrap();
    let submitted = format!("  {}\n", token.to_lowercase());

    assert!(h.broker.verify_token(PHONE, &submitted).await.is_ok());
}

#[tokio::test]
async fn test_invalidate_removes_outstanding_token() {
    let h = harness(config());
    h.broker.request_token(PHONE).await.unwrap();
    let token = h.sender.last_token(PHONE).unwrap();

    h.broker.invalidate(PHONE).await.unwrap();
    h.broker.invalidate(PHONE).await.unwrap();

    let result = h.broker.verify_token(PHONE, &token).await;
    assert_eq!(result, Err(VerificationError::TokenNotFound));
}

#[tokio::test]
async fn test_storage_failure_is_retryable() {
    let broker = TokenBroker::new(
        Arc::new(FailingStore),
        Arc::new(RecordingSender::new()),
        TokenHasher::new("test-key").unwrap(),
        config(),
    )
    .unwrap();

    let err = broker.request_token(PHONE).await.unwrap_err();
    assert_eq!(err.error_code(), "STORAGE_FAILURE");
    assert!(err.is_retryable());

    let err = broker.verify_token(PHONE, "123456").await.unwrap_err();
    assert!(matches!(err, VerificationError::Storage { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_store_calls_are_bounded_by_timeout() {
    let broker = TokenBroker::new(
        Arc::new(StalledStore),
        Arc::new(RecordingSender::new()),
        TokenHasher::new("test-key").unwrap(),
        BrokerConfig {
            store_timeout: std::time::Duration::from_millis(250),
            ..config()
        },
    )
    .unwrap();

    let err = broker.verify_token(PHONE, "123456").await.unwrap_err();
    match err {
        VerificationError::Storage { message } => assert!(message.contains("timed out")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_verification_succeeds_once() {
    let h = harness(config());
    h.broker.request_token(PHONE).await.unwrap();
    let token = h.sender.last_token(PHONE).unwrap();

    let broker = Arc::new(h.broker);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let broker = broker.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            broker.verify_token(PHONE, &token).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err, VerificationError::TokenNotFound),
        }
    }
    assert_eq!(successes, 1);
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let store = Arc::new(InMemoryTokenStore::new());
    let sender = Arc::new(RecordingSender::new());
    let hasher = TokenHasher::new("test-key").unwrap();

    let zero_lifetime = BrokerConfig {
        token_lifetime: Duration::zero(),
        ..config()
    };
    assert!(TokenBroker::new(store.clone(), sender.clone(), hasher.clone(), zero_lifetime).is_err());

    let short_tokens = BrokerConfig {
        token_length: 2,
        ..config()
    };
    assert!(TokenBroker::new(store, sender, hasher, short_tokens).is_err());
}

#[test]
fn test_windows_longer_than_a_day_are_rejected() {
    let store = Arc::new(InMemoryTokenStore::new());
    let sender = Arc::new(RecordingSender::new());
    let hasher = TokenHasher::new("test-key").unwrap();

    let long_lifetime = BrokerConfig {
        token_lifetime: Duration::days(1) + Duration::seconds(1),
        ..config()
    };
    let result = TokenBroker::new(store.clone(), sender.clone(), hasher.clone(), long_lifetime);
    assert!(matches!(result, Err(VerificationError::Configuration { .. })));

    let long_throttle = BrokerConfig {
        resend_throttle: Duration::weeks(1),
        ..config()
    };
    let result = TokenBroker::new(store.clone(), sender.clone(), hasher.clone(), long_throttle);
    assert!(matches!(result, Err(VerificationError::Configuration { .. })));

    let one_day = BrokerConfig {
        token_lifetime: Duration::days(1),
        resend_throttle: Duration::days(1),
        ..config()
    };
    assert!(TokenBroker::new(store, sender, hasher, one_day).is_ok());
}

#[test]
fn test_oversized_verifier_windows_fail_conversion() {
    let config = mv_shared::VerifierConfig::default().with_lifetime_secs(100_000_000_000_000_000);
    let result = BrokerConfig::try_from(&config);
    assert!(matches!(result, Err(VerificationError::Configuration { .. })));

    let config = mv_shared::VerifierConfig::default().with_resend_throttle_secs(u64::MAX);
    let result = BrokerConfig::try_from(&config);
    assert!(matches!(result, Err(VerificationError::Configuration { .. })));

    let converted = BrokerConfig::try_from(&mv_shared::VerifierConfig::default()).unwrap();
    let defaults = BrokerConfig::default();
    assert_eq!(converted.token_lifetime, defaults.token_lifetime);
    assert_eq!(converted.resend_throttle, defaults.resend_throttle);
    assert_eq!(BrokerConfig::max_window().num_seconds(), 86_400);
}

#[tokio::test]
async fn test_unrepresentable_deadline_fails_before_store_and_send() {
    let h = harness(config());
    h.clock.set(chrono::DateTime::<Utc>::MAX_UTC - Duration::seconds(30));

    let err = h.broker.request_token(PHONE).await.unwrap_err();
    assert!(matches!(err, VerificationError::Configuration { .. }));
    assert_eq!(h.sender.sent_count(), 0);
    assert!(h.store.find(&subject()).await.unwrap().is_none());
}
