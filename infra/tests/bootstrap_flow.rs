//! Integration tests for startup wiring
//!
//! The memory store and the log sender need no external services; the
//! MySQL and Redis flows are ignored unless `DATABASE_URL` / `REDIS_URL`
//! point at live servers.

use std::sync::Arc;

use chrono::Duration;

use mv_core::errors::VerificationError;
use mv_core::services::ManualClock;
use mv_infra::{build_broker, build_broker_with_clock, InfrastructureError, VerifierServices};
use mv_shared::{AppConfig, Environment, SmsProvider, StorageBackend};

const PHONE: &str = "+14155552671";

fn dev_config() -> AppConfig {
    AppConfig::for_environment(Environment::Development)
}

async fn delivered_token(services: &VerifierServices, phone: &str) -> String {
    services
        .sender
        .as_log()
        .expect("log sender configured")
        .last_token(phone)
        .await
        .expect("a token was delivered")
}

#[tokio::test]
async fn test_default_config_builds_memory_broker() {
    let services = build_broker(&dev_config()).await.unwrap();
    assert!(services.sweeper.is_none());

    let issued = services.broker.request_token("+1 (415) 555-2671").await.unwrap();
    assert_eq!(issued.subject.as_str(), PHONE);
    assert!(issued.message_id.starts_with("log_"));

    let token = delivered_token(&services, PHONE).await;
    assert_eq!(token.len(), 5);

    let verified = services.broker.verify_token(PHONE, &token).await.unwrap();
    assert_eq!(verified.subject.as_str(), PHONE);

    let replay = services.broker.verify_token(PHONE, &token).await;
    assert_eq!(replay, Err(VerificationError::TokenNotFound));
}

#[tokio::test]
async fn test_manual_clock_drives_expiry_and_throttle() {
    let clock = Arc::new(ManualClock::starting_now());
    let services = build_broker_with_clock(&dev_config(), clock.clone())
        .await
        .unwrap();

    services.broker.request_token(PHONE).await.unwrap();
    let first = delivered_token(&services, PHONE).await;

    clock.advance(Duration::seconds(30));
    assert!(matches!(
        services.broker.request_token(PHONE).await,
        Err(VerificationError::Throttled { retry_after_secs: 30 })
    ));

    clock.advance(Duration::minutes(5));
    assert_eq!(
        services.broker.verify_token(PHONE, &first).await,
        Err(VerificationError::TokenExpired)
    );

    services.broker.request_token(PHONE).await.unwrap();
    let second = delivered_token(&services, PHONE).await;
    assert!(services.broker.verify_token(PHONE, &second).await.is_ok());
}

#[tokio::test]
async fn test_sweeper_starts_when_configured() {
    let mut config = dev_config();
    config.verifier.sweep_interval_secs = 60;

    let mut services = build_broker(&config).await.unwrap();
    assert!(services.sweeper.is_some());

    services.shutdown();
    assert!(services.sweeper.is_none());
}

#[tokio::test]
async fn test_invalid_configuration_fails_startup() {
    let mut config = dev_config();
    config.verifier.token_length = 20;
    assert!(matches!(
        build_broker(&config).await,
        Err(InfrastructureError::Config(_))
    ));

    let mut config = dev_config();
    config.sms.provider = SmsProvider::Twilio;
    assert!(matches!(
        build_broker(&config).await,
        Err(InfrastructureError::Config(_))
    ));

    let config = AppConfig::for_environment(Environment::Production);
    assert!(matches!(
        build_broker(&config).await,
        Err(InfrastructureError::Config(_))
    ));
}

#[tokio::test]
async fn test_delivery_failure_surfaces() {
    let services = build_broker(&dev_config()).await.unwrap();
    services.sender.as_log().unwrap().set_simulate_failure(true);

    let result = services.broker.request_token(PHONE).await;
    assert!(matches!(result, Err(VerificationError::DeliveryFailed { .. })));
}

async fn full_flow(config: AppConfig) {
    let services = build_broker(&config).await.unwrap();
    let phone = "+447911123456";

    services.broker.invalidate(phone).await.unwrap();
    services.broker.request_token(phone).await.unwrap();
    let token = delivered_token(&services, phone).await;

    assert_eq!(
        services.broker.verify_token(phone, "0000000").await,
        Err(VerificationError::InvalidToken)
    );
    assert!(services.broker.verify_token(phone, &token).await.is_ok());
    assert_eq!(
        services.broker.verify_token(phone, &token).await,
        Err(VerificationError::TokenNotFound)
    );
}

#[tokio::test]
#[ignore] // Requires actual database
async fn test_mysql_flow() {
    let mut config = dev_config();
    config.storage.backend = StorageBackend::MySql;
    config.database.ensure_schema = true;
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }
    full_flow(config).await;
}

#[tokio::test]
#[ignore] // Requires actual Redis server
async fn test_redis_flow() {
    let mut config = dev_config();
    config.storage.backend = StorageBackend::Redis;
    if let Ok(url) = std::env::var("REDIS_URL") {
        config.cache.url = url;
    }
    full_flow(config).await;
}
