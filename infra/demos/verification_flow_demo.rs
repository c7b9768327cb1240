//! Example: issuing and verifying a mobile token end to end
//!
//! Uses whatever `config/mobile_verifier.*` and `MOBILE_VERIFIER__*`
//! variables select; with no configuration that is the in-memory store and
//! the log sender.
//!
//! Run with: cargo run --example verification_flow_demo -p mv_infra

use anyhow::Context;

use mv_infra::build_broker;
use mv_shared::{init_tracing, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.logging).context("initializing tracing")?;

    let services = build_broker(&config).await.context("starting the verifier")?;
    let phone = std::env::args().nth(1).unwrap_or_else(|| "+14155552671".to_string());

    let issued = services.broker.request_token(&phone).await?;
    println!(
        "Token sent to {} (message {}), valid until {}",
        issued.subject.masked(),
        issued.message_id,
        issued.expires_at
    );

    let token = match services.sender.as_log() {
        Some(log) => log
            .last_token(issued.subject.as_str())
            .await
            .context("log sender recorded no token")?,
        None => {
            println!("Enter the code you received:");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line
        }
    };

    match services.broker.verify_token(&phone, &token).await {
        Ok(verified) => println!("{} verified at {}", verified.subject.masked(), verified.verified_at),
        Err(e) => println!("Verification failed: {} ({})", e, e.error_code()),
    }

    // A second attempt with the same token must fail
    if let Err(e) = services.broker.verify_token(&phone, &token).await {
        println!("Replay rejected: {}", e.error_code());
    }

    Ok(())
}
