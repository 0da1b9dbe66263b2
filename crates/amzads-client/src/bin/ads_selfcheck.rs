//! Credential self-check binary.
//!
//! Loads `AMAZON_ADS_*` settings (from `.env` if present), refreshes an access
//! token and lists the advertising profiles the credentials can reach.

use anyhow::Context;
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use amzads_client::{catalog, AdsClient, ApiRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    profile_id: u64,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    currency_code: Option<String>,
    #[serde(default)]
    account_info: Option<AccountInfo>,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(2);
    }

    if let Err(e) = run().await {
        error!("Self-check failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?
        .add_directive("amzads_client=info".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(false))
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let client = AdsClient::from_env().context("building client from environment")?;
    info!(endpoints = ?client.endpoints(), "Checking Amazon Ads credentials");

    client
        .token_manager()
        .get_valid_token()
        .await
        .map_err(|failure| anyhow::anyhow!("token refresh failed: {}", failure))?;
    info!("Access token obtained");

    // Profile listing is not scoped to a profile.
    let unscoped = client.with_profile(None);
    let response = unscoped
        .core()
        .execute(ApiRequest::for_operation(&catalog::PROFILES_LIST))
        .await
        .context("listing profiles")?;

    let profiles: Vec<Profile> = response.json().context("decoding profile list")?;
    info!(
        count = profiles.len(),
        attempts = response.attempts,
        request_id = response.request_id.as_deref().unwrap_or("-"),
        "Profiles listed"
    );

    for profile in &profiles {
        let account = profile.account_info.as_ref();
        println!(
            "{}\t{}\t{}\t{}\t{}",
            profile.profile_id,
            profile.country_code.as_deref().unwrap_or("-"),
            profile.currency_code.as_deref().unwrap_or("-"),
            account.and_then(|a| a.kind.as_deref()).unwrap_or("-"),
            account.and_then(|a| a.name.as_deref()).unwrap_or("-"),
        );
    }

    Ok(())
}
