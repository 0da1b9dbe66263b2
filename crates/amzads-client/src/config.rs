//! Client configuration.

use std::time::Duration;

use amzads_models::{Credentials, ProfileId, Region, RegionEndpoints};

use crate::error::{AdsError, AdsResult};
use crate::retry::RetryConfig;

/// Minimum buffer between a token's expiry and its use.
pub const MIN_SAFETY_MARGIN: Duration = Duration::from_secs(60);

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Token cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    /// Tokens expiring within this margin are refreshed before use.
    pub safety_margin: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            safety_margin: MIN_SAFETY_MARGIN,
        }
    }
}

impl TokenConfig {
    /// Margins below [`MIN_SAFETY_MARGIN`] are raised to it.
    pub fn with_safety_margin(margin: Duration) -> Self {
        Self {
            safety_margin: margin.max(MIN_SAFETY_MARGIN),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let secs: u64 = std::env::var("AMAZON_ADS_TOKEN_SAFETY_MARGIN_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(MIN_SAFETY_MARGIN.as_secs());
        Self::with_safety_margin(Duration::from_secs(secs))
    }
}

/// Everything needed to construct an [`crate::AdsClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    /// Regional endpoints; defaults to the credentials' region.
    pub endpoints: RegionEndpoints,
    /// Per-request timeout, applied to API calls and token refreshes.
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    pub token: TokenConfig,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        let endpoints = credentials.region().endpoints();
        Self {
            credentials,
            endpoints,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            retry: RetryConfig::default(),
            token: TokenConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> AdsResult<Self> {
        let client_id = required_env("AMAZON_ADS_CLIENT_ID")?;
        let client_secret = required_env("AMAZON_ADS_CLIENT_SECRET")?;
        let refresh_token = required_env("AMAZON_ADS_REFRESH_TOKEN")?;

        let profile_id = match std::env::var("AMAZON_ADS_PROFILE_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(ProfileId::new(raw)?),
            _ => None,
        };

        let region: Region = match std::env::var("AMAZON_ADS_REGION") {
            Ok(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => Region::default(),
        };

        let credentials = Credentials::new(client_id, client_secret, refresh_token, profile_id, region)?;

        let timeout_secs: u64 = std::env::var("AMAZON_ADS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let connect_timeout_secs: u64 = std::env::var("AMAZON_ADS_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            token: TokenConfig::from_env(),
            ..Self::new(credentials)
        })
    }

    /// Point the client at other base URLs (proxy, local test server).
    pub fn with_endpoints(mut self, endpoints: RegionEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_token_config(mut self, token: TokenConfig) -> Self {
        self.token = token;
        self
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> AdsResult<()> {
        if self.timeout.is_zero() {
            return Err(AdsError::config("timeout must be greater than zero"));
        }
        if self.token.safety_margin < MIN_SAFETY_MARGIN {
            return Err(AdsError::config(format!(
                "token safety margin must be at least {}s",
                MIN_SAFETY_MARGIN.as_secs()
            )));
        }
        Ok(())
    }
}

fn required_env(name: &'static str) -> AdsResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AdsError::config(format!("{} must be set", name))),
    }
}
