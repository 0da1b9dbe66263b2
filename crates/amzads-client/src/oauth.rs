//! Login with Amazon (LWA) refresh-token grant.

use std::time::Duration;

use amzads_models::{Credentials, RegionEndpoints};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info_span, Instrument};

use crate::error::{ApiErrorBody, AuthFailure};
use crate::token_manager::{TokenGrant, TokenSource};

/// Lifetime assumed when the server omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Exchanges the long-lived refresh token for access tokens.
///
/// `POST {auth_base_url}/token` with a form-encoded
/// `grant_type=refresh_token` body.
#[derive(Clone)]
pub struct LwaTokenSource {
    http: Client,
    token_url: String,
    credentials: Credentials,
}

impl LwaTokenSource {
    pub fn new(http: Client, endpoints: &RegionEndpoints, credentials: Credentials) -> Self {
        Self {
            http,
            token_url: endpoints.token_url(),
            credentials,
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenSource for LwaTokenSource {
    async fn fetch_token(&self) -> Result<TokenGrant, AuthFailure> {
        let span = info_span!(
            "lwa_token_refresh",
            client_id = %self.credentials.client_id(),
            region = %self.credentials.region()
        );

        async {
            let form = [
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token().expose()),
                ("client_id", self.credentials.client_id()),
                ("client_secret", self.credentials.client_secret().expose()),
            ];

            let response = self
                .http
                .post(&self.token_url)
                .form(&form)
                .send()
                .await
                .map_err(|e| {
                    let what = if e.is_timeout() { "timed out" } else { "failed" };
                    AuthFailure::transient(format!("token request {}: {}", what, e.without_url()), None)
                })?;

            let status = response.status();
            let body = response.text().await.map_err(|e| {
                AuthFailure::transient(format!("reading token response failed: {}", e.without_url()), Some(status.as_u16()))
            })?;

            if !status.is_success() {
                let failure = if status.as_u16() == 429 || status.is_server_error() {
                    AuthFailure::transient("token endpoint unavailable", Some(status.as_u16()))
                } else {
                    AuthFailure::fatal("token refresh rejected", Some(status.as_u16()))
                };
                return Err(failure.with_body(ApiErrorBody::parse(body)));
            }

            let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
                AuthFailure::fatal(format!("malformed token response: {}", e), Some(status.as_u16()))
            })?;

            if parsed.access_token.is_empty() {
                return Err(AuthFailure::fatal("token response has an empty access_token", Some(status.as_u16())));
            }

            let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
            debug!(expires_in_secs = expires_in, "Token endpoint returned a grant");

            Ok(TokenGrant {
                access_token: parsed.access_token,
                expires_in: Duration::from_secs(expires_in),
                scope: parsed.scope,
            })
        }
        .instrument(span)
        .await
    }
}
