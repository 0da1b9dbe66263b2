//! Access token lifecycle for one client.
//!
//! Provides an async-aware token cache with:
//! - A safety margin so a returned token never expires mid-flight
//! - Single-flight refresh: concurrent callers share one in-flight refresh
//!   and all observe its result, success or failure
//! - Explicit invalidation after the API rejects a token
//!
//! The manager never retries a failed refresh by itself. The next
//! `get_valid_token` call (driven by the request executor's retry policy)
//! starts a new one.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use amzads_models::{Credentials, ProfileId, Region};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::AuthFailure;
use crate::metrics::record_token_refresh;

// =============================================================================
// Token Types
// =============================================================================

/// A bearer token with its expiry.
///
/// Replaced wholesale on refresh and never persisted. `Debug` hides the value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: Instant,
    scope: Option<String>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Instant, scope: Option<String>) -> Self {
        Self {
            value: value.into(),
            expires_at,
            scope,
        }
    }

    /// Raw token value for the `Authorization` header.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// True while the token outlives `now + margin`.
    pub fn is_valid(&self, margin: Duration) -> bool {
        Instant::now() + margin < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"***")
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// A token as issued by the authorization server.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: Duration,
    pub scope: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"***")
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Something that can mint access tokens.
///
/// [`crate::oauth::LwaTokenSource`] is the production implementation.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<TokenGrant, AuthFailure>;
}

/// Identity of a token cache: one per `(client_id, profile_id, region)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    pub client_id: String,
    pub profile_id: Option<ProfileId>,
    pub region: Region,
}

impl TokenKey {
    pub fn for_credentials(credentials: &Credentials) -> Self {
        Self {
            client_id: credentials.client_id().to_string(),
            profile_id: credentials.profile_id().cloned(),
            region: credentials.region(),
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.profile_id {
            Some(profile) => write!(f, "{}/{}/{}", self.client_id, profile, self.region),
            None => write!(f, "{}/-/{}", self.client_id, self.region),
        }
    }
}

// =============================================================================
// Token Manager
// =============================================================================

type SharedRefresh = Shared<BoxFuture<'static, Result<AccessToken, AuthFailure>>>;

struct InFlight {
    id: u64,
    refresh: SharedRefresh,
}

#[derive(Default)]
struct TokenState {
    current: Option<AccessToken>,
    in_flight: Option<InFlight>,
    next_flight_id: u64,
}

/// Owns the access token cache for one client handle.
pub struct TokenManager {
    key: TokenKey,
    source: Arc<dyn TokenSource>,
    safety_margin: Duration,
    state: Mutex<TokenState>,
}

impl TokenManager {
    pub fn new(key: TokenKey, source: Arc<dyn TokenSource>, safety_margin: Duration) -> Self {
        Self {
            key,
            source,
            safety_margin,
            state: Mutex::new(TokenState::default()),
        }
    }

    pub fn key(&self) -> &TokenKey {
        &self.key
    }

    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    /// The cached token, if any, without refreshing.
    pub fn cached(&self) -> Option<AccessToken> {
        self.lock_state().current.clone()
    }

    /// Return a token valid beyond the safety margin, refreshing if needed.
    ///
    /// Concurrent callers during a refresh await the same refresh; at most one
    /// request to the authorization server is in flight at any time.
    pub async fn get_valid_token(&self) -> Result<AccessToken, AuthFailure> {
        let (flight_id, refresh) = {
            let mut state = self.lock_state();

            if let Some(token) = state.current.as_ref() {
                if token.is_valid(self.safety_margin) {
                    return Ok(token.clone());
                }
            }

            match state.in_flight.as_ref() {
                Some(flight) => (flight.id, flight.refresh.clone()),
                None => {
                    let id = state.next_flight_id;
                    state.next_flight_id += 1;
                    let refresh = refresh_token(
                        Arc::clone(&self.source),
                        self.key.clone(),
                        self.safety_margin,
                    )
                    .boxed()
                    .shared();
                    state.in_flight = Some(InFlight {
                        id,
                        refresh: refresh.clone(),
                    });
                    (id, refresh)
                }
            }
        };

        let result = refresh.await;

        {
            let mut state = self.lock_state();
            // The first waiter to wake retires the flight; a failure leaves the
            // cache empty so the next call starts a fresh refresh.
            if state.in_flight.as_ref().map(|f| f.id) == Some(flight_id) {
                state.in_flight = None;
                if let Ok(token) = &result {
                    state.current = Some(token.clone());
                }
            }
        }

        let token = result?;
        if !token.is_valid(self.safety_margin) {
            return Err(AuthFailure::transient(
                "refreshed token expired before it could be used",
                None,
            ));
        }
        Ok(token)
    }

    /// Forcibly clear the cached token.
    pub fn invalidate(&self) {
        let mut state = self.lock_state();
        if state.current.take().is_some() {
            debug!(key = %self.key, "Access token invalidated");
        }
    }

    /// Clear the cached token only if it is the one the API rejected.
    ///
    /// Returns true if the cache was cleared. A token refreshed by another
    /// caller in the meantime is kept.
    pub fn invalidate_rejected(&self, rejected: &AccessToken) -> bool {
        let mut state = self.lock_state();
        match state.current.as_ref() {
            Some(current) if current.value == rejected.value => {
                state.current = None;
                debug!(key = %self.key, "Rejected access token invalidated");
                true
            }
            _ => false,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("key", &self.key)
            .field("safety_margin", &self.safety_margin)
            .finish_non_exhaustive()
    }
}

async fn refresh_token(
    source: Arc<dyn TokenSource>,
    key: TokenKey,
    safety_margin: Duration,
) -> Result<AccessToken, AuthFailure> {
    let started = Instant::now();

    match source.fetch_token().await {
        Ok(grant) => {
            if grant.expires_in <= safety_margin {
                record_token_refresh("fatal_failure");
                warn!(
                    key = %key,
                    expires_in_secs = grant.expires_in.as_secs(),
                    "Issued token lifetime does not exceed the safety margin"
                );
                return Err(AuthFailure::fatal(
                    format!(
                        "token lifetime {}s does not exceed safety margin {}s",
                        grant.expires_in.as_secs(),
                        safety_margin.as_secs()
                    ),
                    None,
                ));
            }

            // Expiry counted from when the request was sent, before any latency.
            let token = AccessToken::new(grant.access_token, started + grant.expires_in, grant.scope);
            record_token_refresh("success");
            debug!(
                key = %key,
                expires_in_secs = grant.expires_in.as_secs(),
                "Refreshed access token"
            );
            Ok(token)
        }
        Err(failure) => {
            record_token_refresh(if failure.transient {
                "transient_failure"
            } else {
                "fatal_failure"
            });
            warn!(key = %key, transient = failure.transient, "Token refresh failed: {}", failure);
            Err(failure)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
