//! Error taxonomy for the request execution layer.

use std::fmt;
use std::time::Duration;

use amzads_models::{ModelError, OperationTier};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for client operations.
pub type AdsResult<T> = Result<T, AdsError>;

/// Errors surfaced by the client.
///
/// Only 401 (once), 429, 5xx and transport failures are retried internally;
/// every variant here is what remains once that policy has run its course.
#[derive(Debug, Error)]
pub enum AdsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Tier(#[from] TierError),

    #[error("Authentication failed: {0}")]
    Auth(AuthFailure),

    #[error("Rate limited after {attempts} attempts{}", fmt_retry_after(.retry_after))]
    RateLimited {
        retry_after: Option<Duration>,
        attempts: u32,
        body: ApiErrorBody,
    },

    #[error("Server error {status} after {attempts} attempts: {body}")]
    Server {
        status: u16,
        attempts: u32,
        body: ApiErrorBody,
    },

    #[error("Network error after {attempts} attempts: {source}")]
    Network {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request rejected with {status}: {body}")]
    Validation { status: u16, body: ApiErrorBody },

    #[error("Resource not found: {body}")]
    NotFound { body: ApiErrorBody },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn fmt_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(", retry after {}ms", d.as_millis()),
        None => String::new(),
    }
}

/// Coarse classification of an [`AdsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Tier,
    Auth,
    RateLimit,
    Server,
    Network,
    Validation,
    NotFound,
    InvalidResponse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config_error",
            ErrorKind::Tier => "tier_error",
            ErrorKind::Auth => "auth_error",
            ErrorKind::RateLimit => "rate_limit_error",
            ErrorKind::Server => "server_error",
            ErrorKind::Network => "network_error",
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found_error",
            ErrorKind::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AdsError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a non-retryable 4xx status to its error kind.
    pub fn from_client_status(status: u16, body: ApiErrorBody) -> Self {
        match status {
            404 => Self::NotFound { body },
            _ => Self::Validation { status, body },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AdsError::Config(_) => ErrorKind::Config,
            AdsError::Tier(_) => ErrorKind::Tier,
            AdsError::Auth(_) => ErrorKind::Auth,
            AdsError::RateLimited { .. } => ErrorKind::RateLimit,
            AdsError::Server { .. } => ErrorKind::Server,
            AdsError::Network { .. } => ErrorKind::Network,
            AdsError::Validation { .. } => ErrorKind::Validation,
            AdsError::NotFound { .. } => ErrorKind::NotFound,
            AdsError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }

    /// True if the condition is transient and a later, independent call may
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AdsError::RateLimited { .. } | AdsError::Server { .. } | AdsError::Network { .. } => true,
            AdsError::Auth(failure) => failure.transient,
            _ => false,
        }
    }

    /// Original HTTP status, if the error came from an HTTP response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AdsError::Auth(failure) => failure.status,
            AdsError::RateLimited { .. } => Some(429),
            AdsError::Server { status, .. } | AdsError::Validation { status, .. } => Some(*status),
            AdsError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Last server-provided retry hint on rate limiting.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AdsError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Attempts made before giving up, for the exhausted-budget kinds.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            AdsError::RateLimited { attempts, .. }
            | AdsError::Server { attempts, .. }
            | AdsError::Network { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Preserved server error body.
    pub fn body(&self) -> Option<&ApiErrorBody> {
        match self {
            AdsError::RateLimited { body, .. }
            | AdsError::Server { body, .. }
            | AdsError::Validation { body, .. }
            | AdsError::NotFound { body } => Some(body),
            AdsError::Auth(failure) => failure.body.as_ref(),
            _ => None,
        }
    }
}

impl From<ModelError> for AdsError {
    fn from(err: ModelError) -> Self {
        AdsError::Config(err.to_string())
    }
}

/// Server error body, kept verbatim alongside the parsed Amazon envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ApiErrorBody {
    pub raw: String,
    pub code: Option<String>,
    pub details: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default, alias = "message", alias = "error_description")]
    details: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiErrorBody {
    /// Parse an error body. Non-JSON bodies keep only `raw`.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let envelope = serde_json::from_str::<ErrorEnvelope>(&raw).ok();
        let (code, details) = match envelope {
            Some(env) => {
                let code = match env.code {
                    Some(serde_json::Value::String(s)) => Some(s),
                    Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                    _ => env.error,
                };
                (code, env.details)
            }
            None => (None, None),
        };
        Self { raw, code, details }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.details) {
            (Some(code), Some(details)) => write!(f, "{}: {}", code, details),
            (Some(code), None) => write!(f, "{}", code),
            (None, Some(details)) => write!(f, "{}", details),
            (None, None) if self.raw.is_empty() => write!(f, "<empty body>"),
            (None, None) => write!(f, "{}", truncate(&self.raw, 200)),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Why a token could not be obtained or was rejected.
///
/// `Clone` so a single failed refresh can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub status: Option<u16>,
    pub message: String,
    /// Transport failures, timeouts, 429 and 5xx from the token endpoint.
    pub transient: bool,
    pub body: Option<ApiErrorBody>,
}

impl AuthFailure {
    pub fn transient(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            status,
            message: message.into(),
            transient: true,
            body: None,
        }
    }

    pub fn fatal(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            status,
            message: message.into(),
            transient: false,
            body: None,
        }
    }

    pub fn with_body(mut self, body: ApiErrorBody) -> Self {
        self.body = Some(body);
        self
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{}] {}", status, self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(body) = self.body.as_ref().filter(|b| !b.is_empty()) {
            write!(f, " - {}", body)?;
        }
        Ok(())
    }
}

/// Reason a tier gate check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierDenial {
    /// L4 through an experimental handle built without `acknowledge_risk`.
    RiskNotAcknowledged,
    /// L4 through any non-experimental handle.
    ExperimentalOnly,
    /// L2/L3 through a handle other than their own namespace.
    NamespaceMismatch,
    /// Operation id missing from the registry.
    UnknownOperation,
}

impl TierDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierDenial::RiskNotAcknowledged => "risk_not_acknowledged",
            TierDenial::ExperimentalOnly => "experimental_only",
            TierDenial::NamespaceMismatch => "namespace_mismatch",
            TierDenial::UnknownOperation => "unknown_operation",
        }
    }
}

impl fmt::Display for TierDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier gate rejection. Raised before any request is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Operation {operation} ({}) denied via {access}: {reason}", .tier.map(|t| t.as_str()).unwrap_or("unregistered"))]
pub struct TierError {
    pub operation: String,
    pub tier: Option<OperationTier>,
    pub access: &'static str,
    pub reason: TierDenial,
}
