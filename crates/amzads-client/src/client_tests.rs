//! Tests for client configuration, error classification and handle wiring.

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use crate::client::AdsClient;
use crate::config::{ClientConfig, TokenConfig, MIN_SAFETY_MARGIN};
use crate::error::{AdsError, ApiErrorBody, AuthFailure, ErrorKind, TierDenial, TierError};
use crate::retry::RetryConfig;
use amzads_models::{Credentials, OperationTier, ProfileId, Region};

// =============================================================================
// Test Helpers
// =============================================================================

const ENV_VARS: &[&str] = &[
    "AMAZON_ADS_CLIENT_ID",
    "AMAZON_ADS_CLIENT_SECRET",
    "AMAZON_ADS_REFRESH_TOKEN",
    "AMAZON_ADS_PROFILE_ID",
    "AMAZON_ADS_REGION",
    "AMAZON_ADS_TIMEOUT_SECS",
    "AMAZON_ADS_CONNECT_TIMEOUT_SECS",
    "AMAZON_ADS_MAX_RETRIES",
    "AMAZON_ADS_RETRY_BASE_MS",
    "AMAZON_ADS_RETRY_MAX_MS",
    "AMAZON_ADS_TOKEN_SAFETY_MARGIN_SECS",
    "AMAZON_ADS_MAX_RETRY_AFTER_SECS",
];

fn clear_env() {
    for name in ENV_VARS {
        std::env::remove_var(name);
    }
}

fn set_required_env() {
    std::env::set_var("AMAZON_ADS_CLIENT_ID", "amzn1.application-oa2-client.test");
    std::env::set_var("AMAZON_ADS_CLIENT_SECRET", "secret");
    std::env::set_var("AMAZON_ADS_REFRESH_TOKEN", "Atzr|refresh");
}

fn test_credentials(profile: Option<&str>) -> Credentials {
    Credentials::new(
        "client-1",
        "secret",
        "refresh",
        profile.map(|p| ProfileId::new(p).unwrap()),
        Region::Na,
    )
    .unwrap()
}

fn body(raw: &str) -> ApiErrorBody {
    ApiErrorBody::parse(raw)
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
#[serial]
fn test_config_from_env_defaults() {
    clear_env();
    set_required_env();

    let config = ClientConfig::from_env().unwrap();
    assert_eq!(config.credentials.region(), Region::Na);
    assert!(config.credentials.profile_id().is_none());
    assert_eq!(config.endpoints.api_base_url(), "https://advertising-api.amazon.com");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.connect_timeout, Duration::from_secs(10));
    assert_eq!(config.retry, RetryConfig::default());
    assert_eq!(config.token.safety_margin, MIN_SAFETY_MARGIN);

    clear_env();
}

#[test]
#[serial]
fn test_config_from_env_overrides() {
    clear_env();
    set_required_env();
    std::env::set_var("AMAZON_ADS_PROFILE_ID", "1234567890");
    std::env::set_var("AMAZON_ADS_REGION", "eu");
    std::env::set_var("AMAZON_ADS_TIMEOUT_SECS", "5");
    std::env::set_var("AMAZON_ADS_MAX_RETRIES", "5");
    std::env::set_var("AMAZON_ADS_RETRY_BASE_MS", "200");
    std::env::set_var("AMAZON_ADS_RETRY_MAX_MS", "2000");
    std::env::set_var("AMAZON_ADS_TOKEN_SAFETY_MARGIN_SECS", "120");
    std::env::set_var("AMAZON_ADS_MAX_RETRY_AFTER_SECS", "300");

    let config = ClientConfig::from_env().unwrap();
    assert_eq!(config.credentials.region(), Region::Eu);
    assert_eq!(config.credentials.profile_id().map(|p| p.as_str()), Some("1234567890"));
    assert_eq!(config.endpoints.api_base_url(), "https://advertising-api-eu.amazon.com");
    assert_eq!(config.endpoints.token_url(), "https://api.amazon.co.uk/auth/o2/token");
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.base_delay, Duration::from_millis(200));
    assert_eq!(config.retry.max_delay, Duration::from_millis(2000));
    assert_eq!(config.token.safety_margin, Duration::from_secs(120));
    assert_eq!(config.retry.max_retry_after, Some(Duration::from_secs(300)));

    clear_env();
}

#[test]
#[serial]
fn test_config_from_env_missing_credentials() {
    clear_env();
    std::env::set_var("AMAZON_ADS_CLIENT_ID", "client");

    let err = ClientConfig::from_env().unwrap_err();
    assert!(matches!(err, AdsError::Config(_)));
    assert!(err.to_string().contains("AMAZON_ADS_CLIENT_SECRET"));

    clear_env();
}

#[test]
#[serial]
fn test_config_from_env_rejects_bad_region_and_profile() {
    clear_env();
    set_required_env();

    std::env::set_var("AMAZON_ADS_REGION", "APAC");
    assert!(matches!(ClientConfig::from_env(), Err(AdsError::Config(_))));
    std::env::remove_var("AMAZON_ADS_REGION");

    std::env::set_var("AMAZON_ADS_PROFILE_ID", "not-a-number");
    assert!(matches!(ClientConfig::from_env(), Err(AdsError::Config(_))));

    clear_env();
}

#[test]
#[serial]
fn test_safety_margin_floor_from_env() {
    clear_env();
    std::env::set_var("AMAZON_ADS_TOKEN_SAFETY_MARGIN_SECS", "5");
    assert_eq!(TokenConfig::from_env().safety_margin, MIN_SAFETY_MARGIN);
    clear_env();
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let config = ClientConfig::new(test_credentials(None)).with_timeout(Duration::ZERO);
    assert!(matches!(config.validate(), Err(AdsError::Config(_))));
}

#[test]
fn test_validate_rejects_small_safety_margin() {
    let mut config = ClientConfig::new(test_credentials(None));
    config.token.safety_margin = Duration::from_secs(10);
    assert!(config.validate().is_err());
}

// =============================================================================
// Error Type Tests
// =============================================================================

#[test]
fn test_error_from_client_status_404() {
    let err = AdsError::from_client_status(404, body("not here"));
    assert!(matches!(err, AdsError::NotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!err.is_retryable());
}

#[test]
fn test_error_from_client_status_400() {
    let err = AdsError::from_client_status(400, body(r#"{"code":"INVALID_ARGUMENT"}"#));
    assert!(matches!(err, AdsError::Validation { status: 400, .. }));
    assert_eq!(err.kind().as_str(), "validation_error");
    assert!(!err.is_retryable());
}

#[test]
fn test_error_from_client_status_403_and_422() {
    for status in [403, 409, 422] {
        let err = AdsError::from_client_status(status, ApiErrorBody::default());
        assert_eq!(err.http_status(), Some(status));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[test]
fn test_error_retryable_kinds() {
    let rate_limited = AdsError::RateLimited {
        retry_after: Some(Duration::from_secs(3)),
        attempts: 4,
        body: ApiErrorBody::default(),
    };
    assert!(rate_limited.is_retryable());
    assert_eq!(rate_limited.http_status(), Some(429));
    assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(3)));
    assert_eq!(rate_limited.attempts(), Some(4));
    assert_eq!(rate_limited.kind().as_str(), "rate_limit_error");

    let server = AdsError::Server {
        status: 503,
        attempts: 4,
        body: body("unavailable"),
    };
    assert!(server.is_retryable());
    assert_eq!(server.http_status(), Some(503));
    assert_eq!(server.body().map(|b| b.raw.as_str()), Some("unavailable"));
}

#[test]
fn test_error_auth_retryability_follows_failure() {
    let transient = AdsError::Auth(AuthFailure::transient("token endpoint unavailable", Some(503)));
    assert!(transient.is_retryable());
    assert_eq!(transient.http_status(), Some(503));

    let fatal = AdsError::Auth(AuthFailure::fatal("token refresh rejected", Some(400)).with_body(body(
        r#"{"error":"invalid_grant","error_description":"The request has an invalid grant parameter"}"#,
    )));
    assert!(!fatal.is_retryable());
    assert_eq!(fatal.kind(), ErrorKind::Auth);
    assert_eq!(fatal.body().and_then(|b| b.code.as_deref()), Some("invalid_grant"));
    assert!(fatal.to_string().contains("invalid_grant"));
}

#[test]
fn test_error_from_model_error() {
    let err: AdsError = "APAC".parse::<Region>().unwrap_err().into();
    assert!(matches!(err, AdsError::Config(_)));
    assert!(err.to_string().contains("APAC"));
}

#[test]
fn test_tier_error_display_and_kind() {
    let err = TierError {
        operation: "experimental.moderation.pre_moderation".to_string(),
        tier: Some(OperationTier::L4Experimental),
        access: "experimental",
        reason: TierDenial::RiskNotAcknowledged,
    };
    let message = err.to_string();
    assert!(message.contains("L4"));
    assert!(message.contains("risk_not_acknowledged"));

    let wrapped: AdsError = err.into();
    assert_eq!(wrapped.kind(), ErrorKind::Tier);
    assert_eq!(wrapped.http_status(), None);

    let unknown = TierError {
        operation: "nope".to_string(),
        tier: None,
        access: "default",
        reason: TierDenial::UnknownOperation,
    };
    assert!(unknown.to_string().contains("unregistered"));
}

// =============================================================================
// Error Body Tests
// =============================================================================

#[test]
fn test_error_body_amazon_envelope() {
    let parsed = body(r#"{"code":"UNAUTHORIZED","details":"Not authorized to access scope 1"}"#);
    assert_eq!(parsed.code.as_deref(), Some("UNAUTHORIZED"));
    assert_eq!(parsed.details.as_deref(), Some("Not authorized to access scope 1"));
    assert_eq!(parsed.to_string(), "UNAUTHORIZED: Not authorized to access scope 1");
}

#[test]
fn test_error_body_numeric_code_and_message_alias() {
    let parsed = body(r#"{"code":400,"message":"bad filter"}"#);
    assert_eq!(parsed.code.as_deref(), Some("400"));
    assert_eq!(parsed.details.as_deref(), Some("bad filter"));
}

#[test]
fn test_error_body_non_json_kept_raw() {
    let parsed = body("<html>Bad Gateway</html>");
    assert!(parsed.code.is_none());
    assert_eq!(parsed.raw, "<html>Bad Gateway</html>");
    assert_eq!(parsed.to_string(), "<html>Bad Gateway</html>");
    assert_eq!(body("").to_string(), "<empty body>");
}

// =============================================================================
// Client Handle Tests
// =============================================================================

#[tokio::test]
async fn test_client_namespaces_and_profile_handles() {
    let client = AdsClient::new(ClientConfig::new(test_credentials(Some("111")))).unwrap();
    assert_eq!(client.profile_id().map(|p| p.as_str()), Some("111"));
    assert!(!client.experimental(false).is_risk_acknowledged());
    assert!(client.experimental(true).is_risk_acknowledged());

    let other = client.with_profile(Some(ProfileId::new("222").unwrap()));
    assert_eq!(other.profile_id().map(|p| p.as_str()), Some("222"));
    assert_eq!(other.credentials().client_id(), client.credentials().client_id());
    assert!(!Arc::ptr_eq(client.token_manager(), other.token_manager()));
    assert_ne!(client.token_manager().key(), other.token_manager().key());

    let clone = client.clone();
    assert!(Arc::ptr_eq(client.token_manager(), clone.token_manager()));
}

#[tokio::test]
async fn test_client_rejects_invalid_config() {
    let config = ClientConfig::new(test_credentials(None)).with_timeout(Duration::ZERO);
    assert!(matches!(AdsClient::new(config), Err(AdsError::Config(_))));
}

#[tokio::test]
async fn test_client_debug_hides_secrets() {
    let client = AdsClient::new(ClientConfig::new(test_credentials(None))).unwrap();
    let debug = format!("{:?}", client);
    assert!(debug.contains("client-1"));
    assert!(!debug.contains("refresh\""));
    assert!(!debug.contains("\"secret\""));
}
