//! Request executor: the single chokepoint every API call passes through.
//!
//! Per call:
//! 1. Tier gate check (no I/O on failure)
//! 2. Valid token from the token manager, bearer + client id + profile scope
//! 3. HTTP call against the regional API base URL
//! 4. Classification: 2xx returns; 401 invalidates and resends once; 429,
//!    5xx and transport failures back off and retry within the budget; other
//!    4xx fail immediately
//!
//! The executor holds no mutable state of its own. Concurrent calls share
//! only the token manager.

use std::sync::Arc;
use std::time::{Duration, Instant};

use amzads_models::{HttpMethod, OperationTier, ProfileId, RegionEndpoints};
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{AdsError, AdsResult, ApiErrorBody, AuthFailure};
use crate::metrics::{record_request, record_retry};
use crate::request::{ApiRequest, ApiResponse};
use crate::retry::{retry_after_from_headers, RetryConfig};
use crate::tier_gate::{AccessPath, TierGate};
use crate::token_manager::{AccessToken, TokenManager};

pub const CLIENT_ID_HEADER: &str = "Amazon-Advertising-API-ClientId";
pub const SCOPE_HEADER: &str = "Amazon-Advertising-API-Scope";
const REQUEST_ID_HEADERS: &[&str] = &["x-amzn-requestid", "x-amz-request-id"];

// =============================================================================
// Request Context
// =============================================================================

/// State of one call, from gate check to final outcome.
///
/// `attempt_count` is the only field that changes while the call runs. It
/// counts attempts charged to the retry budget; the single resend after a
/// 401 reuses the current attempt number.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    request: ApiRequest,
    access: AccessPath,
    profile_id: Option<ProfileId>,
    tier: Option<OperationTier>,
    attempt_count: u32,
}

impl RequestContext {
    pub fn new(request: ApiRequest, access: AccessPath, profile_id: Option<ProfileId>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            request,
            access,
            profile_id,
            tier: None,
            attempt_count: 0,
        }
    }

    /// Local correlation id used in logs.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn method(&self) -> HttpMethod {
        self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    pub fn access(&self) -> AccessPath {
        self.access
    }

    pub fn profile_id(&self) -> Option<&ProfileId> {
        self.profile_id.as_ref()
    }

    /// Tier of the operation, known once the gate has passed it.
    pub fn tier(&self) -> Option<OperationTier> {
        self.tier
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Outcome of a single HTTP attempt.
enum Attempt {
    Done(ApiResponse),
    Unauthorized { token: AccessToken, body: ApiErrorBody },
    Retry {
        error: AdsError,
        retry_after: Option<Duration>,
        reason: &'static str,
    },
    Fatal(AdsError),
}

/// Executes API requests for one client handle.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: Client,
    endpoints: RegionEndpoints,
    client_id: String,
    profile_id: Option<ProfileId>,
    tokens: Arc<TokenManager>,
    gate: TierGate,
    retry: RetryConfig,
}

impl RequestExecutor {
    pub fn new(
        http: Client,
        endpoints: RegionEndpoints,
        client_id: impl Into<String>,
        profile_id: Option<ProfileId>,
        tokens: Arc<TokenManager>,
        gate: TierGate,
        retry: RetryConfig,
    ) -> Self {
        Self {
            http,
            endpoints,
            client_id: client_id.into(),
            profile_id,
            tokens,
            gate,
            retry,
        }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn tier_gate(&self) -> &TierGate {
        &self.gate
    }

    pub fn endpoints(&self) -> &RegionEndpoints {
        &self.endpoints
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fresh context for a request on this executor's profile.
    pub fn context(&self, request: ApiRequest, access: AccessPath) -> RequestContext {
        RequestContext::new(request, access, self.profile_id.clone())
    }

    /// Execute a request through the given access path.
    pub async fn execute(&self, request: ApiRequest, access: AccessPath) -> AdsResult<ApiResponse> {
        let mut ctx = self.context(request, access);
        self.execute_context(&mut ctx).await
    }

    /// Execute with a caller-held context, left in its final state.
    pub async fn execute_context(&self, ctx: &mut RequestContext) -> AdsResult<ApiResponse> {
        let span = info_span!(
            "ads_request",
            operation = %ctx.request.operation_id,
            method = %ctx.request.method,
            path = %ctx.request.path,
            access = %ctx.access,
            request_id = %ctx.request_id
        );

        let operation = ctx.request.operation_id.clone();
        let start = Instant::now();
        let result = self.run(ctx).instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let outcome = match &result {
            Ok(response) => response.status.to_string(),
            Err(e) => e.kind().as_str().to_string(),
        };
        record_request(&operation, &outcome, latency_ms);

        result
    }

    async fn run(&self, ctx: &mut RequestContext) -> AdsResult<ApiResponse> {
        let descriptor = self.gate.authorize(&ctx.request.operation_id, ctx.access)?;
        ctx.tier = Some(descriptor.tier);

        if descriptor.method != ctx.request.method {
            return Err(AdsError::config(format!(
                "operation {} is {} but the request uses {}",
                descriptor.id, descriptor.method, ctx.request.method
            )));
        }

        if !descriptor.matches_path(&ctx.request.path) {
            return Err(AdsError::config(format!(
                "operation {} has path {} but the request targets {}",
                descriptor.id, descriptor.path, ctx.request.path
            )));
        }

        let body = match ctx.request.body.as_ref() {
            Some(value) => Some(
                serde_json::to_vec(value)
                    .map_err(|e| AdsError::config(format!("request body is not serializable: {}", e)))?,
            ),
            None => None,
        };

        let mut auth_retry_used = false;
        let mut last_retry_after: Option<Duration> = None;
        ctx.attempt_count = 0;

        loop {
            ctx.attempt_count += 1;
            let attempt = ctx.attempt_count;

            match self.attempt(ctx, body.as_deref()).await {
                Attempt::Done(response) => {
                    debug!(attempt, status = response.status, "Request succeeded");
                    return Ok(response);
                }
                Attempt::Unauthorized { token, body } => {
                    if auth_retry_used {
                        warn!(attempt, "Request rejected again after token refresh");
                        return Err(AdsError::Auth(
                            AuthFailure::fatal("request rejected after token refresh", Some(401)).with_body(body),
                        ));
                    }
                    auth_retry_used = true;
                    self.tokens.invalidate_rejected(&token);
                    record_retry(&ctx.request.operation_id, "unauthorized");
                    warn!(attempt, "Access token rejected, refreshing and resending once");
                    ctx.attempt_count -= 1;
                }
                Attempt::Retry {
                    error,
                    retry_after,
                    reason,
                } => {
                    if retry_after.is_some() {
                        last_retry_after = retry_after;
                    }

                    if attempt >= self.retry.max_attempts() {
                        warn!(attempt, reason, "Retry budget exhausted: {}", error);
                        return Err(with_last_hint(error, last_retry_after));
                    }

                    if self.retry.exceeds_retry_after_cap(retry_after) {
                        warn!(attempt, reason, "Server retry hint exceeds the configured cap: {}", error);
                        return Err(error);
                    }

                    let delay = self.retry.delay_for(attempt, retry_after);
                    warn!(
                        attempt,
                        reason,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, retrying: {}",
                        error
                    );
                    record_retry(&ctx.request.operation_id, reason);
                    tokio::time::sleep(delay).await;
                }
                Attempt::Fatal(error) => {
                    debug!(attempt, "Request failed: {}", error);
                    return Err(error);
                }
            }
        }
    }

    async fn attempt(&self, ctx: &RequestContext, body: Option<&[u8]>) -> Attempt {
        let attempts = ctx.attempt_count;

        let token = match self.tokens.get_valid_token().await {
            Ok(token) => token,
            Err(failure) if failure.transient => {
                return Attempt::Retry {
                    error: AdsError::Auth(failure),
                    retry_after: None,
                    reason: "token_refresh",
                }
            }
            Err(failure) => return Attempt::Fatal(AdsError::Auth(failure)),
        };

        let request = &ctx.request;
        let mut builder = self
            .http
            .request(to_method(request.method), self.endpoints.api_url(&request.path))
            .bearer_auth(token.value())
            .header(CLIENT_ID_HEADER, &self.client_id)
            .header(CONTENT_TYPE, request.content_type_header())
            .header(ACCEPT, request.accept_header());

        if let Some(profile) = ctx.profile_id.as_ref() {
            builder = builder.header(SCOPE_HEADER, profile.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(bytes) = body {
            builder = builder.body(bytes.to_vec());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        debug!(attempt = attempts, "Sending request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return network_retry(attempts, e),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return network_retry(attempts, e),
        };

        classify(status, &headers, text, attempts, token)
    }
}

fn classify(status: StatusCode, headers: &HeaderMap, text: String, attempts: u32, token: AccessToken) -> Attempt {
    if status.is_success() {
        return match parse_success_body(headers, &text) {
            Ok(body) => Attempt::Done(ApiResponse {
                status: status.as_u16(),
                body,
                request_id: request_id(headers),
                attempts,
            }),
            Err(e) => Attempt::Fatal(e),
        };
    }

    let body = ApiErrorBody::parse(text);
    match status {
        StatusCode::UNAUTHORIZED => Attempt::Unauthorized { token, body },
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = retry_after_from_headers(headers);
            Attempt::Retry {
                error: AdsError::RateLimited {
                    retry_after,
                    attempts,
                    body,
                },
                retry_after,
                reason: "rate_limited",
            }
        }
        s if s.is_server_error() => Attempt::Retry {
            error: AdsError::Server {
                status: s.as_u16(),
                attempts,
                body,
            },
            retry_after: None,
            reason: "server_error",
        },
        s => Attempt::Fatal(AdsError::from_client_status(s.as_u16(), body)),
    }
}

fn network_retry(attempts: u32, source: reqwest::Error) -> Attempt {
    let reason = if source.is_timeout() { "timeout" } else { "network" };
    Attempt::Retry {
        error: AdsError::Network { attempts, source },
        retry_after: None,
        reason,
    }
}

fn with_last_hint(error: AdsError, last: Option<Duration>) -> AdsError {
    match error {
        AdsError::RateLimited {
            retry_after: None,
            attempts,
            body,
        } => AdsError::RateLimited {
            retry_after: last,
            attempts,
            body,
        },
        other => other,
    }
}

fn parse_success_body(headers: &HeaderMap, text: &str) -> AdsResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(e) => {
            let declared_json = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|ct| ct.contains("json"))
                .unwrap_or(false);
            if declared_json {
                Err(AdsError::invalid_response(format!("malformed JSON body: {}", e)))
            } else {
                Ok(Value::String(text.to_string()))
            }
        }
    }
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    REQUEST_ID_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}
