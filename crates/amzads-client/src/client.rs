//! Client handle and the tiered namespace entry points.

use std::sync::Arc;
use std::time::Duration;

use amzads_models::{Credentials, ProfileId, RegionEndpoints, TierRegistry};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{AdsError, AdsResult};
use crate::executor::RequestExecutor;
use crate::oauth::LwaTokenSource;
use crate::request::{ApiRequest, ApiResponse};
use crate::tier_gate::{AccessPath, TierGate};
use crate::token_manager::{TokenKey, TokenManager, TokenSource};

const USER_AGENT: &str = concat!("amzads-client/", env!("CARGO_PKG_VERSION"));

/// Amazon Ads API client.
///
/// Cheap to clone; clones share the HTTP connection pool and the token cache.
/// A handle for another profile gets its own token cache through
/// [`AdsClient::with_profile`].
#[derive(Clone)]
pub struct AdsClient {
    config: Arc<ClientConfig>,
    source: Arc<dyn TokenSource>,
    executor: Arc<RequestExecutor>,
}

impl AdsClient {
    /// Create a client with the built-in operation catalog.
    pub fn new(config: ClientConfig) -> AdsResult<Self> {
        Self::with_registry(config, TierRegistry::with_catalog())
    }

    /// Create a client from `AMAZON_ADS_*` environment variables.
    pub fn from_env() -> AdsResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client with a caller-supplied operation registry.
    pub fn with_registry(config: ClientConfig, registry: TierRegistry) -> AdsResult<Self> {
        config.validate()?;
        let http = build_http_client(&config)?;
        let source: Arc<dyn TokenSource> = Arc::new(LwaTokenSource::new(
            http.clone(),
            &config.endpoints,
            config.credentials.clone(),
        ));
        Ok(Self::assemble(config, registry, http, source))
    }

    /// Create a client that obtains access tokens from `source` instead of
    /// the LWA token endpoint.
    pub fn with_token_source(
        config: ClientConfig,
        registry: TierRegistry,
        source: Arc<dyn TokenSource>,
    ) -> AdsResult<Self> {
        config.validate()?;
        let http = build_http_client(&config)?;
        Ok(Self::assemble(config, registry, http, source))
    }

    fn assemble(config: ClientConfig, registry: TierRegistry, http: Client, source: Arc<dyn TokenSource>) -> Self {
        let gate = TierGate::new(Arc::new(registry));
        let executor = build_executor(&config, http, gate, Arc::clone(&source));

        info!(
            region = %config.credentials.region(),
            api_base_url = config.endpoints.api_base_url(),
            profile_id = config.credentials.profile_id().map(|p| p.as_str()).unwrap_or("-"),
            "Amazon Ads client initialized"
        );

        Self {
            config: Arc::new(config),
            source,
            executor: Arc::new(executor),
        }
    }

    /// A handle scoped to another advertising profile.
    ///
    /// The new handle shares the HTTP client and the tier registry but owns a
    /// separate token cache.
    pub fn with_profile(&self, profile_id: Option<ProfileId>) -> Self {
        let mut config = (*self.config).clone();
        config.credentials = config.credentials.for_profile(profile_id);

        let executor = build_executor(
            &config,
            self.http().clone(),
            self.executor.tier_gate().clone(),
            Arc::clone(&self.source),
        );

        Self {
            config: Arc::new(config),
            source: Arc::clone(&self.source),
            executor: Arc::new(executor),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.config.credentials
    }

    pub fn profile_id(&self) -> Option<&ProfileId> {
        self.config.credentials.profile_id()
    }

    pub fn endpoints(&self) -> &RegionEndpoints {
        &self.config.endpoints
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        self.executor.token_manager()
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn http(&self) -> &Client {
        self.executor.http()
    }

    /// Execute through an explicit access path.
    pub async fn execute(&self, request: ApiRequest, access: AccessPath) -> AdsResult<ApiResponse> {
        self.executor.execute(request, access).await
    }

    /// Execute many requests with at most `max_concurrent` in flight.
    ///
    /// Results come back in input order; one failure does not cancel the rest.
    pub async fn execute_all(
        &self,
        requests: Vec<ApiRequest>,
        access: AccessPath,
        max_concurrent: usize,
    ) -> Vec<AdsResult<ApiResponse>> {
        execute_all(&self.executor, requests, access, max_concurrent).await
    }

    /// Stable, production-ready operations.
    pub fn core(&self) -> CoreApi {
        CoreApi {
            executor: Arc::clone(&self.executor),
        }
    }

    /// Reference and utility operations.
    pub fn reference(&self) -> ReferenceApi {
        ReferenceApi {
            executor: Arc::clone(&self.executor),
        }
    }

    /// Higher-level service operations (reporting, insights).
    pub fn services(&self) -> ServiceApi {
        ServiceApi {
            executor: Arc::clone(&self.executor),
        }
    }

    /// Experimental operations.
    ///
    /// Without `acknowledge_risk` every call through the returned handle
    /// fails the tier check before any network I/O.
    pub fn experimental(&self, acknowledge_risk: bool) -> ExperimentalApi {
        if acknowledge_risk {
            warn!("Experimental APIs enabled: these endpoints may change or break without notice");
        }
        ExperimentalApi {
            executor: Arc::clone(&self.executor),
            acknowledged: acknowledge_risk,
        }
    }
}

impl std::fmt::Debug for AdsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdsClient")
            .field("credentials", &self.config.credentials)
            .field("endpoints", &self.config.endpoints)
            .finish_non_exhaustive()
    }
}

fn build_http_client(config: &ClientConfig) -> AdsResult<Client> {
    Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(20)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AdsError::config(format!("failed to build HTTP client: {}", e)))
}

fn build_executor(config: &ClientConfig, http: Client, gate: TierGate, source: Arc<dyn TokenSource>) -> RequestExecutor {
    let credentials = &config.credentials;
    let tokens = Arc::new(TokenManager::new(
        TokenKey::for_credentials(credentials),
        source,
        config.token.safety_margin,
    ));

    RequestExecutor::new(
        http,
        config.endpoints.clone(),
        credentials.client_id(),
        credentials.profile_id().cloned(),
        tokens,
        gate,
        config.retry.clone(),
    )
}

async fn execute_all(
    executor: &RequestExecutor,
    requests: Vec<ApiRequest>,
    access: AccessPath,
    max_concurrent: usize,
) -> Vec<AdsResult<ApiResponse>> {
    stream::iter(requests)
        .map(|request| executor.execute(request, access))
        .buffered(max_concurrent.max(1))
        .collect()
        .await
}

// =============================================================================
// Namespaces
// =============================================================================

/// Entry point for L1 operations.
#[derive(Debug, Clone)]
pub struct CoreApi {
    executor: Arc<RequestExecutor>,
}

impl CoreApi {
    pub async fn execute(&self, request: ApiRequest) -> AdsResult<ApiResponse> {
        self.executor.execute(request, AccessPath::Default).await
    }

    pub async fn execute_all(&self, requests: Vec<ApiRequest>, max_concurrent: usize) -> Vec<AdsResult<ApiResponse>> {
        execute_all(&self.executor, requests, AccessPath::Default, max_concurrent).await
    }
}

/// Entry point for L2 operations.
#[derive(Debug, Clone)]
pub struct ReferenceApi {
    executor: Arc<RequestExecutor>,
}

impl ReferenceApi {
    pub async fn execute(&self, request: ApiRequest) -> AdsResult<ApiResponse> {
        self.executor.execute(request, AccessPath::Reference).await
    }

    pub async fn execute_all(&self, requests: Vec<ApiRequest>, max_concurrent: usize) -> Vec<AdsResult<ApiResponse>> {
        execute_all(&self.executor, requests, AccessPath::Reference, max_concurrent).await
    }
}

/// Entry point for L3 operations.
#[derive(Debug, Clone)]
pub struct ServiceApi {
    executor: Arc<RequestExecutor>,
}

impl ServiceApi {
    pub async fn execute(&self, request: ApiRequest) -> AdsResult<ApiResponse> {
        self.executor.execute(request, AccessPath::Service).await
    }

    pub async fn execute_all(&self, requests: Vec<ApiRequest>, max_concurrent: usize) -> Vec<AdsResult<ApiResponse>> {
        execute_all(&self.executor, requests, AccessPath::Service, max_concurrent).await
    }
}

/// Entry point for L4 operations, carrying the risk acknowledgment flag.
#[derive(Debug, Clone)]
pub struct ExperimentalApi {
    executor: Arc<RequestExecutor>,
    acknowledged: bool,
}

impl ExperimentalApi {
    pub fn is_risk_acknowledged(&self) -> bool {
        self.acknowledged
    }

    fn access(&self) -> AccessPath {
        AccessPath::Experimental {
            acknowledged: self.acknowledged,
        }
    }

    pub async fn execute(&self, request: ApiRequest) -> AdsResult<ApiResponse> {
        self.executor.execute(request, self.access()).await
    }

    pub async fn execute_all(&self, requests: Vec<ApiRequest>, max_concurrent: usize) -> Vec<AdsResult<ApiResponse>> {
        execute_all(&self.executor, requests, self.access(), max_concurrent).await
    }
}
