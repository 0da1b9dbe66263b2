//! Authenticated request execution layer for the Amazon Ads API.
//!
//! This crate provides:
//! - Token management with single-flight refresh and a safety margin
//! - A tier gate that keeps experimental operations behind an explicit opt-in
//! - A request executor with 401 recovery and 429/5xx/network backoff
//! - A structured error taxonomy preserving HTTP status and body
//! - The `AdsClient` handle and its namespace handles
//!
//! Generated endpoint functions call [`AdsClient`] namespaces (or
//! [`RequestExecutor::execute`] directly) with an [`ApiRequest`]; nothing
//! else talks to the network.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod oauth;
pub mod request;
pub mod retry;
pub mod tier_gate;
pub mod token_manager;

#[cfg(test)]
mod client_tests;

pub use amzads_models::{
    catalog, Credentials, HttpMethod, OperationDescriptor, OperationTier, ProfileId, Region,
    RegionEndpoints, TierRegistry,
};
pub use client::{AdsClient, CoreApi, ExperimentalApi, ReferenceApi, ServiceApi};
pub use config::{ClientConfig, TokenConfig};
pub use error::{AdsError, AdsResult, ApiErrorBody, AuthFailure, ErrorKind, TierDenial, TierError};
pub use executor::{RequestContext, RequestExecutor};
pub use oauth::LwaTokenSource;
pub use request::{ApiRequest, ApiResponse};
pub use retry::RetryConfig;
pub use tier_gate::{AccessPath, TierGate};
pub use token_manager::{AccessToken, TokenKey, TokenManager, TokenSource};
