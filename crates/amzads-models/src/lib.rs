//! Shared data models for the Amazon Ads API client.
//!
//! This crate provides plain, I/O-free types for:
//! - Advertising regions and their regional endpoints
//! - OAuth client credentials with redacted secrets
//! - Advertiser profile identifiers
//! - Operation tiers, descriptors and the tier registry
//! - A static catalog of well-known operations

pub mod catalog;
pub mod credentials;
pub mod error;
pub mod profile;
pub mod region;
pub mod tier;

// Re-export common types
pub use credentials::{Credentials, SecretString};
pub use error::{ModelError, ModelResult};
pub use profile::ProfileId;
pub use region::{Region, RegionEndpoints};
pub use tier::{HttpMethod, OperationDescriptor, OperationTier, TierRegistry};
