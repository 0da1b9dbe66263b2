//! Operation tiers and the static operation registry.
//!
//! Every API operation is classified into exactly one tier when it is
//! registered. The tier is never inferred from the method or path at call
//! time; callers look the descriptor up by its operation id.
//!
//! - `L1Core`: OpenAPI-validated, production ready (sp, sb, sd, dsp, accounts)
//! - `L2Reference`: documented in the API reference but not in OpenAPI
//! - `L3Service`: product-level aggregate services (reporting, insights)
//! - `L4Experimental`: beta or UI-bound operations that may change at any time

use std::collections::HashMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Stability tier of an API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum OperationTier {
    #[serde(rename = "L1")]
    L1Core,
    #[serde(rename = "L2")]
    L2Reference,
    #[serde(rename = "L3")]
    L3Service,
    #[serde(rename = "L4")]
    L4Experimental,
}

impl OperationTier {
    pub const ALL: &'static [OperationTier] = &[
        OperationTier::L1Core,
        OperationTier::L2Reference,
        OperationTier::L3Service,
        OperationTier::L4Experimental,
    ];

    /// Short tier label.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationTier::L1Core => "L1",
            OperationTier::L2Reference => "L2",
            OperationTier::L3Service => "L3",
            OperationTier::L4Experimental => "L4",
        }
    }

    /// Where the tier's classification comes from.
    pub fn source(&self) -> &'static str {
        match self {
            OperationTier::L1Core => "openapi",
            OperationTier::L2Reference => "api-reference",
            OperationTier::L3Service => "product-level",
            OperationTier::L4Experimental => "experimental",
        }
    }

    /// True if invoking this tier requires an explicit risk acknowledgment.
    pub fn requires_risk_acknowledgment(&self) -> bool {
        matches!(self, OperationTier::L4Experimental)
    }
}

impl fmt::Display for OperationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP verb of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of one API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub struct OperationDescriptor {
    /// Stable operation id, e.g. `sp.campaigns.list`.
    pub id: &'static str,
    pub method: HttpMethod,
    /// Path template with `{placeholders}`, e.g. `/sp/campaigns/{campaignId}`.
    pub path: &'static str,
    pub tier: OperationTier,
}

impl OperationDescriptor {
    pub const fn new(
        id: &'static str,
        method: HttpMethod,
        path: &'static str,
        tier: OperationTier,
    ) -> Self {
        Self {
            id,
            method,
            path,
            tier,
        }
    }

    /// True if the path template has no placeholders.
    pub fn is_static_path(&self) -> bool {
        !self.path.contains('{')
    }

    /// True if `path` is an instance of this descriptor's path template.
    ///
    /// Each `{placeholder}` segment matches exactly one non-empty segment;
    /// every other segment must match literally.
    pub fn matches_path(&self, path: &str) -> bool {
        let mut template = self.path.split('/');
        let mut actual = path.split('/');
        loop {
            match (template.next(), actual.next()) {
                (None, None) => return true,
                (Some(t), Some(a)) if t.starts_with('{') && t.ends_with('}') => {
                    if a.is_empty() {
                        return false;
                    }
                }
                (Some(t), Some(a)) if t == a => {}
                _ => return false,
            }
        }
    }
}

/// Lookup table from operation id to descriptor.
///
/// Built once when the facade layer registers its operations and shared
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TierRegistry {
    operations: HashMap<&'static str, OperationDescriptor>,
}

impl TierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one descriptor.
    ///
    /// Re-registering an identical descriptor is a no-op. Registering the same
    /// id with a different tier, method or path fails, so every operation
    /// keeps exactly one verb, path and tier.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> ModelResult<()> {
        if let Some(existing) = self.operations.get(descriptor.id) {
            if existing.tier != descriptor.tier {
                return Err(ModelError::ConflictingTier {
                    id: descriptor.id.to_string(),
                    existing: existing.tier,
                    conflicting: descriptor.tier,
                });
            }
            if *existing != descriptor {
                return Err(ModelError::ConflictingOperation {
                    id: descriptor.id.to_string(),
                    existing: format!("{} {}", existing.method, existing.path),
                    conflicting: format!("{} {}", descriptor.method, descriptor.path),
                });
            }
            return Ok(());
        }
        self.operations.insert(descriptor.id, descriptor);
        Ok(())
    }

    /// Register many descriptors, stopping at the first conflict.
    pub fn register_all<I>(&mut self, descriptors: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = OperationDescriptor>,
    {
        descriptors.into_iter().try_for_each(|d| self.register(d))
    }

    /// Build a registry from a descriptor list.
    pub fn from_descriptors<I>(descriptors: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = OperationDescriptor>,
    {
        let mut registry = Self::new();
        registry.register_all(descriptors)?;
        Ok(registry)
    }

    /// Registry pre-populated with [`crate::catalog::ALL`].
    pub fn with_catalog() -> Self {
        let mut registry = Self::new();
        for descriptor in crate::catalog::ALL {
            registry.operations.insert(descriptor.id, *descriptor);
        }
        registry
    }

    pub fn get(&self, id: &str) -> Option<&OperationDescriptor> {
        self.operations.get(id)
    }

    pub fn tier_of(&self, id: &str) -> Option<OperationTier> {
        self.get(id).map(|d| d.tier)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of registered operations per tier.
    pub fn count_by_tier(&self) -> HashMap<OperationTier, usize> {
        let mut counts = HashMap::new();
        for descriptor in self.operations.values() {
            *counts.entry(descriptor.tier).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: OperationDescriptor = OperationDescriptor::new(
        "sp.campaigns.list",
        HttpMethod::Post,
        "/sp/campaigns/list",
        OperationTier::L1Core,
    );

    #[test]
    fn test_tier_labels() {
        let labels: Vec<_> = OperationTier::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(labels, vec!["L1", "L2", "L3", "L4"]);
        assert!(OperationTier::L4Experimental.requires_risk_acknowledgment());
        assert!(!OperationTier::L3Service.requires_risk_acknowledgment());
    }

    #[test]
    fn test_tier_serde() {
        assert_eq!(serde_json::to_string(&OperationTier::L2Reference).unwrap(), "\"L2\"");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TierRegistry::new();
        registry.register(LIST).unwrap();
        registry.register(LIST).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.tier_of("sp.campaigns.list"), Some(OperationTier::L1Core));
        assert!(registry.get("sp.campaigns.delete").is_none());
    }

    #[test]
    fn test_conflicting_tier_rejected() {
        let mut registry = TierRegistry::new();
        registry.register(LIST).unwrap();
        let err = registry
            .register(OperationDescriptor {
                tier: OperationTier::L4Experimental,
                ..LIST
            })
            .unwrap_err();
        assert!(matches!(err, ModelError::ConflictingTier { .. }));
        assert_eq!(registry.tier_of("sp.campaigns.list"), Some(OperationTier::L1Core));
    }

    #[test]
    fn test_conflicting_method_or_path_rejected() {
        let mut registry = TierRegistry::new();
        registry.register(LIST).unwrap();
        registry.register(LIST).unwrap();

        let moved = OperationDescriptor {
            path: "/st/campaigns/list",
            ..LIST
        };
        let err = registry.register(moved).unwrap_err();
        assert!(matches!(err, ModelError::ConflictingOperation { .. }));

        let verb = OperationDescriptor {
            method: HttpMethod::Get,
            ..LIST
        };
        assert!(registry.register(verb).is_err());
        assert_eq!(registry.get("sp.campaigns.list"), Some(&LIST));
    }

    #[test]
    fn test_path_matches_template() {
        let get = OperationDescriptor::new(
            "sp.campaigns.get",
            HttpMethod::Get,
            "/sp/campaigns/{campaignId}",
            OperationTier::L1Core,
        );
        assert!(get.matches_path("/sp/campaigns/123"));
        assert!(get.matches_path("/sp/campaigns/a%2Fb"));
        assert!(!get.matches_path("/sp/campaigns/"));
        assert!(!get.matches_path("/sp/campaigns/1/extra"));
        assert!(!get.matches_path("/st/campaigns/1"));
        assert!(LIST.matches_path("/sp/campaigns/list"));
        assert!(!LIST.matches_path("/st/campaigns/list"));
        assert!(!LIST.matches_path("/sp/campaigns"));
    }

    #[test]
    fn test_static_path_detection() {
        assert!(LIST.is_static_path());
        let get = OperationDescriptor::new(
            "sp.campaigns.get",
            HttpMethod::Get,
            "/v2/sp/campaigns/{campaignId}",
            OperationTier::L1Core,
        );
        assert!(!get.is_static_path());
    }
}
