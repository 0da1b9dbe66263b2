//! Tier gate: decides whether an operation may run through a given handle.
//!
//! | Tier | Default path | Own namespace            | Risk flag |
//! |------|--------------|--------------------------|-----------|
//! | L1   | allowed      | allowed everywhere       | no        |
//! | L2   | denied       | `reference()`            | no        |
//! | L3   | denied       | `services()`             | no        |
//! | L4   | denied       | `experimental(true)`     | yes       |
//!
//! The check is pure and synchronous and runs before a request is built.

use std::fmt;
use std::sync::Arc;

use amzads_models::{OperationDescriptor, OperationTier, TierRegistry};

use crate::error::{TierDenial, TierError};

/// The handle a call came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPath {
    /// `client.core()`: the default path.
    Default,
    /// `client.reference()`
    Reference,
    /// `client.services()`
    Service,
    /// `client.experimental(acknowledge_risk)`; the flag is fixed for the
    /// handle's lifetime.
    Experimental { acknowledged: bool },
}

impl AccessPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPath::Default => "default",
            AccessPath::Reference => "reference",
            AccessPath::Service => "services",
            AccessPath::Experimental { .. } => "experimental",
        }
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check one descriptor against the access path.
pub fn authorize(descriptor: &OperationDescriptor, access: AccessPath) -> Result<(), TierError> {
    let denial = match (descriptor.tier, access) {
        (OperationTier::L1Core, _) => None,
        (OperationTier::L2Reference, AccessPath::Reference) => None,
        (OperationTier::L3Service, AccessPath::Service) => None,
        (OperationTier::L4Experimental, AccessPath::Experimental { acknowledged: true }) => None,
        (OperationTier::L4Experimental, AccessPath::Experimental { acknowledged: false }) => {
            Some(TierDenial::RiskNotAcknowledged)
        }
        (OperationTier::L4Experimental, _) => Some(TierDenial::ExperimentalOnly),
        (OperationTier::L2Reference | OperationTier::L3Service, _) => Some(TierDenial::NamespaceMismatch),
    };

    match denial {
        None => Ok(()),
        Some(reason) => Err(TierError {
            operation: descriptor.id.to_string(),
            tier: Some(descriptor.tier),
            access: access.as_str(),
            reason,
        }),
    }
}

/// Registry-backed gate shared by every handle of a client.
#[derive(Debug, Clone)]
pub struct TierGate {
    registry: Arc<TierRegistry>,
}

impl TierGate {
    pub fn new(registry: Arc<TierRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TierRegistry {
        &self.registry
    }

    /// Look the operation up and check it against the access path.
    pub fn authorize(&self, operation_id: &str, access: AccessPath) -> Result<OperationDescriptor, TierError> {
        let descriptor = self.registry.get(operation_id).ok_or_else(|| TierError {
            operation: operation_id.to_string(),
            tier: None,
            access: access.as_str(),
            reason: TierDenial::UnknownOperation,
        })?;
        authorize(descriptor, access)?;
        Ok(*descriptor)
    }
}

#[cfg(test)]
mod tests {
    use amzads_models::catalog;

    use super::*;

    const ACK: AccessPath = AccessPath::Experimental { acknowledged: true };
    const NO_ACK: AccessPath = AccessPath::Experimental { acknowledged: false };

    fn reason(descriptor: &OperationDescriptor, access: AccessPath) -> Option<TierDenial> {
        authorize(descriptor, access).err().map(|e| e.reason)
    }

    #[test]
    fn test_l1_allowed_everywhere() {
        for access in [AccessPath::Default, AccessPath::Reference, AccessPath::Service, ACK, NO_ACK] {
            assert_eq!(reason(&catalog::SP_CAMPAIGNS_LIST, access), None, "{}", access);
        }
    }

    #[test]
    fn test_l2_only_through_reference() {
        let op = &catalog::AMC_INSTANCES_LIST;
        assert_eq!(reason(op, AccessPath::Reference), None);
        assert_eq!(reason(op, AccessPath::Default), Some(TierDenial::NamespaceMismatch));
        assert_eq!(reason(op, AccessPath::Service), Some(TierDenial::NamespaceMismatch));
        assert_eq!(reason(op, ACK), Some(TierDenial::NamespaceMismatch));
    }

    #[test]
    fn test_l3_only_through_services() {
        let op = &catalog::REPORTS_CREATE;
        assert_eq!(reason(op, AccessPath::Service), None);
        assert_eq!(reason(op, AccessPath::Default), Some(TierDenial::NamespaceMismatch));
        assert_eq!(reason(op, AccessPath::Reference), Some(TierDenial::NamespaceMismatch));
    }

    #[test]
    fn test_l4_requires_acknowledged_experimental_handle() {
        let op = &catalog::ST_CAMPAIGNS_CREATE;
        assert_eq!(reason(op, ACK), None);
        assert_eq!(reason(op, NO_ACK), Some(TierDenial::RiskNotAcknowledged));
        assert_eq!(reason(op, AccessPath::Default), Some(TierDenial::ExperimentalOnly));
        assert_eq!(reason(op, AccessPath::Service), Some(TierDenial::ExperimentalOnly));
        assert_eq!(reason(op, AccessPath::Reference), Some(TierDenial::ExperimentalOnly));
    }

    #[test]
    fn test_risk_error_message() {
        let err = authorize(&catalog::PRE_MODERATION, NO_ACK).unwrap_err();
        assert_eq!(err.reason.as_str(), "risk_not_acknowledged");
        assert_eq!(err.tier, Some(OperationTier::L4Experimental));
        assert!(err.to_string().contains("risk_not_acknowledged"));
        assert!(err.to_string().contains("experimental.moderation.pre_moderation"));
    }

    #[test]
    fn test_gate_rejects_unknown_operation() {
        let gate = TierGate::new(Arc::new(TierRegistry::with_catalog()));
        let err = gate.authorize("sp.campaigns.explode", AccessPath::Default).unwrap_err();
        assert_eq!(err.reason, TierDenial::UnknownOperation);
        assert_eq!(err.tier, None);

        let descriptor = gate.authorize("accounts.profiles.list", AccessPath::Default).unwrap();
        assert_eq!(descriptor, catalog::PROFILES_LIST);
    }
}
