//! Well-known operation descriptors.
//!
//! A representative slice of the operation table for each tier. The full
//! table is generated from the OpenAPI definitions and registered by the
//! facade layer; these entries back the self-check binary and the tests.

use crate::tier::HttpMethod::{Delete, Get, Post, Put};
use crate::tier::OperationDescriptor as Op;
use crate::tier::OperationTier::{L1Core, L2Reference, L3Service, L4Experimental};

/// Media type used by the Sponsored Products v3 campaign endpoints.
pub const SP_CAMPAIGN_MEDIA_TYPE: &str = "application/vnd.spCampaign.v3+json";

// L1: accounts
pub const PROFILES_LIST: Op = Op::new("accounts.profiles.list", Get, "/v2/profiles", L1Core);
pub const PROFILES_GET: Op = Op::new("accounts.profiles.get", Get, "/v2/profiles/{profileId}", L1Core);

// L1: sponsored products
pub const SP_CAMPAIGNS_LIST: Op = Op::new("sp.campaigns.list", Post, "/sp/campaigns/list", L1Core);
pub const SP_CAMPAIGNS_CREATE: Op = Op::new("sp.campaigns.create", Post, "/sp/campaigns", L1Core);
pub const SP_CAMPAIGNS_UPDATE: Op = Op::new("sp.campaigns.update", Put, "/sp/campaigns", L1Core);
pub const SP_CAMPAIGNS_DELETE: Op = Op::new("sp.campaigns.delete", Post, "/sp/campaigns/delete", L1Core);

// L2: reference
pub const AMC_INSTANCES_LIST: Op = Op::new("reference.amc.instances.list", Get, "/amc/instances", L2Reference);
pub const AMC_INSTANCES_DELETE: Op =
    Op::new("reference.amc.instances.delete", Delete, "/amc/instances/{instanceId}", L2Reference);
pub const STREAM_SUBSCRIPTIONS_LIST: Op =
    Op::new("reference.stream.subscriptions.list", Get, "/streams/subscriptions", L2Reference);

// L3: services
pub const REPORTS_CREATE: Op = Op::new("services.reporting.create", Post, "/reporting/reports", L3Service);
pub const REPORTS_GET: Op = Op::new("services.reporting.get", Get, "/reporting/reports/{reportId}", L3Service);
pub const INSIGHTS_OVERLAPPING_AUDIENCES: Op = Op::new(
    "services.insights.top_overlapping_audiences",
    Post,
    "/insights/topOverlappingAudiences",
    L3Service,
);

// L4: experimental
pub const ST_CAMPAIGNS_LIST: Op =
    Op::new("experimental.sponsored_tv.campaigns.list", Post, "/st/campaigns/list", L4Experimental);
pub const ST_CAMPAIGNS_CREATE: Op =
    Op::new("experimental.sponsored_tv.campaigns.create", Post, "/st/campaigns", L4Experimental);
pub const PRE_MODERATION: Op = Op::new("experimental.moderation.pre_moderation", Post, "/preModeration", L4Experimental);

/// Every descriptor in this catalog.
pub const ALL: &[Op] = &[
    PROFILES_LIST,
    PROFILES_GET,
    SP_CAMPAIGNS_LIST,
    SP_CAMPAIGNS_CREATE,
    SP_CAMPAIGNS_UPDATE,
    SP_CAMPAIGNS_DELETE,
    AMC_INSTANCES_LIST,
    AMC_INSTANCES_DELETE,
    STREAM_SUBSCRIPTIONS_LIST,
    REPORTS_CREATE,
    REPORTS_GET,
    INSIGHTS_OVERLAPPING_AUDIENCES,
    ST_CAMPAIGNS_LIST,
    ST_CAMPAIGNS_CREATE,
    PRE_MODERATION,
];
