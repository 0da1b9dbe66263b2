//! Advertising regions and regional endpoint resolution.
//!
//! Each region has its own API host and its own Login with Amazon token
//! host. A client is bound to exactly one region at construction.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ModelError, ModelResult};

/// Amazon Ads marketplace region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    /// North America (US, CA, MX, BR).
    #[default]
    Na,
    /// Europe, Middle East, India.
    Eu,
    /// Far East (JP, AU, SG).
    Fe,
}

impl Region {
    /// All supported regions.
    pub const ALL: &'static [Region] = &[Region::Na, Region::Eu, Region::Fe];

    /// Short region code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Na => "NA",
            Region::Eu => "EU",
            Region::Fe => "FE",
        }
    }

    /// Regional advertising API base URL.
    pub fn api_base_url(&self) -> &'static str {
        match self {
            Region::Na => "https://advertising-api.amazon.com",
            Region::Eu => "https://advertising-api-eu.amazon.com",
            Region::Fe => "https://advertising-api-fe.amazon.com",
        }
    }

    /// Regional OAuth base URL. The token endpoint is `{auth_base_url}/token`.
    pub fn auth_base_url(&self) -> &'static str {
        match self {
            Region::Na => "https://api.amazon.com/auth/o2",
            Region::Eu => "https://api.amazon.co.uk/auth/o2",
            Region::Fe => "https://api.amazon.co.jp/auth/o2",
        }
    }

    /// Resolve the endpoints for this region.
    pub fn endpoints(&self) -> RegionEndpoints {
        RegionEndpoints {
            auth_base_url: self.auth_base_url().to_string(),
            api_base_url: self.api_base_url().to_string(),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = ModelError;

    /// Accepts the region code (any case) or the region's API base URL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_uppercase().as_str() {
            "NA" => return Ok(Region::Na),
            "EU" => return Ok(Region::Eu),
            "FE" => return Ok(Region::Fe),
            _ => {}
        }

        let normalized = trimmed.trim_end_matches('/');
        Region::ALL
            .iter()
            .copied()
            .find(|region| region.api_base_url() == normalized)
            .ok_or_else(|| ModelError::UnknownRegion(s.to_string()))
    }
}

/// Resolved base URLs for one region.
///
/// Normally produced by [`Region::endpoints`]; [`RegionEndpoints::custom`]
/// points a client at a proxy or a local test server instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEndpoints {
    auth_base_url: String,
    api_base_url: String,
}

impl RegionEndpoints {
    /// Build endpoints from explicit base URLs.
    pub fn custom(auth_base_url: &str, api_base_url: &str) -> ModelResult<Self> {
        Ok(Self {
            auth_base_url: normalize_base(auth_base_url)?,
            api_base_url: normalize_base(api_base_url)?,
        })
    }

    pub fn auth_base_url(&self) -> &str {
        &self.auth_base_url
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// OAuth2 token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/token", self.auth_base_url)
    }

    /// Absolute URL for an API path such as `/v2/profiles`.
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base_url, path)
        } else {
            format!("{}/{}", self.api_base_url, path)
        }
    }
}

fn normalize_base(raw: &str) -> ModelResult<String> {
    let parsed = Url::parse(raw).map_err(|e| ModelError::InvalidEndpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ModelError::InvalidEndpoint {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }

    Ok(raw.trim_end_matches('/').to_string())
}
