//! OAuth client credentials.
//!
//! Credentials are immutable once built. Secret material is wrapped in
//! [`SecretString`], whose `Debug` and `Display` output is redacted, and
//! neither type implements `Serialize`.

use std::fmt;

use crate::error::{ModelError, ModelResult};
use crate::profile::ProfileId;
use crate::region::Region;

/// A string that never appears in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret. Only the token refresh request body should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Client credentials plus the profile and region a client is bound to.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: SecretString,
    refresh_token: SecretString,
    profile_id: Option<ProfileId>,
    region: Region,
}

impl Credentials {
    /// Build credentials, rejecting empty fields.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
        profile_id: Option<ProfileId>,
        region: Region,
    ) -> ModelResult<Self> {
        let client_id = client_id.into().trim().to_string();
        let client_secret = SecretString::new(client_secret);
        let refresh_token = SecretString::new(refresh_token);

        if client_id.is_empty() {
            return Err(ModelError::MissingCredential("client_id"));
        }
        if client_secret.is_empty() {
            return Err(ModelError::MissingCredential("client_secret"));
        }
        if refresh_token.is_empty() {
            return Err(ModelError::MissingCredential("refresh_token"));
        }

        Ok(Self {
            client_id,
            client_secret,
            refresh_token,
            profile_id,
            region,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }

    pub fn profile_id(&self) -> Option<&ProfileId> {
        self.profile_id.as_ref()
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Same secrets and region, scoped to another profile.
    pub fn for_profile(&self, profile_id: Option<ProfileId>) -> Self {
        Self {
            profile_id,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .field("refresh_token", &self.refresh_token)
            .field("profile_id", &self.profile_id)
            .field("region", &self.region)
            .finish()
    }
}
