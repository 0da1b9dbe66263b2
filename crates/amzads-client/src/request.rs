//! Request and response values passed across the facade boundary.

use std::time::Duration;

use amzads_models::{HttpMethod, OperationDescriptor};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AdsError, AdsResult};

/// Default media type for request and response bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// One API call as described by a generated endpoint function.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub(crate) operation_id: String,
    pub(crate) method: HttpMethod,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Value>,
    pub(crate) content_type: Option<String>,
    pub(crate) accept: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(operation_id: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            content_type: None,
            accept: None,
            timeout: None,
        }
    }

    /// Request for an operation whose path has no placeholders.
    pub fn for_operation(descriptor: &OperationDescriptor) -> Self {
        Self::new(descriptor.id, descriptor.method, descriptor.path)
    }

    /// Request for an operation, filling `{name}` placeholders from `params`.
    /// Values are percent-encoded.
    pub fn with_path_params(descriptor: &OperationDescriptor, params: &[(&str, &str)]) -> AdsResult<Self> {
        let mut path = descriptor.path.to_string();
        for (name, value) in params {
            let placeholder = format!("{{{}}}", name);
            if !path.contains(&placeholder) {
                return Err(AdsError::config(format!(
                    "operation {} has no path parameter {}",
                    descriptor.id, name
                )));
            }
            path = path.replace(&placeholder, &urlencoding::encode(value));
        }
        if path.contains('{') {
            return Err(AdsError::config(format!(
                "operation {} is missing path parameters: {}",
                descriptor.id, path
            )));
        }
        Ok(Self::new(descriptor.id, descriptor.method, path))
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Vendor media type such as `application/vnd.spCampaign.v3+json`. Also
    /// used as `Accept` unless one is set explicitly.
    pub fn content_type(mut self, media_type: impl Into<String>) -> Self {
        self.content_type = Some(media_type.into());
        self
    }

    pub fn accept(mut self, media_type: impl Into<String>) -> Self {
        self.accept = Some(media_type.into());
        self
    }

    /// Override the client's per-request timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub(crate) fn content_type_header(&self) -> &str {
        self.content_type.as_deref().unwrap_or(JSON_MEDIA_TYPE)
    }

    pub(crate) fn accept_header(&self) -> &str {
        self.accept
            .as_deref()
            .or(self.content_type.as_deref())
            .unwrap_or(JSON_MEDIA_TYPE)
    }
}

/// Successful API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON payload; `Value::Null` for empty bodies such as 204.
    pub body: Value,
    /// Amazon request id, when the response carried one.
    pub request_id: Option<String>,
    /// Attempts charged to the retry budget.
    pub attempts: u32,
}

impl ApiResponse {
    /// Deserialize the payload.
    pub fn json<T: DeserializeOwned>(&self) -> AdsResult<T> {
        T::deserialize(&self.body).map_err(|e| AdsError::invalid_response(e.to_string()))
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use amzads_models::catalog;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_path_params_are_encoded() {
        let request = ApiRequest::with_path_params(&catalog::REPORTS_GET, &[("reportId", "a b/c")]).unwrap();
        assert_eq!(request.path(), "/reporting/reports/a%20b%2Fc");
        assert_eq!(request.method(), HttpMethod::Get);
        assert_eq!(request.operation_id(), "services.reporting.get");
    }

    #[test]
    fn test_path_params_must_match_template() {
        assert!(ApiRequest::with_path_params(&catalog::REPORTS_GET, &[]).is_err());
        assert!(ApiRequest::with_path_params(&catalog::REPORTS_GET, &[("campaignId", "1")]).is_err());
    }

    #[test]
    fn test_media_type_defaults() {
        let plain = ApiRequest::for_operation(&catalog::PROFILES_LIST);
        assert_eq!(plain.content_type_header(), JSON_MEDIA_TYPE);
        assert_eq!(plain.accept_header(), JSON_MEDIA_TYPE);

        let vendor = ApiRequest::for_operation(&catalog::SP_CAMPAIGNS_LIST).content_type(catalog::SP_CAMPAIGN_MEDIA_TYPE);
        assert_eq!(vendor.content_type_header(), catalog::SP_CAMPAIGN_MEDIA_TYPE);
        assert_eq!(vendor.accept_header(), catalog::SP_CAMPAIGN_MEDIA_TYPE);

        let mixed = vendor.accept("application/json");
        assert_eq!(mixed.accept_header(), "application/json");
    }

    #[test]
    fn test_response_typed_decode() {
        #[derive(Deserialize)]
        struct Profile {
            #[serde(rename = "profileId")]
            profile_id: u64,
        }

        let response = ApiResponse {
            status: 200,
            body: json!([{"profileId": 123456789, "countryCode": "US"}]),
            request_id: None,
            attempts: 1,
        };
        let profiles: Vec<Profile> = response.json().unwrap();
        assert_eq!(profiles[0].profile_id, 123456789);

        let err = response.json::<String>().unwrap_err();
        assert!(matches!(err, AdsError::InvalidResponse(_)));
    }
}
