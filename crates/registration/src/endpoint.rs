use async_trait::async_trait;
use beehub_core::config::RegistrationConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::PickError;

/// Body of one add/drop call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRequest {
    #[serde(rename = "ECRN")]
    pub add: Vec<String>,
    #[serde(rename = "SCRN")]
    pub drop: Vec<String>,
}

impl RegistrationRequest {
    pub fn add_only(crns: Vec<String>) -> Self {
        Self {
            add: crns,
            drop: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    #[serde(rename = "ecrnResultList", default)]
    pub add_results: Vec<CrnResult>,
    #[serde(rename = "scrnResultList", default)]
    pub drop_results: Vec<CrnResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrnResult {
    pub crn: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub result_code: String,
    pub status_code: i64,
}

/// The vendor sometimes sends `"resultCode": null`; read it as an unknown code.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// The upstream add/drop service.
#[async_trait]
pub trait RegistrationEndpoint: Send + Sync {
    async fn submit(
        &self,
        token: &str,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, PickError>;
}

pub struct HttpEndpoint {
    client: reqwest::Client,
    url: Url,
}

impl HttpEndpoint {
    pub fn new(config: &RegistrationConfig) -> Result<Self, PickError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ORIGIN, header_value(&config.origin)?);
        headers.insert(REFERER, header_value(&config.referer)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PickError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: config.endpoint_url.clone(),
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue, PickError> {
    HeaderValue::from_str(value).map_err(|e| PickError::Parse(format!("invalid header {value:?}: {e}")))
}

#[async_trait]
impl RegistrationEndpoint for HttpEndpoint {
    async fn submit(
        &self,
        token: &str,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, PickError> {
        let resp = self
            .client
            .post(self.url.as_str())
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %self.url, error = %e, "registration call failed");
                PickError::Transport(e.to_string())
            })?;

        let status = resp.status().as_u16();
        if status != 200 {
            warn!(status, "registration endpoint rejected batch");
            return Err(PickError::BadStatus(status));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| PickError::Transport(e.to_string()))?;
        debug!(bytes = body.len(), "registration response");

        serde_json::from_slice(&body).map_err(|e| PickError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req = RegistrationRequest::add_only(vec!["21340".into(), "21341".into()]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"ECRN": ["21340", "21341"], "SCRN": []}));
    }

    #[test]
    fn test_response_parses_vendor_fields() {
        let body = r#"{
            "ecrnResultList": [
                {"crn": "21340", "resultCode": "successResult", "statusCode": 0, "resultData": null},
                {"crn": "21341", "resultCode": "VAL06", "statusCode": 1}
            ],
            "scrnResultList": []
        }"#;
        let resp: RegistrationResponse = serde_json::from_str(body).unwrap();

        assert_eq!(resp.add_results.len(), 2);
        assert_eq!(resp.add_results[1].result_code, "VAL06");
        assert_eq!(resp.add_results[1].status_code, 1);
        assert!(resp.drop_results.is_empty());
    }

    #[test]
    fn test_null_result_code_keeps_rest_of_batch() {
        let body = r#"{"ecrnResultList":[
            {"crn":"1","resultCode":null,"statusCode":1},
            {"crn":"2","resultCode":"VAL06","statusCode":1},
            {"crn":"3","statusCode":1}
        ]}"#;
        let resp: RegistrationResponse = serde_json::from_str(body).unwrap();

        assert_eq!(resp.add_results.len(), 3);
        assert_eq!(resp.add_results[0].result_code, "");
        assert_eq!(resp.add_results[1].result_code, "VAL06");
        assert_eq!(resp.add_results[2].result_code, "");

        let null_code = &resp.add_results[0];
        let result = crate::classifier::classify(&null_code.crn, null_code.status_code, &null_code.result_code);
        assert_eq!(result.message, "The course with CRN 1 cannot be added due to a problem.");
    }

    #[test]
    fn test_response_missing_lists_default_empty() {
        let resp: RegistrationResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.add_results.is_empty());
    }
}
