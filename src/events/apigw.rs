//! API Gateway REST (v1) proxy integration payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Request forwarded by an API Gateway v1 proxy integration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiGatewayProxyRequest {
    pub resource: String,
    pub path: String,
    pub http_method: String,
    #[serde(deserialize_with = "super::nullable")]
    pub headers: HashMap<String, String>,
    #[serde(deserialize_with = "super::nullable")]
    pub multi_value_headers: HashMap<String, Vec<String>>,
    #[serde(deserialize_with = "super::nullable")]
    pub query_string_parameters: HashMap<String, String>,
    #[serde(deserialize_with = "super::nullable")]
    pub multi_value_query_string_parameters: HashMap<String, Vec<String>>,
    #[serde(deserialize_with = "super::nullable")]
    pub path_parameters: HashMap<String, String>,
    #[serde(deserialize_with = "super::nullable")]
    pub stage_variables: HashMap<String, String>,
    pub request_context: ApiGatewayProxyRequestContext,
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

/// The `requestContext` block of an [`ApiGatewayProxyRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiGatewayProxyRequestContext {
    pub account_id: String,
    pub resource_id: String,
    pub stage: String,
    pub request_id: String,
    pub resource_path: String,
    pub http_method: String,
    pub api_id: String,
    pub path: String,
    pub domain_name: String,
    pub request_time: String,
    pub request_time_epoch: i64,
}

/// Response returned to an API Gateway v1 proxy integration.
///
/// `headers` is always present, so middleware can add to it without
/// checking. Build one with the helpers in [`crate::response`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiGatewayProxyResponse {
    pub status_code: u16,
    #[serde(deserialize_with = "super::nullable")]
    pub headers: HashMap<String, String>,
    #[serde(deserialize_with = "super::nullable", skip_serializing_if = "HashMap::is_empty")]
    pub multi_value_headers: HashMap<String, Vec<String>>,
    pub body: String,
    pub is_base64_encoded: bool,
}
