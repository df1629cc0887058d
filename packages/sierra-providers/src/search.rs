use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::{Error, Result};
use sierra_config::SearchBackendConfig;
use sierra_domain::endpoint::{EndpointInfo, SearchEndpointType};

/// Sends a raw query document to a search endpoint and returns the backend's JSON answer.
///
/// Only backends that speak the Elasticsearch query DSL are reachable this way. Error documents
/// are returned as-is whatever the status, so callers can show why a query was rejected.
pub async fn execute_query(
	cfg: &SearchBackendConfig,
	kind: SearchEndpointType,
	info: &EndpointInfo,
	query: &str,
) -> Result<Value> {
	if !kind.speaks_query_dsl() {
		return Err(Error::Unsupported { kind });
	}

	let client = crate::client(cfg.timeout_ms)?;
	let mut req = client
		.post(info.endpoint.as_str())
		.header(CONTENT_TYPE, "application/json")
		.body(query.to_string());

	if let Some(username) = info.username.as_deref() {
		req = req.basic_auth(username, info.password.as_deref());
	}

	let res = req.send().await?;
	let status = res.status();
	let body = res.bytes().await?;

	match serde_json::from_slice::<Value>(&body) {
		Ok(json) => Ok(json),
		Err(_) if !status.is_success() => Err(Error::InvalidResponse {
			message: format!("Search backend answered {status} without a JSON body."),
		}),
		Err(err) => Err(err.into()),
	}
}
