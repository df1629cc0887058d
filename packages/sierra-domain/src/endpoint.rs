use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchEndpointType {
	Elasticsearch,
	OpenSearch,
	Solr,
	Vespa,
	RedisSearch,
}
impl SearchEndpointType {
	pub const ALL: [Self; 5] =
		[Self::Elasticsearch, Self::OpenSearch, Self::Solr, Self::Vespa, Self::RedisSearch];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Elasticsearch => "ELASTICSEARCH",
			Self::OpenSearch => "OPEN_SEARCH",
			Self::Solr => "SOLR",
			Self::Vespa => "VESPA",
			Self::RedisSearch => "REDIS_SEARCH",
		}
	}

	/// Backends that accept the Elasticsearch query DSL over `POST <endpoint>`.
	pub fn speaks_query_dsl(self) -> bool {
		matches!(self, Self::Elasticsearch | Self::OpenSearch)
	}
}
impl fmt::Display for SearchEndpointType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for SearchEndpointType {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == raw)
			.ok_or_else(|| format!("Unknown search endpoint type {raw:?}."))
	}
}

/// Connection details stored in `search_endpoints.info`.
///
/// Elasticsearch and OpenSearch endpoints may carry an index and basic-auth credentials; the
/// other backends only need a URL. All shapes share `endpoint`, so one struct covers them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
	pub endpoint: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub index: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
}
impl EndpointInfo {
	pub fn validate(&self) -> Result<(), String> {
		if self.endpoint.trim().is_empty() {
			return Err("info.endpoint must be non-empty.".to_string());
		}
		if self.password.is_some() && self.username.is_none() {
			return Err("info.password requires info.username.".to_string());
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn type_names_round_trip_through_strings() {
		for kind in SearchEndpointType::ALL {
			assert_eq!(kind.as_str().parse::<SearchEndpointType>(), Ok(kind));
		}

		assert!("MONGO".parse::<SearchEndpointType>().is_err());
	}

	#[test]
	fn serde_names_match_database_names() {
		let json = serde_json::to_value(SearchEndpointType::OpenSearch).expect("serialize failed");

		assert_eq!(json, serde_json::json!("OPEN_SEARCH"));
	}

	#[test]
	fn info_requires_endpoint() {
		let info: EndpointInfo =
			serde_json::from_value(serde_json::json!({ "endpoint": " " })).expect("parse failed");

		assert!(info.validate().is_err());
	}
}
