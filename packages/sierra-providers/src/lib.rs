pub mod expander;
pub mod search;

mod error;

pub use error::{Error, Result};

use std::time::Duration as StdDuration;

use reqwest::{
	Client,
	header::{HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn default_headers(default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn client(timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().timeout(StdDuration::from_millis(timeout_ms)).build()?)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_headers_reject_non_string_values() {
		let mut map = Map::new();

		map.insert("x-team".to_string(), Value::from(7));

		assert!(matches!(default_headers(&map), Err(Error::InvalidConfig { .. })));
	}

	#[test]
	fn default_headers_copy_string_values() {
		let mut map = Map::new();

		map.insert("x-team".to_string(), Value::from("relevance"));

		let headers = default_headers(&map).expect("Failed to build headers.");

		assert_eq!(headers.get("x-team").and_then(|value| value.to_str().ok()), Some("relevance"));
	}
}
