use serde_json::{Map, Value};

use crate::{Error, Result};
use sierra_config::QueryExpanderConfig;
use sierra_domain::rules::Rule;

/// Renders `template` for `query` through the query-expansion service.
pub async fn expand(
	cfg: &QueryExpanderConfig,
	query: &str,
	template: Value,
	knobs: &Value,
	rules: &[Rule],
	ltr_model: Option<&str>,
) -> Result<Value> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = expansion_body(template, knobs, rules, ltr_model)?;
	let res = client
		.post(url)
		.headers(crate::default_headers(&cfg.default_headers)?)
		.query(&[("q", query)])
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	if json.is_null() {
		return Err(Error::InvalidResponse {
			message: "Query expander returned an empty document.".to_string(),
		});
	}

	Ok(json)
}

/// Knobs are spread into `config`; `rules` and `ltr_model` are set after them and win on clashes.
pub fn expansion_body(
	template: Value,
	knobs: &Value,
	rules: &[Rule],
	ltr_model: Option<&str>,
) -> Result<Value> {
	let mut config = match knobs {
		Value::Object(map) => map.clone(),
		Value::Null => Map::new(),
		_ => {
			return Err(Error::InvalidConfig {
				message: "Query template knobs must be a JSON object.".to_string(),
			});
		},
	};

	config.insert("rules".to_string(), serde_json::to_value(rules)?);

	if let Some(model) = ltr_model {
		config.insert("ltr_model".to_string(), Value::from(model));
	}

	Ok(serde_json::json!({ "template": template, "config": config }))
}
