use serde_json::{Map, Value};

/// Token replaced by the search phrase when the expander renders a template.
pub const QUERY_PLACEHOLDER: &str = "##$query##";

/// Parses template query text. Templates are stored as text but must hold a JSON document.
pub fn parse_query(raw: &str) -> Result<Value, String> {
	serde_json::from_str(raw).map_err(|err| format!("query must be valid JSON: {err}."))
}

/// Accepts knobs either as a JSON object or as a string holding one; `null` means no knobs.
pub fn normalize_knobs(raw: Value) -> Result<Value, String> {
	let value = match raw {
		Value::Null => return Ok(Value::Object(Map::new())),
		Value::String(text) if text.trim().is_empty() => return Ok(Value::Object(Map::new())),
		Value::String(text) => serde_json::from_str(&text)
			.map_err(|err| format!("knobs must be a JSON object: {err}."))?,
		other => other,
	};

	if !value.is_object() {
		return Err("knobs must be a JSON object.".to_string());
	}

	Ok(value)
}
