//! Records created alongside every new project.

/// Name of the judgement attached to a freshly created project.
pub const DEFAULT_JUDGEMENT_NAME: &str = "Judgements by internal users";

pub const DEFAULT_QUERY_TEMPLATE_DESCRIPTION: &str = "Initial query";
pub const DEFAULT_QUERY_TEMPLATE_TAG: &str = "";
// TODO: derive the match field from the search endpoint's display fields instead of assuming
// `title`.
pub const DEFAULT_QUERY_TEMPLATE_QUERY: &str = r###"{"query":{"match":{"title":"##$query##"}}}"###;

pub fn default_knobs() -> serde_json::Value {
	serde_json::Value::Object(serde_json::Map::new())
}
