//! Sample data for local development.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{Result, SessionUser, SierraService};
use sierra_domain::defaults;

const SAMPLE_PHRASES: [&str; 5] = ["notebook", "fruits", "tote bags", "briefcase", "suitcase"];
const SAMPLE_RESULTS_PER_PHRASE: u64 = 20;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
	pub success: bool,
	pub search_endpoint_id: i64,
	pub project_id: i64,
	pub ruleset_id: i64,
	pub query_template_id: i64,
	pub execution_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
struct SamplePhrase {
	phrase: &'static str,
	total_results: i32,
	combined_score: f64,
	results: Value,
}
impl SamplePhrase {
	/// Scores derive from the phrase's character sum so reseeding yields identical data.
	fn new(phrase: &'static str) -> Self {
		let seed: u64 = phrase.chars().map(u64::from).sum();
		let combined_score = ((seed * 79) % 1_000) as f64 / 10.0;
		let total_results = ((seed * 97) % 250) as i32;
		let results = (0..SAMPLE_RESULTS_PER_PHRASE)
			.map(|i| {
				let document_id = format!("doc_{}", (seed * i) % 1_000_000);
				let score = ((seed + i * 97) % 1_000) as f64 / 10.0;

				json!([document_id, score])
			})
			.collect();

		Self { phrase, total_results, combined_score, results: Value::Array(results) }
	}

	fn all_scores(&self) -> Value {
		let score = self.combined_score;

		json!({ "ndc@5": score, "ap@5": score, "p@5": score })
	}
}

fn sample_ruleset() -> Value {
	json!({
		"rules": [
			{
				"expression": "notebook",
				"instructions": [
					{ "type": "synonym", "directed": false, "weight": 1, "term": "laptop", "enabled": true },
					{ "type": "synonym", "directed": true, "weight": 1, "term": "netbook", "enabled": true },
					{ "type": "updown", "weight": 2, "term": "asus", "enabled": true },
					{ "type": "updown", "weight": -3, "term": "keyboard", "enabled": false },
					{ "type": "updown", "weight": -4, "term": "mouse", "enabled": true },
					{ "type": "updown", "weight": -4, "term": "Optical", "enabled": true },
					{ "type": "updown", "weight": -1, "term": "Power Cord", "enabled": true },
					{ "type": "updown", "weight": -3, "term": "spare part", "enabled": true },
					{ "type": "filter", "include": false, "term": "title:accessory", "enabled": true },
					{ "type": "filter", "include": false, "term": "title:notebook", "enabled": true }
				],
				"enabled": true
			},
			{
				"expression": "cheap iphone",
				"instructions": [{ "type": "delete", "term": "cheap", "enabled": true }],
				"enabled": true
			}
		]
	})
}

impl SierraService {
	/// Seeds the active org with an endpoint, a project and one finished lab run.
	pub async fn seed_dev_data(&self, user: &SessionUser) -> Result<SeedReport> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let search_endpoint_id: i64 = sqlx::query_scalar(
			"\
INSERT INTO search_endpoints (
	org_id,
	name,
	description,
	result_id,
	type,
	info,
	created_at,
	updated_at
)
VALUES ($1, 'Local Elasticsearch', 'Elasticsearch instance on localhost.', '_id', 'ELASTICSEARCH', $2, $3, $3)
RETURNING id",
		)
		.bind(user.active_org_id)
		.bind(json!({ "endpoint": "http://localhost:9200/icecat/_search" }))
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;
		let project_id: i64 = sqlx::query_scalar(
			"\
INSERT INTO projects (org_id, search_endpoint_id, name, created_at, updated_at)
VALUES ($1, $2, 'Dev Project', $3, $3)
RETURNING id",
		)
		.bind(user.active_org_id)
		.bind(search_endpoint_id)
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;
		let ruleset_id: i64 = sqlx::query_scalar(
			"\
INSERT INTO rulesets (project_id, name, created_at, updated_at)
VALUES ($1, 'Dev Ruleset', $2, $2)
RETURNING id",
		)
		.bind(project_id)
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;

		sqlx::query(
			"\
INSERT INTO ruleset_versions (ruleset_id, value, created_at, updated_at)
VALUES ($1, $2, $3, $3)",
		)
		.bind(ruleset_id)
		.bind(sample_ruleset())
		.bind(now)
		.execute(&mut *tx)
		.await?;

		let query_template_id: i64 = sqlx::query_scalar(
			"\
INSERT INTO query_templates (project_id, description, tag, query, knobs, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $6)
RETURNING id",
		)
		.bind(project_id)
		.bind(defaults::DEFAULT_QUERY_TEMPLATE_DESCRIPTION)
		.bind(defaults::DEFAULT_QUERY_TEMPLATE_TAG)
		.bind(defaults::DEFAULT_QUERY_TEMPLATE_QUERY)
		.bind(defaults::default_knobs())
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;
		let search_configuration_id: i64 = sqlx::query_scalar(
			"\
INSERT INTO search_configurations (query_template_id, created_at, updated_at)
VALUES ($1, $2, $2)
RETURNING id",
		)
		.bind(query_template_id)
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;
		let execution_id: i64 = sqlx::query_scalar(
			"\
INSERT INTO executions (search_configuration_id, meta, combined_score, all_scores, created_at, updated_at)
VALUES ($1, $2, 85, $3, $4, $4)
RETURNING id",
		)
		.bind(search_configuration_id)
		.bind(json!({ "documents": 150000 }))
		.bind(json!({ "ndc@5": 90, "ap@5": 10, "p@5": 45 }))
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;

		for phrase in SAMPLE_PHRASES.map(SamplePhrase::new) {
			sqlx::query(
				"\
INSERT INTO search_phrase_executions (
	execution_id,
	phrase,
	total_results,
	results,
	explanation,
	combined_score,
	all_scores,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, '{}', $5, $6, $7, $7)",
			)
			.bind(execution_id)
			.bind(phrase.phrase)
			.bind(phrase.total_results)
			.bind(&phrase.results)
			.bind(phrase.combined_score)
			.bind(phrase.all_scores())
			.bind(now)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		tracing::info!(org_id = user.active_org_id, project_id, "Seeded development data.");

		Ok(SeedReport {
			success: true,
			search_endpoint_id,
			project_id,
			ruleset_id,
			query_template_id,
			execution_id,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use sierra_domain::rules::RulesetVersionValue;

	#[test]
	fn sample_phrases_are_deterministic() {
		// "fruits" sums to 669.
		let phrase = SamplePhrase::new("fruits");

		assert_eq!(phrase, SamplePhrase::new("fruits"));
		assert_eq!(phrase.combined_score, 85.1);
		assert_eq!(phrase.total_results, 143);
		assert_eq!(phrase.results.as_array().map(Vec::len), Some(20));
		assert_eq!(phrase.results[0], json!(["doc_0", 66.9]));
		assert_eq!(phrase.results[1], json!(["doc_669", 76.6]));
	}

	#[test]
	fn sample_ruleset_is_valid() {
		let value: RulesetVersionValue =
			serde_json::from_value(sample_ruleset()).expect("parse failed");

		assert!(value.validate().is_ok());
		assert_eq!(value.rules.len(), 2);
	}
}
