use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result, SessionUser, SierraService, access, query_templates, rulesets};
use sierra_domain::{
	query_template,
	rules::{Rule, RulesetVersionValue},
};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestbedRequest {
	pub query: String,
	pub project_id: i64,
	#[serde(default)]
	pub ruleset_ids: Vec<i64>,
	pub ltr_model_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestbedResponse {
	pub result: Value,
}

impl SierraService {
	/// Expands `query` with the project's latest template and the selected rulesets, then runs the
	/// expansion against the project's search endpoint.
	pub async fn testbed_query(
		&self,
		user: &SessionUser,
		req: TestbedRequest,
	) -> Result<TestbedResponse> {
		let project = access::project(&self.db.pool, user.id, req.project_id).await?;
		let mut rules: Vec<Rule> = Vec::new();

		for ruleset_id in &req.ruleset_ids {
			let ruleset = access::ruleset(&self.db.pool, user.id, *ruleset_id).await?;
			let Some(version) = rulesets::latest_version(&self.db.pool, ruleset.id).await? else {
				continue;
			};
			let value: RulesetVersionValue =
				serde_json::from_value(version.value).map_err(|err| Error::Storage {
					message: format!("Stored ruleset version {} is invalid: {err}.", version.id),
				})?;

			rules.extend(value.enabled_rules());
		}

		let template = query_templates::latest_query_template(&self.db.pool, project.id)
			.await?
			.ok_or_else(|| Error::not_found("query template not found"))?;
		let endpoint =
			access::search_endpoint(&self.db.pool, user.id, project.search_endpoint_id).await?;
		let parsed_template = query_template::parse_query(&template.query).map_err(|message| {
			Error::Storage { message: format!("Stored query template is invalid: {message}") }
		})?;
		let expanded = self
			.providers
			.expander
			.expand(
				&self.cfg.providers.query_expander,
				&req.query,
				parsed_template,
				&template.knobs,
				&rules,
				req.ltr_model_name.as_deref().filter(|name| !name.trim().is_empty()),
			)
			.await
			.map_err(|err| {
				tracing::warn!(project_id = project.id, error = %err, "Query expansion failed.");

				Error::Provider { message: "failed to expand query".to_string() }
			})?;
		let result = self.execute_on_endpoint(&endpoint, &expanded.to_string()).await?;

		Ok(TestbedResponse { result })
	}
}
