use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgExecutor;
use time::OffsetDateTime;

use crate::{Error, Result, SessionUser, SierraService, access};
use sierra_domain::rules::RulesetVersionValue;
use sierra_storage::models::{Ruleset, RulesetVersion};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesetView {
	pub id: i64,
	pub project_id: i64,
	pub name: String,
}
impl From<Ruleset> for RulesetView {
	fn from(ruleset: Ruleset) -> Self {
		Self { id: ruleset.id, project_id: ruleset.project_id, name: ruleset.name }
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesetVersionView {
	pub id: i64,
	pub ruleset_id: i64,
	pub parent_id: Option<i64>,
	pub value: Value,
}
impl From<RulesetVersion> for RulesetVersionView {
	fn from(version: RulesetVersion) -> Self {
		Self {
			id: version.id,
			ruleset_id: version.ruleset_id,
			parent_id: version.parent_id,
			value: version.value,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RulesetDetail {
	pub ruleset: RulesetView,
	pub version: Option<RulesetVersionView>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRulesetRequest {
	pub project_id: i64,
	pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRulesetVersionRequest {
	pub ruleset_id: i64,
	pub parent_id: Option<i64>,
	pub value: RulesetVersionValue,
}

impl SierraService {
	pub async fn create_ruleset(
		&self,
		user: &SessionUser,
		req: CreateRulesetRequest,
	) -> Result<RulesetView> {
		let project = access::project(&self.db.pool, user.id, req.project_id).await?;
		let name = crate::trimmed_required(&req.name, "name")?;
		let ruleset: Ruleset = sqlx::query_as(
			"\
INSERT INTO rulesets (project_id, name, created_at, updated_at)
VALUES ($1, $2, $3, $3)
RETURNING *",
		)
		.bind(project.id)
		.bind(name)
		.bind(OffsetDateTime::now_utc())
		.fetch_one(&self.db.pool)
		.await?;

		tracing::info!(ruleset_id = ruleset.id, project_id = project.id, "Created ruleset.");

		Ok(ruleset.into())
	}

	pub async fn get_ruleset(&self, user: &SessionUser, ruleset_id: i64) -> Result<RulesetDetail> {
		let ruleset = access::ruleset(&self.db.pool, user.id, ruleset_id).await?;
		let version = latest_version(&self.db.pool, ruleset.id).await?;

		Ok(RulesetDetail { ruleset: ruleset.into(), version: version.map(Into::into) })
	}

	pub async fn list_rulesets(
		&self,
		user: &SessionUser,
		project_id: i64,
	) -> Result<Vec<RulesetView>> {
		let project = access::project(&self.db.pool, user.id, project_id).await?;
		let rulesets: Vec<Ruleset> = sqlx::query_as(
			"SELECT * FROM rulesets WHERE project_id = $1 ORDER BY updated_at DESC, id DESC",
		)
		.bind(project.id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(rulesets.into_iter().map(RulesetView::from).collect())
	}

	pub async fn create_ruleset_version(
		&self,
		user: &SessionUser,
		req: CreateRulesetVersionRequest,
	) -> Result<RulesetVersionView> {
		req.value.validate().map_err(Error::invalid)?;

		let now = OffsetDateTime::now_utc();
		let value = serde_json::to_value(&req.value)
			.map_err(|err| Error::invalid(format!("value could not be encoded: {err}.")))?;
		let mut tx = self.db.pool.begin().await?;
		let ruleset = access::ruleset(&mut *tx, user.id, req.ruleset_id).await?;

		if let Some(parent_id) = req.parent_id {
			let parent: Option<i64> = sqlx::query_scalar(
				"SELECT id FROM ruleset_versions WHERE id = $1 AND ruleset_id = $2",
			)
			.bind(parent_id)
			.bind(ruleset.id)
			.fetch_optional(&mut *tx)
			.await?;

			if parent.is_none() {
				return Err(Error::invalid("parentId must be a version of the same ruleset."));
			}
		}

		let version: RulesetVersion = sqlx::query_as(
			"\
INSERT INTO ruleset_versions (ruleset_id, parent_id, value, created_at, updated_at)
VALUES ($1, $2, $3, $4, $4)
RETURNING *",
		)
		.bind(ruleset.id)
		.bind(req.parent_id)
		.bind(value)
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;

		sqlx::query("UPDATE rulesets SET updated_at = $2 WHERE id = $1")
			.bind(ruleset.id)
			.bind(now)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		tracing::info!(ruleset_id = ruleset.id, version_id = version.id, "Created ruleset version.");

		Ok(version.into())
	}
}

/// Most recently updated version of a ruleset.
pub(crate) async fn latest_version<'e, E>(
	executor: E,
	ruleset_id: i64,
) -> Result<Option<RulesetVersion>>
where
	E: PgExecutor<'e>,
{
	let version = sqlx::query_as(
		"\
SELECT *
FROM ruleset_versions
WHERE ruleset_id = $1
ORDER BY updated_at DESC, id DESC
LIMIT 1",
	)
	.bind(ruleset_id)
	.fetch_optional(executor)
	.await?;

	Ok(version)
}
