use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgExecutor;
use time::OffsetDateTime;

use crate::{Error, Result, SessionUser, SierraService, access};
use sierra_domain::query_template;
use sierra_storage::models::QueryTemplate;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTemplateView {
	pub id: i64,
	pub project_id: i64,
	pub parent_id: Option<i64>,
	pub description: String,
	pub knobs: Value,
	pub tag: String,
	pub query: String,
}
impl From<QueryTemplate> for QueryTemplateView {
	fn from(template: QueryTemplate) -> Self {
		Self {
			id: template.id,
			project_id: template.project_id,
			parent_id: template.parent_id,
			description: template.description,
			knobs: template.knobs,
			tag: template.tag,
			query: template.query,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueryTemplateRequest {
	pub project_id: i64,
	#[serde(default)]
	pub description: String,
	pub query: String,
	#[serde(default)]
	pub knobs: Value,
	pub tag: Option<String>,
}

/// Templates are immutable; an update stores a child of `id`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQueryTemplateRequest {
	pub id: i64,
	pub project_id: i64,
	#[serde(default)]
	pub description: String,
	pub query: String,
	#[serde(default)]
	pub knobs: Value,
	pub tag: Option<String>,
}

struct NewTemplate {
	project_id: i64,
	parent_id: Option<i64>,
	description: String,
	tag: String,
	query: String,
	knobs: Value,
}

impl SierraService {
	pub async fn create_query_template(
		&self,
		user: &SessionUser,
		req: CreateQueryTemplateRequest,
	) -> Result<QueryTemplateView> {
		let project = access::project(&self.db.pool, user.id, req.project_id).await?;
		let template = NewTemplate::checked(
			project.id,
			None,
			req.description,
			req.tag,
			req.query,
			req.knobs,
		)?;
		let created = insert_template(&self.db.pool, template).await?;

		tracing::info!(
			query_template_id = created.id,
			project_id = project.id,
			"Created query template."
		);

		Ok(created.into())
	}

	pub async fn update_query_template(
		&self,
		user: &SessionUser,
		req: UpdateQueryTemplateRequest,
	) -> Result<QueryTemplateView> {
		let parent = access::query_template(&self.db.pool, user.id, req.id).await?;

		if parent.project_id != req.project_id {
			return Err(Error::invalid("projectId must match the parent template's project."));
		}

		let template = NewTemplate::checked(
			parent.project_id,
			Some(parent.id),
			req.description,
			req.tag,
			req.query,
			req.knobs,
		)?;
		let created = insert_template(&self.db.pool, template).await?;

		tracing::info!(
			query_template_id = created.id,
			parent_id = parent.id,
			"Created query template revision."
		);

		Ok(created.into())
	}

	/// Templates of a project, newest first.
	pub async fn list_query_templates(
		&self,
		user: &SessionUser,
		project_id: i64,
	) -> Result<Vec<QueryTemplateView>> {
		let project = access::project(&self.db.pool, user.id, project_id).await?;
		let templates: Vec<QueryTemplate> = sqlx::query_as(
			"SELECT * FROM query_templates WHERE project_id = $1 ORDER BY created_at DESC, id DESC",
		)
		.bind(project.id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(templates.into_iter().map(QueryTemplateView::from).collect())
	}
}

impl NewTemplate {
	fn checked(
		project_id: i64,
		parent_id: Option<i64>,
		description: String,
		tag: Option<String>,
		query: String,
		knobs: Value,
	) -> Result<Self> {
		query_template::parse_query(&query).map_err(Error::invalid)?;

		let knobs = query_template::normalize_knobs(knobs).map_err(Error::invalid)?;

		Ok(Self {
			project_id,
			parent_id,
			description: description.trim().to_string(),
			tag: tag.map(|tag| tag.trim().to_string()).unwrap_or_default(),
			query,
			knobs,
		})
	}
}

async fn insert_template<'e, E>(executor: E, template: NewTemplate) -> Result<QueryTemplate>
where
	E: PgExecutor<'e>,
{
	let created = sqlx::query_as(
		"\
INSERT INTO query_templates (
	project_id,
	parent_id,
	description,
	tag,
	query,
	knobs,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
RETURNING *",
	)
	.bind(template.project_id)
	.bind(template.parent_id)
	.bind(template.description)
	.bind(template.tag)
	.bind(template.query)
	.bind(template.knobs)
	.bind(OffsetDateTime::now_utc())
	.fetch_one(executor)
	.await?;

	Ok(created)
}

/// Most recently updated template of a project.
pub(crate) async fn latest_query_template<'e, E>(
	executor: E,
	project_id: i64,
) -> Result<Option<QueryTemplate>>
where
	E: PgExecutor<'e>,
{
	let template = sqlx::query_as(
		"\
SELECT *
FROM query_templates
WHERE project_id = $1
ORDER BY updated_at DESC, id DESC
LIMIT 1",
	)
	.bind(project_id)
	.fetch_optional(executor)
	.await?;

	Ok(template)
}
