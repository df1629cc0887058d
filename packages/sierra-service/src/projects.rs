use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, JudgementView, Result, RulesetView, SessionUser, SierraService, access};
use sierra_domain::{defaults, endpoint::SearchEndpointType};
use sierra_storage::models::{Judgement, Project, Ruleset};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
	pub id: i64,
	pub org_id: i64,
	pub search_endpoint_id: i64,
	pub name: String,
}
impl From<Project> for ProjectView {
	fn from(project: Project) -> Self {
		Self {
			id: project.id,
			org_id: project.org_id,
			search_endpoint_id: project.search_endpoint_id,
			name: project.name,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedProjectView {
	#[serde(flatten)]
	pub project: ProjectView,
	pub judgements: Vec<JudgementView>,
	pub rulesets: Vec<RulesetView>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
	pub name: String,
	pub search_endpoint_id: i64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
	pub id: i64,
	pub name: Option<String>,
	pub search_endpoint_id: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DeleteProjectRequest {
	pub id: i64,
}

impl SierraService {
	/// Projects of the active org.
	pub async fn list_projects(&self, user: &SessionUser) -> Result<Vec<ProjectView>> {
		let projects: Vec<Project> = sqlx::query_as(
			"\
SELECT p.*
FROM projects p
JOIN org_users ou ON ou.org_id = p.org_id
WHERE p.org_id = $1 AND ou.user_id = $2
ORDER BY p.id ASC",
		)
		.bind(user.active_org_id)
		.bind(user.id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(projects.into_iter().map(ProjectView::from).collect())
	}

	pub async fn get_project(&self, user: &SessionUser, project_id: i64) -> Result<ProjectView> {
		Ok(access::project(&self.db.pool, user.id, project_id).await?.into())
	}

	pub async fn get_extended_project(
		&self,
		user: &SessionUser,
		project_id: i64,
	) -> Result<ExtendedProjectView> {
		let project = access::project(&self.db.pool, user.id, project_id).await?;
		let judgements: Vec<Judgement> = sqlx::query_as(
			"SELECT * FROM judgements WHERE project_id = $1 ORDER BY updated_at DESC, id DESC",
		)
		.bind(project.id)
		.fetch_all(&self.db.pool)
		.await?;
		let rulesets: Vec<Ruleset> = sqlx::query_as(
			"SELECT * FROM rulesets WHERE project_id = $1 ORDER BY updated_at DESC, id DESC",
		)
		.bind(project.id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(ExtendedProjectView {
			project: project.into(),
			judgements: judgements.into_iter().map(JudgementView::from).collect(),
			rulesets: rulesets.into_iter().map(RulesetView::from).collect(),
		})
	}

	/// Creates a project in the active org with its default judgement and, for backends that
	/// take the query DSL, a starter query template.
	pub async fn create_project(
		&self,
		user: &SessionUser,
		req: CreateProjectRequest,
	) -> Result<ProjectView> {
		let name = crate::trimmed_required(&req.name, "name")?;
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let endpoint = access::search_endpoint(&mut *tx, user.id, req.search_endpoint_id).await?;
		let project: Project = sqlx::query_as(
			"\
INSERT INTO projects (org_id, search_endpoint_id, name, created_at, updated_at)
VALUES ($1, $2, $3, $4, $4)
RETURNING *",
		)
		.bind(user.active_org_id)
		.bind(endpoint.id)
		.bind(name)
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;

		sqlx::query(
			"\
INSERT INTO judgements (project_id, name, created_at, updated_at)
VALUES ($1, $2, $3, $3)",
		)
		.bind(project.id)
		.bind(defaults::DEFAULT_JUDGEMENT_NAME)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		let speaks_query_dsl = endpoint
			.r#type
			.parse::<SearchEndpointType>()
			.map(SearchEndpointType::speaks_query_dsl)
			.unwrap_or(false);

		if speaks_query_dsl {
			sqlx::query(
				"\
INSERT INTO query_templates (project_id, description, tag, query, knobs, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $6)",
			)
			.bind(project.id)
			.bind(defaults::DEFAULT_QUERY_TEMPLATE_DESCRIPTION)
			.bind(defaults::DEFAULT_QUERY_TEMPLATE_TAG)
			.bind(defaults::DEFAULT_QUERY_TEMPLATE_QUERY)
			.bind(defaults::default_knobs())
			.bind(now)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		tracing::info!(
			project_id = project.id,
			org_id = project.org_id,
			search_endpoint_id = endpoint.id,
			"Created project."
		);

		Ok(project.into())
	}

	pub async fn update_project(
		&self,
		user: &SessionUser,
		req: UpdateProjectRequest,
	) -> Result<ProjectView> {
		let project = access::project(&self.db.pool, user.id, req.id).await?;

		if let Some(search_endpoint_id) = req.search_endpoint_id {
			access::search_endpoint(&self.db.pool, user.id, search_endpoint_id).await?;
		}

		let name =
			req.name.as_deref().map(|name| crate::trimmed_required(name, "name")).transpose()?;
		let project: Project = sqlx::query_as(
			"\
UPDATE projects
SET
	name = COALESCE($2, name),
	search_endpoint_id = COALESCE($3, search_endpoint_id),
	updated_at = $4
WHERE id = $1
RETURNING *",
		)
		.bind(project.id)
		.bind(name)
		.bind(req.search_endpoint_id)
		.bind(OffsetDateTime::now_utc())
		.fetch_one(&self.db.pool)
		.await?;

		Ok(project.into())
	}

	pub async fn delete_project(&self, user: &SessionUser, req: DeleteProjectRequest) -> Result<()> {
		let project = access::project(&self.db.pool, user.id, req.id).await?;
		let deleted = sqlx::query("DELETE FROM projects WHERE id = $1")
			.bind(project.id)
			.execute(&self.db.pool)
			.await?
			.rows_affected();

		if deleted == 0 {
			return Err(Error::not_found("project not found"));
		}

		tracing::info!(project_id = project.id, "Deleted project.");

		Ok(())
	}
}
