use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgExecutor;

use crate::{Result, SessionUser, SierraService, access};
use sierra_domain::lab::{LAB_PHRASE_LIMIT, PhraseSort};
use sierra_storage::models::{Execution, SearchConfiguration, SearchPhraseExecution};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfigurationView {
	pub id: i64,
	pub query_template_id: i64,
}
impl From<SearchConfiguration> for SearchConfigurationView {
	fn from(configuration: SearchConfiguration) -> Self {
		Self { id: configuration.id, query_template_id: configuration.query_template_id }
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionView {
	pub id: i64,
	pub search_configuration_id: i64,
	pub meta: Value,
	pub combined_score: f64,
	pub all_scores: Value,
}
impl From<Execution> for ExecutionView {
	fn from(execution: Execution) -> Self {
		Self {
			id: execution.id,
			search_configuration_id: execution.search_configuration_id,
			meta: execution.meta,
			combined_score: execution.combined_score,
			all_scores: execution.all_scores,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPhraseView {
	pub id: i64,
	pub execution_id: i64,
	pub phrase: String,
	pub combined_score: f64,
	pub all_scores: Value,
	pub total_results: i32,
}
impl From<SearchPhraseExecution> for SearchPhraseView {
	fn from(phrase: SearchPhraseExecution) -> Self {
		Self {
			id: phrase.id,
			execution_id: phrase.execution_id,
			phrase: phrase.phrase,
			combined_score: phrase.combined_score,
			all_scores: phrase.all_scores,
			total_results: phrase.total_results,
		}
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabView {
	pub search_configuration: Option<SearchConfigurationView>,
	pub execution: Option<ExecutionView>,
	pub phrases: Vec<SearchPhraseView>,
}

impl SierraService {
	/// The latest run of the project's active search configuration.
	pub async fn lab(
		&self,
		user: &SessionUser,
		project_id: i64,
		sort: PhraseSort,
	) -> Result<LabView> {
		let project = access::project(&self.db.pool, user.id, project_id).await?;
		let Some(configuration) =
			active_search_configuration(&self.db.pool, project.id).await?
		else {
			return Ok(LabView::default());
		};
		let Some(execution) = latest_execution(&self.db.pool, configuration.id).await? else {
			return Ok(LabView {
				search_configuration: Some(configuration.into()),
				..LabView::default()
			});
		};
		let phrases = search_phrases(&self.db.pool, execution.id, sort).await?;

		Ok(LabView {
			search_configuration: Some(configuration.into()),
			execution: Some(execution.into()),
			phrases: phrases.into_iter().map(SearchPhraseView::from).collect(),
		})
	}
}

pub(crate) async fn active_search_configuration<'e, E>(
	executor: E,
	project_id: i64,
) -> Result<Option<SearchConfiguration>>
where
	E: PgExecutor<'e>,
{
	let configuration = sqlx::query_as(
		"\
SELECT sc.*
FROM search_configurations sc
JOIN query_templates qt ON qt.id = sc.query_template_id
WHERE qt.project_id = $1
ORDER BY sc.updated_at DESC, sc.id DESC
LIMIT 1",
	)
	.bind(project_id)
	.fetch_optional(executor)
	.await?;

	Ok(configuration)
}

pub(crate) async fn latest_execution<'e, E>(
	executor: E,
	search_configuration_id: i64,
) -> Result<Option<Execution>>
where
	E: PgExecutor<'e>,
{
	let execution = sqlx::query_as(
		"\
SELECT *
FROM executions
WHERE search_configuration_id = $1
ORDER BY created_at DESC, id DESC
LIMIT 1",
	)
	.bind(search_configuration_id)
	.fetch_optional(executor)
	.await?;

	Ok(execution)
}

pub(crate) async fn search_phrases<'e, E>(
	executor: E,
	execution_id: i64,
	sort: PhraseSort,
) -> Result<Vec<SearchPhraseExecution>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT * FROM search_phrase_executions WHERE execution_id = $1 ORDER BY {} LIMIT $2",
		sort.order_by()
	);
	let phrases = sqlx::query_as(&sql)
		.bind(execution_id)
		.bind(LAB_PHRASE_LIMIT)
		.fetch_all(executor)
		.await?;

	Ok(phrases)
}
