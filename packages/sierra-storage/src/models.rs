use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Org {
	pub id: i64,
	pub name: String,
	pub image: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
	pub id: i64,
	pub name: Option<String>,
	pub email: String,
	pub email_verified: Option<OffsetDateTime>,
	pub image: Option<String>,
	pub site_role: String,
	pub active_org_id: Option<i64>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrgUser {
	pub id: i64,
	pub user_id: i64,
	pub org_id: i64,
	pub role: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
	pub id: i64,
	pub token_hash: String,
	pub user_id: i64,
	pub expires_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchEndpoint {
	pub id: i64,
	pub org_id: i64,
	pub name: String,
	pub description: String,
	pub whitelist: Vec<String>,
	pub result_id: String,
	pub display_fields: Vec<String>,
	pub r#type: String,
	pub info: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
	pub id: i64,
	pub org_id: i64,
	pub search_endpoint_id: i64,
	pub name: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Ruleset {
	pub id: i64,
	pub project_id: i64,
	pub name: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RulesetVersion {
	pub id: i64,
	pub ruleset_id: i64,
	pub parent_id: Option<i64>,
	pub value: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueryTemplate {
	pub id: i64,
	pub project_id: i64,
	pub parent_id: Option<i64>,
	pub description: String,
	pub tag: String,
	pub query: String,
	pub knobs: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Judgement {
	pub id: i64,
	pub project_id: i64,
	pub name: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JudgementPhrase {
	pub id: i64,
	pub judgement_id: i64,
	pub phrase: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Vote {
	pub id: i64,
	pub judgement_phrase_id: i64,
	pub document_id: String,
	pub score: f64,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchConfiguration {
	pub id: i64,
	pub query_template_id: i64,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Execution {
	pub id: i64,
	pub search_configuration_id: i64,
	pub meta: Value,
	pub combined_score: f64,
	pub all_scores: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchPhraseExecution {
	pub id: i64,
	pub execution_id: i64,
	pub phrase: String,
	pub total_results: i32,
	pub results: Value,
	pub explanation: Value,
	pub combined_score: f64,
	pub all_scores: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
