use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Result, SessionUser, SierraService, access};
use sierra_domain::{
	judgement_csv,
	votes::{SetVotes, VotePlan},
};
use sierra_storage::{
	models::{Judgement, JudgementPhrase, Vote},
	votes::{self, AppliedVotes},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgementView {
	pub id: i64,
	pub project_id: i64,
	pub name: String,
}
impl From<Judgement> for JudgementView {
	fn from(judgement: Judgement) -> Self {
		Self { id: judgement.id, project_id: judgement.project_id, name: judgement.name }
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JudgementSummary {
	pub id: i64,
	pub name: String,
	pub total_search_phrases: i64,
	pub total_votes: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseView {
	pub id: i64,
	pub judgement_id: i64,
	pub phrase: String,
}
impl From<JudgementPhrase> for PhraseView {
	fn from(phrase: JudgementPhrase) -> Self {
		Self { id: phrase.id, judgement_id: phrase.judgement_id, phrase: phrase.phrase }
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
	pub id: i64,
	pub judgement_phrase_id: i64,
	pub document_id: String,
	pub score: f64,
}
impl From<Vote> for VoteView {
	fn from(vote: Vote) -> Self {
		Self {
			id: vote.id,
			judgement_phrase_id: vote.judgement_phrase_id,
			document_id: vote.document_id,
			score: vote.score,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJudgementRequest {
	pub project_id: i64,
	pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateJudgementRequest {
	pub id: i64,
	pub name: Option<String>,
}

/// Vote diff for one judgement: phrase to `null` (drop the phrase) or to document scores, where a
/// `null` score drops that vote.
#[derive(Clone, Debug, Deserialize)]
pub struct SetVotesRequest {
	pub id: i64,
	pub votes: SetVotes,
}

#[derive(Clone, Debug)]
pub struct ImportJudgementRequest {
	pub project_id: i64,
	pub name: String,
	pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportedJudgement {
	pub success: bool,
	pub id: i64,
}

impl SierraService {
	pub async fn create_judgement(
		&self,
		user: &SessionUser,
		req: CreateJudgementRequest,
	) -> Result<JudgementView> {
		let project = access::project(&self.db.pool, user.id, req.project_id).await?;
		let name = crate::trimmed_required(&req.name, "name")?;
		let judgement = insert_judgement(&self.db.pool, project.id, &name).await?;

		tracing::info!(judgement_id = judgement.id, project_id = project.id, "Created judgement.");

		Ok(judgement.into())
	}

	pub async fn update_judgement(
		&self,
		user: &SessionUser,
		req: UpdateJudgementRequest,
	) -> Result<JudgementView> {
		let judgement = access::judgement(&self.db.pool, user.id, req.id).await?;
		let name =
			req.name.as_deref().map(|name| crate::trimmed_required(name, "name")).transpose()?;
		let judgement: Judgement = sqlx::query_as(
			"\
UPDATE judgements
SET name = COALESCE($2, name), updated_at = $3
WHERE id = $1
RETURNING *",
		)
		.bind(judgement.id)
		.bind(name)
		.bind(OffsetDateTime::now_utc())
		.fetch_one(&self.db.pool)
		.await?;

		Ok(judgement.into())
	}

	pub async fn get_judgement(
		&self,
		user: &SessionUser,
		judgement_id: i64,
	) -> Result<JudgementView> {
		Ok(access::judgement(&self.db.pool, user.id, judgement_id).await?.into())
	}

	/// Judgements of a project with their distinct phrase and vote counts.
	pub async fn list_judgements_extended(
		&self,
		user: &SessionUser,
		project_id: i64,
	) -> Result<Vec<JudgementSummary>> {
		let project = access::project(&self.db.pool, user.id, project_id).await?;
		let summaries = sqlx::query_as(
			"\
SELECT
	j.id,
	j.name,
	count(DISTINCT jp.id) AS total_search_phrases,
	count(DISTINCT v.id) AS total_votes
FROM judgements j
LEFT JOIN judgement_phrases jp ON jp.judgement_id = j.id
LEFT JOIN votes v ON v.judgement_phrase_id = jp.id
WHERE j.project_id = $1
GROUP BY j.id, j.name, j.updated_at
ORDER BY j.updated_at DESC, j.id DESC",
		)
		.bind(project.id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(summaries)
	}

	pub async fn list_phrases(
		&self,
		user: &SessionUser,
		judgement_id: i64,
	) -> Result<Vec<PhraseView>> {
		let judgement = access::judgement(&self.db.pool, user.id, judgement_id).await?;
		let phrases: Vec<JudgementPhrase> = sqlx::query_as(
			"SELECT * FROM judgement_phrases WHERE judgement_id = $1 ORDER BY phrase ASC, id ASC",
		)
		.bind(judgement.id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(phrases.into_iter().map(PhraseView::from).collect())
	}

	pub async fn list_votes(
		&self,
		user: &SessionUser,
		judgement_id: i64,
		phrase: &str,
	) -> Result<Vec<VoteView>> {
		let judgement = access::judgement(&self.db.pool, user.id, judgement_id).await?;
		let votes: Vec<Vote> = sqlx::query_as(
			"\
SELECT v.*
FROM votes v
JOIN judgement_phrases jp ON jp.id = v.judgement_phrase_id
WHERE jp.judgement_id = $1 AND jp.phrase = $2
ORDER BY v.score DESC, v.document_id ASC",
		)
		.bind(judgement.id)
		.bind(phrase)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(votes.into_iter().map(VoteView::from).collect())
	}

	/// Applies a vote diff to one judgement in a single transaction.
	pub async fn set_votes(&self, user: &SessionUser, req: SetVotesRequest) -> Result<AppliedVotes> {
		let plan = VotePlan::from_changes(&req.votes)?;
		let mut tx = self.db.pool.begin().await?;
		let judgement = access::judgement(&mut *tx, user.id, req.id).await?;
		let applied =
			votes::apply_vote_plan(&mut tx, judgement.id, &plan, OffsetDateTime::now_utc()).await?;

		tx.commit().await?;

		tracing::info!(
			judgement_id = judgement.id,
			phrases_deleted = applied.phrases_deleted,
			votes_deleted = applied.votes_deleted,
			phrases_created = applied.phrases_created,
			votes_upserted = applied.votes_upserted,
			"Applied vote diff."
		);

		Ok(applied)
	}

	/// Creates a judgement from an uploaded CSV file.
	pub async fn import_judgement(
		&self,
		user: &SessionUser,
		req: ImportJudgementRequest,
	) -> Result<ImportedJudgement> {
		let name = crate::trimmed_required(&req.name, "name")?;
		let diff = judgement_csv::parse(&req.content)?;
		let plan = VotePlan::from_changes(&diff)?;
		let mut tx = self.db.pool.begin().await?;
		let project = access::project(&mut *tx, user.id, req.project_id).await?;
		let judgement = insert_judgement(&mut *tx, project.id, &name).await?;
		let applied =
			votes::apply_vote_plan(&mut tx, judgement.id, &plan, OffsetDateTime::now_utc()).await?;

		tx.commit().await?;

		tracing::info!(
			judgement_id = judgement.id,
			project_id = project.id,
			phrases = applied.phrases_created,
			votes = applied.votes_upserted,
			"Imported judgement."
		);

		Ok(ImportedJudgement { success: true, id: judgement.id })
	}
}

async fn insert_judgement<'e, E>(executor: E, project_id: i64, name: &str) -> Result<Judgement>
where
	E: sqlx::PgExecutor<'e>,
{
	let judgement = sqlx::query_as(
		"\
INSERT INTO judgements (project_id, name, created_at, updated_at)
VALUES ($1, $2, $3, $3)
RETURNING *",
	)
	.bind(project_id)
	.bind(name)
	.bind(OffsetDateTime::now_utc())
	.fetch_one(executor)
	.await?;

	Ok(judgement)
}
