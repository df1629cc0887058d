use sqlx::PgConnection;
use time::OffsetDateTime;

use crate::Result;
use sierra_domain::votes::VotePlan;

/// Row counts touched by one vote plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedVotes {
	pub phrases_deleted: u64,
	pub votes_deleted: u64,
	pub phrases_created: u64,
	pub votes_upserted: u64,
}

/// Applies a vote plan to one judgement. Callers run this inside a transaction so the whole diff
/// lands atomically.
pub async fn apply_vote_plan(
	conn: &mut PgConnection,
	judgement_id: i64,
	plan: &VotePlan,
	now: OffsetDateTime,
) -> Result<AppliedVotes> {
	let mut applied = AppliedVotes::default();

	if !plan.delete_phrases.is_empty() {
		applied.votes_deleted += sqlx::query(
			"\
DELETE FROM votes v
USING judgement_phrases jp
WHERE v.judgement_phrase_id = jp.id
	AND jp.judgement_id = $1
	AND jp.phrase = ANY($2)",
		)
		.bind(judgement_id)
		.bind(&plan.delete_phrases)
		.execute(&mut *conn)
		.await?
		.rows_affected();
		applied.phrases_deleted += sqlx::query(
			"DELETE FROM judgement_phrases WHERE judgement_id = $1 AND phrase = ANY($2)",
		)
		.bind(judgement_id)
		.bind(&plan.delete_phrases)
		.execute(&mut *conn)
		.await?
		.rows_affected();
	}

	if !plan.delete_votes.is_empty() {
		let (phrases, document_ids): (Vec<String>, Vec<String>) =
			plan.delete_votes.iter().cloned().unzip();

		applied.votes_deleted += sqlx::query(
			"\
DELETE FROM votes v
USING judgement_phrases jp, UNNEST($2::text[], $3::text[]) AS doomed (phrase, document_id)
WHERE v.judgement_phrase_id = jp.id
	AND jp.judgement_id = $1
	AND jp.phrase = doomed.phrase
	AND v.document_id = doomed.document_id",
		)
		.bind(judgement_id)
		.bind(&phrases)
		.bind(&document_ids)
		.execute(&mut *conn)
		.await?
		.rows_affected();
	}

	if !plan.ensure_phrases.is_empty() {
		applied.phrases_created += sqlx::query(
			"\
INSERT INTO judgement_phrases (judgement_id, phrase, created_at, updated_at)
SELECT $1, phrase, $3, $3
FROM UNNEST($2::text[]) AS inputs (phrase)
ON CONFLICT (judgement_id, phrase) DO NOTHING",
		)
		.bind(judgement_id)
		.bind(&plan.ensure_phrases)
		.bind(now)
		.execute(&mut *conn)
		.await?
		.rows_affected();
	}

	if !plan.upsert_votes.is_empty() {
		let mut phrases = Vec::with_capacity(plan.upsert_votes.len());
		let mut document_ids = Vec::with_capacity(plan.upsert_votes.len());
		let mut scores = Vec::with_capacity(plan.upsert_votes.len());

		for vote in &plan.upsert_votes {
			phrases.push(vote.phrase.clone());
			document_ids.push(vote.document_id.clone());
			scores.push(vote.score);
		}

		applied.votes_upserted += sqlx::query(
			"\
INSERT INTO votes (judgement_phrase_id, document_id, score, created_at, updated_at)
SELECT jp.id, inputs.document_id, inputs.score, $5, $5
FROM UNNEST($2::text[], $3::text[], $4::float8[]) AS inputs (phrase, document_id, score)
INNER JOIN judgement_phrases jp ON jp.phrase = inputs.phrase AND jp.judgement_id = $1
ON CONFLICT (judgement_phrase_id, document_id)
DO UPDATE SET score = EXCLUDED.score, updated_at = EXCLUDED.updated_at",
		)
		.bind(judgement_id)
		.bind(&phrases)
		.bind(&document_ids)
		.bind(&scores)
		.bind(now)
		.execute(&mut *conn)
		.await?
		.rows_affected();
	}

	if !plan.is_empty() {
		sqlx::query("UPDATE judgements SET updated_at = $2 WHERE id = $1")
			.bind(judgement_id)
			.bind(now)
			.execute(&mut *conn)
			.await?;
	}

	Ok(applied)
}
