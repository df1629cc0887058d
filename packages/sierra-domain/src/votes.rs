//! Turning a vote diff into the set of statements that apply it.
//!
//! A diff maps each search phrase to either `null` or a map of document id to nullable score:
//!
//! - `{ "phrase": { "doc_123": 4 } }` creates or updates a vote.
//! - `{ "phrase": { "doc_456": null } }` deletes one vote.
//! - `{ "phrase": {} }` ensures the phrase exists without adding a vote.
//! - `{ "phrase": null }` deletes the phrase and all of its votes.

use std::collections::BTreeMap;

/// Document id to score; `None` deletes the vote.
pub type PhraseVotes = BTreeMap<String, Option<f64>>;

/// Phrase to votes; `None` deletes the phrase.
pub type SetVotes = BTreeMap<String, Option<PhraseVotes>>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VoteError {
	#[error("Score for phrase {phrase:?} and document {document_id:?} must be finite.")]
	NonFiniteScore { phrase: String, document_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteUpsert {
	pub phrase: String,
	pub document_id: String,
	pub score: f64,
}

/// The statements for one diff, applied in field order inside a single transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VotePlan {
	/// Phrases removed together with all their votes.
	pub delete_phrases: Vec<String>,
	/// `(phrase, document_id)` pairs removed from surviving phrases.
	pub delete_votes: Vec<(String, String)>,
	/// Phrases that must exist afterwards. Existing rows are left alone.
	pub ensure_phrases: Vec<String>,
	/// Votes inserted or overwritten, keyed by `(phrase, document_id)`.
	pub upsert_votes: Vec<VoteUpsert>,
}
impl VotePlan {
	pub fn from_changes(changes: &SetVotes) -> Result<Self, VoteError> {
		let mut plan = Self::default();

		for (phrase, votes) in changes {
			let Some(votes) = votes else {
				plan.delete_phrases.push(phrase.clone());

				continue;
			};

			plan.ensure_phrases.push(phrase.clone());

			for (document_id, score) in votes {
				match score {
					Some(score) if !score.is_finite() =>
						return Err(VoteError::NonFiniteScore {
							phrase: phrase.clone(),
							document_id: document_id.clone(),
						}),
					Some(score) => plan.upsert_votes.push(VoteUpsert {
						phrase: phrase.clone(),
						document_id: document_id.clone(),
						score: *score,
					}),
					None => plan.delete_votes.push((phrase.clone(), document_id.clone())),
				}
			}
		}

		Ok(plan)
	}

	pub fn is_empty(&self) -> bool {
		self.delete_phrases.is_empty()
			&& self.delete_votes.is_empty()
			&& self.ensure_phrases.is_empty()
			&& self.upsert_votes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn changes(json: serde_json::Value) -> SetVotes {
		serde_json::from_value(json).expect("parse failed")
	}

	#[test]
	fn splits_diff_into_statements() {
		let plan = VotePlan::from_changes(&changes(serde_json::json!({
			"laptop": { "doc_1": 4, "doc_2": null },
			"tote bags": null,
			"suitcase": {}
		})))
		.expect("plan failed");

		assert_eq!(plan.delete_phrases, vec!["tote bags".to_string()]);
		assert_eq!(plan.delete_votes, vec![("laptop".to_string(), "doc_2".to_string())]);
		assert_eq!(plan.ensure_phrases, vec!["laptop".to_string(), "suitcase".to_string()]);
		assert_eq!(
			plan.upsert_votes,
			vec![VoteUpsert {
				phrase: "laptop".to_string(),
				document_id: "doc_1".to_string(),
				score: 4.0,
			}]
		);
	}

	#[test]
	fn empty_diff_is_empty_plan() {
		let plan = VotePlan::from_changes(&SetVotes::new()).expect("plan failed");

		assert!(plan.is_empty());
	}

	#[test]
	fn rejects_non_finite_scores() {
		let mut votes = PhraseVotes::new();

		votes.insert("doc".to_string(), Some(f64::INFINITY));

		let mut diff = SetVotes::new();

		diff.insert("phrase".to_string(), Some(votes));

		assert!(matches!(VotePlan::from_changes(&diff), Err(VoteError::NonFiniteScore { .. })));
	}
}
