use serde::{Deserialize, Serialize};

/// Phrases shown per execution in the lab view.
pub const LAB_PHRASE_LIMIT: i64 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhraseSort {
	SearchPhraseAsc,
	#[default]
	SearchPhraseDesc,
	ScoreAsc,
	ScoreDesc,
	SearchResultsAsc,
	SearchResultsDesc,
}
impl PhraseSort {
	/// `ORDER BY` body for `search_phrase_executions`. Ties fall back to id for stable paging.
	pub fn order_by(self) -> &'static str {
		match self {
			Self::SearchPhraseAsc => "phrase ASC, id ASC",
			Self::SearchPhraseDesc => "phrase DESC, id DESC",
			Self::ScoreAsc => "combined_score ASC, id ASC",
			Self::ScoreDesc => "combined_score DESC, id DESC",
			Self::SearchResultsAsc => "total_results ASC, id ASC",
			Self::SearchResultsDesc => "total_results DESC, id DESC",
		}
	}
}
