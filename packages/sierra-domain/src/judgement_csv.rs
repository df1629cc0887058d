//! Judgement import from CSV files with `query`, `docid` and `rating` columns.

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::votes::{PhraseVotes, SetVotes};

#[derive(Debug, thiserror::Error)]
pub enum CsvImportError {
	#[error("Invalid CSV format: {0}")]
	Csv(#[from] csv::Error),
	#[error("Invalid CSV format: row {row} has no query.")]
	MissingQuery { row: usize },
}

/// Parses an uploaded judgement file into a vote diff.
///
/// Rows without a `docid` only register the phrase. Later rows win over earlier rows for the
/// same `(query, docid)` pair.
pub fn parse(content: &str) -> Result<SetVotes, CsvImportError> {
	let mut reader = ReaderBuilder::new()
		.has_headers(true)
		.flexible(true)
		.trim(Trim::All)
		.from_reader(content.as_bytes());
	let headers = reader.headers()?.clone();
	let query_col = column(&headers, "query");
	let docid_col = column(&headers, "docid");
	let rating_col = column(&headers, "rating");
	let mut actions = SetVotes::new();

	for (index, record) in reader.records().enumerate() {
		let record = record?;

		if record.iter().all(str::is_empty) {
			continue;
		}

		let query = cell(&record, query_col);

		if query.is_empty() {
			return Err(CsvImportError::MissingQuery { row: index + 1 });
		}

		let votes = actions
			.entry(query.to_string())
			.or_insert_with(|| Some(PhraseVotes::new()))
			.get_or_insert_with(PhraseVotes::new);
		let docid = cell(&record, docid_col);

		if !docid.is_empty() {
			votes.insert(docid.to_string(), Some(parse_rating(cell(&record, rating_col))));
		}
	}

	Ok(actions)
}

/// Reads the leading integer of a rating cell. Anything else counts as zero.
pub fn parse_rating(raw: &str) -> f64 {
	let raw = raw.trim();
	let (sign, digits) = match raw.as_bytes().first() {
		Some(b'-') => (-1.0, &raw[1..]),
		Some(b'+') => (1.0, &raw[1..]),
		_ => (1.0, raw),
	};
	let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());

	match digits[..end].parse::<f64>() {
		Ok(value) => sign * value,
		Err(_) => 0.0,
	}
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
	headers.iter().position(|header| header == name)
}

fn cell(record: &StringRecord, column: Option<usize>) -> &str {
	column.and_then(|index| record.get(index)).unwrap_or("")
}
