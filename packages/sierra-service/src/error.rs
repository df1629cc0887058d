use sierra_domain::{judgement_csv::CsvImportError, votes::VoteError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Unauthorized: {message}")]
	Unauthorized { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Unsupported: {message}")]
	Unsupported { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Configuration error: {message}")]
	Config { message: String },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		let code =
			err.as_database_error().and_then(|db_err| db_err.code().map(|code| code.into_owned()));

		match code.as_deref() {
			Some("23505") => Self::Conflict { message: "Record already exists.".to_string() },
			Some("23503") => Self::Conflict {
				message: "Record is still referenced by another record.".to_string(),
			},
			_ => Self::Storage { message: err.to_string() },
		}
	}
}

impl From<sierra_storage::Error> for Error {
	fn from(err: sierra_storage::Error) -> Self {
		let sierra_storage::Error::Sqlx(inner) = err;

		inner.into()
	}
}

impl From<VoteError> for Error {
	fn from(err: VoteError) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<CsvImportError> for Error {
	fn from(err: CsvImportError) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<sierra_providers::Error> for Error {
	fn from(err: sierra_providers::Error) -> Self {
		match err {
			sierra_providers::Error::Unsupported { .. } => Self::Unsupported {
				message: "unsupported search endpoint type".to_string(),
			},
			other => Self::Provider { message: other.to_string() },
		}
	}
}
