pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid {dsn_env}: {message}", dsn_env = crate::DSN_ENV)]
	InvalidDsn { message: String },
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
}
