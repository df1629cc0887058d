//! Throwaway PostgreSQL databases for Sierra's integration tests.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

/// Names a database the tests may connect to in order to create and drop their own.
pub const DSN_ENV: &str = "SIERRA_PG_DSN";

/// A fresh database on the server behind [`DSN_ENV`], dropped on cleanup or drop.
pub struct TestDatabase {
	name: String,
	dsn: String,
	server: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	/// `None` when [`DSN_ENV`] is unset, so tests can skip instead of failing.
	pub async fn from_env() -> Result<Option<Self>> {
		match env::var(DSN_ENV) {
			Ok(server_dsn) => Self::new(&server_dsn).await.map(Some),
			Err(_) => Ok(None),
		}
	}

	pub async fn new(server_dsn: &str) -> Result<Self> {
		let server = PgConnectOptions::from_str(server_dsn)
			.map_err(|err| Error::InvalidDsn { message: err.to_string() })?;
		let name = format!("sierra_test_{}", Uuid::new_v4().simple());
		let mut conn = PgConnection::connect_with(&server).await?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;
		conn.close().await?;

		let dsn = server.clone().database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, server, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.server, &self.name).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	// Failed assertions skip `cleanup`. The drop runs on its own runtime because the test's
	// runtime may be single-threaded and is mid-unwind.
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let server = self.server.clone();
		let name = std::mem::take(&mut self.name);
		let worker = thread::spawn(move || {
			let dropped = Builder::new_current_thread()
				.enable_all()
				.build()
				.map_err(Error::from)
				.and_then(|runtime| runtime.block_on(drop_database(&server, &name)));

			if let Err(err) = dropped {
				eprintln!("Failed to drop test database {name}: {err}.");
			}
		});
		let _ = worker.join();
	}
}

/// `WITH (FORCE)` also disconnects pools the test forgot to close.
async fn drop_database(server: &PgConnectOptions, name: &str) -> Result<()> {
	let mut conn = PgConnection::connect_with(server).await?;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}" WITH (FORCE)"#).as_str()).await?;
	conn.close().await?;

	Ok(())
}
