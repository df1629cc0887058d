use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, Result, SierraService, access};
use sierra_storage::models::User;

/// The user behind a request, with the org every tenant-scoped operation acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
	pub id: i64,
	pub name: Option<String>,
	pub email: String,
	pub image: Option<String>,
	pub active_org_id: i64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSessionRequest {
	pub user_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedSession {
	pub token: String,
	pub user_id: i64,
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}

pub fn hash_token(token: &str) -> String {
	blake3::hash(token.as_bytes()).to_hex().to_string()
}

fn session_expiry(now: OffsetDateTime, ttl_days: i64) -> Result<OffsetDateTime> {
	ttl_days
		.checked_mul(Duration::DAY.whole_seconds())
		.map(Duration::seconds)
		.and_then(|ttl| now.checked_add(ttl))
		.ok_or_else(|| Error::Config {
			message: format!("security.session_ttl_days = {ttl_days} is out of range."),
		})
}

impl SierraService {
	pub async fn resolve_session(&self, token: &str) -> Result<SessionUser> {
		let token = token.trim();

		if token.is_empty() {
			return Err(Error::Unauthorized { message: "session token is missing".to_string() });
		}

		let user: User = sqlx::query_as(
			"\
SELECT u.*
FROM sessions s
JOIN users u ON u.id = s.user_id
WHERE s.token_hash = $1 AND s.expires_at > $2",
		)
		.bind(hash_token(token))
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::Unauthorized {
			message: "session is missing or expired".to_string(),
		})?;
		let active_org_id = self.ensure_active_org(&user).await?;

		Ok(SessionUser {
			id: user.id,
			name: user.name,
			email: user.email,
			image: user.image,
			active_org_id,
		})
	}

	pub async fn issue_session(&self, req: IssueSessionRequest) -> Result<IssuedSession> {
		let now = OffsetDateTime::now_utc();
		let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
			.bind(req.user_id)
			.fetch_optional(&self.db.pool)
			.await?;

		if exists.is_none() {
			return Err(Error::not_found("user not found"));
		}

		let expires_at = session_expiry(now, self.cfg.security.session_ttl_days)?;
		let token = Uuid::new_v4().simple().to_string();

		sqlx::query(
			"\
INSERT INTO sessions (token_hash, user_id, expires_at, created_at, updated_at)
VALUES ($1, $2, $3, $4, $4)",
		)
		.bind(hash_token(&token))
		.bind(req.user_id)
		.bind(expires_at)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		tracing::info!(user_id = req.user_id, "Issued session.");

		Ok(IssuedSession { token, user_id: req.user_id, expires_at })
	}

	/// Falls back to the user's first org when no accessible active org is recorded.
	async fn ensure_active_org(&self, user: &User) -> Result<i64> {
		if let Some(org_id) = user.active_org_id
			&& access::org_accessible(&self.db.pool, user.id, org_id).await?
		{
			return Ok(org_id);
		}

		let Some(org_id) = access::first_org_id(&self.db.pool, user.id).await? else {
			return Err(Error::Unauthorized { message: "user has no organizations".to_string() });
		};

		sqlx::query("UPDATE users SET active_org_id = $2, updated_at = $3 WHERE id = $1")
			.bind(user.id)
			.bind(org_id)
			.bind(OffsetDateTime::now_utc())
			.execute(&self.db.pool)
			.await?;

		Ok(org_id)
	}
}
