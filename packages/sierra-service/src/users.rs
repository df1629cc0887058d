use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, OrgView, ProjectView, Result, SessionUser, SierraService, access};
use sierra_domain::registration;
use sierra_storage::models::{Org, Project, User};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
	pub id: i64,
	pub name: Option<String>,
	pub email: String,
	pub image: Option<String>,
	pub active_org_id: Option<i64>,
}
impl From<User> for UserView {
	fn from(user: User) -> Self {
		Self {
			id: user.id,
			name: user.name,
			email: user.email,
			image: user.image,
			active_org_id: user.active_org_id,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
	pub name: Option<String>,
	pub email: String,
	#[serde(default)]
	pub email_verified: bool,
	pub image: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisteredUser {
	pub user: UserView,
	pub org: OrgView,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeResponse {
	pub user: UserView,
	pub orgs: Vec<OrgView>,
	pub projects: Vec<ProjectView>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveOrgRequest {
	pub active_org_id: i64,
}

impl SierraService {
	/// Creates a user together with a personal org they administer.
	pub async fn register_user(&self, req: RegisterUserRequest) -> Result<RegisteredUser> {
		let email = crate::trimmed_required(&req.email, "email")?;

		if !registration::email_allowed(
			&email,
			req.email_verified,
			&self.cfg.security.allow_registration_from,
		) {
			tracing::warn!(email = %email, "Rejected registration outside allowed domains.");

			return Err(Error::invalid("email is not allowed to register"));
		}

		let now = OffsetDateTime::now_utc();
		let name = req.name.map(|name| name.trim().to_string()).filter(|name| !name.is_empty());
		let mut tx = self.db.pool.begin().await?;
		let user_id: i64 = sqlx::query_scalar(
			"\
INSERT INTO users (name, email, email_verified, image, created_at, updated_at)
VALUES ($1, $2, $3, $4, $3, $3)
RETURNING id",
		)
		.bind(name.as_deref())
		.bind(&email)
		.bind(now)
		.bind(req.image.as_deref())
		.fetch_one(&mut *tx)
		.await?;
		let org: Org = sqlx::query_as(
			"INSERT INTO orgs (name, created_at, updated_at) VALUES ($1, $2, $2) RETURNING *",
		)
		.bind(registration::personal_org_name(name.as_deref(), &email))
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;

		sqlx::query(
			"\
INSERT INTO org_users (user_id, org_id, role, created_at, updated_at)
VALUES ($1, $2, 'ADMIN', $3, $3)",
		)
		.bind(user_id)
		.bind(org.id)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		let user: User =
			sqlx::query_as("UPDATE users SET active_org_id = $2 WHERE id = $1 RETURNING *")
				.bind(user_id)
				.bind(org.id)
				.fetch_one(&mut *tx)
				.await?;

		tx.commit().await?;

		tracing::info!(user_id, org_id = org.id, "Registered user.");

		Ok(RegisteredUser { user: user.into(), org: org.into() })
	}

	pub async fn me(&self, user: &SessionUser) -> Result<MeResponse> {
		let row: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
			.bind(user.id)
			.fetch_optional(&self.db.pool)
			.await?
			.ok_or_else(|| Error::Unauthorized { message: "user no longer exists".to_string() })?;
		let orgs = self.list_orgs(user).await?;
		let projects: Vec<Project> =
			sqlx::query_as("SELECT * FROM projects WHERE org_id = $1 ORDER BY id ASC")
				.bind(user.active_org_id)
				.fetch_all(&self.db.pool)
				.await?;
		let mut view = UserView::from(row);

		view.active_org_id = Some(user.active_org_id);

		Ok(MeResponse {
			user: view,
			orgs,
			projects: projects.into_iter().map(ProjectView::from).collect(),
		})
	}

	pub async fn set_active_org(
		&self,
		user: &SessionUser,
		req: SetActiveOrgRequest,
	) -> Result<MeResponse> {
		if !access::org_accessible(&self.db.pool, user.id, req.active_org_id).await? {
			return Err(Error::not_found("org not found"));
		}

		sqlx::query("UPDATE users SET active_org_id = $2, updated_at = $3 WHERE id = $1")
			.bind(user.id)
			.bind(req.active_org_id)
			.bind(OffsetDateTime::now_utc())
			.execute(&self.db.pool)
			.await?;

		let user = SessionUser { active_org_id: req.active_org_id, ..user.clone() };

		self.me(&user).await
	}
}
