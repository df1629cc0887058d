use serde::{Deserialize, Serialize};

use crate::{Error, Result, SessionUser, SierraService};
use sierra_storage::models::Org;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgView {
	pub id: i64,
	pub name: String,
	pub image: Option<String>,
}
impl From<Org> for OrgView {
	fn from(org: Org) -> Self {
		Self { id: org.id, name: org.name, image: org.image }
	}
}

impl SierraService {
	pub async fn list_orgs(&self, user: &SessionUser) -> Result<Vec<OrgView>> {
		let orgs: Vec<Org> = sqlx::query_as(
			"\
SELECT o.*
FROM orgs o
JOIN org_users ou ON ou.org_id = o.id
WHERE ou.user_id = $1
ORDER BY o.id ASC",
		)
		.bind(user.id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(orgs.into_iter().map(OrgView::from).collect())
	}

	pub async fn get_org(&self, user: &SessionUser, org_id: i64) -> Result<OrgView> {
		let org: Org = sqlx::query_as(
			"\
SELECT o.*
FROM orgs o
JOIN org_users ou ON ou.org_id = o.id
WHERE o.id = $1 AND ou.user_id = $2",
		)
		.bind(org_id)
		.bind(user.id)
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("org not found"))?;

		Ok(org.into())
	}

	/// The active org when it is still accessible, otherwise any org the user belongs to.
	pub async fn get_active_org(&self, user: &SessionUser) -> Result<OrgView> {
		match self.get_org(user, user.active_org_id).await {
			Err(Error::NotFound { .. }) => self
				.list_orgs(user)
				.await?
				.into_iter()
				.next()
				.ok_or_else(|| Error::not_found("org not found")),
			other => other,
		}
	}
}
