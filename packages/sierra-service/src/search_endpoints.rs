use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{Error, Result, SessionUser, SierraService, access};
use sierra_domain::{
	endpoint::{EndpointInfo, SearchEndpointType},
	query_template,
};
use sierra_storage::models::SearchEndpoint;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEndpointView {
	pub id: i64,
	pub org_id: i64,
	pub name: String,
	pub description: String,
	pub whitelist: Vec<String>,
	pub result_id: String,
	pub display_fields: Vec<String>,
	#[serde(rename = "type")]
	pub kind: String,
	pub info: Value,
}
impl From<SearchEndpoint> for SearchEndpointView {
	fn from(endpoint: SearchEndpoint) -> Self {
		Self {
			id: endpoint.id,
			org_id: endpoint.org_id,
			name: endpoint.name,
			description: endpoint.description,
			whitelist: endpoint.whitelist,
			result_id: endpoint.result_id,
			display_fields: endpoint.display_fields,
			kind: endpoint.r#type,
			info: endpoint.info,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSearchEndpointRequest {
	pub org_id: Option<i64>,
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub whitelist: Vec<String>,
	pub result_id: String,
	#[serde(default)]
	pub display_fields: Vec<String>,
	#[serde(rename = "type")]
	pub kind: SearchEndpointType,
	pub info: EndpointInfo,
}

/// Partial update. The endpoint type is fixed at creation; a `type` key is ignored.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSearchEndpointRequest {
	pub org_id: Option<i64>,
	pub name: Option<String>,
	pub description: Option<String>,
	pub whitelist: Option<Vec<String>>,
	pub result_id: Option<String>,
	pub display_fields: Option<Vec<String>>,
	pub info: Option<EndpointInfo>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySearchEndpointRequest {
	pub search_endpoint_id: i64,
	/// Query document, either as JSON text or inline JSON.
	pub query: Value,
}

impl SierraService {
	pub async fn list_search_endpoints(
		&self,
		user: &SessionUser,
	) -> Result<Vec<SearchEndpointView>> {
		let endpoints: Vec<SearchEndpoint> = sqlx::query_as(
			"\
SELECT se.*
FROM search_endpoints se
JOIN org_users ou ON ou.org_id = se.org_id
WHERE ou.user_id = $1
ORDER BY se.id ASC",
		)
		.bind(user.id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(endpoints.into_iter().map(SearchEndpointView::from).collect())
	}

	pub async fn get_search_endpoint(
		&self,
		user: &SessionUser,
		search_endpoint_id: i64,
	) -> Result<SearchEndpointView> {
		Ok(access::search_endpoint(&self.db.pool, user.id, search_endpoint_id).await?.into())
	}

	pub async fn create_search_endpoint(
		&self,
		user: &SessionUser,
		req: CreateSearchEndpointRequest,
	) -> Result<SearchEndpointView> {
		let org_id = req.org_id.unwrap_or(user.active_org_id);

		if !access::org_accessible(&self.db.pool, user.id, org_id).await? {
			return Err(Error::invalid("invalid org"));
		}

		let name = crate::trimmed_required(&req.name, "name")?;
		let result_id = crate::trimmed_required(&req.result_id, "resultId")?;

		req.info.validate().map_err(Error::invalid)?;

		let now = OffsetDateTime::now_utc();
		let endpoint: SearchEndpoint = sqlx::query_as(
			"\
INSERT INTO search_endpoints (
	org_id,
	name,
	description,
	whitelist,
	result_id,
	display_fields,
	type,
	info,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
RETURNING *",
		)
		.bind(org_id)
		.bind(name)
		.bind(req.description)
		.bind(&req.whitelist)
		.bind(result_id)
		.bind(&req.display_fields)
		.bind(req.kind.as_str())
		.bind(info_json(&req.info)?)
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		tracing::info!(
			search_endpoint_id = endpoint.id,
			org_id,
			kind = %req.kind,
			"Created search endpoint."
		);

		Ok(endpoint.into())
	}

	pub async fn update_search_endpoint(
		&self,
		user: &SessionUser,
		search_endpoint_id: i64,
		req: UpdateSearchEndpointRequest,
	) -> Result<SearchEndpointView> {
		access::search_endpoint(&self.db.pool, user.id, search_endpoint_id).await?;

		if let Some(org_id) = req.org_id
			&& !access::org_accessible(&self.db.pool, user.id, org_id).await?
		{
			return Err(Error::invalid("invalid org"));
		}

		let name =
			req.name.as_deref().map(|name| crate::trimmed_required(name, "name")).transpose()?;
		let result_id = req
			.result_id
			.as_deref()
			.map(|result_id| crate::trimmed_required(result_id, "resultId"))
			.transpose()?;
		let info = match &req.info {
			Some(info) => {
				info.validate().map_err(Error::invalid)?;

				Some(info_json(info)?)
			},
			None => None,
		};
		let endpoint: SearchEndpoint = sqlx::query_as(
			"\
UPDATE search_endpoints
SET
	org_id = COALESCE($2, org_id),
	name = COALESCE($3, name),
	description = COALESCE($4, description),
	whitelist = COALESCE($5, whitelist),
	result_id = COALESCE($6, result_id),
	display_fields = COALESCE($7, display_fields),
	info = COALESCE($8, info),
	updated_at = $9
WHERE id = $1
RETURNING *",
		)
		.bind(search_endpoint_id)
		.bind(req.org_id)
		.bind(name)
		.bind(req.description)
		.bind(req.whitelist)
		.bind(result_id)
		.bind(req.display_fields)
		.bind(info)
		.bind(OffsetDateTime::now_utc())
		.fetch_one(&self.db.pool)
		.await?;

		Ok(endpoint.into())
	}

	pub async fn delete_search_endpoint(
		&self,
		user: &SessionUser,
		search_endpoint_id: i64,
	) -> Result<()> {
		let mut tx = self.db.pool.begin().await?;
		let endpoint = access::search_endpoint(&mut *tx, user.id, search_endpoint_id).await?;
		let projects: i64 =
			sqlx::query_scalar("SELECT count(*) FROM projects WHERE search_endpoint_id = $1")
				.bind(endpoint.id)
				.fetch_one(&mut *tx)
				.await?;

		if projects > 0 {
			return Err(Error::Conflict {
				message: "search endpoint is still used by a project".to_string(),
			});
		}

		sqlx::query("DELETE FROM search_endpoints WHERE id = $1")
			.bind(endpoint.id)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		tracing::info!(search_endpoint_id = endpoint.id, "Deleted search endpoint.");

		Ok(())
	}

	pub async fn query_search_endpoint(
		&self,
		user: &SessionUser,
		req: QuerySearchEndpointRequest,
	) -> Result<Value> {
		let endpoint =
			access::search_endpoint(&self.db.pool, user.id, req.search_endpoint_id).await?;
		let query = match req.query {
			Value::String(text) => {
				query_template::parse_query(&text).map_err(Error::invalid)?;

				text
			},
			Value::Object(map) => Value::Object(map).to_string(),
			_ => return Err(Error::invalid("query must be a JSON object.")),
		};

		self.execute_on_endpoint(&endpoint, &query).await
	}

	/// Runs a query document against a stored endpoint through the search backend provider.
	pub(crate) async fn execute_on_endpoint(
		&self,
		endpoint: &SearchEndpoint,
		query: &str,
	) -> Result<Value> {
		let kind: SearchEndpointType = endpoint.r#type.parse().map_err(|message| {
			Error::Storage { message: format!("Stored search endpoint type is invalid: {message}") }
		})?;
		let info: EndpointInfo = serde_json::from_value(endpoint.info.clone()).map_err(|err| {
			Error::Storage { message: format!("Stored search endpoint info is invalid: {err}.") }
		})?;

		self.providers
			.search
			.execute(&self.cfg.providers.search, kind, &info, query)
			.await
			.map_err(|err| {
				tracing::warn!(
					search_endpoint_id = endpoint.id,
					error = %err,
					"Search endpoint query failed."
				);

				Error::from(err)
			})
	}
}

fn info_json(info: &EndpointInfo) -> Result<Value> {
	serde_json::to_value(info)
		.map_err(|err| Error::invalid(format!("info could not be encoded: {err}.")))
}
