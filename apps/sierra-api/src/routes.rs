use axum::{
	Json, Router,
	extract::{
		FromRequest, FromRequestParts, Multipart, Path, Query, Request, State,
		multipart::MultipartRejection,
	},
	http::{StatusCode, request::Parts},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{auth::CurrentUser, state::AppState};
use sierra_domain::lab::PhraseSort;
use sierra_service::{
	CreateJudgementRequest, CreateProjectRequest, CreateQueryTemplateRequest,
	CreateRulesetRequest, CreateRulesetVersionRequest, CreateSearchEndpointRequest,
	DeleteProjectRequest, Error, ImportJudgementRequest, ImportedJudgement, IssueSessionRequest,
	IssuedSession, LabView, MeResponse, QuerySearchEndpointRequest, RegisterUserRequest,
	RegisteredUser, RulesetDetail, SeedReport, SetActiveOrgRequest, SetVotesRequest,
	TestbedRequest, TestbedResponse, UpdateJudgementRequest, UpdateProjectRequest,
	UpdateQueryTemplateRequest, UpdateSearchEndpointRequest,
};

pub fn router(state: AppState) -> Router {
	let mut router = Router::new()
		.route("/health", get(health))
		.route("/api/users/me", get(me).patch(set_active_org))
		.route("/api/orgs", get(list_orgs))
		.route("/api/orgs/active", get(get_active_org))
		.route("/api/orgs/{id}", get(get_org))
		.route("/api/projects", get(list_projects))
		.route("/api/projects/create", post(create_project))
		.route("/api/projects/update", post(update_project))
		.route("/api/projects/delete", post(delete_project))
		.route("/api/projects/{id}", get(get_project))
		.route("/api/searchendpoints", get(list_search_endpoints).post(create_search_endpoint))
		.route("/api/searchendpoints/query", post(query_search_endpoint))
		.route(
			"/api/searchendpoints/{id}",
			get(get_search_endpoint).patch(update_search_endpoint).delete(delete_search_endpoint),
		)
		.route("/api/rulesets", get(list_rulesets))
		.route("/api/rulesets/create", post(create_ruleset))
		.route("/api/rulesets/createVersion", post(create_ruleset_version))
		.route("/api/rulesets/{id}", get(get_ruleset))
		.route("/api/querytemplates", get(list_query_templates))
		.route("/api/querytemplates/create", post(create_query_template))
		.route("/api/querytemplates/update", post(update_query_template))
		.route("/api/judgements", get(list_judgements))
		.route("/api/judgements/create", post(create_judgement))
		.route("/api/judgements/update", post(update_judgement))
		.route("/api/judgements/setVotes", post(set_votes))
		.route("/api/judgements/import", post(import_judgement))
		.route("/api/judgements/{id}", get(get_judgement))
		.route("/api/judgements/{id}/phrases", get(list_phrases))
		.route("/api/judgements/{id}/votes", get(list_votes))
		.route("/api/lab", get(lab))
		.route("/api/testbed/query", post(testbed_query));

	if state.service.cfg.service.enable_dev_routes {
		router = router.route("/api/dev/seed", post(seed_dev_data));
	}

	router
		.fallback(not_found)
		.method_not_allowed_fallback(method_not_allowed)
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/users", post(register_user))
		.route("/v1/admin/sessions", post(issue_session))
		.fallback(not_found)
		.method_not_allowed_fallback(method_not_allowed)
		.with_state(state)
}

/// JSON body extractor that answers malformed input with the API error body.
pub struct ApiJson<T>(pub T);
impl<T, S> FromRequest<S> for ApiJson<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let Json(value) = Json::<T>::from_request(req, state)
			.await
			.map_err(|rejection| ApiError::invalid(rejection.body_text()))?;

		Ok(Self(value))
	}
}

pub struct ApiQuery<T>(pub T);
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let Query(value) = Query::<T>::from_request_parts(parts, state)
			.await
			.map_err(|rejection| ApiError::invalid(rejection.body_text()))?;

		Ok(Self(value))
	}
}

pub struct ApiPath<T>(pub T);
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
	T: DeserializeOwned + Send,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let Path(value) = Path::<T>::from_request_parts(parts, state)
			.await
			.map_err(|rejection| ApiError::invalid(rejection.body_text()))?;

		Ok(Self(value))
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectIdQuery {
	project_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabQuery {
	project_id: i64,
	#[serde(default)]
	sort: Option<PhraseSort>,
}

#[derive(Debug, Deserialize)]
struct VotesQuery {
	phrase: String,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn not_found() -> ApiError {
	ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found.", None)
}

async fn method_not_allowed() -> ApiError {
	ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", "Method not allowed.", None)
}

fn success() -> Json<Value> {
	Json(json!({ "success": true }))
}

async fn me(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
) -> Result<Json<MeResponse>, ApiError> {
	Ok(Json(state.service.me(&user).await?))
}

async fn set_active_org(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<SetActiveOrgRequest>,
) -> Result<Json<MeResponse>, ApiError> {
	Ok(Json(state.service.set_active_org(&user, payload).await?))
}

async fn list_orgs(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
	let orgs = state.service.list_orgs(&user).await?;

	Ok(Json(json!({ "orgs": orgs })))
}

async fn get_active_org(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
	let org = state.service.get_active_org(&user).await?;

	Ok(Json(json!({ "org": org })))
}

async fn get_org(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
	let org = state.service.get_org(&user, id).await?;

	Ok(Json(json!({ "org": org })))
}

async fn list_projects(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
	let projects = state.service.list_projects(&user).await?;

	Ok(Json(json!({ "projects": projects })))
}

async fn get_project(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
	let project = state.service.get_extended_project(&user, id).await?;

	Ok(Json(json!({ "project": project })))
}

async fn create_project(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<CreateProjectRequest>,
) -> Result<Json<Value>, ApiError> {
	let project = state.service.create_project(&user, payload).await?;

	Ok(Json(json!({ "project": project })))
}

async fn update_project(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<UpdateProjectRequest>,
) -> Result<Json<Value>, ApiError> {
	let project = state.service.update_project(&user, payload).await?;

	Ok(Json(json!({ "project": project })))
}

async fn delete_project(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<DeleteProjectRequest>,
) -> Result<Json<Value>, ApiError> {
	state.service.delete_project(&user, payload).await?;

	Ok(success())
}

async fn list_search_endpoints(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
	let endpoints = state.service.list_search_endpoints(&user).await?;

	Ok(Json(json!({ "searchEndpoints": endpoints })))
}

async fn get_search_endpoint(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
	let endpoint = state.service.get_search_endpoint(&user, id).await?;

	Ok(Json(json!({ "searchEndpoint": endpoint })))
}

async fn create_search_endpoint(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<CreateSearchEndpointRequest>,
) -> Result<Json<Value>, ApiError> {
	let endpoint = state.service.create_search_endpoint(&user, payload).await?;

	Ok(Json(json!({ "searchEndpoint": endpoint })))
}

async fn update_search_endpoint(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiPath(id): ApiPath<i64>,
	ApiJson(payload): ApiJson<UpdateSearchEndpointRequest>,
) -> Result<Json<Value>, ApiError> {
	let endpoint = state.service.update_search_endpoint(&user, id, payload).await?;

	Ok(Json(json!({ "searchEndpoint": endpoint })))
}

async fn delete_search_endpoint(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
	state.service.delete_search_endpoint(&user, id).await?;

	Ok(success())
}

async fn query_search_endpoint(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<QuerySearchEndpointRequest>,
) -> Result<Json<Value>, ApiError> {
	Ok(Json(state.service.query_search_endpoint(&user, payload).await?))
}

async fn list_rulesets(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiQuery(query): ApiQuery<ProjectIdQuery>,
) -> Result<Json<Value>, ApiError> {
	let rulesets = state.service.list_rulesets(&user, query.project_id).await?;

	Ok(Json(json!({ "rulesets": rulesets })))
}

async fn get_ruleset(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiPath(id): ApiPath<i64>,
) -> Result<Json<RulesetDetail>, ApiError> {
	Ok(Json(state.service.get_ruleset(&user, id).await?))
}

async fn create_ruleset(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<CreateRulesetRequest>,
) -> Result<Json<Value>, ApiError> {
	let ruleset = state.service.create_ruleset(&user, payload).await?;

	Ok(Json(json!({ "ruleset": ruleset })))
}

async fn create_ruleset_version(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<CreateRulesetVersionRequest>,
) -> Result<Json<Value>, ApiError> {
	let version = state.service.create_ruleset_version(&user, payload).await?;

	Ok(Json(json!({ "version": version })))
}

async fn list_query_templates(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiQuery(query): ApiQuery<ProjectIdQuery>,
) -> Result<Json<Value>, ApiError> {
	let templates = state.service.list_query_templates(&user, query.project_id).await?;

	Ok(Json(json!({ "queryTemplates": templates })))
}

async fn create_query_template(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<CreateQueryTemplateRequest>,
) -> Result<Json<Value>, ApiError> {
	let template = state.service.create_query_template(&user, payload).await?;

	Ok(Json(json!({ "queryTemplate": template })))
}

async fn update_query_template(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<UpdateQueryTemplateRequest>,
) -> Result<Json<Value>, ApiError> {
	let template = state.service.update_query_template(&user, payload).await?;

	Ok(Json(json!({ "queryTemplate": template })))
}

async fn list_judgements(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiQuery(query): ApiQuery<ProjectIdQuery>,
) -> Result<Json<Value>, ApiError> {
	let judgements = state.service.list_judgements_extended(&user, query.project_id).await?;

	Ok(Json(json!({ "judgements": judgements })))
}

async fn get_judgement(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
	let judgement = state.service.get_judgement(&user, id).await?;

	Ok(Json(json!({ "judgement": judgement })))
}

async fn list_phrases(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
	let phrases = state.service.list_phrases(&user, id).await?;

	Ok(Json(json!({ "phrases": phrases })))
}

async fn list_votes(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiPath(id): ApiPath<i64>,
	ApiQuery(query): ApiQuery<VotesQuery>,
) -> Result<Json<Value>, ApiError> {
	let votes = state.service.list_votes(&user, id, &query.phrase).await?;

	Ok(Json(json!({ "votes": votes })))
}

async fn create_judgement(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<CreateJudgementRequest>,
) -> Result<Json<Value>, ApiError> {
	let judgement = state.service.create_judgement(&user, payload).await?;

	Ok(Json(json!({ "judgement": judgement })))
}

async fn update_judgement(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<UpdateJudgementRequest>,
) -> Result<Json<Value>, ApiError> {
	let judgement = state.service.update_judgement(&user, payload).await?;

	Ok(Json(json!({ "judgement": judgement })))
}

async fn set_votes(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<SetVotesRequest>,
) -> Result<Json<Value>, ApiError> {
	state.service.set_votes(&user, payload).await?;

	Ok(success())
}

async fn import_judgement(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportedJudgement>, ApiError> {
	let mut multipart = multipart.map_err(|rejection| ApiError::invalid(rejection.body_text()))?;
	let mut content = None;
	let mut project_id = None;
	let mut name = None;

	while let Some(field) =
		multipart.next_field().await.map_err(|err| ApiError::invalid(err.body_text()))?
	{
		let field_name = field.name().unwrap_or_default().to_string();

		if !matches!(field_name.as_str(), "file" | "projectId" | "name") {
			continue;
		}

		let text = field.text().await.map_err(|err| ApiError::invalid(err.body_text()))?;

		match field_name.as_str() {
			"file" => content = Some(text),
			"projectId" => {
				project_id = Some(
					text.trim()
						.parse::<i64>()
						.map_err(|_| ApiError::invalid("projectId must be an integer."))?,
				);
			},
			_ => name = Some(text),
		}
	}

	let (Some(content), Some(project_id), Some(name)) = (content, project_id, name) else {
		return Err(ApiError::invalid("file, projectId and name are required."));
	};
	let imported = state
		.service
		.import_judgement(&user, ImportJudgementRequest { project_id, name, content })
		.await?;

	Ok(Json(imported))
}

async fn lab(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiQuery(query): ApiQuery<LabQuery>,
) -> Result<Json<LabView>, ApiError> {
	let sort = query.sort.unwrap_or_default();

	Ok(Json(state.service.lab(&user, query.project_id, sort).await?))
}

async fn testbed_query(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
	ApiJson(payload): ApiJson<TestbedRequest>,
) -> Result<Json<TestbedResponse>, ApiError> {
	Ok(Json(state.service.testbed_query(&user, payload).await?))
}

async fn seed_dev_data(
	State(state): State<AppState>,
	CurrentUser(user): CurrentUser,
) -> Result<Json<SeedReport>, ApiError> {
	Ok(Json(state.service.seed_dev_data(&user).await?))
}

async fn register_user(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<RegisterUserRequest>,
) -> Result<Json<RegisteredUser>, ApiError> {
	Ok(Json(state.service.register_user(payload).await?))
}

async fn issue_session(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<IssueSessionRequest>,
) -> Result<Json<IssuedSession>, ApiError> {
	Ok(Json(state.service.issue_session(payload).await?))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}

	pub fn invalid(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None)
	}

	pub fn unauthorized(message: impl Into<String>) -> Self {
		Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message, None)
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } => Self::invalid(message),
			Error::Unauthorized { message } => Self::unauthorized(message),
			Error::NotFound { message } => {
				Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message, None)
			},
			Error::Conflict { message } => {
				Self::new(StatusCode::CONFLICT, "CONFLICT", message, None)
			},
			Error::Unsupported { message } => {
				Self::new(StatusCode::NOT_IMPLEMENTED, "NOT_IMPLEMENTED", message, None)
			},
			Error::Provider { message } => {
				tracing::warn!(error = %message, "Provider call failed.");

				Self::new(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message, None)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage error.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "Internal error.", None)
			},
			Error::Config { message } => {
				tracing::error!(error = %message, "Configuration error.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "Internal error.", None)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}
