pub mod judgements;
pub mod lab;
pub mod orgs;
pub mod projects;
pub mod query_templates;
pub mod rulesets;
pub mod search_endpoints;
pub mod seed;
pub mod sessions;
pub mod testbed;
pub mod users;

mod access;
mod error;

pub use error::{Error, Result};
pub use judgements::{
	CreateJudgementRequest, ImportJudgementRequest, ImportedJudgement, JudgementSummary,
	JudgementView, PhraseView, SetVotesRequest, UpdateJudgementRequest, VoteView,
};
pub use lab::{ExecutionView, LabView, SearchConfigurationView, SearchPhraseView};
pub use orgs::OrgView;
pub use projects::{
	CreateProjectRequest, DeleteProjectRequest, ExtendedProjectView, ProjectView,
	UpdateProjectRequest,
};
pub use query_templates::{
	CreateQueryTemplateRequest, QueryTemplateView, UpdateQueryTemplateRequest,
};
pub use rulesets::{
	CreateRulesetRequest, CreateRulesetVersionRequest, RulesetDetail, RulesetVersionView,
	RulesetView,
};
pub use search_endpoints::{
	CreateSearchEndpointRequest, QuerySearchEndpointRequest, SearchEndpointView,
	UpdateSearchEndpointRequest,
};
pub use seed::SeedReport;
pub use sessions::{IssueSessionRequest, IssuedSession, SessionUser};
pub use testbed::{TestbedRequest, TestbedResponse};
pub use users::{MeResponse, RegisterUserRequest, RegisteredUser, SetActiveOrgRequest, UserView};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use sierra_config::{Config, QueryExpanderConfig, SearchBackendConfig};
use sierra_domain::{
	endpoint::{EndpointInfo, SearchEndpointType},
	rules::Rule,
};
use sierra_providers::{expander, search};
use sierra_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SearchBackend
where
	Self: Send + Sync,
{
	fn execute<'a>(
		&'a self,
		cfg: &'a SearchBackendConfig,
		kind: SearchEndpointType,
		info: &'a EndpointInfo,
		query: &'a str,
	) -> BoxFuture<'a, sierra_providers::Result<Value>>;
}

pub trait QueryExpander
where
	Self: Send + Sync,
{
	fn expand<'a>(
		&'a self,
		cfg: &'a QueryExpanderConfig,
		query: &'a str,
		template: Value,
		knobs: &'a Value,
		rules: &'a [Rule],
		ltr_model: Option<&'a str>,
	) -> BoxFuture<'a, sierra_providers::Result<Value>>;
}

#[derive(Clone)]
pub struct Providers {
	pub search: Arc<dyn SearchBackend>,
	pub expander: Arc<dyn QueryExpander>,
}
impl Providers {
	pub fn new(search: Arc<dyn SearchBackend>, expander: Arc<dyn QueryExpander>) -> Self {
		Self { search, expander }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { search: provider.clone(), expander: provider }
	}
}

pub struct SierraService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
}
impl SierraService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, providers }
	}
}

struct DefaultProviders;
impl SearchBackend for DefaultProviders {
	fn execute<'a>(
		&'a self,
		cfg: &'a SearchBackendConfig,
		kind: SearchEndpointType,
		info: &'a EndpointInfo,
		query: &'a str,
	) -> BoxFuture<'a, sierra_providers::Result<Value>> {
		Box::pin(search::execute_query(cfg, kind, info, query))
	}
}
impl QueryExpander for DefaultProviders {
	fn expand<'a>(
		&'a self,
		cfg: &'a QueryExpanderConfig,
		query: &'a str,
		template: Value,
		knobs: &'a Value,
		rules: &'a [Rule],
		ltr_model: Option<&'a str>,
	) -> BoxFuture<'a, sierra_providers::Result<Value>> {
		Box::pin(expander::expand(cfg, query, template, knobs, rules, ltr_model))
	}
}

pub(crate) fn trimmed_required(value: &str, field: &str) -> Result<String> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::invalid(format!("{field} must be non-empty.")));
	}

	Ok(trimmed.to_string())
}
