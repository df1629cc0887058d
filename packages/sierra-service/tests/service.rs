use std::sync::{Arc, Mutex};

use serde_json::{Map, Value, json};

use sierra_config::{
	Config, Postgres, Providers as ProviderSettings, QueryExpanderConfig, SearchBackendConfig,
	Security, Service, Storage,
};
use sierra_domain::{
	endpoint::{EndpointInfo, SearchEndpointType},
	lab::PhraseSort,
	rules::Rule,
};
use sierra_service::{
	BoxFuture, CreateJudgementRequest, CreateProjectRequest, CreateRulesetRequest,
	CreateRulesetVersionRequest, CreateSearchEndpointRequest, Error, ImportJudgementRequest,
	IssueSessionRequest, ProjectView, Providers, QueryExpander, QuerySearchEndpointRequest,
	RegisterUserRequest, SearchBackend, SessionUser, SetActiveOrgRequest, SetVotesRequest,
	SierraService, TestbedRequest, UpdateQueryTemplateRequest, UpdateSearchEndpointRequest,
};
use sierra_storage::db::Db;
use sierra_testkit::TestDatabase;

#[derive(Default)]
struct SpySearch {
	queries: Mutex<Vec<(SearchEndpointType, String)>>,
}
impl SearchBackend for SpySearch {
	fn execute<'a>(
		&'a self,
		_cfg: &'a SearchBackendConfig,
		kind: SearchEndpointType,
		_info: &'a EndpointInfo,
		query: &'a str,
	) -> BoxFuture<'a, sierra_providers::Result<Value>> {
		if let Ok(mut queries) = self.queries.lock() {
			queries.push((kind, query.to_string()));
		}

		Box::pin(async move {
			if !kind.speaks_query_dsl() {
				return Err(sierra_providers::Error::Unsupported { kind });
			}

			Ok(json!({ "hits": { "total": { "value": 1 }, "hits": [{ "_id": "doc_1" }] } }))
		})
	}
}

#[derive(Default)]
struct SpyExpander {
	rules: Mutex<Vec<Rule>>,
}
impl QueryExpander for SpyExpander {
	fn expand<'a>(
		&'a self,
		_cfg: &'a QueryExpanderConfig,
		query: &'a str,
		_template: Value,
		_knobs: &'a Value,
		rules: &'a [Rule],
		_ltr_model: Option<&'a str>,
	) -> BoxFuture<'a, sierra_providers::Result<Value>> {
		if let Ok(mut seen) = self.rules.lock() {
			seen.extend_from_slice(rules);
		}

		let expanded = json!({ "query": { "match": { "title": query } } });

		Box::pin(async move { Ok(expanded) })
	}
}

struct Harness {
	service: SierraService,
	search: Arc<SpySearch>,
	expander: Arc<SpyExpander>,
}

fn test_config(dsn: &str) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:3000".to_string(),
			admin_bind: "127.0.0.1:3001".to_string(),
			log_level: "info".to_string(),
			enable_dev_routes: true,
		},
		storage: Storage { postgres: Postgres { dsn: dsn.to_string(), pool_max_conns: 2 } },
		providers: ProviderSettings {
			search: SearchBackendConfig { timeout_ms: 1_000 },
			query_expander: QueryExpanderConfig {
				api_base: "http://127.0.0.1:8000".to_string(),
				path: "/query/expand".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		security: Security {
			bind_localhost_only: true,
			allow_registration_from: vec!["example.com".to_string()],
			session_ttl_days: 30,
			session_cookie: "sierra.session-token".to_string(),
		},
	}
}

async fn harness(test_db: &TestDatabase) -> Harness {
	let cfg = test_config(test_db.dsn());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let search = Arc::new(SpySearch::default());
	let expander = Arc::new(SpyExpander::default());
	let service = SierraService::with_providers(
		cfg,
		db,
		Providers::new(search.clone(), expander.clone()),
	);

	Harness { service, search, expander }
}

async fn sign_in(service: &SierraService, name: &str, email: &str) -> SessionUser {
	let registered = service
		.register_user(RegisterUserRequest {
			name: Some(name.to_string()),
			email: email.to_string(),
			email_verified: true,
			image: None,
		})
		.await
		.expect("Failed to register user.");
	let session = service
		.issue_session(IssueSessionRequest { user_id: registered.user.id })
		.await
		.expect("Failed to issue session.");

	service.resolve_session(&session.token).await.expect("Failed to resolve session.")
}

async fn create_endpoint(
	service: &SierraService,
	user: &SessionUser,
	kind: SearchEndpointType,
) -> i64 {
	service
		.create_search_endpoint(
			user,
			CreateSearchEndpointRequest {
				org_id: None,
				name: format!("{kind} endpoint"),
				description: String::new(),
				whitelist: Vec::new(),
				result_id: "_id".to_string(),
				display_fields: vec!["title".to_string()],
				kind,
				info: EndpointInfo {
					endpoint: "http://localhost:9200/icecat/_search".to_string(),
					index: None,
					username: None,
					password: None,
				},
			},
		)
		.await
		.expect("Failed to create search endpoint.")
		.id
}

async fn create_project(
	service: &SierraService,
	user: &SessionUser,
	name: &str,
	kind: SearchEndpointType,
) -> ProjectView {
	let endpoint = create_endpoint(service, user, kind).await;

	service
		.create_project(
			user,
			CreateProjectRequest { name: name.to_string(), search_endpoint_id: endpoint },
		)
		.await
		.expect("Failed to create project.")
}

fn synonym_rules() -> sierra_domain::rules::RulesetVersionValue {
	serde_json::from_value(json!({
		"rules": [{
			"expression": "notebook",
			"instructions": [
				{ "type": "synonym", "directed": false, "term": "laptop", "enabled": true }
			],
			"enabled": true
		}]
	}))
	.expect("Failed to parse rules.")
}

macro_rules! with_db {
	($name:literal, $test_db:ident) => {
		let Some($test_db) =
			TestDatabase::from_env().await.expect("Failed to create test database.")
		else {
			eprintln!(concat!("Skipping ", $name, "; set SIERRA_PG_DSN to run this test."));

			return;
		};
	};
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn registration_creates_personal_org_and_session() {
	with_db!("registration_creates_personal_org_and_session", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let me = h.service.me(&user).await.expect("Failed to load session view.");

	assert_eq!(me.orgs.len(), 1);
	assert_eq!(me.orgs[0].name, "Ada's Organization");
	assert_eq!(me.user.active_org_id, Some(me.orgs[0].id));
	assert!(me.projects.is_empty());

	let rejected = h
		.service
		.register_user(RegisterUserRequest {
			name: None,
			email: "eve@elsewhere.org".to_string(),
			email_verified: true,
			image: None,
		})
		.await;

	assert!(matches!(rejected, Err(Error::InvalidRequest { .. })));

	let duplicate = h
		.service
		.register_user(RegisterUserRequest {
			name: None,
			email: "ADA@example.com".to_string(),
			email_verified: true,
			image: None,
		})
		.await;

	assert!(matches!(duplicate, Err(Error::Conflict { .. })));
	assert!(matches!(
		h.service.resolve_session("not-a-token").await,
		Err(Error::Unauthorized { .. })
	));

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn project_creation_adds_defaults_per_endpoint_type() {
	with_db!("project_creation_adds_defaults_per_endpoint_type", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let es = create_endpoint(&h.service, &user, SearchEndpointType::Elasticsearch).await;
	let solr = create_endpoint(&h.service, &user, SearchEndpointType::Solr).await;
	let es_project = h
		.service
		.create_project(&user, CreateProjectRequest { name: "ES".to_string(), search_endpoint_id: es })
		.await
		.expect("Failed to create project.");
	let solr_project = h
		.service
		.create_project(
			&user,
			CreateProjectRequest { name: "Solr".to_string(), search_endpoint_id: solr },
		)
		.await
		.expect("Failed to create project.");
	let extended =
		h.service.get_extended_project(&user, es_project.id).await.expect("Failed to load.");

	assert_eq!(extended.judgements.len(), 1);
	assert_eq!(extended.judgements[0].name, "Judgements by internal users");
	assert_eq!(
		h.service.list_query_templates(&user, es_project.id).await.expect("list failed").len(),
		1
	);
	assert!(
		h.service.list_query_templates(&user, solr_project.id).await.expect("list failed").is_empty()
	);

	let in_use = h.service.delete_search_endpoint(&user, es).await;

	assert!(matches!(in_use, Err(Error::Conflict { .. })));

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn other_orgs_records_look_missing() {
	with_db!("other_orgs_records_look_missing", test_db);

	let h = harness(&test_db).await;
	let owner = sign_in(&h.service, "Ada", "ada@example.com").await;
	let stranger = sign_in(&h.service, "Bob", "bob@example.com").await;
	let endpoint = create_endpoint(&h.service, &owner, SearchEndpointType::OpenSearch).await;
	let project = h
		.service
		.create_project(
			&owner,
			CreateProjectRequest { name: "Private".to_string(), search_endpoint_id: endpoint },
		)
		.await
		.expect("Failed to create project.");

	assert!(matches!(
		h.service.get_project(&stranger, project.id).await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(
		h.service.get_search_endpoint(&stranger, endpoint).await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(
		h.service
			.create_project(
				&stranger,
				CreateProjectRequest { name: "Steal".to_string(), search_endpoint_id: endpoint },
			)
			.await,
		Err(Error::NotFound { .. })
	));
	assert!(h.service.list_search_endpoints(&stranger).await.expect("list failed").is_empty());

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn testbed_sends_enabled_rules_and_runs_expansion() {
	with_db!("testbed_sends_enabled_rules_and_runs_expansion", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let endpoint = create_endpoint(&h.service, &user, SearchEndpointType::Elasticsearch).await;
	let project = h
		.service
		.create_project(
			&user,
			CreateProjectRequest { name: "Shop".to_string(), search_endpoint_id: endpoint },
		)
		.await
		.expect("Failed to create project.");
	let ruleset = h
		.service
		.create_ruleset(
			&user,
			CreateRulesetRequest { project_id: project.id, name: "Synonyms".to_string() },
		)
		.await
		.expect("Failed to create ruleset.");
	let value = serde_json::from_value(json!({
		"rules": [
			{
				"expression": "notebook",
				"instructions": [
					{ "type": "synonym", "directed": false, "term": "laptop", "enabled": true },
					{ "type": "updown", "weight": -3, "term": "keyboard", "enabled": false }
				],
				"enabled": true
			},
			{ "expression": "phone", "instructions": [], "enabled": false }
		]
	}))
	.expect("Failed to parse rules.");

	h.service
		.create_ruleset_version(
			&user,
			CreateRulesetVersionRequest { ruleset_id: ruleset.id, parent_id: None, value },
		)
		.await
		.expect("Failed to create ruleset version.");

	let response = h
		.service
		.testbed_query(
			&user,
			TestbedRequest {
				query: "notebook".to_string(),
				project_id: project.id,
				ruleset_ids: vec![ruleset.id],
				ltr_model_name: None,
			},
		)
		.await
		.expect("Failed to run testbed query.");

	assert_eq!(response.result["hits"]["hits"][0]["_id"], "doc_1");

	let rules = h.expander.rules.lock().expect("lock poisoned").clone();

	assert_eq!(rules.len(), 1);
	assert_eq!(rules[0].instructions.len(), 1);

	let queries = h.search.queries.lock().expect("lock poisoned").clone();

	assert_eq!(queries.len(), 1);
	assert_eq!(
		serde_json::from_str::<Value>(&queries[0].1).expect("query must be JSON"),
		json!({ "query": { "match": { "title": "notebook" } } })
	);

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn imported_judgements_count_phrases_and_votes() {
	with_db!("imported_judgements_count_phrases_and_votes", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let endpoint = create_endpoint(&h.service, &user, SearchEndpointType::Vespa).await;
	let project = h
		.service
		.create_project(
			&user,
			CreateProjectRequest { name: "Vespa".to_string(), search_endpoint_id: endpoint },
		)
		.await
		.expect("Failed to create project.");
	let imported = h
		.service
		.import_judgement(
			&user,
			ImportJudgementRequest {
				project_id: project.id,
				name: "Imported".to_string(),
				content: "query,docid,rating\nlaptop,doc_1,3\nlaptop,doc_2,1\nfruits,,\n"
					.to_string(),
			},
		)
		.await
		.expect("Failed to import judgement.");

	assert!(imported.success);

	h.service
		.set_votes(
			&user,
			SetVotesRequest {
				id: imported.id,
				votes: serde_json::from_value(json!({ "laptop": { "doc_2": null } }))
					.expect("Failed to parse votes."),
			},
		)
		.await
		.expect("Failed to set votes.");

	let summaries =
		h.service.list_judgements_extended(&user, project.id).await.expect("list failed");
	let summary =
		summaries.iter().find(|summary| summary.id == imported.id).expect("summary missing");

	assert_eq!(summary.total_search_phrases, 2);
	assert_eq!(summary.total_votes, 1);

	let votes = h.service.list_votes(&user, imported.id, "laptop").await.expect("list failed");

	assert_eq!(votes.len(), 1);
	assert_eq!(votes[0].document_id, "doc_1");
	assert_eq!(votes[0].score, 3.0);

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn seeded_lab_sorts_phrases() {
	with_db!("seeded_lab_sorts_phrases", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let report = h.service.seed_dev_data(&user).await.expect("Failed to seed.");
	let lab = h
		.service
		.lab(&user, report.project_id, PhraseSort::SearchPhraseAsc)
		.await
		.expect("Failed to load lab.");
	let phrases: Vec<&str> = lab.phrases.iter().map(|phrase| phrase.phrase.as_str()).collect();

	assert_eq!(phrases, vec!["briefcase", "fruits", "notebook", "suitcase", "tote bags"]);
	assert_eq!(lab.execution.map(|execution| execution.combined_score), Some(85.0));

	let empty = h
		.service
		.create_project(
			&user,
			CreateProjectRequest {
				name: "Fresh".to_string(),
				search_endpoint_id: report.search_endpoint_id,
			},
		)
		.await
		.expect("Failed to create project.");
	let lab = h.service.lab(&user, empty.id, PhraseSort::default()).await.expect("lab failed");

	assert!(lab.search_configuration.is_none());
	assert!(lab.phrases.is_empty());

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn query_template_updates_store_child_revisions() {
	with_db!("query_template_updates_store_child_revisions", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let stranger = sign_in(&h.service, "Bob", "bob@example.com").await;
	let shop = create_project(&h.service, &user, "Shop", SearchEndpointType::Elasticsearch).await;
	let other = create_project(&h.service, &user, "Other", SearchEndpointType::Elasticsearch).await;
	let templates = h.service.list_query_templates(&user, shop.id).await.expect("list failed");
	let parent = templates.first().expect("Elasticsearch projects start with a template.").clone();
	let update = |project_id: i64| UpdateQueryTemplateRequest {
		id: parent.id,
		project_id,
		description: "Boost titles".to_string(),
		query: json!({ "query": { "match": { "title": "##$query##" } } }).to_string(),
		knobs: json!({ "boost": 2 }),
		tag: Some("v2".to_string()),
	};
	let child = h
		.service
		.update_query_template(&user, update(shop.id))
		.await
		.expect("Failed to update query template.");

	assert_eq!(child.parent_id, Some(parent.id));
	assert_eq!(child.project_id, shop.id);
	assert_ne!(child.id, parent.id);
	assert_eq!(h.service.list_query_templates(&user, shop.id).await.expect("list failed").len(), 2);
	assert!(matches!(
		h.service.update_query_template(&user, update(other.id)).await,
		Err(Error::InvalidRequest { .. })
	));
	assert!(matches!(
		h.service.update_query_template(&stranger, update(shop.id)).await,
		Err(Error::NotFound { .. })
	));

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn ruleset_version_parent_must_share_the_ruleset() {
	with_db!("ruleset_version_parent_must_share_the_ruleset", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let project = create_project(&h.service, &user, "Shop", SearchEndpointType::OpenSearch).await;
	let mut rulesets = Vec::new();

	for name in ["Synonyms", "Boosts"] {
		let ruleset = h
			.service
			.create_ruleset(
				&user,
				CreateRulesetRequest { project_id: project.id, name: name.to_string() },
			)
			.await
			.expect("Failed to create ruleset.");

		rulesets.push(ruleset.id);
	}

	let first = h
		.service
		.create_ruleset_version(
			&user,
			CreateRulesetVersionRequest {
				ruleset_id: rulesets[0],
				parent_id: None,
				value: synonym_rules(),
			},
		)
		.await
		.expect("Failed to create ruleset version.");
	let foreign_parent = h
		.service
		.create_ruleset_version(
			&user,
			CreateRulesetVersionRequest {
				ruleset_id: rulesets[1],
				parent_id: Some(first.id),
				value: synonym_rules(),
			},
		)
		.await;

	assert!(matches!(foreign_parent, Err(Error::InvalidRequest { .. })));

	let second = h
		.service
		.create_ruleset_version(
			&user,
			CreateRulesetVersionRequest {
				ruleset_id: rulesets[0],
				parent_id: Some(first.id),
				value: synonym_rules(),
			},
		)
		.await
		.expect("Failed to create child version.");

	assert_eq!(second.parent_id, Some(first.id));

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn foreign_orgs_are_rejected() {
	with_db!("foreign_orgs_are_rejected", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let stranger = sign_in(&h.service, "Bob", "bob@example.com").await;
	let foreign_org = stranger.active_org_id;

	assert!(matches!(
		h.service
			.set_active_org(&user, SetActiveOrgRequest { active_org_id: foreign_org })
			.await,
		Err(Error::NotFound { .. })
	));

	let me = h
		.service
		.set_active_org(&user, SetActiveOrgRequest { active_org_id: user.active_org_id })
		.await
		.expect("Switching to an own org must succeed.");

	assert_eq!(me.user.active_org_id, Some(user.active_org_id));

	let created = h
		.service
		.create_search_endpoint(
			&user,
			CreateSearchEndpointRequest {
				org_id: Some(foreign_org),
				name: "Elsewhere".to_string(),
				description: String::new(),
				whitelist: Vec::new(),
				result_id: "_id".to_string(),
				display_fields: Vec::new(),
				kind: SearchEndpointType::Elasticsearch,
				info: EndpointInfo {
					endpoint: "http://localhost:9200/_search".to_string(),
					index: None,
					username: None,
					password: None,
				},
			},
		)
		.await;

	assert!(matches!(created, Err(Error::InvalidRequest { message }) if message == "invalid org"));

	let endpoint = create_endpoint(&h.service, &user, SearchEndpointType::Elasticsearch).await;
	let updated = h
		.service
		.update_search_endpoint(
			&user,
			endpoint,
			UpdateSearchEndpointRequest { org_id: Some(foreign_org), ..Default::default() },
		)
		.await;

	assert!(matches!(updated, Err(Error::InvalidRequest { message }) if message == "invalid org"));
	assert!(h.service.list_search_endpoints(&stranger).await.expect("list failed").is_empty());

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn only_query_dsl_endpoints_run_queries() {
	with_db!("only_query_dsl_endpoints_run_queries", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let query = json!({ "query": { "match_all": {} } });

	for kind in [SearchEndpointType::Solr, SearchEndpointType::Vespa, SearchEndpointType::RedisSearch]
	{
		let endpoint = create_endpoint(&h.service, &user, kind).await;
		let result = h
			.service
			.query_search_endpoint(
				&user,
				QuerySearchEndpointRequest { search_endpoint_id: endpoint, query: query.clone() },
			)
			.await;

		assert!(matches!(result, Err(Error::Unsupported { .. })), "{kind} must be unsupported");
	}

	let endpoint = create_endpoint(&h.service, &user, SearchEndpointType::Elasticsearch).await;
	let result = h
		.service
		.query_search_endpoint(
			&user,
			QuerySearchEndpointRequest {
				search_endpoint_id: endpoint,
				query: Value::String(query.to_string()),
			},
		)
		.await
		.expect("Elasticsearch endpoints must run queries.");

	assert_eq!(result["hits"]["hits"][0]["_id"], "doc_1");

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIERRA_PG_DSN to run."]
async fn votes_on_foreign_judgements_look_missing() {
	with_db!("votes_on_foreign_judgements_look_missing", test_db);

	let h = harness(&test_db).await;
	let user = sign_in(&h.service, "Ada", "ada@example.com").await;
	let stranger = sign_in(&h.service, "Bob", "bob@example.com").await;
	let project = create_project(&h.service, &user, "Shop", SearchEndpointType::Solr).await;
	let judgement = h
		.service
		.create_judgement(
			&user,
			CreateJudgementRequest { project_id: project.id, name: "Ratings".to_string() },
		)
		.await
		.expect("Failed to create judgement.");
	let votes = |score: f64| SetVotesRequest {
		id: judgement.id,
		votes: serde_json::from_value(json!({ "laptop": { "doc_1": score } }))
			.expect("Failed to parse votes."),
	};

	h.service.set_votes(&user, votes(3.0)).await.expect("Failed to set votes.");

	assert!(matches!(
		h.service.set_votes(&stranger, votes(0.0)).await,
		Err(Error::NotFound { .. })
	));

	let stored = h.service.list_votes(&user, judgement.id, "laptop").await.expect("list failed");

	assert_eq!(stored.len(), 1);
	assert_eq!(stored[0].score, 3.0);

	drop(h);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
