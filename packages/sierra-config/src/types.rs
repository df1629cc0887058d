use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
	/// Exposes `POST /api/dev/seed`. Never enable outside local development.
	#[serde(default)]
	pub enable_dev_routes: bool,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub search: SearchBackendConfig,
	pub query_expander: QueryExpanderConfig,
}

/// Shared settings for outbound calls to project search endpoints. The endpoint URLs
/// themselves live in the database, one per search endpoint record.
#[derive(Debug, Deserialize)]
pub struct SearchBackendConfig {
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct QueryExpanderConfig {
	pub api_base: String,
	#[serde(default = "default_expander_path")]
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	/// Email domains allowed to register, e.g. `["example.com"]`.
	pub allow_registration_from: Vec<String>,
	#[serde(default = "default_session_ttl_days")]
	pub session_ttl_days: i64,
	#[serde(default = "default_session_cookie")]
	pub session_cookie: String,
}

fn default_expander_path() -> String {
	"/query/expand".to_string()
}

fn default_session_ttl_days() -> i64 {
	30
}

fn default_session_cookie() -> String {
	"sierra.session-token".to_string()
}
