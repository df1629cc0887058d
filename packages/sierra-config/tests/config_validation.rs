use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use sierra_config::Config;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_with(section: &[&str], key: &str, value: Value) -> String {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let mut table = root.as_table_mut().expect("Sample config must be a table.");

	for name in section {
		table = table
			.get_mut(*name)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{name}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("sierra_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> sierra_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = sierra_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

#[test]
fn sample_config_loads_and_normalizes() {
	let cfg = load_payload(SAMPLE_CONFIG_TOML.to_string()).expect("Sample config must be valid.");

	assert_eq!(cfg.providers.query_expander.api_base, "http://127.0.0.1:8000");
	assert_eq!(
		cfg.security.allow_registration_from,
		vec!["example.com".to_string(), "bigdataboutique.com".to_string()]
	);
	assert!(!cfg.service.enable_dev_routes);
}

#[test]
fn admin_bind_must_be_loopback() {
	let payload =
		sample_with(&["service"], "admin_bind", Value::String("0.0.0.0:3001".to_string()));
	let err = load_payload(payload).expect_err("Expected admin_bind validation error.");

	assert!(
		err.to_string().contains("service.admin_bind must be a loopback address."),
		"Unexpected error: {err}"
	);
}

#[test]
fn http_bind_must_parse() {
	let payload = sample_with(&["service"], "http_bind", Value::String("localhost".to_string()));
	let err = load_payload(payload).expect_err("Expected http_bind validation error.");

	assert!(err.to_string().contains("service.http_bind must be a socket address"), "{err}");
}

#[test]
fn registration_domains_are_required() {
	let payload =
		sample_with(&["security"], "allow_registration_from", Value::Array(Vec::new()));
	let err = load_payload(payload).expect_err("Expected registration domain error.");

	assert!(
		err.to_string().contains("security.allow_registration_from must list at least one domain."),
		"Unexpected error: {err}"
	);
}

#[test]
fn expander_base_must_be_http() {
	let payload = sample_with(
		&["providers", "query_expander"],
		"api_base",
		Value::String("ftp://expander".to_string()),
	);
	let err = load_payload(payload).expect_err("Expected api_base validation error.");

	assert!(err.to_string().contains("must be an http or https URL"), "{err}");
}

#[test]
fn pool_size_must_be_positive() {
	let payload = sample_with(&["storage", "postgres"], "pool_max_conns", Value::Integer(0));
	let err = load_payload(payload).expect_err("Expected pool validation error.");

	assert!(
		err.to_string().contains("storage.postgres.pool_max_conns must be greater than zero."),
		"{err}"
	);
}

#[test]
fn session_ttl_defaults_when_omitted() {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let security = root
		.get_mut("security")
		.and_then(Value::as_table_mut)
		.expect("Sample config must include [security].");

	security.remove("session_ttl_days");
	security.remove("session_cookie");

	let cfg = load_payload(toml::to_string(&root).expect("Failed to render config."))
		.expect("Config without session settings must be valid.");

	assert_eq!(cfg.security.session_ttl_days, 30);
	assert_eq!(cfg.security.session_cookie, "sierra.session-token");
}

#[test]
fn session_ttl_is_bounded() {
	let payload = sample_with(&["security"], "session_ttl_days", Value::Integer(10_000_000));
	let err = load_payload(payload).expect_err("Expected session TTL validation error.");

	assert!(err.to_string().contains("security.session_ttl_days must be at most 3650."), "{err}");

	let payload = sample_with(
		&["security"],
		"session_ttl_days",
		Value::Integer(sierra_config::MAX_SESSION_TTL_DAYS),
	);

	load_payload(payload).expect("The largest allowed TTL must be valid.");
}

#[test]
fn missing_file_reports_path() {
	let path = env::temp_dir().join("sierra_config_missing_file.toml");
	let err = sierra_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, sierra_config::Error::ReadConfig { .. }));
}
