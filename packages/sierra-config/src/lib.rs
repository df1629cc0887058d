mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Postgres, Providers, QueryExpanderConfig, SearchBackendConfig, Security, Service,
	Storage,
};

use std::{fs, net::SocketAddr, path::Path};

/// Ten years. Session expiry is computed as `now + ttl` and must stay representable.
pub const MAX_SESSION_TTL_DAYS: i64 = 3_650;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, bind) in
		[("service.http_bind", &cfg.service.http_bind), ("service.admin_bind", &cfg.service.admin_bind)]
	{
		if bind.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
		if bind.parse::<SocketAddr>().is_err() {
			return Err(Error::Validation {
				message: format!("{label} must be a socket address such as 127.0.0.1:8080."),
			});
		}
	}

	if let Ok(admin) = cfg.service.admin_bind.parse::<SocketAddr>()
		&& !admin.ip().is_loopback()
	{
		return Err(Error::Validation {
			message: "service.admin_bind must be a loopback address.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.search.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.search.timeout_ms must be greater than zero.".to_string(),
		});
	}

	let expander = &cfg.providers.query_expander;

	if !(expander.api_base.starts_with("http://") || expander.api_base.starts_with("https://")) {
		return Err(Error::Validation {
			message: "providers.query_expander.api_base must be an http or https URL.".to_string(),
		});
	}
	if !expander.path.starts_with('/') {
		return Err(Error::Validation {
			message: "providers.query_expander.path must start with '/'.".to_string(),
		});
	}
	if expander.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.query_expander.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if expander.default_headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: "providers.query_expander.default_headers values must be strings."
				.to_string(),
		});
	}
	if cfg.security.allow_registration_from.is_empty() {
		return Err(Error::Validation {
			message: "security.allow_registration_from must list at least one domain.".to_string(),
		});
	}
	if cfg.security.allow_registration_from.iter().any(|domain| domain.is_empty()) {
		return Err(Error::Validation {
			message: "security.allow_registration_from must not contain empty domains."
				.to_string(),
		});
	}
	if cfg.security.session_ttl_days <= 0 {
		return Err(Error::Validation {
			message: "security.session_ttl_days must be greater than zero.".to_string(),
		});
	}
	if cfg.security.session_ttl_days > MAX_SESSION_TTL_DAYS {
		return Err(Error::Validation {
			message: format!(
				"security.session_ttl_days must be at most {MAX_SESSION_TTL_DAYS}."
			),
		});
	}
	if cfg.security.session_cookie.trim().is_empty() {
		return Err(Error::Validation {
			message: "security.session_cookie must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let base = cfg.providers.query_expander.api_base.trim().trim_end_matches('/').to_string();

	cfg.providers.query_expander.api_base = base;
	cfg.security.allow_registration_from = cfg
		.security
		.allow_registration_from
		.iter()
		.map(|domain| domain.trim().trim_start_matches('@').to_ascii_lowercase())
		.collect();
}
