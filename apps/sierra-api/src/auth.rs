use axum::{
	extract::FromRequestParts,
	http::{
		HeaderMap,
		header::{AUTHORIZATION, COOKIE},
		request::Parts,
	},
};

use crate::{routes::ApiError, state::AppState};
use sierra_service::SessionUser;

/// The signed-in user. Rejects with 401 before any handler logic runs.
pub struct CurrentUser(pub SessionUser);
impl FromRequestParts<AppState> for CurrentUser {
	type Rejection = ApiError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let cookie_name = state.service.cfg.security.session_cookie.as_str();
		let Some(token) = session_token(&parts.headers, cookie_name) else {
			return Err(ApiError::unauthorized("Sign in required."));
		};
		let user = state.service.resolve_session(&token).await?;

		Ok(Self(user))
	}
}

/// Bearer token first, then the session cookie.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	let bearer = headers
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|raw| raw.trim().strip_prefix("Bearer "))
		.map(str::trim)
		.filter(|token| !token.is_empty());

	if let Some(token) = bearer {
		return Some(token.to_string());
	}

	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|raw| raw.split(';'))
		.filter_map(|pair| pair.trim().split_once('='))
		.find(|(name, value)| *name == cookie_name && !value.is_empty())
		.map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
	use axum::http::HeaderValue;

	use super::*;

	const COOKIE_NAME: &str = "sierra.session-token";

	#[test]
	fn bearer_token_wins_over_cookie() {
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
		headers.insert(COOKIE, HeaderValue::from_static("sierra.session-token=def"));

		assert_eq!(session_token(&headers, COOKIE_NAME).as_deref(), Some("abc"));
	}

	#[test]
	fn cookie_is_found_among_others() {
		let mut headers = HeaderMap::new();

		headers.insert(COOKIE, HeaderValue::from_static("theme=dark; sierra.session-token=def"));

		assert_eq!(session_token(&headers, COOKIE_NAME).as_deref(), Some("def"));
	}

	#[test]
	fn missing_or_blank_tokens_yield_none() {
		let mut headers = HeaderMap::new();

		assert_eq!(session_token(&headers, COOKIE_NAME), None);

		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  "));
		headers.insert(COOKIE, HeaderValue::from_static("sierra.session-token="));

		assert_eq!(session_token(&headers, COOKIE_NAME), None);

		headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));

		assert_eq!(session_token(&headers, COOKIE_NAME), None);
	}
}
