/// Whether a verified email belongs to one of the allowed registration domains.
///
/// Domains are expected in normalized form (lowercase, without a leading `@`).
pub fn email_allowed(email: &str, email_verified: bool, allowed_domains: &[String]) -> bool {
	if !email_verified {
		return false;
	}

	let email = email.trim().to_ascii_lowercase();

	allowed_domains.iter().any(|domain| email.ends_with(&format!("@{domain}")))
}

/// Name of the organization created for a newly registered user.
pub fn personal_org_name(user_name: Option<&str>, email: &str) -> String {
	let owner = user_name
		.map(str::trim)
		.filter(|name| !name.is_empty())
		.unwrap_or_else(|| email.split('@').next().unwrap_or(email));

	format!("{owner}'s Organization")
}
