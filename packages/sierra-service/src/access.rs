//! Tenant checks. A record is visible to a user only through an `org_users` membership of the
//! org that owns it, directly or through its project.

use sqlx::PgExecutor;

use crate::{Error, Result};
use sierra_storage::models::{Judgement, Project, QueryTemplate, Ruleset, SearchEndpoint};

pub(crate) async fn org_accessible<'e, E>(executor: E, user_id: i64, org_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let member: Option<i64> =
		sqlx::query_scalar("SELECT id FROM org_users WHERE user_id = $1 AND org_id = $2")
			.bind(user_id)
			.bind(org_id)
			.fetch_optional(executor)
			.await?;

	Ok(member.is_some())
}

pub(crate) async fn first_org_id<'e, E>(executor: E, user_id: i64) -> Result<Option<i64>>
where
	E: PgExecutor<'e>,
{
	let org_id = sqlx::query_scalar(
		"SELECT org_id FROM org_users WHERE user_id = $1 ORDER BY org_id ASC LIMIT 1",
	)
	.bind(user_id)
	.fetch_optional(executor)
	.await?;

	Ok(org_id)
}

pub(crate) async fn project<'e, E>(executor: E, user_id: i64, project_id: i64) -> Result<Project>
where
	E: PgExecutor<'e>,
{
	sqlx::query_as(
		"\
SELECT p.*
FROM projects p
JOIN org_users ou ON ou.org_id = p.org_id
WHERE p.id = $1 AND ou.user_id = $2",
	)
	.bind(project_id)
	.bind(user_id)
	.fetch_optional(executor)
	.await?
	.ok_or_else(|| Error::not_found("project not found"))
}

pub(crate) async fn search_endpoint<'e, E>(
	executor: E,
	user_id: i64,
	search_endpoint_id: i64,
) -> Result<SearchEndpoint>
where
	E: PgExecutor<'e>,
{
	sqlx::query_as(
		"\
SELECT se.*
FROM search_endpoints se
JOIN org_users ou ON ou.org_id = se.org_id
WHERE se.id = $1 AND ou.user_id = $2",
	)
	.bind(search_endpoint_id)
	.bind(user_id)
	.fetch_optional(executor)
	.await?
	.ok_or_else(|| Error::not_found("search endpoint not found"))
}

pub(crate) async fn ruleset<'e, E>(executor: E, user_id: i64, ruleset_id: i64) -> Result<Ruleset>
where
	E: PgExecutor<'e>,
{
	sqlx::query_as(
		"\
SELECT r.*
FROM rulesets r
JOIN projects p ON p.id = r.project_id
JOIN org_users ou ON ou.org_id = p.org_id
WHERE r.id = $1 AND ou.user_id = $2",
	)
	.bind(ruleset_id)
	.bind(user_id)
	.fetch_optional(executor)
	.await?
	.ok_or_else(|| Error::not_found("ruleset not found"))
}

pub(crate) async fn judgement<'e, E>(
	executor: E,
	user_id: i64,
	judgement_id: i64,
) -> Result<Judgement>
where
	E: PgExecutor<'e>,
{
	sqlx::query_as(
		"\
SELECT j.*
FROM judgements j
JOIN projects p ON p.id = j.project_id
JOIN org_users ou ON ou.org_id = p.org_id
WHERE j.id = $1 AND ou.user_id = $2",
	)
	.bind(judgement_id)
	.bind(user_id)
	.fetch_optional(executor)
	.await?
	.ok_or_else(|| Error::not_found("judgement not found"))
}

pub(crate) async fn query_template<'e, E>(
	executor: E,
	user_id: i64,
	query_template_id: i64,
) -> Result<QueryTemplate>
where
	E: PgExecutor<'e>,
{
	sqlx::query_as(
		"\
SELECT qt.*
FROM query_templates qt
JOIN projects p ON p.id = qt.project_id
JOIN org_users ou ON ou.org_id = p.org_id
WHERE qt.id = $1 AND ou.user_id = $2",
	)
	.bind(query_template_id)
	.bind(user_id)
	.fetch_optional(executor)
	.await?
	.ok_or_else(|| Error::not_found("query template not found"))
}
