pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_orgs.sql" => out.push_str(include_str!("../../../sql/tables/001_orgs.sql")),
				"tables/002_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_users.sql")),
				"tables/003_org_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_org_users.sql")),
				"tables/004_sessions.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_sessions.sql")),
				"tables/005_search_endpoints.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_search_endpoints.sql")),
				"tables/006_projects.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_projects.sql")),
				"tables/007_rulesets.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_rulesets.sql")),
				"tables/008_ruleset_versions.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_ruleset_versions.sql")),
				"tables/009_query_templates.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_query_templates.sql")),
				"tables/010_judgements.sql" =>
					out.push_str(include_str!("../../../sql/tables/010_judgements.sql")),
				"tables/011_judgement_phrases.sql" =>
					out.push_str(include_str!("../../../sql/tables/011_judgement_phrases.sql")),
				"tables/012_votes.sql" => out.push_str(include_str!("../../../sql/tables/012_votes.sql")),
				"tables/013_search_configurations.sql" => out
					.push_str(include_str!("../../../sql/tables/013_search_configurations.sql")),
				"tables/014_executions.sql" =>
					out.push_str(include_str!("../../../sql/tables/014_executions.sql")),
				"tables/015_search_phrase_executions.sql" => out
					.push_str(include_str!("../../../sql/tables/015_search_phrase_executions.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
