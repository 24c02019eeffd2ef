pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_jobs.sql" => out.push_str(include_str!("../../../sql/tables/001_jobs.sql")),
				"tables/002_sources.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_sources.sql")),
				"tables/003_documents.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_documents.sql")),
				"tables/004_events.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_events.sql")),
				"tables/005_pipeline_tasks.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_pipeline_tasks.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_are_expanded_in_dependency_order() {
		let sql = render_schema();
		let jobs = sql.find("CREATE TABLE IF NOT EXISTS jobs").expect("jobs table missing");
		let sources = sql.find("CREATE TABLE IF NOT EXISTS sources").expect("sources table missing");
		let tasks =
			sql.find("CREATE TABLE IF NOT EXISTS pipeline_tasks").expect("task table missing");

		assert!(!sql.contains("\\ir "));
		assert!(jobs < sources && sources < tasks);
	}
}
