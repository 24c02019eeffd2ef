use color_eyre::Result;
use reqwest::Client;
use serde_json::Value;

use dossier_domain::discovery::{self, Constraints, DiscoveryItem};

use super::domain_base;

pub const NAME: &str = "wordpress";

const CONFIDENCE: f32 = 0.6;
const PER_PAGE: &str = "10";

/// Queries the WordPress REST search endpoint of each seed domain.
pub struct WordpressProvider {
	client: Client,
	domains: Vec<String>,
	max_results: usize,
}
impl WordpressProvider {
	pub fn new(cfg: &dossier_config::SeededProvider, client: Client) -> Self {
		Self { client, domains: cfg.domains.clone(), max_results: cfg.max_results as usize }
	}

	pub async fn discover(
		&self,
		person: &str,
		_constraints: &Constraints,
	) -> Result<Vec<DiscoveryItem>> {
		let mut out = Vec::new();

		for domain in &self.domains {
			match self.search_domain(domain, person).await {
				Ok(items) => out.extend(items),
				Err(err) => {
					tracing::warn!(error = %err, provider = NAME, domain = %domain, "Seed domain search failed.");
				},
			}

			if out.len() >= self.max_results {
				break;
			}
		}

		out.truncate(self.max_results);

		Ok(out)
	}

	async fn search_domain(&self, domain: &str, person: &str) -> Result<Vec<DiscoveryItem>> {
		let response = self
			.client
			.get(format!("{}/wp-json/wp/v2/search", domain_base(domain)))
			.query(&[("search", person), ("per_page", PER_PAGE)])
			.send()
			.await?;

		// Sites without the REST API answer 404; that is "no results".
		if !response.status().is_success() {
			return Ok(Vec::new());
		}

		let json: Value = response.json().await?;

		Ok(parse_results(&json))
	}
}

fn parse_results(json: &Value) -> Vec<DiscoveryItem> {
	let Some(results) = json.as_array() else {
		return Vec::new();
	};

	results
		.iter()
		.filter_map(|result| {
			let url = ["url", "link"]
				.iter()
				.filter_map(|key| result.get(*key).and_then(|v| v.as_str()))
				.find(|url| !url.is_empty())?;
			let title = match result.get("title") {
				Some(Value::String(title)) => Some(title.clone()),
				Some(Value::Object(title)) =>
					title.get("rendered").and_then(|v| v.as_str()).map(str::to_string),
				_ => None,
			}
			.filter(|title| !title.trim().is_empty())
			.unwrap_or_else(|| url.to_string());

			Some(
				DiscoveryItem::new(url, discovery::kind_for_url(url), NAME)
					.with_title(Some(title))
					.with_confidence(CONFIDENCE),
			)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_url_or_link_and_rendered_titles() {
		let json = serde_json::json!([
			{ "id": 1, "url": "https://wp.test/ada", "title": "Ada Lovelace" },
			{ "id": 2, "link": "https://wp.test/notes", "title": { "rendered": "Notes" } },
			{ "id": 3, "title": "no link" }
		]);
		let items = parse_results(&json);

		assert_eq!(items.len(), 2);
		assert_eq!(items[1].url, "https://wp.test/notes");
		assert_eq!(items[1].title.as_deref(), Some("Notes"));
		assert_eq!(items[0].source, NAME);
	}

	#[test]
	fn error_objects_yield_nothing() {
		assert!(parse_results(&serde_json::json!({ "code": "rest_no_route" })).is_empty());
	}
}
