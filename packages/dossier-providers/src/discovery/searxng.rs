use color_eyre::Result;
use reqwest::Client;
use serde_json::Value;

use dossier_domain::discovery::{self, Constraints, DiscoveryItem};

pub const NAME: &str = "searxng";

const CONFIDENCE: f32 = 0.6;

pub struct SearxngProvider {
	client: Client,
	base_url: String,
	max_results: usize,
}
impl SearxngProvider {
	pub fn new(cfg: &dossier_config::Searxng, client: Client) -> Self {
		Self { client, base_url: cfg.base_url.clone(), max_results: cfg.max_results as usize }
	}

	pub async fn discover(
		&self,
		person: &str,
		constraints: &Constraints,
	) -> Result<Vec<DiscoveryItem>> {
		let quoted = format!("\"{person}\"");
		let mut query = vec![
			("q", quoted.as_str()),
			("format", "json"),
			("time_range", "year"),
			("safesearch", "1"),
		];

		if let Some(language) = constraints.first_language() {
			query.push(("language", language));
		}

		let json: Value = self
			.client
			.get(format!("{}/search", self.base_url))
			.query(&query)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;

		Ok(parse_results(&json, self.max_results))
	}
}

fn parse_results(json: &Value, max_results: usize) -> Vec<DiscoveryItem> {
	let Some(results) = json.get("results").and_then(|v| v.as_array()) else {
		return Vec::new();
	};

	results
		.iter()
		.take(max_results)
		.filter_map(|result| {
			let url = result.get("url").and_then(|v| v.as_str()).filter(|url| !url.is_empty())?;
			let title = result.get("title").and_then(|v| v.as_str()).unwrap_or(url).to_string();
			let published_at =
				result.get("publishedDate").and_then(|v| v.as_str()).map(str::to_string);

			Some(
				DiscoveryItem::new(url, discovery::kind_for_url(url), NAME)
					.with_title(Some(title))
					.with_published_at(published_at)
					.with_confidence(CONFIDENCE),
			)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use dossier_domain::status::SourceKind;

	use super::*;

	#[test]
	fn maps_results_and_marks_pdfs() {
		let json = serde_json::json!({
			"results": [
				{ "url": "https://a.test/ada", "title": "Ada", "publishedDate": "2024-01-02" },
				{ "title": "no url" },
				{ "url": "https://b.test/notes.pdf", "publishedDate": null },
				{ "url": "https://c.test/over-limit" }
			]
		});
		let items = parse_results(&json, 3);

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].published_at.as_deref(), Some("2024-01-02"));
		assert_eq!(items[0].confidence, 0.6);
		assert_eq!(items[1].kind, SourceKind::Pdf);
		assert_eq!(items[1].title.as_deref(), Some("https://b.test/notes.pdf"));
		assert_eq!(items[1].source, NAME);
	}
}
