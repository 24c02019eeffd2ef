use color_eyre::{Result, eyre};
use quick_xml::{Reader, events::Event};
use reqwest::Client;

use dossier_domain::discovery::{self, Constraints, DiscoveryItem};

use super::domain_base;

pub const NAME: &str = "sitemap";

const CONFIDENCE: f32 = 0.55;
const SITEMAP_PATHS: [&str; 3] = ["/sitemap.xml", "/sitemap_index.xml", "/sitemap-index.xml"];

#[derive(Debug, Default, PartialEq)]
struct SitemapDoc {
	is_index: bool,
	entries: Vec<SitemapEntry>,
}

#[derive(Debug, Default, PartialEq)]
struct SitemapEntry {
	loc: String,
	lastmod: Option<String>,
}

#[derive(Clone, Copy)]
enum Field {
	Loc,
	Lastmod,
}

/// Matches sitemap locations against the person's name on each seed domain.
pub struct SitemapProvider {
	client: Client,
	domains: Vec<String>,
	max_results: usize,
}
impl SitemapProvider {
	pub fn new(cfg: &dossier_config::SeededProvider, client: Client) -> Self {
		Self { client, domains: cfg.domains.clone(), max_results: cfg.max_results as usize }
	}

	pub async fn discover(
		&self,
		person: &str,
		_constraints: &Constraints,
	) -> Result<Vec<DiscoveryItem>> {
		let needles = name_needles(person);
		let mut out = Vec::new();

		if needles.is_empty() {
			return Ok(out);
		}

		for domain in &self.domains {
			let remaining = self.max_results.saturating_sub(out.len());

			if remaining == 0 {
				break;
			}

			match self.discover_domain(domain, &needles, remaining).await {
				Ok(items) => out.extend(items),
				Err(err) => {
					tracing::warn!(error = %err, provider = NAME, domain = %domain, "Sitemap crawl failed.");
				},
			}
		}

		out.truncate(self.max_results);

		Ok(out)
	}

	async fn discover_domain(
		&self,
		domain: &str,
		needles: &[String],
		limit: usize,
	) -> Result<Vec<DiscoveryItem>> {
		let base = domain_base(domain);

		for path in SITEMAP_PATHS {
			let Some(body) = self.fetch_xml(&format!("{base}{path}")).await else {
				continue;
			};
			let doc = parse_sitemap(&body)?;

			if !doc.is_index {
				return Ok(matching_items(doc.entries, needles, limit));
			}

			// Indexes are followed one level deep.
			let mut items = Vec::new();

			for child in doc.entries {
				if items.len() >= limit {
					break;
				}

				let Some(body) = self.fetch_xml(&child.loc).await else {
					continue;
				};

				match parse_sitemap(&body) {
					Ok(child_doc) if !child_doc.is_index => items.extend(matching_items(
						child_doc.entries,
						needles,
						limit - items.len(),
					)),
					Ok(_) => {},
					Err(err) => {
						tracing::warn!(error = %err, sitemap = %child.loc, "Skipping unreadable sitemap.");
					},
				}
			}

			return Ok(items);
		}

		Ok(Vec::new())
	}

	async fn fetch_xml(&self, url: &str) -> Option<String> {
		let response = self.client.get(url).send().await.ok()?;

		if !response.status().is_success() {
			return None;
		}

		let body = response.text().await.ok()?;

		body.trim_start().starts_with('<').then_some(body)
	}
}

/// The name as written, hyphenated, and underscored, all lower-cased.
fn name_needles(person: &str) -> Vec<String> {
	let words: Vec<String> = person.split_whitespace().map(str::to_lowercase).collect();

	if words.is_empty() {
		return Vec::new();
	}

	let mut needles = vec![words.join(" "), words.join("-"), words.join("_"), words.join("%20")];

	needles.dedup();

	needles
}

fn matching_items(
	entries: Vec<SitemapEntry>,
	needles: &[String],
	limit: usize,
) -> Vec<DiscoveryItem> {
	entries
		.into_iter()
		.filter(|entry| {
			let loc = entry.loc.to_lowercase();

			needles.iter().any(|needle| loc.contains(needle.as_str()))
		})
		.take(limit)
		.map(|entry| {
			let kind = discovery::kind_for_url(&entry.loc);
			let title = Some(entry.loc.clone());

			DiscoveryItem::new(entry.loc, kind, NAME)
				.with_title(title)
				.with_published_at(entry.lastmod)
				.with_confidence(CONFIDENCE)
		})
		.collect()
}

fn parse_sitemap(xml: &str) -> Result<SitemapDoc> {
	let mut reader = Reader::from_str(xml);

	reader.config_mut().trim_text(true);

	let mut doc = SitemapDoc::default();
	let mut seen_root = false;
	let mut current: Option<SitemapEntry> = None;
	let mut field: Option<Field> = None;

	loop {
		match reader.read_event() {
			Ok(Event::Start(e)) => {
				match e.local_name().as_ref() {
					b"sitemapindex" if !seen_root => doc.is_index = true,
					b"url" | b"sitemap" => current = Some(SitemapEntry::default()),
					b"loc" => field = Some(Field::Loc),
					b"lastmod" => field = Some(Field::Lastmod),
					_ => {},
				}

				seen_root = true;
			},
			Ok(Event::Text(text)) => {
				let value = text.unescape()?.trim().to_string();

				push_field(current.as_mut(), field, value);
			},
			Ok(Event::CData(data)) => {
				let value = String::from_utf8_lossy(&data.into_inner()).trim().to_string();

				push_field(current.as_mut(), field, value);
			},
			Ok(Event::End(e)) => match e.local_name().as_ref() {
				b"url" | b"sitemap" => {
					if let Some(entry) = current.take()
						&& !entry.loc.is_empty()
					{
						doc.entries.push(entry);
					}
				},
				b"loc" | b"lastmod" => field = None,
				_ => {},
			},
			Ok(Event::Eof) => break,
			Ok(_) => {},
			Err(err) => return Err(eyre::eyre!("Sitemap is not valid XML: {err}.")),
		}
	}

	Ok(doc)
}

fn push_field(entry: Option<&mut SitemapEntry>, field: Option<Field>, value: String) {
	let (Some(entry), Some(field)) = (entry, field) else {
		return;
	};

	if value.is_empty() {
		return;
	}

	match field {
		Field::Loc => entry.loc.push_str(&value),
		Field::Lastmod => entry.lastmod = Some(value),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
	<url><loc>https://site.test/people/ada-lovelace</loc><lastmod>2023-05-01</lastmod></url>
	<url><loc>https://site.test/people/charles-babbage</loc></url>
	<url><loc><![CDATA[https://site.test/files/Ada_Lovelace_notes.pdf]]></loc></url>
</urlset>"#;

	#[test]
	fn parses_urlset_entries() {
		let doc = parse_sitemap(URLSET).expect("parse failed");

		assert!(!doc.is_index);
		assert_eq!(doc.entries.len(), 3);
		assert_eq!(doc.entries[0].lastmod.as_deref(), Some("2023-05-01"));
		assert_eq!(doc.entries[2].loc, "https://site.test/files/Ada_Lovelace_notes.pdf");
	}

	#[test]
	fn detects_sitemap_indexes() {
		let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
			<sitemap><loc>https://site.test/post-sitemap.xml</loc></sitemap>
		</sitemapindex>"#;
		let doc = parse_sitemap(xml).expect("parse failed");

		assert!(doc.is_index);
		assert_eq!(doc.entries[0].loc, "https://site.test/post-sitemap.xml");
	}

	#[test]
	fn matches_name_variants_case_insensitively() {
		let doc = parse_sitemap(URLSET).expect("parse failed");
		let items = matching_items(doc.entries, &name_needles("Ada Lovelace"), 10);

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].published_at.as_deref(), Some("2023-05-01"));
		assert_eq!(items[0].confidence, 0.55);
		assert_eq!(items[1].kind, dossier_domain::status::SourceKind::Pdf);
	}

	#[test]
	fn blank_names_match_nothing() {
		assert!(name_needles("   ").is_empty());
	}
}
