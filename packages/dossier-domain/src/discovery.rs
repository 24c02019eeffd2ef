use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{content, status::SourceKind};

/// Optional research constraints attached to a job and handed to every provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date_from: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date_to: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub languages: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub regions: Vec<String>,
}
impl Constraints {
	pub fn first_language(&self) -> Option<&str> {
		self.languages.iter().map(|lang| lang.trim()).find(|lang| !lang.is_empty())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryItem {
	pub url: String,
	pub kind: SourceKind,
	/// Name of the provider that produced the item.
	pub source: String,
	pub title: Option<String>,
	pub published_at: Option<String>,
	pub confidence: f32,
}
impl DiscoveryItem {
	pub fn new(url: impl Into<String>, kind: SourceKind, source: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			kind,
			source: source.into(),
			title: None,
			published_at: None,
			confidence: 0.5,
		}
	}

	pub fn with_title(mut self, title: Option<String>) -> Self {
		self.title = title.filter(|title| !title.trim().is_empty());

		self
	}

	pub fn with_published_at(mut self, published_at: Option<String>) -> Self {
		self.published_at = published_at.filter(|value| !value.trim().is_empty());

		self
	}

	pub fn with_confidence(mut self, confidence: f32) -> Self {
		self.confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };

		self
	}

	/// Drops NUL from every text field; a title or date left blank becomes `None`.
	pub fn sanitized(self) -> Self {
		let Self { url, kind, source, title, published_at, confidence } = self;

		Self {
			url: content::strip_nul(&url),
			kind,
			source: content::strip_nul(&source),
			title: None,
			published_at: None,
			confidence,
		}
		.with_title(title.as_deref().map(content::strip_nul))
		.with_published_at(published_at.as_deref().map(content::strip_nul))
	}
}

/// Collapses items sharing an exact URL, keeping the first one seen. Items come out sanitized.
pub fn dedup_items(items: Vec<DiscoveryItem>) -> Vec<DiscoveryItem> {
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(items.len());

	for item in items.into_iter().map(DiscoveryItem::sanitized) {
		if item.url.is_empty() {
			continue;
		}
		if seen.insert(item.url.clone()) {
			out.push(item);
		}
	}

	out
}

pub fn kind_for_url(url: &str) -> SourceKind {
	let path = url.split(['?', '#']).next().unwrap_or(url);

	if path.to_ascii_lowercase().ends_with(".pdf") { SourceKind::Pdf } else { SourceKind::Webpage }
}
