use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content;

pub const DEFAULT_CITATION_LABEL: &str = "source";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
	pub url: String,
	pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
	pub date: String,
	pub event_text: String,
	pub citations: Vec<Citation>,
}

/// Citation shapes a model may emit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawCitation {
	Url(String),
	Object {
		#[serde(default)]
		url: Option<Value>,
		#[serde(default)]
		source: Option<Value>,
		#[serde(default)]
		label: Option<Value>,
	},
	Other(Value),
}
impl RawCitation {
	pub fn normalize(self) -> Option<Citation> {
		match self {
			Self::Url(url) => {
				let url = content::strip_nul(&url).trim().to_string();

				(!url.is_empty())
					.then(|| Citation { url, label: DEFAULT_CITATION_LABEL.to_string() })
			},
			Self::Object { url, source, label } => {
				let url = non_empty_text(url.as_ref()).or_else(|| non_empty_text(source.as_ref()))?;
				let label = non_empty_text(label.as_ref())
					.unwrap_or_else(|| DEFAULT_CITATION_LABEL.to_string());

				Some(Citation { url, label })
			},
			Self::Other(_) => None,
		}
	}
}

/// Pulls candidate events out of a model response and normalizes them.
pub fn parse_timeline(raw: &str) -> Vec<TimelineEvent> {
	let Some(value) = extract_json(raw) else {
		return Vec::new();
	};
	let candidates = match value {
		Value::Object(mut map) => {
			let list = [map.remove("timeline"), map.remove("events")]
				.into_iter()
				.flatten()
				.find(|value| value.as_array().map(|items| !items.is_empty()).unwrap_or(false));

			match list {
				Some(Value::Array(items)) => items,
				_ => Vec::new(),
			}
		},
		Value::Array(items) => items,
		_ => Vec::new(),
	};

	dedup_events(candidates.iter().filter_map(normalize_event).collect())
}

pub fn normalize_event(value: &Value) -> Option<TimelineEvent> {
	let object = value.as_object()?;
	let date = scalar_text(object.get("date")).unwrap_or_default();
	let event_text = non_empty_text(object.get("event"))
		.or_else(|| non_empty_text(object.get("text")))?;
	let citations = match object.get("citations") {
		Some(Value::Array(items)) => items
			.iter()
			.filter_map(|item| serde_json::from_value::<RawCitation>(item.clone()).ok())
			.filter_map(RawCitation::normalize)
			.collect(),
		_ => Vec::new(),
	};

	Some(TimelineEvent { date, event_text, citations })
}

/// Drops later events that repeat an earlier (date, lower-cased text) pair.
pub fn dedup_events(events: Vec<TimelineEvent>) -> Vec<TimelineEvent> {
	let mut seen = HashSet::new();

	events
		.into_iter()
		.filter(|event| seen.insert((event.date.clone(), event.event_text.to_lowercase())))
		.collect()
}

/// Fenced block first, then a bare list, then the outermost object span.
pub fn extract_json(raw: &str) -> Option<Value> {
	if let Ok(fence) = Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```")
		&& let Some(block) = fence.captures(raw).and_then(|caps| caps.get(1))
		&& let Ok(value) = serde_json::from_str::<Value>(block.as_str())
	{
		return Some(value);
	}

	let trimmed = raw.trim();

	if trimmed.starts_with('[')
		&& trimmed.ends_with(']')
		&& let Ok(value) = serde_json::from_str::<Value>(trimmed)
	{
		return Some(value);
	}

	let (start, end) = (raw.find('{')?, raw.rfind('}')?);

	if end <= start {
		return None;
	}

	serde_json::from_str(&raw[start..=end]).ok()
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
	match value? {
		Value::String(text) => Some(content::strip_nul(text).trim().to_string()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
	scalar_text(value).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn bare_string_citation_gets_default_label() {
		let citation: RawCitation =
			serde_json::from_value(json!("https://x.test/a")).expect("Parse failed.");

		assert_eq!(
			citation.normalize(),
			Some(Citation { url: "https://x.test/a".to_string(), label: "source".to_string() })
		);
	}

	#[test]
	fn citation_without_url_is_dropped() {
		let citation: RawCitation =
			serde_json::from_value(json!({ "url": "", "label": "x" })).expect("Parse failed.");

		assert_eq!(citation.normalize(), None);
	}

	#[test]
	fn citation_source_is_a_url_alias() {
		let citation: RawCitation =
			serde_json::from_value(json!({ "source": "https://x.test/b", "label": "" }))
				.expect("Parse failed.");

		assert_eq!(
			citation.normalize(),
			Some(Citation { url: "https://x.test/b".to_string(), label: "source".to_string() })
		);
	}

	#[test]
	fn non_text_citations_are_ignored() {
		let citation: RawCitation = serde_json::from_value(json!(42)).expect("Parse failed.");

		assert_eq!(citation.normalize(), None);
	}

	#[test]
	fn events_fall_back_to_text_and_numeric_dates() {
		let event = normalize_event(&json!({ "date": 1843, "text": "Notes published" }))
			.expect("Expected an event.");

		assert_eq!(event.date, "1843");
		assert_eq!(event.event_text, "Notes published");
		assert!(event.citations.is_empty());
		assert!(normalize_event(&json!({ "date": "1843", "event": "  " })).is_none());
	}

	#[test]
	fn extracts_fenced_and_embedded_json() {
		let fenced = "Here you go:\n```json\n{\"timeline\": []}\n```";
		let embedded = "Sure! {\"events\": [{\"event\": \"x\"}]} Hope that helps.";

		assert_eq!(extract_json(fenced), Some(json!({ "timeline": [] })));
		assert_eq!(extract_json(embedded), Some(json!({ "events": [{ "event": "x" }] })));
		assert_eq!(extract_json("[{\"event\": \"y\"}]"), Some(json!([{ "event": "y" }])));
		assert_eq!(extract_json("no json here"), None);
	}

	#[test]
	fn nul_bytes_are_dropped_from_event_fields() {
		let event = normalize_event(&json!({
			"date": "1843\0",
			"event": "\0 Published notes",
			"citations": ["https://x.test/a\0", { "url": "https://x.test/b", "label": "no\0tes" }]
		}))
		.expect("Expected an event.");

		assert_eq!(event.date, "1843");
		assert_eq!(event.event_text, "Published notes");
		assert_eq!(event.citations[0].url, "https://x.test/a");
		assert_eq!(event.citations[1].label, "notes");
		assert!(normalize_event(&json!({ "event": "\0" })).is_none());
	}
}
