use dossier_domain::{
	chunking, content,
	discovery::{self, DiscoveryItem},
	fanin::{self, DocumentCounts, FanInDecision, FinalizeDecision},
	status::{DocumentStatus, JobStatus, SourceKind},
	timeline::{self, Citation},
};

#[test]
fn duplicate_urls_collapse_to_one_source_each() {
	let items = vec![
		DiscoveryItem::new("https://a.test/ada", SourceKind::Webpage, "searxng")
			.with_confidence(0.6),
		DiscoveryItem::new("https://a.test/ada", SourceKind::Webpage, "sitemap")
			.with_confidence(0.55),
		DiscoveryItem::new("https://b.test/notes.pdf", SourceKind::Pdf, "searxng"),
	];
	let unique = discovery::dedup_items(items);
	let urls: Vec<_> = unique.iter().map(|item| item.url.as_str()).collect();

	assert_eq!(urls, vec!["https://a.test/ada", "https://b.test/notes.pdf"]);
	assert_eq!(unique[0].source, "searxng");
	assert_eq!(unique[0].confidence, 0.6);
}

#[test]
fn fan_in_requires_settled_documents() {
	let pending = |total, pending| DocumentCounts { total, pending };

	assert_eq!(fanin::evaluate(JobStatus::Fetching, pending(1, 0)), FanInDecision::Ready);
	assert_eq!(fanin::evaluate(JobStatus::Fetching, pending(0, 0)), FanInDecision::Empty);
	assert_eq!(fanin::evaluate(JobStatus::Analyzing, pending(1, 0)), FanInDecision::Settled);
}

#[test]
fn all_blocked_job_is_completed_by_fallback() {
	let decision =
		fanin::decide_finalize(JobStatus::Fetching, DocumentCounts { total: 0, pending: 0 }, 0);

	assert_eq!(decision, FinalizeDecision::CompleteEmpty);
}

#[test]
fn terminal_document_statuses_are_final() {
	assert!(DocumentStatus::IndexFailed.is_terminal());
	assert!(DocumentStatus::NormalizeFailed.is_terminal());
	assert!(!DocumentStatus::Normalizing.is_terminal());
}

#[test]
fn content_gate_boundaries() {
	assert!(!content::passes_content_gate(&"n".repeat(150), 200));
	assert!(content::passes_content_gate(&"n".repeat(250), 200));
}

#[test]
fn chunk_payload_truncation_stays_within_chunk() {
	let text = "word ".repeat(700);
	let chunks = chunking::chunk_text(&text, 1_500);

	assert_eq!(chunks.len(), 3);
	assert_eq!(chunking::truncate_chars(&chunks[0], 1_000).chars().count(), 1_000);
	assert_eq!(chunking::truncate_chars(&chunks[2], 1_200), chunks[2]);
}

#[test]
fn timeline_dedups_case_insensitively() {
	let raw = r#"{"timeline": [
		{"date": "1843", "event": "Published notes", "citations": ["https://x.test/a"]},
		{"date": "1843", "event": "published notes", "citations": []},
		{"date": "1852", "event": "Died in London", "citations": [{"url": "", "label": "x"}]}
	]}"#;
	let events = timeline::parse_timeline(raw);

	assert_eq!(events.len(), 2);
	assert_eq!(events[0].event_text, "Published notes");
	assert_eq!(
		events[0].citations,
		vec![Citation { url: "https://x.test/a".to_string(), label: "source".to_string() }]
	);
	assert!(events[1].citations.is_empty());
}

#[test]
fn timeline_accepts_events_key_and_bare_lists() {
	let keyed = timeline::parse_timeline(r#"{"events": [{"date": "1815", "event": "Born"}]}"#);
	let bare = timeline::parse_timeline(r#"[{"date": "1815", "text": "Born"}]"#);

	assert_eq!(keyed.len(), 1);
	assert_eq!(bare.len(), 1);
	assert_eq!(bare[0].event_text, "Born");
}

#[test]
fn timeline_from_prose_is_empty() {
	assert!(timeline::parse_timeline("I could not find any events.").is_empty());
}
