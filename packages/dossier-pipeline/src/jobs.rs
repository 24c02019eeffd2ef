use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use dossier_domain::{
	discovery::Constraints,
	status::{JobStatus, SourceKind, SourceStatus},
	timeline::Citation,
};
use dossier_storage::{
	db::Db,
	documents, events, jobs,
	models::{EventRow, SourceRow},
	sources,
	tasks::{self, Task},
};

use crate::{Error, Result};

pub const RECENT_SOURCES_LIMIT: i64 = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitJobRequest {
	pub person: String,
	#[serde(default)]
	pub date_from: Option<String>,
	#[serde(default)]
	pub date_to: Option<String>,
	#[serde(default)]
	pub languages: Vec<String>,
	#[serde(default)]
	pub regions: Vec<String>,
}
impl SubmitJobRequest {
	fn constraints(&self) -> Constraints {
		let text = |value: &Option<String>| {
			value.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
		};
		let list = |values: &[String]| {
			values
				.iter()
				.map(|value| value.trim())
				.filter(|value| !value.is_empty())
				.map(str::to_string)
				.collect()
		};

		Constraints {
			date_from: text(&self.date_from),
			date_to: text(&self.date_to),
			languages: list(&self.languages),
			regions: list(&self.regions),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
	pub job_id: String,
	pub status: JobStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
	pub total: u64,
	pub queued: u64,
	pub fetched: u64,
	pub fetch_failed: u64,
	pub blocked_by_robots: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentProgress {
	pub total: u64,
	/// Documents in a terminal status.
	pub finished: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOverview {
	pub job_id: String,
	pub person: String,
	pub status: JobStatus,
	pub constraints: Constraints,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	pub sources: SourceCounts,
	pub documents: DocumentProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceView {
	pub source_id: Uuid,
	pub url: String,
	pub kind: SourceKind,
	pub source: String,
	pub title: Option<String>,
	pub published_at: Option<String>,
	pub confidence: f32,
	pub status: SourceStatus,
}
impl TryFrom<SourceRow> for SourceView {
	type Error = Error;

	fn try_from(row: SourceRow) -> Result<Self> {
		Ok(Self {
			kind: row.kind()?,
			status: row.status()?,
			source_id: row.source_id,
			url: row.url,
			source: row.source,
			title: row.title,
			published_at: row.published_at,
			confidence: row.confidence,
		})
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEventView {
	pub date: String,
	pub event: String,
	pub citations: Vec<Citation>,
}
impl From<EventRow> for TimelineEventView {
	fn from(row: EventRow) -> Self {
		// Rows written by this crate always hold a citation list.
		let citations = serde_json::from_value(row.citations).unwrap_or_default();

		Self { date: row.date, event: row.event_text, citations }
	}
}

/// Creates the job and its discovery task in one transaction.
pub async fn submit_job(db: &Db, request: SubmitJobRequest) -> Result<SubmitJobResponse> {
	let person = request.person.trim();

	if person.is_empty() {
		return Err(Error::InvalidRequest { message: "person must be non-empty.".to_string() });
	}

	let constraints = serde_json::to_value(request.constraints()).unwrap_or(Value::Null);
	let job_id = Uuid::new_v4().to_string();
	let now = crate::now();
	let mut tx = db.pool.begin().await?;

	jobs::insert_job(&mut *tx, &job_id, person, &constraints, now).await?;
	tasks::enqueue_task(&mut *tx, &Task::Discover { job_id: job_id.clone() }, now).await?;
	tx.commit().await?;

	tracing::info!(job_id = %job_id, person = %person, "Job submitted.");

	Ok(SubmitJobResponse { job_id, status: JobStatus::Queued })
}

pub async fn job_overview(db: &Db, job_id: &str) -> Result<JobOverview> {
	let job = jobs::get_job(&db.pool, job_id)
		.await?
		.ok_or_else(|| Error::NotFound { message: format!("Job {job_id} does not exist.") })?;
	let mut source_counts = SourceCounts::default();

	for (status, count) in sources::count_sources_by_status(&db.pool, job_id).await? {
		let count = count.max(0) as u64;

		source_counts.total += count;

		match status.parse::<SourceStatus>() {
			Ok(SourceStatus::Queued) => source_counts.queued += count,
			Ok(SourceStatus::Fetched) => source_counts.fetched += count,
			Ok(SourceStatus::FetchFailed) => source_counts.fetch_failed += count,
			Ok(SourceStatus::BlockedByRobots) => source_counts.blocked_by_robots += count,
			Err(err) => tracing::warn!(error = %err, job_id = %job_id, "Unexpected source status."),
		}
	}

	let counts = documents::count_documents(&db.pool, job_id).await?;

	Ok(JobOverview {
		status: job.status()?,
		constraints: serde_json::from_value(job.constraints).unwrap_or_default(),
		job_id: job.job_id,
		person: job.person,
		created_at: job.created_at,
		updated_at: job.updated_at,
		sources: source_counts,
		documents: DocumentProgress {
			total: counts.total,
			finished: counts.total.saturating_sub(counts.pending),
		},
	})
}

/// The newest sources of a job, newest first.
pub async fn list_sources(db: &Db, job_id: &str) -> Result<Vec<SourceView>> {
	ensure_job(db, job_id).await?;

	sources::list_recent_sources(&db.pool, job_id, RECENT_SOURCES_LIMIT)
		.await?
		.into_iter()
		.map(SourceView::try_from)
		.collect()
}

/// Events ordered by date, then by their position in the synthesis batch.
pub async fn list_timeline(db: &Db, job_id: &str) -> Result<Vec<TimelineEventView>> {
	ensure_job(db, job_id).await?;

	Ok(events::list_events(&db.pool, job_id).await?.into_iter().map(Into::into).collect())
}

async fn ensure_job(db: &Db, job_id: &str) -> Result<()> {
	if jobs::get_job(&db.pool, job_id).await?.is_none() {
		return Err(Error::NotFound { message: format!("Job {job_id} does not exist.") });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn constraints_drop_blank_values() {
		let request = SubmitJobRequest {
			person: "Ada Lovelace".to_string(),
			date_from: Some("  ".to_string()),
			date_to: Some(" 1852 ".to_string()),
			languages: vec!["en".to_string(), " ".to_string()],
			regions: Vec::new(),
		};
		let constraints = request.constraints();

		assert_eq!(constraints.date_from, None);
		assert_eq!(constraints.date_to.as_deref(), Some("1852"));
		assert_eq!(constraints.languages, vec!["en".to_string()]);
	}

	#[test]
	fn request_accepts_person_only() {
		let request: SubmitJobRequest =
			serde_json::from_str(r#"{"person":"Ada Lovelace"}"#).expect("Parse failed.");

		assert_eq!(request.person, "Ada Lovelace");
		assert!(request.languages.is_empty());
	}

	#[test]
	fn event_view_falls_back_to_no_citations() {
		let row = EventRow {
			event_id: Uuid::nil(),
			job_id: "job-1".to_string(),
			position: 0,
			date: "1843".to_string(),
			event_text: "Published notes".to_string(),
			citations: serde_json::json!([{ "url": "https://a.test", "label": "source" }]),
			created_at: OffsetDateTime::UNIX_EPOCH,
		};
		let view = TimelineEventView::from(row.clone());

		assert_eq!(view.citations.len(), 1);
		assert_eq!(view.event, "Published notes");

		let broken = TimelineEventView::from(EventRow { citations: Value::Null, ..row });

		assert!(broken.citations.is_empty());
	}
}
