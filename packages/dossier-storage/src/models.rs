use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use dossier_domain::status::{DocumentStatus, JobStatus, SourceKind, SourceStatus};

use crate::{Error, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
	pub job_id: String,
	pub person: String,
	pub constraints: Value,
	pub status: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl JobRow {
	pub fn status(&self) -> Result<JobStatus> {
		parse_status(&self.status)
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
	pub source_id: Uuid,
	pub job_id: String,
	pub url: String,
	pub kind: String,
	pub source: String,
	pub title: Option<String>,
	pub published_at: Option<String>,
	pub confidence: f32,
	pub status: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl SourceRow {
	pub fn status(&self) -> Result<SourceStatus> {
		parse_status(&self.status)
	}

	pub fn kind(&self) -> Result<SourceKind> {
		parse_status(&self.kind)
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
	pub document_id: Uuid,
	pub job_id: String,
	pub source_id: Uuid,
	pub file_path: String,
	pub mime_type: String,
	pub text_path: Option<String>,
	pub status: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl DocumentRow {
	pub fn status(&self) -> Result<DocumentStatus> {
		parse_status(&self.status)
	}
}

/// Metadata copied into every chunk payload of a document.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentContext {
	pub document_id: Uuid,
	pub job_id: String,
	pub person: String,
	pub source_url: String,
	pub published_at: Option<String>,
	pub kind: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
	pub event_id: Uuid,
	pub job_id: String,
	pub position: i32,
	pub date: String,
	pub event_text: String,
	pub citations: Value,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
	pub task_id: Uuid,
	pub job_id: String,
	pub kind: String,
	pub payload: Value,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

fn parse_status<T>(value: &str) -> Result<T>
where
	T: std::str::FromStr<Err = dossier_domain::status::UnknownStatus>,
{
	value.parse().map_err(|err: dossier_domain::status::UnknownStatus| {
		Error::InvalidArgument(err.to_string())
	})
}
