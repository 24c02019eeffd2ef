use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use dossier_domain::{fanin::DocumentCounts, status::DocumentStatus};

use crate::{
	Result,
	models::{DocumentContext, DocumentRow},
};

pub struct NewDocument<'a> {
	pub job_id: &'a str,
	pub source_id: Uuid,
	pub file_path: &'a str,
	pub mime_type: &'a str,
}

pub async fn insert_document<'e, E>(
	executor: E,
	document: &NewDocument<'_>,
	now: OffsetDateTime,
) -> Result<Uuid>
where
	E: PgExecutor<'e>,
{
	let document_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO documents (
	document_id, job_id, source_id, file_path, mime_type, text_path, status, created_at, updated_at
)
VALUES ($1, $2, $3, $4, $5, NULL, $6, $7, $7)",
	)
	.bind(document_id)
	.bind(document.job_id)
	.bind(document.source_id)
	.bind(document.file_path)
	.bind(document.mime_type)
	.bind(DocumentStatus::Fetched.as_str())
	.bind(now)
	.execute(executor)
	.await?;

	Ok(document_id)
}

pub async fn get_document<'e, E>(executor: E, document_id: Uuid) -> Result<Option<DocumentRow>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, DocumentRow>(
		"\
SELECT
	document_id,
	job_id,
	source_id,
	file_path,
	mime_type,
	text_path,
	status,
	created_at,
	updated_at
FROM documents
WHERE document_id = $1",
	)
	.bind(document_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn get_document_context<'e, E>(
	executor: E,
	document_id: Uuid,
) -> Result<Option<DocumentContext>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, DocumentContext>(
		"\
SELECT
	d.document_id,
	d.job_id,
	j.person,
	s.url AS source_url,
	s.published_at,
	s.kind
FROM documents d
JOIN sources s ON s.source_id = d.source_id
JOIN jobs j ON j.job_id = d.job_id
WHERE d.document_id = $1",
	)
	.bind(document_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Moves a document to `to` only when it is currently in one of `from`.
pub async fn transition_document<'e, E>(
	executor: E,
	document_id: Uuid,
	from: &[DocumentStatus],
	to: DocumentStatus,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let from: Vec<&str> = from.iter().map(|status| status.as_str()).collect();
	let result = sqlx::query(
		"\
UPDATE documents
SET status = $1, updated_at = $2
WHERE document_id = $3 AND status = ANY($4)",
	)
	.bind(to.as_str())
	.bind(now)
	.bind(document_id)
	.bind(&from)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn mark_document_normalized<'e, E>(
	executor: E,
	document_id: Uuid,
	text_path: &str,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE documents
SET status = 'normalized', text_path = $1, updated_at = $2
WHERE document_id = $3 AND status IN ('fetched', 'normalizing')",
	)
	.bind(text_path)
	.bind(now)
	.bind(document_id)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn count_documents<'e, E>(executor: E, job_id: &str) -> Result<DocumentCounts>
where
	E: PgExecutor<'e>,
{
	let terminal: Vec<&str> =
		DocumentStatus::TERMINAL.iter().map(|status| status.as_str()).collect();
	let (total, pending): (i64, i64) = sqlx::query_as(
		"\
SELECT
	count(*),
	count(*) FILTER (WHERE status <> ALL($2))
FROM documents
WHERE job_id = $1",
	)
	.bind(job_id)
	.bind(&terminal)
	.fetch_one(executor)
	.await?;

	Ok(DocumentCounts { total: total.max(0) as u64, pending: pending.max(0) as u64 })
}
