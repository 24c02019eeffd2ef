use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use dossier_domain::{discovery::DiscoveryItem, status::SourceStatus};

use crate::{Result, models::SourceRow};

const SOURCE_COLUMNS: &str = "\
source_id, job_id, url, kind, source, title, published_at, confidence, status, created_at, \
updated_at";

/// Returns the new id, or `None` when the job already has a source with this URL.
pub async fn insert_source<'e, E>(
	executor: E,
	job_id: &str,
	item: &DiscoveryItem,
	now: OffsetDateTime,
) -> Result<Option<Uuid>>
where
	E: PgExecutor<'e>,
{
	let source_id = sqlx::query_scalar::<_, Uuid>(
		"\
INSERT INTO sources (
	source_id, job_id, url, kind, source, title, published_at, confidence, status, created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
ON CONFLICT (job_id, url) DO NOTHING
RETURNING source_id",
	)
	.bind(Uuid::new_v4())
	.bind(job_id)
	.bind(item.url.as_str())
	.bind(item.kind.as_str())
	.bind(item.source.as_str())
	.bind(item.title.as_deref())
	.bind(item.published_at.as_deref())
	.bind(item.confidence)
	.bind(SourceStatus::Queued.as_str())
	.bind(now)
	.fetch_optional(executor)
	.await?;

	Ok(source_id)
}

pub async fn get_source<'e, E>(executor: E, source_id: Uuid) -> Result<Option<SourceRow>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE source_id = $1");
	let row =
		sqlx::query_as::<_, SourceRow>(&sql).bind(source_id).fetch_optional(executor).await?;

	Ok(row)
}

/// Moves a source to `to` only when it is still in `from`.
pub async fn transition_source<'e, E>(
	executor: E,
	source_id: Uuid,
	from: SourceStatus,
	to: SourceStatus,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"UPDATE sources SET status = $1, updated_at = $2 WHERE source_id = $3 AND status = $4",
	)
	.bind(to.as_str())
	.bind(now)
	.bind(source_id)
	.bind(from.as_str())
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn count_sources_by_status<'e, E>(executor: E, job_id: &str) -> Result<Vec<(String, i64)>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, (String, i64)>(
		"SELECT status, count(*) FROM sources WHERE job_id = $1 GROUP BY status",
	)
	.bind(job_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn count_queued_sources<'e, E>(executor: E, job_id: &str) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM sources WHERE job_id = $1 AND status = 'queued'",
	)
	.bind(job_id)
	.fetch_one(executor)
	.await?;

	Ok(count.max(0) as u64)
}

/// Newest first.
pub async fn list_recent_sources<'e, E>(
	executor: E,
	job_id: &str,
	limit: i64,
) -> Result<Vec<SourceRow>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT {SOURCE_COLUMNS} FROM sources WHERE job_id = $1 \
		 ORDER BY created_at DESC, source_id LIMIT $2"
	);
	let rows = sqlx::query_as::<_, SourceRow>(&sql)
		.bind(job_id)
		.bind(limit)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}
