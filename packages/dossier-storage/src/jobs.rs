use serde_json::Value;
use sqlx::PgExecutor;
use time::OffsetDateTime;

use dossier_domain::status::JobStatus;

use crate::{Result, models::JobRow};

pub async fn insert_job<'e, E>(
	executor: E,
	job_id: &str,
	person: &str,
	constraints: &Value,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO jobs (job_id, person, constraints, status, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $5)",
	)
	.bind(job_id)
	.bind(person)
	.bind(constraints)
	.bind(JobStatus::Queued.as_str())
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_job<'e, E>(executor: E, job_id: &str) -> Result<Option<JobRow>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, JobRow>(
		"\
SELECT job_id, person, constraints, status, created_at, updated_at
FROM jobs
WHERE job_id = $1",
	)
	.bind(job_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Moves a job to `to` only when it is currently in one of `from`.
pub async fn transition_job<'e, E>(
	executor: E,
	job_id: &str,
	from: &[JobStatus],
	to: JobStatus,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let from: Vec<&str> = from.iter().map(|status| status.as_str()).collect();
	let result = sqlx::query(
		"UPDATE jobs SET status = $1, updated_at = $2 WHERE job_id = $3 AND status = ANY($4)",
	)
	.bind(to.as_str())
	.bind(now)
	.bind(job_id)
	.bind(&from)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// The synthesis gate. Exactly one caller observes `true` per job.
pub async fn enter_analyzing<'e, E>(executor: E, job_id: &str, now: OffsetDateTime) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE jobs
SET status = 'analyzing', updated_at = $1
WHERE job_id = $2 AND status NOT IN ('analyzing', 'complete', 'analysis_failed')",
	)
	.bind(now)
	.bind(job_id)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Completes a job that never produced a document once no source is left in flight.
pub async fn complete_empty_job<'e, E>(
	executor: E,
	job_id: &str,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE jobs
SET status = 'complete', updated_at = $1
WHERE job_id = $2
	AND status = 'fetching'
	AND NOT EXISTS (SELECT 1 FROM documents WHERE documents.job_id = $2)
	AND NOT EXISTS (
		SELECT 1 FROM sources WHERE sources.job_id = $2 AND sources.status = 'queued'
	)",
	)
	.bind(now)
	.bind(job_id)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}
