//! At-least-once task queue. A claim leases the row by pushing `available_at` forward, so a task
//! whose worker dies is redelivered once the lease runs out.

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use dossier_domain::status::SourceKind;

use crate::{Result, db::Db, models::TaskRow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchItem {
	pub url: String,
	pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
	Discover { job_id: String },
	Fetch { job_id: String, source_id: Uuid, item: FetchItem },
	Normalize { job_id: String, document_id: Uuid },
	Index { job_id: String, document_id: Uuid },
	Synthesize { job_id: String },
	Finalize { job_id: String },
}
impl Task {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Discover { .. } => "discover",
			Self::Fetch { .. } => "fetch",
			Self::Normalize { .. } => "normalize",
			Self::Index { .. } => "index",
			Self::Synthesize { .. } => "synthesize",
			Self::Finalize { .. } => "finalize",
		}
	}

	pub fn job_id(&self) -> &str {
		match self {
			Self::Discover { job_id }
			| Self::Fetch { job_id, .. }
			| Self::Normalize { job_id, .. }
			| Self::Index { job_id, .. }
			| Self::Synthesize { job_id }
			| Self::Finalize { job_id } => job_id,
		}
	}
}

impl TaskRow {
	pub fn task(&self) -> Result<Task> {
		Ok(serde_json::from_value(self.payload.clone())?)
	}
}

pub async fn enqueue_task<'e, E>(
	executor: E,
	task: &Task,
	available_at: OffsetDateTime,
) -> Result<Uuid>
where
	E: PgExecutor<'e>,
{
	let task_id = Uuid::new_v4();
	let payload = serde_json::to_value(task)?;

	sqlx::query(
		"\
INSERT INTO pipeline_tasks (
	task_id, job_id, kind, payload, status, attempts, available_at, created_at, updated_at
)
VALUES ($1, $2, $3, $4, 'PENDING', 0, $5, now(), now())",
	)
	.bind(task_id)
	.bind(task.job_id())
	.bind(task.kind())
	.bind(payload)
	.bind(available_at)
	.execute(executor)
	.await?;

	Ok(task_id)
}

pub async fn claim_next_task(
	db: &Db,
	now: OffsetDateTime,
	lease_seconds: i64,
) -> Result<Option<TaskRow>> {
	let mut tx = db.pool.begin().await?;
	let row = sqlx::query_as::<_, TaskRow>(
		"\
SELECT
	task_id,
	job_id,
	kind,
	payload,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at
FROM pipeline_tasks
WHERE status IN ('PENDING', 'FAILED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;
	let task = if let Some(mut task) = row {
		let lease_until = now + time::Duration::seconds(lease_seconds);

		sqlx::query("UPDATE pipeline_tasks SET available_at = $1, updated_at = $2 WHERE task_id = $3")
			.bind(lease_until)
			.bind(now)
			.bind(task.task_id)
			.execute(&mut *tx)
			.await?;

		task.available_at = lease_until;
		task.updated_at = now;

		Some(task)
	} else {
		None
	};

	tx.commit().await?;

	Ok(task)
}

pub async fn mark_task_done(db: &Db, task_id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query("UPDATE pipeline_tasks SET status = 'DONE', updated_at = $1 WHERE task_id = $2")
		.bind(now)
		.bind(task_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn mark_task_failed(
	db: &Db,
	task_id: Uuid,
	attempts: i32,
	error_text: &str,
	available_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE pipeline_tasks
SET status = 'FAILED',
	attempts = $1,
	last_error = $2,
	available_at = $3,
	updated_at = $4
WHERE task_id = $5",
	)
	.bind(attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(task_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}
