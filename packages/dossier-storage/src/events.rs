use sqlx::{PgConnection, PgExecutor};
use time::OffsetDateTime;
use uuid::Uuid;

use dossier_domain::timeline::TimelineEvent;

use crate::{Result, models::EventRow};

/// Inserts one synthesis batch. Callers run this inside the completing transaction.
pub async fn insert_events(
	conn: &mut PgConnection,
	job_id: &str,
	events: &[TimelineEvent],
	now: OffsetDateTime,
) -> Result<()> {
	for (position, event) in events.iter().enumerate() {
		let citations = serde_json::to_value(&event.citations)?;

		sqlx::query(
			"\
INSERT INTO events (event_id, job_id, position, date, event_text, citations, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
		)
		.bind(Uuid::new_v4())
		.bind(job_id)
		.bind(position as i32)
		.bind(event.date.as_str())
		.bind(event.event_text.as_str())
		.bind(citations)
		.bind(now)
		.execute(&mut *conn)
		.await?;
	}

	Ok(())
}

/// Ordered by date, then by the model's own ordering.
pub async fn list_events<'e, E>(executor: E, job_id: &str) -> Result<Vec<EventRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, EventRow>(
		"\
SELECT event_id, job_id, position, date, event_text, citations, created_at
FROM events
WHERE job_id = $1
ORDER BY date ASC, position ASC",
	)
	.bind(job_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
