use std::{
	sync::{Arc, LazyLock},
	time::Duration as StdDuration,
};

use regex::Regex;
use time::{Duration, OffsetDateTime};
use tokio::{task::JoinSet, time as tokio_time};

use dossier_pipeline::Pipeline;
use dossier_storage::{models::TaskRow, tasks};

use crate::{Error, Result};

const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_TASK_ERROR_CHARS: usize = 1_024;

/// Runs `worker.concurrency` claim loops until one of them stops.
pub async fn run_worker(pipeline: Arc<Pipeline>) -> Result<()> {
	let concurrency = pipeline.cfg.worker.concurrency.max(1);
	let mut loops = JoinSet::new();

	for slot in 0..concurrency {
		loops.spawn(claim_loop(pipeline.clone(), slot));
	}

	// Loops never return on their own; reaching this means one panicked.
	match loops.join_next().await {
		Some(Err(err)) => Err(Error::LoopStopped { message: err.to_string() }),
		_ => Ok(()),
	}
}

async fn claim_loop(pipeline: Arc<Pipeline>, slot: u32) {
	let poll_interval = StdDuration::from_millis(pipeline.cfg.worker.poll_interval_ms);

	tracing::debug!(slot, "Claim loop started.");

	loop {
		match process_once(&pipeline).await {
			Ok(true) => continue,
			Ok(false) => {},
			Err(err) => tracing::error!(error = %err, slot, "Task queue processing failed."),
		}

		tokio_time::sleep(poll_interval).await;
	}
}

/// Claims and runs at most one task. Returns whether a task was claimed.
pub async fn process_once(pipeline: &Pipeline) -> Result<bool> {
	let now = OffsetDateTime::now_utc();
	let lease_seconds = pipeline.cfg.worker.task_lease_seconds;
	let Some(row) = tasks::claim_next_task(&pipeline.db, now, lease_seconds).await? else {
		return Ok(false);
	};
	let result = match row.task() {
		Ok(task) => pipeline.run_task(&task).await.map_err(Error::from),
		Err(err) => Err(Error::from(err)),
	};

	match result {
		Ok(()) => {
			tasks::mark_task_done(&pipeline.db, row.task_id, OffsetDateTime::now_utc()).await?;
		},
		Err(err) => {
			mark_failed(pipeline, &row, &err).await?;
			tracing::error!(
				error = %err,
				task_id = %row.task_id,
				job_id = %row.job_id,
				kind = %row.kind,
				"Task failed."
			);
		},
	}

	Ok(true)
}

async fn mark_failed(pipeline: &Pipeline, row: &TaskRow, err: &Error) -> Result<()> {
	let attempts = row.attempts.saturating_add(1);
	let now = OffsetDateTime::now_utc();
	let error_text = sanitize_task_error(&err.to_string());

	tasks::mark_task_failed(
		&pipeline.db,
		row.task_id,
		attempts,
		&error_text,
		now + backoff_for_attempt(attempts),
		now,
	)
	.await?;

	Ok(())
}

fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);

	Duration::milliseconds(base.min(MAX_BACKOFF_MS))
}

/// Credential shapes that show up in provider and storage errors: passwords in connection
/// URLs, auth headers echoed back, and key-like query or body parameters.
static REDACTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	[
		r"(?i)\b([a-z][a-z0-9+.-]*://[^/\s:@]+:)[^@\s/]+@",
		r#"(?i)\b(authorization"?\s*[:=]\s*"?(?:bearer\s+|basic\s+|token\s+)?)[^\s",;)]+"#,
		r"(?i)\b(bearer\s+)[a-z0-9._~+/=-]+",
		r#"(?i)\b((?:x-api-key|api[_-]?key|access_token|token|secret|password|key)"?\s*[:=]\s*"?)[^\s",;&)#]+"#,
	]
	.into_iter()
	.filter_map(|pattern| Regex::new(pattern).ok())
	.collect()
});

/// Keeps the text around each secret and replaces only the secret itself, then truncates.
fn sanitize_task_error(text: &str) -> String {
	let mut out = text.to_string();

	for redaction in REDACTIONS.iter() {
		out = redaction.replace_all(&out, "${1}[REDACTED]").into_owned();
	}

	if let Some((cut, _)) = out.char_indices().nth(MAX_TASK_ERROR_CHARS) {
		out.truncate(cut);
		out.push_str("...");
	}

	out
}
