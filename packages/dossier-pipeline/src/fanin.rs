//! Completion is inferred from persisted rows. Any stage exit that may settle the last document
//! calls [`Pipeline::check_fan_in`]; the delayed finalize task repeats the decision until the job
//! leaves `fetching`.

use dossier_domain::{
	fanin::{self, FanInDecision, FinalizeDecision},
	status::JobStatus,
};
use dossier_storage::{documents, jobs, sources, tasks::Task};

use crate::{Pipeline, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
	/// This caller moved the job to `analyzing` and enqueued synthesis.
	Dispatched,
	/// Another caller got there first, or the job is already finished.
	Closed,
}

impl Pipeline {
	/// Opportunistic check after a stage exit. Never completes an empty job; that is left to
	/// the finalize task, which knows whether sources are still in flight.
	pub async fn check_fan_in(&self, job_id: &str) -> Result<FanInDecision> {
		let Some(job) = jobs::get_job(&self.db.pool, job_id).await? else {
			return Ok(FanInDecision::Settled);
		};
		let counts = documents::count_documents(&self.db.pool, job_id).await?;
		let decision = fanin::evaluate(job.status()?, counts);

		if decision == FanInDecision::Ready {
			self.open_analysis_gate(job_id).await?;
		}

		tracing::debug!(
			job_id = %job_id,
			total = counts.total,
			pending = counts.pending,
			decision = ?decision,
			"Fan-in evaluated."
		);

		Ok(decision)
	}

	/// Moves the job to `analyzing` and enqueues synthesis in one transaction. The conditional
	/// update admits exactly one caller per job.
	pub async fn open_analysis_gate(&self, job_id: &str) -> Result<GateOutcome> {
		let now = crate::now();
		let mut tx = self.db.pool.begin().await?;

		if !jobs::enter_analyzing(&mut *tx, job_id, now).await? {
			tx.rollback().await?;

			return Ok(GateOutcome::Closed);
		}

		Self::schedule(&mut *tx, &Task::Synthesize { job_id: job_id.to_string() }, now, 0).await?;
		tx.commit().await?;

		tracing::info!(job_id = %job_id, "Job entered analysis.");

		Ok(GateOutcome::Dispatched)
	}

	/// The safety net scheduled at discovery time.
	pub async fn finalize_job(&self, job_id: &str) -> Result<()> {
		let Some(job) = jobs::get_job(&self.db.pool, job_id).await? else {
			tracing::warn!(job_id = %job_id, "Finalize skipped for unknown job.");

			return Ok(());
		};
		let status: JobStatus = job.status()?;
		let counts = documents::count_documents(&self.db.pool, job_id).await?;
		let queued_sources = sources::count_queued_sources(&self.db.pool, job_id).await?;
		let decision = fanin::decide_finalize(status, counts, queued_sources);

		tracing::info!(
			job_id = %job_id,
			status = %status,
			total = counts.total,
			pending = counts.pending,
			queued_sources,
			decision = ?decision,
			"Finalize evaluated."
		);

		match decision {
			FinalizeDecision::NoOp => {},
			FinalizeDecision::Dispatch => {
				self.open_analysis_gate(job_id).await?;
			},
			FinalizeDecision::CompleteEmpty => {
				if jobs::complete_empty_job(&self.db.pool, job_id, crate::now()).await? {
					tracing::info!(job_id = %job_id, "Job completed without documents.");
				} else {
					// Something moved between the read and the write; look again later.
					self.reschedule_finalize(job_id).await?;
				}
			},
			FinalizeDecision::Reschedule => self.reschedule_finalize(job_id).await?,
		}

		Ok(())
	}

	async fn reschedule_finalize(&self, job_id: &str) -> Result<()> {
		Self::schedule(
			&self.db.pool,
			&Task::Finalize { job_id: job_id.to_string() },
			crate::now(),
			self.cfg.worker.finalize_retry_seconds,
		)
		.await
	}
}
