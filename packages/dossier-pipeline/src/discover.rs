use dossier_domain::{
	discovery::{self, Constraints, DiscoveryItem},
	status::JobStatus,
};
use dossier_storage::{
	jobs, sources,
	tasks::{FetchItem, Task},
};

use crate::{Pipeline, Result};

impl Pipeline {
	/// Queries every provider, persists one source per distinct URL, and fans out fetch tasks.
	pub async fn run_discovery(&self, job_id: &str) -> Result<()> {
		let Some(job) = jobs::get_job(&self.db.pool, job_id).await? else {
			tracing::warn!(job_id = %job_id, "Discovery skipped for unknown job.");

			return Ok(());
		};

		// A redelivered task may find discovery already committed.
		if !jobs::transition_job(
			&self.db.pool,
			job_id,
			&[JobStatus::Queued, JobStatus::Discovering],
			JobStatus::Discovering,
			crate::now(),
		)
		.await?
		{
			tracing::info!(job_id = %job_id, status = %job.status, "Discovery already ran.");

			return Ok(());
		}

		let constraints: Constraints =
			serde_json::from_value(job.constraints.clone()).unwrap_or_default();
		let items = self.collect_items(job_id, &job.person, &constraints).await;
		let unique = discovery::dedup_items(items);
		let now = crate::now();
		let mut tx = self.db.pool.begin().await?;
		let mut dispatched = 0_usize;

		for item in &unique {
			let Some(source_id) = sources::insert_source(&mut *tx, job_id, item, now).await? else {
				continue;
			};
			let task = Task::Fetch {
				job_id: job_id.to_string(),
				source_id,
				item: FetchItem { url: item.url.clone(), kind: item.kind },
			};

			Self::schedule(&mut *tx, &task, now, 0).await?;

			dispatched += 1;
		}

		Self::schedule(
			&mut *tx,
			&Task::Finalize { job_id: job_id.to_string() },
			now,
			self.cfg.worker.finalize_delay_seconds,
		)
		.await?;
		jobs::transition_job(&mut *tx, job_id, &[JobStatus::Discovering], JobStatus::Fetching, now)
			.await?;
		tx.commit().await?;

		tracing::info!(
			job_id = %job_id,
			unique = unique.len(),
			dispatched,
			"Discovery dispatched fetch tasks."
		);

		Ok(())
	}

	/// Provider failures are logged and skipped; discovery continues with whatever succeeded.
	async fn collect_items(
		&self,
		job_id: &str,
		person: &str,
		constraints: &Constraints,
	) -> Vec<DiscoveryItem> {
		let mut items = Vec::new();

		for provider in &self.collaborators.discovery {
			match provider.discover(person, constraints).await {
				Ok(found) => {
					tracing::info!(
						job_id = %job_id,
						provider = provider.name(),
						count = found.len(),
						"Provider returned items."
					);

					items.extend(found);
				},
				Err(err) => {
					tracing::warn!(
						error = %err,
						job_id = %job_id,
						provider = provider.name(),
						"Discovery provider failed."
					);
				},
			}
		}

		items
	}
}
