use reqwest::header::CONTENT_TYPE;
use uuid::Uuid;

use dossier_domain::{content, status::SourceStatus};
use dossier_storage::{
	documents::{self, NewDocument},
	sources,
	tasks::{FetchItem, Task},
};

use crate::{Pipeline, Result};

/// Bytes of a successful retrieval.
struct Retrieved {
	content_type: String,
	body: Vec<u8>,
}

impl Pipeline {
	pub async fn fetch_source(
		&self,
		job_id: &str,
		source_id: Uuid,
		item: &FetchItem,
	) -> Result<()> {
		let Some(source) = sources::get_source(&self.db.pool, source_id).await? else {
			tracing::warn!(
				job_id = %job_id,
				source_id = %source_id,
				"Fetch skipped for unknown source."
			);

			return Ok(());
		};

		if source.status()? != SourceStatus::Queued {
			tracing::debug!(
				source_id = %source_id,
				status = %source.status,
				"Source already fetched."
			);

			return Ok(());
		}

		let user_agent = self.cfg.fetch.user_agent.as_str();

		if !self.collaborators.fetch_policy.allowed(&item.url, user_agent).await {
			self.settle_source(job_id, source_id, SourceStatus::BlockedByRobots).await?;

			tracing::info!(
				job_id = %job_id,
				source_id = %source_id,
				url = %item.url,
				"Fetch blocked by robots policy."
			);

			return self.check_fan_in(job_id).await.map(|_| ());
		}

		let retrieved = match self.retrieve(&item.url).await {
			Ok(retrieved) => retrieved,
			Err(err) => {
				tracing::warn!(
					error = %err,
					job_id = %job_id,
					source_id = %source_id,
					url = %item.url,
					"Fetch failed."
				);

				self.settle_source(job_id, source_id, SourceStatus::FetchFailed).await?;

				return self.check_fan_in(job_id).await.map(|_| ());
			},
		};
		let class = content::classify(&retrieved.content_type, &item.url);
		let mime_type = content::document_mime(&retrieved.content_type, class);
		let digest = blake3::hash(&retrieved.body).to_hex();
		let key = format!("jobs/{job_id}/raw/{}.{}", &digest[..12], class.extension());
		let file_path =
			match self.collaborators.blobs.put(&key, &retrieved.body, &mime_type).await {
				Ok(locator) => locator,
				Err(err) => {
					tracing::warn!(
						error = %err,
						job_id = %job_id,
						source_id = %source_id,
						key = %key,
						"Raw blob write failed."
					);

					self.settle_source(job_id, source_id, SourceStatus::FetchFailed).await?;

					return self.check_fan_in(job_id).await.map(|_| ());
				},
			};
		let now = crate::now();
		let mut tx = self.db.pool.begin().await?;

		if !sources::transition_source(
			&mut *tx,
			source_id,
			SourceStatus::Queued,
			SourceStatus::Fetched,
			now,
		)
		.await?
		{
			tx.rollback().await?;

			return Ok(());
		}

		let document_id = documents::insert_document(
			&mut *tx,
			&NewDocument { job_id, source_id, file_path: &file_path, mime_type: &mime_type },
			now,
		)
		.await?;

		Self::schedule(
			&mut *tx,
			&Task::Normalize { job_id: job_id.to_string(), document_id },
			now,
			0,
		)
		.await?;
		tx.commit().await?;

		tracing::info!(
			job_id = %job_id,
			source_id = %source_id,
			document_id = %document_id,
			mime_type = %mime_type,
			bytes = retrieved.body.len(),
			"Source fetched."
		);

		Ok(())
	}

	async fn retrieve(&self, url: &str) -> color_eyre::Result<Retrieved> {
		let response = self.http.get(url).send().await?.error_for_status()?;
		let content_type = response
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.unwrap_or_default()
			.to_string();
		let body = response.bytes().await?.to_vec();

		Ok(Retrieved { content_type, body })
	}

	async fn settle_source(&self, job_id: &str, source_id: Uuid, to: SourceStatus) -> Result<()> {
		let moved = sources::transition_source(
			&self.db.pool,
			source_id,
			SourceStatus::Queued,
			to,
			crate::now(),
		)
		.await?;

		if moved {
			tracing::info!(
				job_id = %job_id,
				source_id = %source_id,
				status = %to,
				"Source settled."
			);
		}

		Ok(())
	}
}
