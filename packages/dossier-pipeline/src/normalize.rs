use uuid::Uuid;

use dossier_domain::status::DocumentStatus;
use dossier_storage::{documents, tasks::Task};

use crate::{Pipeline, Result};

const TEXT_MIME: &str = "text/plain; charset=utf-8";

impl Pipeline {
	pub async fn normalize_document(&self, job_id: &str, document_id: Uuid) -> Result<()> {
		let Some(document) = documents::get_document(&self.db.pool, document_id).await? else {
			tracing::warn!(
				job_id = %job_id,
				document_id = %document_id,
				"Normalize skipped for unknown document."
			);

			return Ok(());
		};

		// `normalizing` is left behind by an attempt that died midway.
		if !matches!(document.status()?, DocumentStatus::Fetched | DocumentStatus::Normalizing) {
			return Ok(());
		}

		documents::transition_document(
			&self.db.pool,
			document_id,
			&[DocumentStatus::Fetched],
			DocumentStatus::Normalizing,
			crate::now(),
		)
		.await?;

		let raw = match self.collaborators.blobs.get(&document.file_path).await {
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(
					error = %err,
					job_id = %job_id,
					document_id = %document_id,
					"Raw bytes unreadable."
				);

				return self.fail_normalize(job_id, document_id).await;
			},
		};
		let text = extract_off_runtime(raw, document.mime_type.clone()).await;
		let key = format!("jobs/{job_id}/normalized/{document_id}.txt");
		let text_path = match self.collaborators.blobs.put(&key, text.as_bytes(), TEXT_MIME).await {
			Ok(locator) => locator,
			Err(err) => {
				tracing::warn!(
					error = %err,
					job_id = %job_id,
					document_id = %document_id,
					"Normalized text not persisted."
				);

				return self.fail_normalize(job_id, document_id).await;
			},
		};
		let now = crate::now();
		let mut tx = self.db.pool.begin().await?;

		if !documents::mark_document_normalized(&mut *tx, document_id, &text_path, now).await? {
			tx.rollback().await?;

			return Ok(());
		}

		Self::schedule(&mut *tx, &Task::Index { job_id: job_id.to_string(), document_id }, now, 0)
			.await?;
		tx.commit().await?;

		tracing::info!(
			job_id = %job_id,
			document_id = %document_id,
			chars = text.chars().count(),
			"Document normalized."
		);

		Ok(())
	}

	/// This document stops here, so the fan-in check runs now rather than after indexing.
	async fn fail_normalize(&self, job_id: &str, document_id: Uuid) -> Result<()> {
		documents::transition_document(
			&self.db.pool,
			document_id,
			&[DocumentStatus::Fetched, DocumentStatus::Normalizing],
			DocumentStatus::NormalizeFailed,
			crate::now(),
		)
		.await?;
		self.check_fan_in(job_id).await?;

		Ok(())
	}
}

/// Extraction is CPU-bound and the PDF extractor may panic; a lost task yields empty text.
async fn extract_off_runtime(raw: Vec<u8>, mime_type: String) -> String {
	let extraction =
		tokio::task::spawn_blocking(move || dossier_providers::extract::extract_text(&raw, &mime_type));

	match extraction.await {
		Ok(text) => text,
		Err(err) => {
			tracing::warn!(error = %err, "Text extraction task failed.");

			String::new()
		},
	}
}
