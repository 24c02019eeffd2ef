use uuid::Uuid;

use dossier_domain::{
	chunking::{self, truncate_chars},
	content,
	status::DocumentStatus,
};
use dossier_storage::{
	documents,
	models::DocumentContext,
	qdrant::{self, ChunkPayload, ChunkPoint},
};

use crate::{Error, Pipeline, Result};

impl Pipeline {
	/// The terminal stage for a document. Always ends with the fan-in check.
	pub async fn index_document(&self, job_id: &str, document_id: Uuid) -> Result<()> {
		let Some(document) = documents::get_document(&self.db.pool, document_id).await? else {
			tracing::warn!(
				job_id = %job_id,
				document_id = %document_id,
				"Index skipped for unknown document."
			);

			return Ok(());
		};

		if document.status()? != DocumentStatus::Normalized {
			return Ok(());
		}

		let outcome = match self.load_text(document.text_path.as_deref()).await {
			Some(text)
				if content::passes_content_gate(&text, self.cfg.indexing.min_text_chars as usize) =>
				self.embed_and_upsert(document_id, &text).await,
			_ => {
				tracing::info!(
					job_id = %job_id,
					document_id = %document_id,
					min_chars = self.cfg.indexing.min_text_chars,
					"Too little text to index."
				);

				Err(Error::InvalidRequest {
					message: "Normalized text is below the minimum length.".to_string(),
				})
			},
		};
		let to = match &outcome {
			Ok(chunks) => {
				tracing::info!(job_id = %job_id, document_id = %document_id, chunks, "Document indexed.");

				DocumentStatus::Indexed
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					job_id = %job_id,
					document_id = %document_id,
					"Indexing failed."
				);

				DocumentStatus::IndexFailed
			},
		};

		documents::transition_document(
			&self.db.pool,
			document_id,
			&[DocumentStatus::Normalized],
			to,
			crate::now(),
		)
		.await?;
		self.check_fan_in(job_id).await?;

		Ok(())
	}

	async fn load_text(&self, text_path: Option<&str>) -> Option<String> {
		let bytes = self.collaborators.blobs.get(text_path?).await.ok()?;

		Some(String::from_utf8_lossy(&bytes).into_owned())
	}

	/// Returns the number of chunks written. Nothing reaches the vector store unless every
	/// batch embeds.
	async fn embed_and_upsert(&self, document_id: Uuid, text: &str) -> Result<usize> {
		let context = documents::get_document_context(&self.db.pool, document_id)
			.await?
			.ok_or_else(|| Error::NotFound {
				message: format!("Document {document_id} has no source."),
			})?;
		let indexing = &self.cfg.indexing;
		let batch_size = indexing.embed_batch_size.max(1) as usize;
		let chunks = chunking::chunk_text(text, indexing.chunk_chars as usize);
		let mut points = Vec::with_capacity(chunks.len());

		for batch in chunks.chunks(batch_size) {
			let inputs: Vec<String> = batch
				.iter()
				.map(|chunk| truncate_chars(chunk, indexing.embed_input_chars as usize).to_string())
				.collect();
			let vectors =
				self.collaborators.embedding.embed(&self.cfg.providers.embedding, &inputs).await?;

			if vectors.len() != batch.len() {
				return Err(Error::Provider {
					message: format!(
						"Embedding provider returned {} vectors for {} chunks.",
						vectors.len(),
						batch.len()
					),
				});
			}

			for (chunk, vector) in batch.iter().zip(vectors) {
				let chunk_index = points.len() as u32;

				points.push(chunk_point(
					&context,
					chunk_index,
					chunk,
					vector,
					indexing.payload_text_chars as usize,
				));
			}
		}

		let written = points.len();

		self.collaborators.vectors.upsert(points).await?;

		Ok(written)
	}
}

fn chunk_point(
	context: &DocumentContext,
	chunk_index: u32,
	chunk: &str,
	vector: Vec<f32>,
	payload_text_chars: usize,
) -> ChunkPoint {
	ChunkPoint {
		point_id: qdrant::chunk_point_id(context.document_id, chunk_index),
		vector,
		payload: ChunkPayload {
			job_id: context.job_id.clone(),
			person: context.person.clone(),
			source_url: context.source_url.clone(),
			published_at: context.published_at.clone(),
			kind: context.kind.clone(),
			text: truncate_chars(chunk, payload_text_chars).to_string(),
			document_id: context.document_id,
			chunk_index,
		},
	}
}
