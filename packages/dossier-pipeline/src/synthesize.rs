//! Timeline synthesis: retrieve job-scoped context, prompt the chat backend, and persist the
//! parsed events together with the `analyzing -> complete` transition.

use dossier_domain::{
	chunking::truncate_chars,
	status::JobStatus,
	timeline::{self, TimelineEvent},
};
use dossier_storage::{events, jobs, qdrant::ChunkHit};

use crate::{Error, Pipeline, Result};

const SYSTEM_PROMPT: &str = "\
You are a precise analyst. Use ONLY the provided context. Respond with a single JSON object \
ONLY, no prose, in this schema: \
{\"timeline\":[{\"date\":\"YYYY-MM-DD or YYYY\",\"event\":\"...\",\"citations\":[{\"url\":\"...\",\"label\":\"source\"}]}]}";

impl Pipeline {
	/// Any failure here is terminal for the job: it moves to `analysis_failed` and no events
	/// from the attempt are kept.
	pub async fn synthesize_timeline(&self, job_id: &str) -> Result<()> {
		let Some(job) = jobs::get_job(&self.db.pool, job_id).await? else {
			tracing::warn!(job_id = %job_id, "Synthesis skipped for unknown job.");

			return Ok(());
		};

		if job.status()? != JobStatus::Analyzing {
			tracing::debug!(
				job_id = %job_id,
				status = %job.status,
				"Synthesis skipped outside analysis."
			);

			return Ok(());
		}

		let outcome = match self.draft_timeline(job_id, &job.person).await {
			Ok(events) => self.complete_job(job_id, &events).await,
			Err(err) => Err(err),
		};

		// A failed persist rolls back with its transaction, so only the status change lands.
		if let Err(err) = outcome {
			tracing::warn!(error = %err, job_id = %job_id, "Timeline synthesis failed.");

			jobs::transition_job(
				&self.db.pool,
				job_id,
				&[JobStatus::Analyzing],
				JobStatus::AnalysisFailed,
				crate::now(),
			)
			.await?;
		}

		Ok(())
	}

	async fn draft_timeline(&self, job_id: &str, person: &str) -> Result<Vec<TimelineEvent>> {
		let synthesis = &self.cfg.synthesis;
		let query = format!("Key dated events for {person}. Provide event date and description.");
		let mut vectors = self
			.collaborators
			.embedding
			.embed(&self.cfg.providers.embedding, std::slice::from_ref(&query))
			.await?;
		let vector = vectors.pop().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vector for the timeline query.".to_string(),
		})?;
		let hits = self
			.collaborators
			.vectors
			.search(vector, job_id, u64::from(synthesis.context_hits))
			.await?;
		let context = build_context(&hits, synthesis.context_text_chars as usize);
		let user_prompt = user_prompt(person, &context);
		let first = self.ask_for_timeline(&user_prompt).await?;

		if first.len() >= synthesis.min_events as usize {
			return Ok(first);
		}

		tracing::info!(
			job_id = %job_id,
			events = first.len(),
			min_events = synthesis.min_events,
			"Timeline is short; asking again."
		);

		let second = self.ask_for_timeline(&user_prompt).await?;

		Ok(if second.len() > first.len() { second } else { first })
	}

	async fn ask_for_timeline(&self, user_prompt: &str) -> Result<Vec<TimelineEvent>> {
		let raw = self
			.collaborators
			.chat
			.complete(&self.cfg.providers.chat, SYSTEM_PROMPT, user_prompt)
			.await?;

		if timeline::extract_json(&raw).is_none() {
			return Err(Error::Provider { message: "Chat response contains no JSON.".to_string() });
		}

		Ok(timeline::parse_timeline(&raw))
	}

	async fn complete_job(&self, job_id: &str, events: &[TimelineEvent]) -> Result<()> {
		let now = crate::now();
		let mut tx = self.db.pool.begin().await?;

		if !jobs::transition_job(&mut *tx, job_id, &[JobStatus::Analyzing], JobStatus::Complete, now)
			.await?
		{
			tx.rollback().await?;

			return Ok(());
		}

		events::insert_events(&mut *tx, job_id, events, now).await?;
		tx.commit().await?;

		tracing::info!(job_id = %job_id, events = events.len(), "Timeline persisted.");

		Ok(())
	}
}

/// One numbered line per hit: `[i] date text (src: url)`.
fn build_context(hits: &[ChunkHit], text_chars: usize) -> String {
	hits.iter()
		.enumerate()
		.map(|(i, hit)| {
			let payload = &hit.payload;
			let flattened = payload.text.replace(['\r', '\n'], " ");

			format!(
				"[{}] {} {} (src: {})",
				i + 1,
				payload.published_at.as_deref().unwrap_or_default(),
				truncate_chars(&flattened, text_chars),
				payload.source_url
			)
		})
		.collect::<Vec<_>>()
		.join("\n")
}

fn user_prompt(person: &str, context: &str) -> String {
	format!(
		"Context:\n{context}\n\nTask: Extract 3–5 key dated events about {person}. Every event MUST \
		 have a date string and citations using the src URLs. Respond with JSON ONLY matching the \
		 schema above."
	)
}
