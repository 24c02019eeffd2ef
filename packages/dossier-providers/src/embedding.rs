use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Embeds `texts` in order. OpenAI-style endpoints take the whole batch; the Ollama
/// `/api/embeddings` endpoint takes one prompt per request.
pub async fn embed(
	cfg: &dossier_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let headers = crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;
	let vectors = if takes_single_prompt(cfg) {
		let mut vectors = Vec::with_capacity(texts.len());

		for text in texts {
			let body = serde_json::json!({ "model": cfg.model, "prompt": text });
			let res = client.post(&url).headers(headers.clone()).json(&body).send().await?;
			let json: Value = res.error_for_status()?.json().await?;

			vectors.extend(parse_embedding_response(json)?);
		}

		vectors
	} else {
		let body = serde_json::json!({
			"model": cfg.model,
			"input": texts,
			"dimensions": cfg.dimensions,
		});
		let res = client.post(&url).headers(headers).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;

		parse_embedding_response(json)?
	};

	if vectors.len() != texts.len() {
		return Err(eyre::eyre!(
			"Embedding provider returned {} vectors for {} inputs.",
			vectors.len(),
			texts.len()
		));
	}
	if let Some(vector) = vectors.iter().find(|vector| vector.len() != cfg.dimensions as usize) {
		return Err(eyre::eyre!(
			"Embedding dimension mismatch. Expected {}, got {}.",
			cfg.dimensions,
			vector.len()
		));
	}

	Ok(vectors)
}

fn takes_single_prompt(cfg: &dossier_config::EmbeddingProviderConfig) -> bool {
	cfg.path.trim_end_matches('/').ends_with("/api/embeddings")
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	if let Some(data) = json.get("data").and_then(|v| v.as_array()) {
		let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

		for (fallback_index, item) in data.iter().enumerate() {
			let index = item
				.get("index")
				.and_then(|v| v.as_u64())
				.map(|v| v as usize)
				.unwrap_or(fallback_index);
			let embedding = item
				.get("embedding")
				.ok_or_else(|| eyre::eyre!("Embedding item missing embedding array."))?;

			indexed.push((index, parse_vector(embedding)?));
		}

		indexed.sort_by_key(|(index, _)| *index);

		return Ok(indexed.into_iter().map(|(_, vec)| vec).collect());
	}
	if let Some(embedding) = json.get("embedding") {
		return Ok(vec![parse_vector(embedding)?]);
	}
	if let Some(embeddings) = json.get("embeddings").and_then(|v| v.as_array()) {
		return embeddings.iter().map(parse_vector).collect();
	}

	Err(eyre::eyre!("Embedding response has neither data nor embedding."))
}

fn parse_vector(value: &Value) -> Result<Vec<f32>> {
	let values = value.as_array().ok_or_else(|| eyre::eyre!("Embedding must be an array."))?;

	values
		.iter()
		.map(|value| {
			value
				.as_f64()
				.map(|number| number as f32)
				.ok_or_else(|| eyre::eyre!("Embedding value must be numeric."))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_openai_data_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn parses_ollama_single_embedding() {
		let parsed = parse_embedding_response(serde_json::json!({ "embedding": [0.25, 0.75] }))
			.expect("parse failed");

		assert_eq!(parsed, vec![vec![0.25, 0.75]]);
	}

	#[test]
	fn rejects_non_numeric_values() {
		assert!(parse_embedding_response(serde_json::json!({ "embedding": ["x"] })).is_err());
		assert!(parse_embedding_response(serde_json::json!({ "result": [] })).is_err());
	}
}
