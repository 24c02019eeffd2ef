mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Blobs, ChatProviderConfig, Config, Discovery, EmbeddingProviderConfig, Fetch, Indexing,
	Postgres, Providers, Qdrant, Searxng, SeededProvider, Service, Storage, Synthesis, Worker,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::invalid("storage.postgres.dsn", "must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::invalid("storage.postgres.pool_max_conns", "must be greater than zero."));
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::invalid("storage.qdrant.collection", "must be non-empty."));
	}
	if cfg.storage.blobs.root.as_os_str().is_empty() {
		return Err(Error::invalid("storage.blobs.root", "must be non-empty."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::invalid("providers.embedding.dimensions", "must be greater than zero."));
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::invalid(
			"providers.embedding.dimensions",
			"must match storage.qdrant.vector_dim.",
		));
	}
	if !cfg.providers.chat.temperature.is_finite() || cfg.providers.chat.temperature < 0.0 {
		return Err(Error::invalid(
			"providers.chat.temperature",
			"must be a finite number, zero or greater.",
		));
	}

	for (field, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.chat.timeout_ms", cfg.providers.chat.timeout_ms),
		("discovery.timeout_ms", cfg.discovery.timeout_ms),
		("fetch.timeout_ms", cfg.fetch.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::invalid(field, "must be greater than zero."));
		}
	}

	if let Some(searxng) = cfg.discovery.searxng.as_ref()
		&& searxng.enabled
		&& searxng.base_url.trim().is_empty()
	{
		return Err(Error::invalid(
			"discovery.searxng.base_url",
			"must be non-empty when the provider is enabled.",
		));
	}

	for (field, provider) in [
		("discovery.sitemap.domains", cfg.discovery.sitemap.as_ref()),
		("discovery.wordpress.domains", cfg.discovery.wordpress.as_ref()),
	] {
		if let Some(provider) = provider
			&& provider.enabled
			&& provider.domains.is_empty()
		{
			return Err(Error::invalid(field, "must be non-empty when the provider is enabled."));
		}
	}

	if cfg.fetch.user_agent.trim().is_empty() {
		return Err(Error::invalid("fetch.user_agent", "must be non-empty."));
	}
	if cfg.indexing.min_text_chars == 0 {
		return Err(Error::invalid("indexing.min_text_chars", "must be greater than zero."));
	}
	if cfg.indexing.chunk_chars == 0 {
		return Err(Error::invalid("indexing.chunk_chars", "must be greater than zero."));
	}
	if cfg.indexing.embed_input_chars == 0
		|| cfg.indexing.embed_input_chars > cfg.indexing.chunk_chars
	{
		return Err(Error::invalid(
			"indexing.embed_input_chars",
			"must be greater than zero and at most indexing.chunk_chars.",
		));
	}
	if cfg.indexing.embed_batch_size == 0 {
		return Err(Error::invalid("indexing.embed_batch_size", "must be greater than zero."));
	}
	if cfg.synthesis.context_hits == 0 {
		return Err(Error::invalid("synthesis.context_hits", "must be greater than zero."));
	}
	if cfg.worker.concurrency == 0 {
		return Err(Error::invalid("worker.concurrency", "must be greater than zero."));
	}
	if cfg.worker.task_lease_seconds <= 0 {
		return Err(Error::invalid("worker.task_lease_seconds", "must be greater than zero."));
	}
	if cfg.worker.finalize_delay_seconds < 0 {
		return Err(Error::invalid("worker.finalize_delay_seconds", "must be zero or greater."));
	}
	if cfg.worker.finalize_retry_seconds <= 0 {
		return Err(Error::invalid("worker.finalize_retry_seconds", "must be greater than zero."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_key in [&mut cfg.providers.embedding.api_key, &mut cfg.providers.chat.api_key] {
		if api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			*api_key = None;
		}
	}

	for provider in [cfg.discovery.sitemap.as_mut(), cfg.discovery.wordpress.as_mut()]
		.into_iter()
		.flatten()
	{
		provider.domains.retain(|domain| !domain.trim().is_empty());

		for domain in &mut provider.domains {
			*domain = domain.trim().trim_end_matches('/').to_string();
		}
	}
	if let Some(searxng) = cfg.discovery.searxng.as_mut() {
		searxng.base_url = searxng.base_url.trim().trim_end_matches('/').to_string();
	}
}
