use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub discovery: Discovery,
	#[serde(default)]
	pub fetch: Fetch,
	#[serde(default)]
	pub indexing: Indexing,
	#[serde(default)]
	pub synthesis: Synthesis,
	#[serde(default)]
	pub worker: Worker,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
	pub blobs: Blobs,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

/// Raw and normalized document bytes live under `root`, keyed by job.
#[derive(Debug, Deserialize)]
pub struct Blobs {
	pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub chat: ChatProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: Option<String>,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChatProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: Option<String>,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Discovery {
	#[serde(default = "default_discovery_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub searxng: Option<Searxng>,
	#[serde(default)]
	pub sitemap: Option<SeededProvider>,
	#[serde(default)]
	pub wordpress: Option<SeededProvider>,
}
impl Default for Discovery {
	fn default() -> Self {
		Self { timeout_ms: default_discovery_timeout_ms(), searxng: None, sitemap: None, wordpress: None }
	}
}

#[derive(Debug, Deserialize)]
pub struct Searxng {
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub base_url: String,
	#[serde(default = "default_searxng_max_results")]
	pub max_results: u32,
}

/// A provider that searches a fixed list of seed domains.
#[derive(Debug, Deserialize)]
pub struct SeededProvider {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default)]
	pub domains: Vec<String>,
	#[serde(default = "default_seeded_max_results")]
	pub max_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Fetch {
	pub user_agent: String,
	pub timeout_ms: u64,
	pub respect_robots: bool,
}
impl Default for Fetch {
	fn default() -> Self {
		Self { user_agent: "DossierBot".to_string(), timeout_ms: 30_000, respect_robots: true }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Indexing {
	/// Normalized text shorter than this, after trimming, is rejected.
	pub min_text_chars: u32,
	pub chunk_chars: u32,
	pub embed_input_chars: u32,
	pub payload_text_chars: u32,
	pub embed_batch_size: u32,
}
impl Default for Indexing {
	fn default() -> Self {
		Self {
			min_text_chars: 200,
			chunk_chars: 1_500,
			embed_input_chars: 1_000,
			payload_text_chars: 1_200,
			embed_batch_size: 16,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Synthesis {
	pub context_hits: u32,
	pub context_text_chars: u32,
	/// Below this many events the first attempt is retried once.
	pub min_events: u32,
}
impl Default for Synthesis {
	fn default() -> Self {
		Self { context_hits: 16, context_text_chars: 600, min_events: 8 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub concurrency: u32,
	pub poll_interval_ms: u64,
	pub task_lease_seconds: i64,
	pub finalize_delay_seconds: i64,
	pub finalize_retry_seconds: i64,
}
impl Default for Worker {
	fn default() -> Self {
		Self {
			concurrency: 4,
			poll_interval_ms: 500,
			task_lease_seconds: 120,
			finalize_delay_seconds: 300,
			finalize_retry_seconds: 120,
		}
	}
}

fn default_true() -> bool {
	true
}

fn default_discovery_timeout_ms() -> u64 {
	20_000
}

fn default_searxng_max_results() -> u32 {
	15
}

fn default_seeded_max_results() -> u32 {
	10
}
