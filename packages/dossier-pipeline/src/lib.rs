//! The research pipeline: job submission, per-stage task handlers, and the fan-in gate that
//! decides when a job is ready for timeline synthesis.

pub mod discover;
pub mod fanin;
pub mod fetch;
pub mod index;
pub mod jobs;
pub mod normalize;
pub mod synthesize;
pub mod time_serde;

mod error;

pub use error::{Error, Result};
pub use jobs::{
	DocumentProgress, JobOverview, SourceCounts, SourceView, SubmitJobRequest, SubmitJobResponse,
	TimelineEventView,
};

use std::{future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;

use dossier_config::{ChatProviderConfig, Config, EmbeddingProviderConfig};
use dossier_domain::discovery::{Constraints, DiscoveryItem};
use dossier_providers::{
	chat,
	discovery::{searxng::SearxngProvider, sitemap::SitemapProvider, wordpress::WordpressProvider},
	embedding,
	robots::RobotsPolicy,
};
use dossier_storage::{
	blobs::FsBlobStore,
	db::Db,
	qdrant::{ChunkHit, ChunkPoint, QdrantStore},
	tasks::{self, Task},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A search backend that proposes candidate documents about a person.
pub trait DiscoveryProvider
where
	Self: Send + Sync,
{
	fn name(&self) -> &str;

	/// "No results" is an empty list. Errors are reserved for transport failures.
	fn discover<'a>(
		&'a self,
		person: &'a str,
		constraints: &'a Constraints,
	) -> BoxFuture<'a, color_eyre::Result<Vec<DiscoveryItem>>>;
}

/// Decides whether a URL may be fetched. Lookup failures allow the fetch.
pub trait FetchPolicy
where
	Self: Send + Sync,
{
	fn allowed<'a>(&'a self, url: &'a str, user_agent: &'a str) -> BoxFuture<'a, bool>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a ChatProviderConfig,
		system_prompt: &'a str,
		user_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait BlobStore
where
	Self: Send + Sync,
{
	/// Returns a locator that `get` accepts.
	fn put<'a>(
		&'a self,
		key: &'a str,
		bytes: &'a [u8],
		content_type: &'a str,
	) -> BoxFuture<'a, dossier_storage::Result<String>>;

	fn get<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, dossier_storage::Result<Vec<u8>>>;
}

pub trait VectorStore
where
	Self: Send + Sync,
{
	fn upsert<'a>(&'a self, points: Vec<ChunkPoint>) -> BoxFuture<'a, dossier_storage::Result<()>>;

	/// Nearest chunks, restricted to one job.
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		job_id: &'a str,
		limit: u64,
	) -> BoxFuture<'a, dossier_storage::Result<Vec<ChunkHit>>>;
}

/// Used when `fetch.respect_robots` is off.
pub struct AllowAll;
impl FetchPolicy for AllowAll {
	fn allowed<'a>(&'a self, _url: &'a str, _user_agent: &'a str) -> BoxFuture<'a, bool> {
		Box::pin(async { true })
	}
}

/// Every handle a stage needs besides the database, built once per process.
#[derive(Clone)]
pub struct Collaborators {
	pub discovery: Vec<Arc<dyn DiscoveryProvider>>,
	pub fetch_policy: Arc<dyn FetchPolicy>,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub chat: Arc<dyn ChatProvider>,
	pub blobs: Arc<dyn BlobStore>,
	pub vectors: Arc<dyn VectorStore>,
}
impl Collaborators {
	/// Wires the HTTP providers, the filesystem blob store, and Qdrant from configuration.
	/// Disabled discovery providers are not constructed.
	pub fn from_config(cfg: &Config, qdrant: QdrantStore) -> Result<Self> {
		let discovery_client = dossier_providers::crawl_client(
			&cfg.fetch.user_agent,
			cfg.discovery.timeout_ms,
		)?;
		let mut discovery: Vec<Arc<dyn DiscoveryProvider>> = Vec::new();

		if let Some(searxng) = cfg.discovery.searxng.as_ref().filter(|provider| provider.enabled) {
			discovery.push(Arc::new(SearxngProvider::new(searxng, discovery_client.clone())));
		}
		if let Some(sitemap) = cfg.discovery.sitemap.as_ref().filter(|provider| provider.enabled) {
			discovery.push(Arc::new(SitemapProvider::new(sitemap, discovery_client.clone())));
		}
		if let Some(wordpress) = cfg.discovery.wordpress.as_ref().filter(|provider| provider.enabled)
		{
			discovery.push(Arc::new(WordpressProvider::new(wordpress, discovery_client)));
		}

		let fetch_policy: Arc<dyn FetchPolicy> = if cfg.fetch.respect_robots {
			let robots_client =
				dossier_providers::crawl_client(&cfg.fetch.user_agent, cfg.fetch.timeout_ms)?;

			Arc::new(RobotsPolicy::new(robots_client))
		} else {
			Arc::new(AllowAll)
		};
		let inference = Arc::new(DefaultProviders);

		Ok(Self {
			discovery,
			fetch_policy,
			embedding: inference.clone(),
			chat: inference,
			blobs: Arc::new(FsBlobStore::new(&cfg.storage.blobs)),
			vectors: Arc::new(qdrant),
		})
	}
}

pub struct Pipeline {
	pub cfg: Config,
	pub db: Db,
	/// Client for content retrieval, carrying the crawler user agent and fetch timeout.
	pub http: reqwest::Client,
	pub collaborators: Collaborators,
}
impl Pipeline {
	pub fn new(cfg: Config, db: Db, collaborators: Collaborators) -> Result<Self> {
		let http = dossier_providers::crawl_client(&cfg.fetch.user_agent, cfg.fetch.timeout_ms)?;

		Ok(Self { cfg, db, http, collaborators })
	}

	/// Runs one claimed task. Entity-level failures are recorded as status and return `Ok`;
	/// only infrastructure errors escape, leaving the task for redelivery.
	pub async fn run_task(&self, task: &Task) -> Result<()> {
		match task {
			Task::Discover { job_id } => self.run_discovery(job_id).await,
			Task::Fetch { job_id, source_id, item } =>
				self.fetch_source(job_id, *source_id, item).await,
			Task::Normalize { job_id, document_id } =>
				self.normalize_document(job_id, *document_id).await,
			Task::Index { job_id, document_id } => self.index_document(job_id, *document_id).await,
			Task::Synthesize { job_id } => self.synthesize_timeline(job_id).await,
			Task::Finalize { job_id } => self.finalize_job(job_id).await,
		}
	}

	/// Enqueues `task` to run `delay_seconds` from `now`.
	pub(crate) async fn schedule<'e, E>(
		executor: E,
		task: &Task,
		now: OffsetDateTime,
		delay_seconds: i64,
	) -> Result<()>
	where
		E: sqlx::PgExecutor<'e>,
	{
		tasks::enqueue_task(executor, task, now + time::Duration::seconds(delay_seconds)).await?;

		Ok(())
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl ChatProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a ChatProviderConfig,
		system_prompt: &'a str,
		user_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(chat::complete(cfg, system_prompt, user_prompt))
	}
}

impl DiscoveryProvider for SearxngProvider {
	fn name(&self) -> &str {
		dossier_providers::discovery::searxng::NAME
	}

	fn discover<'a>(
		&'a self,
		person: &'a str,
		constraints: &'a Constraints,
	) -> BoxFuture<'a, color_eyre::Result<Vec<DiscoveryItem>>> {
		Box::pin(SearxngProvider::discover(self, person, constraints))
	}
}

impl DiscoveryProvider for SitemapProvider {
	fn name(&self) -> &str {
		dossier_providers::discovery::sitemap::NAME
	}

	fn discover<'a>(
		&'a self,
		person: &'a str,
		constraints: &'a Constraints,
	) -> BoxFuture<'a, color_eyre::Result<Vec<DiscoveryItem>>> {
		Box::pin(SitemapProvider::discover(self, person, constraints))
	}
}

impl DiscoveryProvider for WordpressProvider {
	fn name(&self) -> &str {
		dossier_providers::discovery::wordpress::NAME
	}

	fn discover<'a>(
		&'a self,
		person: &'a str,
		constraints: &'a Constraints,
	) -> BoxFuture<'a, color_eyre::Result<Vec<DiscoveryItem>>> {
		Box::pin(WordpressProvider::discover(self, person, constraints))
	}
}

impl FetchPolicy for RobotsPolicy {
	fn allowed<'a>(&'a self, url: &'a str, user_agent: &'a str) -> BoxFuture<'a, bool> {
		Box::pin(RobotsPolicy::allowed(self, url, user_agent))
	}
}

impl BlobStore for FsBlobStore {
	fn put<'a>(
		&'a self,
		key: &'a str,
		bytes: &'a [u8],
		_content_type: &'a str,
	) -> BoxFuture<'a, dossier_storage::Result<String>> {
		Box::pin(FsBlobStore::put(self, key, bytes))
	}

	fn get<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, dossier_storage::Result<Vec<u8>>> {
		Box::pin(FsBlobStore::get(self, locator))
	}
}

impl VectorStore for QdrantStore {
	fn upsert<'a>(&'a self, points: Vec<ChunkPoint>) -> BoxFuture<'a, dossier_storage::Result<()>> {
		Box::pin(self.upsert_chunks(points))
	}

	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		job_id: &'a str,
		limit: u64,
	) -> BoxFuture<'a, dossier_storage::Result<Vec<ChunkHit>>> {
		Box::pin(self.search_job(vector, job_id, limit))
	}
}

pub(crate) fn now() -> OffsetDateTime {
	OffsetDateTime::now_utc()
}
