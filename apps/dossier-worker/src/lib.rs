pub mod worker;

mod error;

pub use error::{Error, Result};

use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use dossier_pipeline::{Collaborators, Pipeline};
use dossier_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = dossier_cli::VERSION,
	rename_all = "kebab",
	styles = dossier_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = dossier_config::load(&args.config)?;

	dossier_cli::init_tracing(&config.service.log_level);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	qdrant.ensure_collection().await?;

	let collaborators = Collaborators::from_config(&config, qdrant)?;

	tracing::info!(
		discovery_providers = collaborators.discovery.len(),
		concurrency = config.worker.concurrency,
		"Worker starting."
	);

	let pipeline = Pipeline::new(config, db, collaborators)?;

	worker::run_worker(Arc::new(pipeline)).await?;

	Ok(())
}
