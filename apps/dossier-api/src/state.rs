use std::sync::Arc;

use dossier_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub db: Arc<Db>,
}
impl AppState {
	/// Connects to Postgres and brings the schema up to date. The API never touches Qdrant or
	/// the blob store; those belong to the worker.
	pub async fn new(config: &dossier_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::from_db(db))
	}

	pub fn from_db(db: Db) -> Self {
		Self { db: Arc::new(db) }
	}
}
