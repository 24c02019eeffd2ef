pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] dossier_storage::Error),
	#[error(transparent)]
	Pipeline(#[from] dossier_pipeline::Error),
	#[error("Claim loop stopped: {message}")]
	LoopStopped { message: String },
}
