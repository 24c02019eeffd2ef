use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::{Error, Result};

const LOCATOR_SCHEME: &str = "file://";

/// Filesystem blob store. Keys are relative, slash-separated paths under `root`.
pub struct FsBlobStore {
	root: PathBuf,
}
impl FsBlobStore {
	pub fn new(cfg: &dossier_config::Blobs) -> Self {
		Self { root: cfg.root.clone() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
		let path = self.resolve_key(key)?;

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await?;
		}

		// Write then rename so a reader never sees a partial blob.
		let staging = path.with_extension(format!(
			"{}.partial",
			path.extension().and_then(|ext| ext.to_str()).unwrap_or("blob")
		));

		fs::write(&staging, bytes).await?;
		fs::rename(&staging, &path).await?;

		Ok(format!("{LOCATOR_SCHEME}{}", path.display()))
	}

	pub async fn get(&self, locator: &str) -> Result<Vec<u8>> {
		let path = self.resolve_locator(locator)?;

		match fs::read(&path).await {
			Ok(bytes) => Ok(bytes),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound =>
				Err(Error::NotFound(format!("Blob {locator:?} does not exist."))),
			Err(err) => Err(err.into()),
		}
	}

	fn resolve_key(&self, key: &str) -> Result<PathBuf> {
		let relative = Path::new(key);

		if key.is_empty()
			|| !relative.components().all(|component| matches!(component, Component::Normal(_)))
		{
			return Err(Error::InvalidArgument(format!("Blob key {key:?} must be a relative path.")));
		}

		Ok(self.root.join(relative))
	}

	fn resolve_locator(&self, locator: &str) -> Result<PathBuf> {
		let path = locator.strip_prefix(LOCATOR_SCHEME).ok_or_else(|| {
			Error::InvalidArgument(format!("Blob locator {locator:?} is not a file locator."))
		})?;
		let path = Path::new(path);

		match path.strip_prefix(&self.root) {
			Ok(relative) => self.resolve_key(&relative.to_string_lossy()),
			Err(_) => Err(Error::InvalidArgument(format!(
				"Blob locator {locator:?} is outside the blob root."
			))),
		}
	}
}
