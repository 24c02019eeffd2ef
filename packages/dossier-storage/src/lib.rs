pub mod blobs;
pub mod db;
pub mod documents;
pub mod events;
pub mod jobs;
pub mod models;
pub mod qdrant;
pub mod schema;
pub mod sources;
pub mod tasks;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
