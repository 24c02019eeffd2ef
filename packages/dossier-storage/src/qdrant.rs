use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance,
		FieldType, Filter, PointStruct, Query, QueryPointsBuilder, UpsertPointsBuilder, Value,
		VectorParamsBuilder, value::Kind,
	},
};
use uuid::Uuid;

use crate::Result;

/// Fields stored with every chunk vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPayload {
	pub job_id: String,
	pub person: String,
	pub source_url: String,
	pub published_at: Option<String>,
	pub kind: String,
	pub text: String,
	pub document_id: Uuid,
	pub chunk_index: u32,
}
impl ChunkPayload {
	fn into_payload(self) -> Payload {
		let mut payload = Payload::new();

		payload.insert("job_id", self.job_id);
		payload.insert("person", self.person);
		payload.insert("source_url", self.source_url);
		payload.insert("published_at", self.published_at.unwrap_or_default());
		payload.insert("kind", self.kind);
		payload.insert("text", self.text);
		payload.insert("document_id", self.document_id.to_string());
		payload.insert("chunk_index", i64::from(self.chunk_index));

		payload
	}

	fn from_payload(payload: &HashMap<String, Value>) -> Self {
		let published_at = payload_string(payload, "published_at").filter(|value| !value.is_empty());

		Self {
			job_id: payload_string(payload, "job_id").unwrap_or_default(),
			person: payload_string(payload, "person").unwrap_or_default(),
			source_url: payload_string(payload, "source_url").unwrap_or_default(),
			published_at,
			kind: payload_string(payload, "kind").unwrap_or_default(),
			text: payload_string(payload, "text").unwrap_or_default(),
			document_id: payload_string(payload, "document_id")
				.and_then(|text| Uuid::parse_str(&text).ok())
				.unwrap_or_default(),
			chunk_index: payload_i64(payload, "chunk_index")
				.and_then(|value| u32::try_from(value).ok())
				.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPoint {
	pub point_id: Uuid,
	pub vector: Vec<f32>,
	pub payload: ChunkPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
	pub score: f32,
	pub payload: ChunkPayload,
}

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &dossier_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection and its `job_id` keyword index when missing.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone())
					.vectors_config(VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine)),
			)
			.await?;
		self.client
			.create_field_index(
				CreateFieldIndexCollectionBuilder::new(
					self.collection.clone(),
					"job_id",
					FieldType::Keyword,
				)
				.wait(true),
			)
			.await?;

		Ok(())
	}

	pub async fn upsert_chunks(&self, points: Vec<ChunkPoint>) -> Result<()> {
		if points.is_empty() {
			return Ok(());
		}

		let points = points
			.into_iter()
			.map(|point| {
				PointStruct::new(point.point_id.to_string(), point.vector, point.payload.into_payload())
			})
			.collect::<Vec<_>>();

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
			.await?;

		Ok(())
	}

	pub async fn search_job(
		&self,
		vector: Vec<f32>,
		job_id: &str,
		limit: u64,
	) -> Result<Vec<ChunkHit>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.filter(Filter::must([Condition::matches("job_id", job_id.to_string())]))
			.limit(limit)
			.with_payload(true);
		let response = self.client.query(search).await?;

		Ok(response
			.result
			.into_iter()
			.map(|point| ChunkHit {
				score: point.score,
				payload: ChunkPayload::from_payload(&point.payload),
			})
			.collect())
	}
}

/// Deterministic so a redelivered index task overwrites its own points.
pub fn chunk_point_id(document_id: Uuid, chunk_index: u32) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{document_id}:{chunk_index}").as_bytes())
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

fn payload_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
	match &payload.get(key)?.kind {
		Some(Kind::IntegerValue(value)) => Some(*value),
		Some(Kind::DoubleValue(value)) => Some(*value as i64),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn point_ids_are_stable_per_chunk() {
		let document_id = Uuid::new_v4();

		assert_eq!(chunk_point_id(document_id, 0), chunk_point_id(document_id, 0));
		assert_ne!(chunk_point_id(document_id, 0), chunk_point_id(document_id, 1));
	}

	#[test]
	fn payload_reads_back_stored_fields() {
		let document_id = Uuid::new_v4();
		let mut stored = HashMap::new();

		stored.insert("job_id".to_string(), Value::from("job-1".to_string()));
		stored.insert("source_url".to_string(), Value::from("https://a.test/ada".to_string()));
		stored.insert("published_at".to_string(), Value::from(String::new()));
		stored.insert("text".to_string(), Value::from("Notes.".to_string()));
		stored.insert("document_id".to_string(), Value::from(document_id.to_string()));
		stored.insert("chunk_index".to_string(), Value::from(2_i64));

		let payload = ChunkPayload::from_payload(&stored);

		assert_eq!(payload.job_id, "job-1");
		assert_eq!(payload.published_at, None);
		assert_eq!(payload.document_id, document_id);
		assert_eq!(payload.chunk_index, 2);
		assert!(payload.person.is_empty());
	}
}
