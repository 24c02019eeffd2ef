use std::{fs, path::Path};

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use dossier_config::Config;
use dossier_pipeline::{Collaborators, Pipeline, SubmitJobRequest, jobs};
use dossier_storage::{db::Db, qdrant::QdrantStore};
use dossier_testkit::TestDatabase;

fn test_config(dsn: &str, root: &Path) -> Config {
	let payload = format!(
		r#"
[service]
http_bind = "127.0.0.1:0"
log_level = "info"

[storage.postgres]
dsn            = "{dsn}"
pool_max_conns = 2

[storage.qdrant]
collection = "unused"
url        = "http://127.0.0.1:6334"
vector_dim = 4

[storage.blobs]
root = "{root}"

[providers.embedding]
api_base    = "http://127.0.0.1:1"
dimensions  = 4
model       = "stub"
path        = "/v1/embeddings"
provider_id = "stub"
timeout_ms  = 1000

[providers.chat]
api_base    = "http://127.0.0.1:1"
model       = "stub"
path        = "/v1/chat/completions"
provider_id = "stub"
temperature = 0.0
timeout_ms  = 1000

[worker]
finalize_delay_seconds = 0
"#,
		root = root.display()
	);
	let path = root.join("dossier.toml");

	fs::write(&path, payload).expect("Failed to write test config.");

	dossier_config::load(&path).expect("Failed to load test config.")
}

async fn test_pipeline(test_db: &TestDatabase, root: &Path) -> Pipeline {
	let cfg = test_config(test_db.dsn(), root);
	let pool = PgPoolOptions::new()
		.max_connections(2)
		.connect(test_db.dsn())
		.await
		.expect("Failed to connect to test database.");
	let db = Db { pool };

	db.ensure_schema().await.expect("Failed to ensure schema.");

	// No discovery provider is enabled and Qdrant is never reached by these tasks.
	let qdrant = QdrantStore::new(&cfg.storage.qdrant).expect("Failed to build Qdrant client.");
	let collaborators =
		Collaborators::from_config(&cfg, qdrant).expect("Failed to build collaborators.");

	Pipeline::new(cfg, db, collaborators).expect("Failed to build pipeline.")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set DOSSIER_PG_DSN to run."]
async fn job_without_sources_drains_to_complete() {
	let Some(test_db) = TestDatabase::from_env().await else {
		eprintln!("Skipping worker tests; set DOSSIER_PG_DSN to run this test.");

		return;
	};
	let test_db = test_db.expect("Failed to create test database.");
	let blob_dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let pipeline = test_pipeline(&test_db, blob_dir.path()).await;
	let submitted = jobs::submit_job(
		&pipeline.db,
		SubmitJobRequest { person: "Ada Lovelace".to_string(), ..Default::default() },
	)
	.await
	.expect("Failed to submit job.");

	// Discover, then the immediate finalize.
	let mut claimed = 0;

	while dossier_worker::worker::process_once(&pipeline).await.expect("Processing failed.") {
		claimed += 1;

		assert!(claimed <= 4, "Queue did not drain.");
	}

	assert_eq!(claimed, 2);

	let overview =
		jobs::job_overview(&pipeline.db, &submitted.job_id).await.expect("Missing overview.");

	assert_eq!(overview.status.as_str(), "complete");

	let done: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM pipeline_tasks WHERE job_id = $1 AND status = 'DONE'",
	)
	.bind(&submitted.job_id)
	.fetch_one(&pipeline.db.pool)
	.await
	.expect("Failed to count tasks.");

	assert_eq!(done, 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set DOSSIER_PG_DSN to run."]
async fn undecodable_task_is_failed_with_backoff() {
	let Some(test_db) = TestDatabase::from_env().await else {
		eprintln!("Skipping worker tests; set DOSSIER_PG_DSN to run this test.");

		return;
	};
	let test_db = test_db.expect("Failed to create test database.");
	let blob_dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let pipeline = test_pipeline(&test_db, blob_dir.path()).await;
	let submitted = jobs::submit_job(
		&pipeline.db,
		SubmitJobRequest { person: "Ada Lovelace".to_string(), ..Default::default() },
	)
	.await
	.expect("Failed to submit job.");

	// Park the discovery task so the broken one is claimed first.
	sqlx::query("UPDATE pipeline_tasks SET available_at = now() + interval '1 hour'")
		.execute(&pipeline.db.pool)
		.await
		.expect("Failed to park tasks.");

	let task_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO pipeline_tasks (task_id, job_id, kind, payload, status)
VALUES ($1, $2, 'discover', '{\"kind\":\"unknown\"}'::jsonb, 'PENDING')",
	)
	.bind(task_id)
	.bind(&submitted.job_id)
	.execute(&pipeline.db.pool)
	.await
	.expect("Failed to insert task.");

	assert!(dossier_worker::worker::process_once(&pipeline).await.expect("Processing failed."));
	assert!(!dossier_worker::worker::process_once(&pipeline).await.expect("Processing failed."));

	let (status, attempts, last_error, delayed): (String, i32, Option<String>, bool) =
		sqlx::query_as(
			"\
SELECT status, attempts, last_error, available_at > updated_at
FROM pipeline_tasks
WHERE task_id = $1",
		)
		.bind(task_id)
		.fetch_one(&pipeline.db.pool)
		.await
		.expect("Failed to load task.");

	assert_eq!(status, "FAILED");
	assert_eq!(attempts, 1);
	assert!(last_error.is_some_and(|text| !text.is_empty()));
	assert!(delayed);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
