use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::util::ServiceExt;

use dossier_api::{routes, state::AppState};
use dossier_storage::db::Db;
use dossier_testkit::TestDatabase;

/// A router whose pool never connects; only handlers that reject before touching the
/// database can be exercised with it.
fn offline_router() -> Router {
	let pool = PgPoolOptions::new()
		.connect_lazy("postgres://dossier@127.0.0.1:1/dossier")
		.expect("Failed to build lazy pool.");

	routes::router(AppState::from_db(Db { pool }))
}

async fn db_router() -> Option<(TestDatabase, Router)> {
	let Some(test_db) = TestDatabase::from_env().await else {
		eprintln!("Skipping HTTP tests; set DOSSIER_PG_DSN to run this test.");

		return None;
	};
	let test_db = test_db.expect("Failed to create test database.");
	let pool = PgPoolOptions::new()
		.max_connections(2)
		.connect(test_db.dsn())
		.await
		.expect("Failed to connect to test database.");
	let db = Db { pool };

	db.ensure_schema().await.expect("Failed to ensure schema.");

	Some((test_db, routes::router(AppState::from_db(db))))
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
	let response = app.clone().oneshot(request).await.expect("Failed to call router.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = serde_json::from_slice(&body).unwrap_or(Value::Null);

	(status, json)
}

fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).expect("Failed to build request.")
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(body.to_string()))
		.expect("Failed to build request.")
}

#[tokio::test]
async fn health_reports_ok() {
	let (status, json) = call(&offline_router(), get("/health")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json, serde_json::json!({ "ok": true }));
}

#[tokio::test]
async fn blank_person_is_rejected() {
	let (status, json) =
		call(&offline_router(), post_json("/v1/jobs", r#"{"person":"   "}"#)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "INVALID_REQUEST");
	assert_eq!(json["message"], "person must be non-empty.");
}

#[tokio::test]
async fn malformed_body_gets_a_json_error() {
	let (status, json) = call(&offline_router(), post_json("/v1/jobs", r#"{"people":1}"#)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set DOSSIER_PG_DSN to run."]
async fn submitted_job_is_queued_and_visible() {
	let Some((test_db, app)) = db_router().await else {
		return;
	};
	let (status, created) = call(
		&app,
		post_json("/v1/jobs", r#"{"person":" Ada Lovelace ","languages":["en",""]}"#),
	)
	.await;

	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(created["status"], "queued");

	let job_id = created["job_id"].as_str().expect("Missing job_id.").to_string();
	let (status, overview) = call(&app, get(&format!("/v1/jobs/{job_id}"))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(overview["person"], "Ada Lovelace");
	assert_eq!(overview["status"], "queued");
	assert_eq!(overview["constraints"]["languages"], serde_json::json!(["en"]));
	assert_eq!(overview["sources"]["total"], 0);
	assert_eq!(overview["documents"], serde_json::json!({ "total": 0, "finished": 0 }));

	let (status, sources) = call(&app, get(&format!("/v1/jobs/{job_id}/sources"))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(sources, serde_json::json!([]));

	let (status, timeline) = call(&app, get(&format!("/v1/jobs/{job_id}/timeline"))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(timeline, serde_json::json!([]));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set DOSSIER_PG_DSN to run."]
async fn unknown_job_is_not_found() {
	let Some((test_db, app)) = db_router().await else {
		return;
	};

	for uri in ["/v1/jobs/missing", "/v1/jobs/missing/sources", "/v1/jobs/missing/timeline"] {
		let (status, json) = call(&app, get(uri)).await;

		assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
		assert_eq!(json["error_code"], "NOT_FOUND");
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
