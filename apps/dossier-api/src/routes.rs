use axum::{
	Json, Router,
	extract::{Path, State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};

use dossier_pipeline::{
	Error, JobOverview, SourceView, SubmitJobRequest, SubmitJobResponse, TimelineEventView, jobs,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/jobs", post(submit_job))
		.route("/v1/jobs/{job_id}", get(job_overview))
		.route("/v1/jobs/{job_id}/sources", get(list_sources))
		.route("/v1/jobs/{job_id}/timeline", get(list_timeline))
		.with_state(state)
}

async fn health() -> Json<Value> {
	Json(json!({ "ok": true }))
}

async fn submit_job(
	State(state): State<AppState>,
	payload: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
	let Json(request) = payload.map_err(|err| {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.body_text())
	})?;
	let response = jobs::submit_job(&state.db, request).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn job_overview(
	State(state): State<AppState>,
	Path(job_id): Path<String>,
) -> Result<Json<JobOverview>, ApiError> {
	let response = jobs::job_overview(&state.db, &job_id).await?;

	Ok(Json(response))
}

async fn list_sources(
	State(state): State<AppState>,
	Path(job_id): Path<String>,
) -> Result<Json<Vec<SourceView>>, ApiError> {
	let response = jobs::list_sources(&state.db, &job_id).await?;

	Ok(Json(response))
}

async fn list_timeline(
	State(state): State<AppState>,
	Path(job_id): Path<String>,
) -> Result<Json<Vec<TimelineEventView>>, ApiError> {
	let response = jobs::list_timeline(&state.db, &job_id).await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			Error::NotFound { message } => json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message),
			other => {
				tracing::error!(error = %other, "Request failed.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal error.")
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}
