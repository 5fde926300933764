//! services/api/src/web/jobs.rs
//!
//! Handlers for submitting summaries as background jobs, polling them,
//! cancelling them and downloading the result.
//!
//! The cheap gates (URL, rate limit, credit reservation) run inside the submit
//! request so refusals come back synchronously as 400/429/402. Rendering and
//! summarization run in a spawned task.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;
use web_summarizer_core::PipelineError;

use crate::error::ApiError;
use crate::web::middleware::AuthContext;
use crate::web::protocol::{JobResponse, SubmitResponse, SummarizeRequest};
use crate::web::state::{AppState, JobEntry, JobStatus};

/// POST /summaries - Queue a summary of a web page
#[utoipa::path(
    post,
    path = "/summaries",
    request_body = SummarizeRequest,
    responses(
        (status = 202, description = "Summary job accepted", body = SubmitResponse),
        (status = 400, description = "Invalid URL"),
        (status = 401, description = "Not signed in"),
        (status = 402, description = "No credits remaining"),
        (status = 429, description = "Rate limited, see Retry-After")
    )
)]
pub async fn submit_summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SummarizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context = state
        .sessions
        .get_or_open(&auth.session_id, auth.account_id)
        .await;

    let admission = {
        let mut context = context.lock().await;
        state.pipeline.admit(&mut context, &req.url).await?
    };

    let job_id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    state.jobs.insert(
        job_id,
        JobEntry {
            account_id: auth.account_id,
            session_id: auth.session_id.clone(),
            url: admission.url.to_string(),
            submitted_at: Utc::now(),
            status: JobStatus::Pending,
            finished_at: None,
            cancel: cancel.clone(),
        },
    );
    info!(job_id = %job_id, account_id = %auth.account_id, "Summary job queued");

    let task_state = state.clone();
    tokio::spawn(async move {
        let status = match task_state.pipeline.execute(&context, admission, &cancel).await {
            Ok(outcome) => JobStatus::Done(outcome),
            Err(PipelineError::Cancelled) => JobStatus::Cancelled,
            Err(e) => JobStatus::Failed(e.to_string()),
        };
        info!(job_id = %job_id, status = status.label(), "Summary job finished");
        // The entry is gone if the session logged out meanwhile.
        if let Some(mut job) = task_state.jobs.get_mut(&job_id) {
            job.status = status;
            job.finished_at = Some(Instant::now());
        }
    });

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id })))
}

/// GET /summaries/jobs/{id} - Poll a summary job
#[utoipa::path(
    get,
    path = "/summaries/jobs/{id}",
    params(("id" = Uuid, Path, description = "The job id returned by POST /summaries")),
    responses(
        (status = 200, description = "Current job state", body = JobResponse),
        (status = 404, description = "No such job for this account")
    )
)]
pub async fn get_job_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = owned_job(&state, &auth, job_id)?;
    Ok(Json(JobResponse::from_entry(job_id, &job)))
}

/// POST /summaries/jobs/{id}/cancel - Cancel a pending summary job
#[utoipa::path(
    post,
    path = "/summaries/jobs/{id}/cancel",
    params(("id" = Uuid, Path, description = "The job id returned by POST /summaries")),
    responses(
        (status = 202, description = "Cancellation requested"),
        (status = 404, description = "No such job for this account"),
        (status = 409, description = "Job already finished")
    )
)]
pub async fn cancel_job_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let job = owned_job(&state, &auth, job_id)?;
    match job.status {
        JobStatus::Pending => {
            job.cancel.cancel();
            info!(job_id = %job_id, "Summary job cancellation requested");
            Ok(StatusCode::ACCEPTED)
        }
        _ => Err(ApiError::Conflict(format!(
            "Job {} already {}",
            job_id,
            job.status.label()
        ))),
    }
}

/// GET /summaries/jobs/{id}/download - Download a finished summary as text
#[utoipa::path(
    get,
    path = "/summaries/jobs/{id}/download",
    params(("id" = Uuid, Path, description = "The job id returned by POST /summaries")),
    responses(
        (status = 200, description = "The summary as a plain-text attachment", body = String, content_type = "text/plain"),
        (status = 404, description = "No such job for this account"),
        (status = 409, description = "Job has not produced a summary")
    )
)]
pub async fn download_job_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = owned_job(&state, &auth, job_id)?;
    let JobStatus::Done(outcome) = &job.status else {
        return Err(ApiError::Conflict(format!(
            "Job {} is {}, no summary to download",
            job_id,
            job.status.label()
        )));
    };

    let disposition = format!("attachment; filename=\"{}\"", outcome.download_name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        outcome.summary.clone(),
    ))
}

/// Looks a job up, hiding the jobs of other accounts.
fn owned_job<'a>(
    state: &'a AppState,
    auth: &AuthContext,
    job_id: Uuid,
) -> Result<dashmap::mapref::one::Ref<'a, Uuid, JobEntry>, ApiError> {
    match state.jobs.get(&job_id) {
        Some(job) if job.account_id == auth.account_id => Ok(job),
        Some(_) => {
            warn!(job_id = %job_id, account_id = %auth.account_id, "Job requested by another account");
            Err(ApiError::NotFound(format!("Job {}", job_id)))
        }
        None => Err(ApiError::NotFound(format!("Job {}", job_id))),
    }
}
