//! Axum route handlers for upload, status polling and artifact download.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::config::ProcessingMode;
use crate::document::ARTIFACT_FILE_NAME;
use crate::errors::AppError;
use crate::jobs::JobStatus;
use crate::state::AppState;

const FILE_FIELD: &str = "pdf_file";
const COUNT_FIELD: &str = "num_questions";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct InlineResponse {
    pub task_id: Uuid,
    #[serde(flatten)]
    pub status: JobStatus,
}

struct Upload {
    file_name: String,
    contents: Bytes,
    question_count: u32,
}

/// POST /analyze
///
/// Multipart form with `pdf_file` and `num_questions`. In queue mode returns
/// `202 {"task_id"}` immediately; in inline mode runs the job and returns its
/// final status.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let upload = read_upload(multipart, state.config.max_questions).await?;

    match state.config.processing_mode {
        ProcessingMode::Queue => {
            let task_id = state
                .jobs
                .submit(&upload.file_name, &upload.contents, upload.question_count)
                .await?;
            Ok((StatusCode::ACCEPTED, Json(SubmitResponse { task_id })).into_response())
        }
        ProcessingMode::Inline => {
            let (task_id, status) = state
                .jobs
                .run_inline(&upload.file_name, &upload.contents, upload.question_count)
                .await?;
            Ok(Json(InlineResponse { task_id, status }).into_response())
        }
    }
}

/// GET /task_status/:task_id
///
/// Never errors on unknown or malformed ids; those report `"unknown"`.
pub async fn handle_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<JobStatus>, AppError> {
    let Ok(id) = Uuid::parse_str(&task_id) else {
        return Ok(Json(JobStatus::unknown()));
    };
    Ok(Json(state.jobs.poll(id).await?))
}

/// GET /download/:task_id
///
/// Streams the DOCX of a completed job as an attachment.
pub async fn handle_download(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("No completed document for task {task_id}"));

    let id = Uuid::parse_str(&task_id).map_err(|_| not_found())?;
    let path = state.jobs.artifact_path(id).await?.ok_or_else(not_found)?;

    let contents = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Failed to read {}: {e}",
                path.display()
            )))
        }
    };

    let disposition = format!("attachment; filename=\"{ARTIFACT_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        contents,
    )
        .into_response())
}

async fn read_upload(mut multipart: Multipart, max_questions: u32) -> Result<Upload, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut count_raw: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            file = Some((file_name, field.bytes().await?));
        } else if name == COUNT_FIELD {
            count_raw = Some(field.text().await?);
        }
    }

    let (file_name, contents) =
        file.ok_or_else(|| AppError::Validation(format!("'{FILE_FIELD}' is required")))?;
    if contents.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if !file_name.is_empty() && !file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(AppError::Validation(
            "Only PDF uploads are supported".to_string(),
        ));
    }

    let question_count = parse_question_count(count_raw.as_deref(), max_questions)?;

    Ok(Upload {
        file_name,
        contents,
        question_count,
    })
}

fn parse_question_count(raw: Option<&str>, max_questions: u32) -> Result<u32, AppError> {
    let raw = raw.ok_or_else(|| AppError::Validation(format!("'{COUNT_FIELD}' is required")))?;
    let count: u32 = raw.trim().parse().map_err(|_| {
        AppError::Validation(format!("'{COUNT_FIELD}' must be a positive integer"))
    })?;
    if count == 0 || count > max_questions {
        return Err(AppError::Validation(format!(
            "'{COUNT_FIELD}' must be between 1 and {max_questions}"
        )));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{body::Body, http::Request, Router};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::document::DocumentAssembler;
    use crate::generation::testing::ScriptedGenerator;
    use crate::jobs::memory::MemoryJobBackend;
    use crate::jobs::testing::FaultyBackend;
    use crate::jobs::{JobBackend, JobManager};
    use crate::routes::build_router;

    const BOUNDARY: &str = "qagen-test-boundary";

    struct TestApp {
        _dir: tempfile::TempDir,
        router: Router,
        jobs: JobManager,
    }

    fn test_app(mode: ProcessingMode) -> TestApp {
        test_app_over(mode, Arc::new(MemoryJobBackend::new()))
    }

    fn test_app_over(mode: ProcessingMode, backend: Arc<dyn JobBackend>) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path().to_path_buf());
        config.processing_mode = mode;
        let jobs = JobManager::new(
            backend,
            Arc::new(ScriptedGenerator::default()),
            DocumentAssembler::new(config.output_dir()),
            config.upload_dir(),
        );
        let router = build_router(AppState {
            config,
            jobs: jobs.clone(),
        });
        TestApp {
            _dir: dir,
            router,
            jobs,
        }
    }

    fn multipart_body(file: Option<(&str, &[u8])>, count: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((name, contents)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"pdf_file\"; filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(contents);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(count) = count {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"num_questions\"\r\n\r\n{count}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn analyze_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(router, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_submit_poll_download_flow() {
        let app = test_app(ProcessingMode::Queue);

        let started = std::time::Instant::now();
        let (status, body) = send(
            &app.router,
            analyze_request(multipart_body(Some(("notes.pdf", &b"%PDF-1.4 text"[..])), Some("3"))),
        )
        .await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(status, StatusCode::ACCEPTED);

        let body: Value = serde_json::from_slice(&body).unwrap();
        let task_id = body["task_id"].as_str().unwrap().to_string();

        let (_, pending) = get_json(&app.router, &format!("/task_status/{task_id}")).await;
        assert_eq!(pending["status"], "pending");

        assert!(app
            .jobs
            .process_next(Duration::from_millis(50))
            .await
            .unwrap());

        let (_, done) = get_json(&app.router, &format!("/task_status/{task_id}")).await;
        assert_eq!(done["status"], "completed");
        assert_eq!(done["output_file"], format!("{task_id}/QA.docx"));

        let request = Request::builder()
            .uri(format!("/download/{task_id}"))
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_inline_mode_returns_completed_status() {
        let app = test_app(ProcessingMode::Inline);
        let (status, body) = send(
            &app.router,
            analyze_request(multipart_body(Some(("notes.pdf", &b"text"[..])), Some("2"))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "completed");
        let task_id = body["task_id"].as_str().unwrap();
        assert_eq!(body["output_file"], format!("{task_id}/QA.docx"));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_report_unknown() {
        let app = test_app(ProcessingMode::Queue);
        let (status, body) =
            get_json(&app.router, &format!("/task_status/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "unknown"}));

        let (_, body) = get_json(&app.router, "/task_status/not-a-uuid").await;
        assert_eq!(body["status"], "unknown");
    }

    #[tokio::test]
    async fn test_download_before_completion_is_404() {
        let app = test_app(ProcessingMode::Queue);
        let id = app.jobs.submit("a.pdf", b"x", 1).await.unwrap();
        let (status, body) = get_json(&app.router, &format!("/download/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_missing_file_is_rejected() {
        let app = test_app(ProcessingMode::Queue);
        let (status, _) = send(&app.router, analyze_request(multipart_body(None, Some("3")))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_pdf_is_rejected() {
        let app = test_app(ProcessingMode::Queue);
        let (status, _) = send(
            &app.router,
            analyze_request(multipart_body(Some(("notes.txt", &b"text"[..])), Some("3"))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_enqueue_failure_is_503() {
        let backend = Arc::new(FaultyBackend {
            fail_enqueue: true,
            ..Default::default()
        });
        let app = test_app_over(ProcessingMode::Queue, backend);
        let (status, body) = send(
            &app.router,
            analyze_request(multipart_body(Some(("notes.pdf", &b"text"[..])), Some("2"))),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "QUEUE_ERROR");
    }

    #[tokio::test]
    async fn test_health_reports_mode() {
        let app = test_app(ProcessingMode::Inline);
        let (status, body) = get_json(&app.router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processing_mode"], "inline");
    }

    #[test]
    fn test_question_count_bounds() {
        assert_eq!(parse_question_count(Some(" 5 "), 10).unwrap(), 5);
        assert!(parse_question_count(Some("0"), 10).is_err());
        assert!(parse_question_count(Some("11"), 10).is_err());
        assert!(parse_question_count(Some("-1"), 10).is_err());
        assert!(parse_question_count(Some("five"), 10).is_err());
        assert!(parse_question_count(None, 10).is_err());
    }
}
