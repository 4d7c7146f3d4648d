use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::error::{ErrorPayloadTooLarge, InternalError, JsonPayloadError};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures::TryStreamExt;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{CanonicalResult, DetectionFailure, DetectionOutcome, MediaKind, PollOutcome, TaskId};
use uuid::Uuid;

use crate::orchestrator::{Artifact, Detector};
use crate::validation::MAX_ARTIFACT_BYTES;

pub const FILE_FIELD: &str = "file";
pub const CREDENTIAL_FIELD: &str = "apiKey";
pub const CREDENTIAL_HEADER: &str = "x-api-key";
const MAX_CREDENTIAL_BYTES: usize = 4096;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectResponse {
    success: bool,
    result: CanonicalResult,
    file_name: Option<String>,
    file_type: Option<MediaKind>,
    file_size: Option<u64>,
}

#[derive(Deserialize)]
struct CredentialCheck {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

#[derive(Default)]
struct DetectionForm {
    artifact: Option<Artifact>,
    api_key: Option<String>,
}

struct UploadSummary {
    file_name: String,
    media_kind: Option<MediaKind>,
    byte_size: u64,
}

impl From<&Artifact> for UploadSummary {
    fn from(artifact: &Artifact) -> Self {
        Self {
            file_name: artifact.file_name.clone(),
            media_kind: MediaKind::from_content_type(&artifact.content_type),
            byte_size: artifact.byte_size,
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: Option<String>) {
    cfg.service(
        web::resource("/api/detect")
            .route(web::post().to(handle_detect))
            .route(web::get().to(detect_info)),
    )
    .service(web::resource("/api/detect/async").route(web::post().to(submit_detection)))
    .service(web::resource("/api/tasks/{task_id}").route(web::get().to(get_task)))
    .service(
        web::resource("/api/test")
            .app_data(web::JsonConfig::default().error_handler(unreadable_credential_check))
            .route(web::post().to(test_credential)),
    );

    if let Some(dir) = frontend_dir {
        cfg.service(Files::new("/", dir).index_file("index.html"));
    }
}

/// Reads the upload form. Oversized files are counted but not buffered past
/// the size ceiling so validation can still reject them.
async fn read_detection_form(mut payload: Multipart) -> Result<DetectionForm, Error> {
    let mut form = DetectionForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILE_FIELD => {
                let file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();
                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let mut data = BytesMut::new();
                let mut byte_size: u64 = 0;
                while let Some(chunk) = field.try_next().await? {
                    byte_size += chunk.len() as u64;
                    if byte_size <= MAX_ARTIFACT_BYTES {
                        data.extend_from_slice(&chunk);
                    }
                }

                // Browsers send an empty, unnamed part when no file was picked.
                if file_name.is_empty() && byte_size == 0 {
                    continue;
                }

                form.artifact = Some(Artifact {
                    file_name,
                    content_type,
                    data: data.freeze(),
                    byte_size,
                });
            }
            CREDENTIAL_FIELD => {
                let mut value = Vec::new();
                while let Some(chunk) = field.try_next().await? {
                    if value.len() + chunk.len() > MAX_CREDENTIAL_BYTES {
                        return Err(ErrorPayloadTooLarge("API key field is too large"));
                    }
                    value.extend_from_slice(&chunk);
                }
                form.api_key = Some(String::from_utf8_lossy(&value).into_owned());
            }
            _ => {
                while field.try_next().await?.is_some() {}
            }
        }
    }

    Ok(form)
}

fn failure_response(failure: DetectionFailure) -> HttpResponse {
    let body = ErrorResponse {
        error: failure.message,
        details: failure.detail,
    };
    if failure.kind.is_preflight() {
        HttpResponse::BadRequest().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

fn credential_from_header(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(CREDENTIAL_HEADER)
        .and_then(|value| value.to_str().ok())
}

async fn handle_detect(detector: web::Data<Detector>, payload: Multipart) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();
    let form = read_detection_form(payload).await?;
    let summary = form.artifact.as_ref().map(UploadSummary::from);

    match &summary {
        Some(upload) => info!(
            "[{}] Detection requested for {} ({} bytes)",
            request_id, upload.file_name, upload.byte_size
        ),
        None => info!("[{}] Detection requested without a file", request_id),
    }

    match detector.run_detection(form.artifact, form.api_key.as_deref()).await {
        DetectionOutcome::Success(result) => {
            if let Some(primary) = result.primary() {
                info!(
                    "[{}] Detection completed: {}@{:.3}",
                    request_id, primary.class, primary.confidence
                );
            }
            Ok(HttpResponse::Ok().json(DetectResponse {
                success: true,
                result,
                file_name: summary.as_ref().map(|s| s.file_name.clone()),
                file_type: summary.as_ref().and_then(|s| s.media_kind),
                file_size: summary.as_ref().map(|s| s.byte_size),
            }))
        }
        DetectionOutcome::Failure(failure) => {
            if failure.kind.is_preflight() {
                warn!("[{}] Upload rejected: {}", request_id, failure.message);
            } else {
                error!("[{}] Deepfake detection error: {}", request_id, failure.message);
            }
            Ok(failure_response(failure))
        }
    }
}

async fn detect_info() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Deepfake detection API endpoint. Use POST method with file and API key."
    }))
}

async fn submit_detection(
    detector: web::Data<Detector>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();
    let form = read_detection_form(payload).await?;

    match detector.submit_detection(form.artifact, form.api_key.as_deref()).await {
        Ok(task_id) => {
            info!("[{}] Queued async detection task {}", request_id, task_id);
            Ok(HttpResponse::Accepted().json(json!({ "taskId": task_id })))
        }
        Err(failure) => {
            error!("[{}] Async submission failed: {}", request_id, failure.message);
            Ok(failure_response(failure))
        }
    }
}

async fn get_task(
    detector: web::Data<Detector>,
    path: web::Path<String>,
    req: HttpRequest,
) -> HttpResponse {
    let task_id = TaskId::from(path.into_inner());

    match detector
        .poll_detection(&task_id, credential_from_header(&req))
        .await
    {
        PollOutcome::Pending => {
            info!("Task still processing: {}", task_id);
            HttpResponse::Accepted().json(json!({
                "taskId": task_id,
                "status": "processing"
            }))
        }
        PollOutcome::Done(DetectionOutcome::Success(result)) => {
            info!("Retrieved task: {}", task_id);
            HttpResponse::Ok().json(json!({
                "success": true,
                "taskId": task_id,
                "result": result
            }))
        }
        PollOutcome::Done(DetectionOutcome::Failure(failure)) => {
            error!("Error retrieving task {}: {}", task_id, failure.message);
            failure_response(failure)
        }
    }
}

fn unreadable_credential_check(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    error!("API test error: {}", err);
    let response = HttpResponse::InternalServerError().json(ErrorResponse {
        error: "API test failed".to_string(),
        details: Some(err.to_string()),
    });
    InternalError::from_response(err, response).into()
}

async fn test_credential(
    detector: web::Data<Detector>,
    body: web::Json<CredentialCheck>,
) -> HttpResponse {
    match detector.verify_credential(body.api_key.as_deref()).await {
        Ok(user) => HttpResponse::Ok().json(json!({
            "success": true,
            "user": user,
            "message": "API key is valid and working"
        })),
        Err(failure) if failure.kind.is_preflight() => failure_response(failure),
        Err(failure) => {
            error!("API test error: {}", failure.message);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "API test failed".to_string(),
                details: Some(failure.message),
            })
        }
    }
}
