//! REST API routes for the web server
//!
//! Provides endpoints for email builds, artifact downloads and health checks.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use super::job::{is_safe_name, job_dir_name, new_job_id, JobRecord, JobStore};
use super::DEFAULT_TEMPLATE_ID;
use crate::ocr::{TesseractOracle, TextOracle};
use crate::pipeline::{
    validate_campaign_name, BuildRequest, EmailPipeline, PipelineConfig, SilentProgress,
};
use crate::render::TemplateSource;

/// Subdirectory of a job holding the uploaded image
const UPLOAD_DIR: &str = "upload";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobStore,
    pub pipeline_config: PipelineConfig,
    pub oracle: Arc<dyn TextOracle>,
    pub work_dir: PathBuf,
    pub templates_dir: PathBuf,
    /// Bounds the number of concurrent builds
    pub permits: Arc<Semaphore>,
    pub version: String,
}

impl AppState {
    pub fn new(
        pipeline_config: PipelineConfig,
        oracle: Arc<dyn TextOracle>,
        work_dir: PathBuf,
        templates_dir: PathBuf,
        workers: usize,
    ) -> Self {
        Self {
            jobs: JobStore::new(),
            pipeline_config,
            oracle,
            work_dir,
            templates_dir,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Map a template id to `<templates_dir>/<id>.html`.
    ///
    /// `default` falls back to the built-in template when no such file exists.
    pub fn resolve_template(&self, template_id: &str) -> Result<TemplateSource, AppError> {
        if !is_safe_name(template_id) {
            return Err(AppError::BadRequest("invalid template_id".to_string()));
        }

        let path = self.templates_dir.join(format!("{}.html", template_id));
        if path.is_file() {
            Ok(TemplateSource::File(path))
        } else if template_id == DEFAULT_TEMPLATE_ID {
            Ok(TemplateSource::Builtin)
        } else {
            Err(AppError::BadRequest("invalid template_id".to_string()))
        }
    }
}

/// Build the API router
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/build-email", post(build_email))
        .route("/download/{job_id}/{filename}", get(download_artifact))
        .route("/health", get(health_check))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ocr_available: bool,
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ocr_available = state.pipeline_config.ocr
        && TesseractOracle::new(state.pipeline_config.tesseract.clone()).is_available();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        ocr_available,
    })
}

/// Build response with download links
#[derive(Debug, Serialize)]
pub struct BuildEmailResponse {
    pub job_id: String,
    pub html_file: String,
    pub assets_zip: String,
}

/// Multipart fields of a build request
#[derive(Debug, Default)]
struct BuildForm {
    image: Option<Vec<u8>>,
    image_name: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
    template_id: Option<String>,
    cta_url: Option<String>,
    campaign_name: Option<String>,
}

impl BuildForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "image" {
                form.image_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read image: {}", e)))?;
                form.image = Some(data.to_vec());
                continue;
            }

            let slot = match name.as_str() {
                "title" => &mut form.title,
                "snippet" => &mut form.snippet,
                "template_id" => &mut form.template_id,
                "cta_url" => &mut form.cta_url,
                "campaign_name" => &mut form.campaign_name,
                _ => continue,
            };
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("failed to read {}: {}", name, e)))?;
            *slot = Some(text);
        }

        Ok(form)
    }

    /// All required fields, each present and non-empty
    fn complete(self) -> Option<CompleteForm> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(CompleteForm {
            image: self.image.filter(|d| !d.is_empty())?,
            image_name: self.image_name,
            title: non_empty(self.title)?,
            snippet: non_empty(self.snippet)?,
            template_id: non_empty(self.template_id)?,
            cta_url: non_empty(self.cta_url)?,
            campaign_name: non_empty(self.campaign_name)?,
        })
    }
}

struct CompleteForm {
    image: Vec<u8>,
    image_name: Option<String>,
    title: String,
    snippet: String,
    template_id: String,
    cta_url: String,
    campaign_name: String,
}

/// Name for the stored upload, keeping a plain alphanumeric extension
fn upload_file_name(original: Option<&str>) -> String {
    let ext = original
        .and_then(|n| std::path::Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match ext {
        Some(ext) => format!("source.{}", ext.to_ascii_lowercase()),
        None => "source".to_string(),
    }
}

/// Upload an image and build the email
async fn build_email(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BuildEmailResponse>, AppError> {
    let form = BuildForm::read(&mut multipart)
        .await?
        .complete()
        .ok_or_else(|| AppError::BadRequest("missing required parameters".to_string()))?;

    validate_campaign_name(&form.campaign_name)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let template = state.resolve_template(&form.template_id)?;

    let job_id = new_job_id();
    let job_dir = state.work_dir.join(job_dir_name(&job_id));
    let upload_dir = job_dir.join(UPLOAD_DIR);
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("failed to create job directory: {}", e)))?;

    let image_path = upload_dir.join(upload_file_name(form.image_name.as_deref()));
    tokio::fs::write(&image_path, &form.image)
        .await
        .map_err(|e| AppError::Internal(format!("failed to store upload: {}", e)))?;

    let html_file = format!("{}.html", form.campaign_name);
    let assets_zip = format!("{}-assets.zip", form.campaign_name);
    let request = BuildRequest {
        image_path,
        template,
        title: form.title,
        snippet: form.snippet,
        cta_url: form.cta_url,
        campaign: form.campaign_name.clone(),
        output_html: job_dir.join(&html_file),
    };

    let _permit = state
        .permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let pipeline = EmailPipeline::new(state.pipeline_config.clone(), state.oracle.clone());
    let result = tokio::task::spawn_blocking(move || pipeline.build(&request, &SilentProgress))
        .await
        .map_err(|e| AppError::Internal(format!("build task failed: {}", e)))?;

    let result = result.map_err(|e| {
        error!(job_id = %job_id, error = %e, "email build failed");
        AppError::Internal("failed to build email".to_string())
    })?;

    info!(
        job_id = %job_id,
        campaign = %form.campaign_name,
        text_bands = result.text_bands,
        image_bands = result.image_bands,
        "email built"
    );

    state.jobs.insert(JobRecord {
        id: job_id.clone(),
        campaign: form.campaign_name,
        output_dir: job_dir,
        html_file: html_file.clone(),
        assets_zip: assets_zip.clone(),
        text_bands: result.text_bands,
        image_bands: result.image_bands,
        created_at: Utc::now(),
    });

    Ok(Json(BuildEmailResponse {
        html_file: format!("/api/download/{}/{}", job_id, html_file),
        assets_zip: format!("/api/download/{}/{}", job_id, assets_zip),
        job_id,
    }))
}

/// Downloaded artifact
#[derive(Debug)]
pub struct ArtifactDownload {
    data: Vec<u8>,
    filename: String,
}

impl ArtifactDownload {
    fn content_type(&self) -> &'static str {
        let ext = std::path::Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("html") | Some("htm") => "text/html; charset=utf-8",
            Some("zip") => "application/zip",
            Some("png") => "image/png",
            _ => "application/octet-stream",
        }
    }
}

impl IntoResponse for ArtifactDownload {
    fn into_response(self) -> axum::response::Response {
        let content_type = self.content_type();
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.filename.replace('"', "")),
                ),
            ],
            self.data,
        )
            .into_response()
    }
}

/// Download a generated artifact
async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path((job_id, filename)): Path<(String, String)>,
) -> Result<ArtifactDownload, AppError> {
    if !is_safe_name(&filename) {
        return Err(AppError::BadRequest("invalid filename".to_string()));
    }

    let job_dir = state
        .jobs
        .resolve_dir(&state.work_dir, &job_id)
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

    let path = job_dir.join(&filename);
    if !path.is_file() {
        return Err(AppError::NotFound(format!("File {} not found", filename)));
    }

    let data = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read output file: {}", e)))?;

    Ok(ArtifactDownload { data, filename })
}

/// API error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
