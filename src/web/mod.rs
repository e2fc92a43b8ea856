//! Web server module for mailslicer
//!
//! HTTP API around the build pipeline.
//!
//! # Endpoints
//!
//! - `POST /api/build-email` - multipart upload, builds one email
//! - `GET  /api/download/{job_id}/{filename}` - fetch a generated artifact
//! - `GET  /api/health` - health check
//!
//! # Usage
//!
//! Enable the `web` feature and use the `serve` subcommand:
//!
//! ```bash
//! cargo build --features web
//! mailslicer serve --port 3000 --templates-dir templates
//! ```

mod job;
mod routes;
mod server;

pub use job::{
    is_safe_name, new_job_id, JobRecord, JobStore, DEFAULT_MAX_JOBS, JOB_ID_LEN,
};
pub use routes::{api_routes, AppError, AppState, BuildEmailResponse, HealthResponse};
pub use server::{ServerConfig, ServerError, WebServer};

/// Default server port
pub const DEFAULT_PORT: u16 = crate::config::DEFAULT_SERVER_PORT;

/// Default bind address
pub const DEFAULT_BIND: &str = crate::config::DEFAULT_SERVER_BIND;

/// Default upload limit in bytes (50 MB)
pub const DEFAULT_UPLOAD_LIMIT: usize = crate::config::DEFAULT_UPLOAD_LIMIT_MB * 1024 * 1024;

/// Template id served by the built-in template when no file matches
pub const DEFAULT_TEMPLATE_ID: &str = "default";
