//! Web server implementation
//!
//! Provides the main server struct and configuration.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

use super::routes::{api_routes, AppState};
use super::{DEFAULT_BIND, DEFAULT_PORT, DEFAULT_UPLOAD_LIMIT};
use crate::ocr::TextOracle;
use crate::pipeline::PipelineConfig;

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Address to bind to
    pub bind: String,
    /// Number of concurrent builds
    pub workers: usize,
    /// Maximum upload size in bytes
    pub upload_limit: usize,
    /// Root directory for job outputs
    pub work_dir: PathBuf,
    /// Directory holding `<template_id>.html` files
    pub templates_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            workers: num_cpus::get(),
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            work_dir: PathBuf::from("data"),
            templates_dir: PathBuf::from("templates"),
        }
    }
}

impl ServerConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the bind address
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Set the upload limit in bytes
    pub fn with_upload_limit(mut self, limit: usize) -> Self {
        self.upload_limit = limit;
        self
    }

    /// Set the number of concurrent builds (at least 1)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the job output root
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Set the templates directory
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = dir.into();
        self
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind, self.port).parse()
    }
}

/// Web server instance
pub struct WebServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a server whose text oracle follows `pipeline_config.ocr`
    pub fn new(config: ServerConfig, pipeline_config: PipelineConfig) -> Self {
        let oracle = pipeline_config.oracle();
        Self::with_oracle(config, pipeline_config, oracle)
    }

    /// Create a server with an explicit text oracle
    pub fn with_oracle(
        config: ServerConfig,
        pipeline_config: PipelineConfig,
        oracle: Arc<dyn TextOracle>,
    ) -> Self {
        let state = AppState::new(
            pipeline_config,
            oracle,
            config.work_dir.clone(),
            config.templates_dir.clone(),
            config.workers,
        );
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared state
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api", api_routes())
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.upload_limit))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl-C or SIGTERM
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = self.config.socket_addr()?;
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let router = self.router();

        info!(
            %addr,
            workers = self.config.workers,
            work_dir = %self.config.work_dir.display(),
            templates_dir = %self.config.templates_dir.display(),
            ocr = self.state.oracle.name(),
            "starting server"
        );
        println!("Starting server on http://{}", addr);
        println!("API endpoints:");
        println!("  POST /api/build-email                  - Upload image and build email");
        println!("  GET  /api/download/{{job_id}}/{{filename}} - Download artifact");
        println!("  GET  /api/health                       - Health check");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped");
        Ok(())
    }
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, finishing in-flight requests");
}
