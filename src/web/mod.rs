//! # Web 前端
//!
//! 基于 axum 的浏览器界面：上传结构、选择溶剂与方法、同步优化或排队提交，
//! 并在页面中查看优化前后的结构。
//!
//! ## 依赖关系
//! - 被 `commands/serve.rs` 使用
//! - 子模块: form, handlers, pages
//! - 使用 `jobs/` 运行后台队列

pub mod form;
pub mod handlers;
pub mod pages;

use crate::dft::Engine;
use crate::error::{AutoDftError, Result};
use crate::jobs::{self, JobStore, WorkerConfig};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// 处理函数共享的状态
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub engine: Arc<dyn Engine>,
    pub upload_dir: PathBuf,
    pub max_pending_jobs: usize,
}

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub db_path: PathBuf,
    pub max_pending_jobs: usize,
    pub max_retries: u32,
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            db_path: PathBuf::from("uploads/jobs.json"),
            max_pending_jobs: 5,
            max_retries: 2,
            poll_interval: Duration::from_secs(5),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/jobs", get(handlers::jobs_index))
        .route("/jobs/:id", get(handlers::job_detail))
        .route("/api/run-opt", post(handlers::run_opt))
        .route("/api/jobs", get(handlers::list_jobs))
        .route("/api/jobs/submit", post(handlers::submit_job))
        .route("/api/jobs/:id", get(handlers::get_job))
        .route("/api/jobs/:id/download", get(handlers::download_job))
        // 留出 multipart 边界和其他字段的余量，超限文件由表单校验报告
        .layer(DefaultBodyLimit::max(form::MAX_UPLOAD_BYTES + 1024 * 1024))
        .with_state(state)
}

/// 启动后台作业循环并监听 HTTP，Ctrl-C 时优雅退出
pub async fn serve(config: ServerConfig, engine: Arc<dyn Engine>) -> Result<()> {
    fs::create_dir_all(&config.upload_dir).map_err(|e| AutoDftError::write(&config.upload_dir, e))?;

    let store = Arc::new(JobStore::open(&config.db_path)?);
    log::info!(
        "Job store at {} ({} pending)",
        store.path().display(),
        store.count_pending()
    );

    let worker_config = WorkerConfig {
        upload_dir: config.upload_dir.clone(),
        max_retries: config.max_retries,
        poll_interval: config.poll_interval,
    };
    tokio::spawn(jobs::run_worker(store.clone(), engine.clone(), worker_config));

    let state = AppState {
        store,
        engine,
        upload_dir: config.upload_dir.clone(),
        max_pending_jobs: config.max_pending_jobs,
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AutoDftError::Other(format!("Failed to bind {}: {}", addr, e)))?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AutoDftError::Other(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
