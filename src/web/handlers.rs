//! # HTTP 处理函数
//!
//! ## 路由
//! - `GET /`、`GET /jobs`、`GET /jobs/:id`：HTML 页面
//! - `POST /api/run-opt`：同步优化，直接返回能量、XYZ 与查看器
//! - `POST /api/jobs/submit`：排队优化
//! - `GET /api/jobs`、`GET /api/jobs/:id`、`GET /api/jobs/:id/download`
//!
//! 错误统一返回 `{ "error": ..., "details": ... }`。
//!
//! ## 依赖关系
//! - 被 `web/mod.rs` 使用
//! - 使用 `web/form.rs`, `web/pages.rs`, `dft/`, `jobs/`, `viewer/`

use super::form::{FormError, RawForm, ValidatedUpload};
use super::pages;
use super::AppState;
use crate::dft;
use crate::error::AutoDftError;
use crate::models::{Job, JobStatus, Molecule};
use crate::parsers::{self, xyz::to_xyz_string};
use crate::viewer::{self, ViewerOptions};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;

/// 同步优化的工作目录（上传目录下）
pub const RUN_OPT_DIR: &str = "run-opt";

// ─────────────────────────────────────────────────────────────
// 错误响应
// ─────────────────────────────────────────────────────────────

/// 带状态码的 JSON 错误
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        ApiError {
            status,
            error: error.into(),
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<FormError> for ApiError {
    fn from(e: FormError) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, e.error, Some(e.details))
    }
}

impl From<AutoDftError> for ApiError {
    fn from(e: AutoDftError) -> Self {
        match &e {
            AutoDftError::JobNotFound(id) => {
                ApiError::new(StatusCode::NOT_FOUND, format!("Job {} not found", id), None)
            }
            AutoDftError::QueueFull { limit, .. } => ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                format!("You have reached the maximum limit of {} pending jobs", limit),
                None,
            ),
            _ if e.is_user_error() => {
                ApiError::new(StatusCode::BAD_REQUEST, "Invalid input", Some(e.to_string()))
            }
            _ => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Optimization failed",
                Some(e.to_string()),
            ),
        }
    }
}

fn internal(error: &str, e: impl std::fmt::Display) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, error, Some(e.to_string()))
}

/// 结构解析与判键在阻塞线程池中执行
async fn validate_upload(form: RawForm) -> Result<ValidatedUpload, ApiError> {
    tokio::task::spawn_blocking(move || form.validate())
        .await
        .map_err(|e| internal("Failed to validate upload", e))?
        .map_err(ApiError::from)
}

fn upload_stamp() -> String {
    Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
}

/// 为一次同步优化新建 `run-opt/<时间戳>[-n]`，返回 (运行 id, 目录)
fn create_run_dir(upload_dir: &std::path::Path) -> io::Result<(String, PathBuf)> {
    let parent = upload_dir.join(RUN_OPT_DIR);
    fs::create_dir_all(&parent)?;

    let stamp = upload_stamp();
    let mut n = 0u32;
    loop {
        let run_id = match n {
            0 => stamp.clone(),
            _ => format!("{}-{}", stamp, n),
        };
        let dir = parent.join(&run_id);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok((run_id, dir)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

/// 以 `<时间戳>-<文件名>` 保存排队作业的输入，已存在时追加序号，不覆盖
fn save_job_input(upload_dir: &std::path::Path, file_name: &str, content: &str) -> io::Result<(String, PathBuf)> {
    let stamp = upload_stamp();
    let mut n = 0u32;
    loop {
        let stored_name = match n {
            0 => format!("{}-{}", stamp, file_name),
            _ => format!("{}-{}-{}", stamp, n, file_name),
        };
        let path = upload_dir.join(&stored_name);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(content.as_bytes())?;
                return Ok((stored_name, path));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 页面
// ─────────────────────────────────────────────────────────────

pub async fn index() -> Html<String> {
    Html(pages::index_page())
}

pub async fn jobs_index(State(state): State<AppState>) -> Html<String> {
    Html(pages::jobs_page(&state.store.list()))
}

pub async fn job_detail(
    State(state): State<AppState>,
    Path(job_id): Path<u64>,
) -> Result<Html<String>, ApiError> {
    let job = state.store.get(job_id)?;
    let viewer = job_viewer(&state, &job);
    Ok(Html(pages::job_page(&job, viewer.as_deref())))
}

/// 作业页面的查看器：完成后叠加输入与优化结构，否则只显示输入
fn job_viewer(state: &AppState, job: &Job) -> Option<String> {
    let input = match parsers::parse_structure_file(&state.upload_dir.join(&job.input_file)) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("Cannot render input of job {}: {}", job.job_id, e);
            return None;
        }
    };

    let optimized = job
        .xyz_file
        .as_ref()
        .filter(|_| job.status == JobStatus::Completed)
        .and_then(|name| parsers::parse_structure_file(&state.upload_dir.join(name)).ok());

    let mut molecules: Vec<&Molecule> = vec![&input];
    if let Some(opt) = &optimized {
        molecules.push(opt);
    }
    let options = ViewerOptions::with_id(format!("job{}", job.job_id));
    Some(viewer::render_molecules(&molecules, &options))
}

// ─────────────────────────────────────────────────────────────
// 同步优化
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptResponse {
    /// 最终能量 (kJ/mol)
    pub energy: f64,
    pub xyz: String,
    /// `run-opt/` 下本次运行的目录名
    pub run_id: String,
    pub input_file_name: String,
    pub xyz_file_name: String,
    /// 叠加输入与优化结构的独立 HTML 页面
    pub viewer_html: String,
}

/// 结果文件名：输入本身是 XYZ 时加 `_opt` 避免覆盖
fn result_file_name(input_file_name: &str) -> String {
    match input_file_name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("xyz") => format!("{}_opt.xyz", stem),
        Some((stem, _)) => format!("{}.xyz", stem),
        None => format!("{}.xyz", input_file_name),
    }
}

pub async fn run_opt(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RunOptResponse>, ApiError> {
    let upload = validate_upload(RawForm::from_multipart(multipart).await?).await?;

    // 每次运行独占一个目录，不碰队列作业的文件
    let (run_id, run_dir) =
        create_run_dir(&state.upload_dir).map_err(|e| internal("Failed to save upload", e))?;
    let input_path = run_dir.join(&upload.file_name);
    fs::write(&input_path, &upload.content).map_err(|e| internal("Failed to save upload", e))?;

    let xyz_file_name = result_file_name(&upload.file_name);
    let xyz_path = run_dir.join(&xyz_file_name);

    log::info!("Synchronous optimization of {} in {}/{}", upload.file_name, RUN_OPT_DIR, run_id);
    let engine = state.engine.clone();
    let molecule = upload.molecule;
    let settings = upload.settings;
    let report = tokio::task::spawn_blocking(move || {
        dft::optimize_molecule(&molecule, &settings, &xyz_path, engine.as_ref())
    })
    .await
    .map_err(|e| internal("Optimization failed", e))??;

    let viewer_html = viewer::viewer_page(
        &format!("{} (input vs. optimized)", report.input.name),
        &viewer::render_molecules(&[&report.input, &report.optimized], &ViewerOptions::default()),
    );

    Ok(Json(RunOptResponse {
        energy: report.energy_kjmol,
        xyz: to_xyz_string(&report.optimized),
        run_id,
        input_file_name: upload.file_name,
        xyz_file_name,
        viewer_html,
    }))
}

// ─────────────────────────────────────────────────────────────
// 作业 API
// ─────────────────────────────────────────────────────────────

pub async fn submit_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pending = state.store.count_pending();
    if pending >= state.max_pending_jobs {
        return Err(AutoDftError::QueueFull {
            pending,
            limit: state.max_pending_jobs,
        }
        .into());
    }

    let upload = validate_upload(RawForm::from_multipart(multipart).await?).await?;

    // 先落盘再入队，worker 取到作业时文件一定存在
    let (stored_name, input_path) = save_job_input(&state.upload_dir, &upload.file_name, &upload.content)
        .map_err(|e| internal("Failed to save upload", e))?;

    let job = match state
        .store
        .submit(&stored_name, upload.settings, state.max_pending_jobs)
    {
        Ok(job) => job,
        Err(e) => {
            let _ = fs::remove_file(&input_path);
            return Err(e.into());
        }
    };

    log::info!("Queued job {} ({})", job.job_id, stored_name);
    Ok(Json(json!({ "success": true, "jobId": job.job_id })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<serde_json::Value> {
    let jobs: Vec<Job> = state
        .store
        .list()
        .into_iter()
        .filter(|j| match &query.status {
            Some(s) => j.status.to_string() == s.to_lowercase(),
            None => true,
        })
        .collect();
    Json(json!({ "jobs": jobs }))
}

pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<u64>) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.store.get(job_id)?))
}

pub async fn download_job(
    State(state): State<AppState>,
    Path(job_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.store.get(job_id)?;

    if job.status != JobStatus::Completed {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Job is not completed yet, cannot download results",
            Some(format!("status: {}", job.status)),
        ));
    }
    let name = job.xyz_file.as_deref().ok_or_else(|| {
        ApiError::new(StatusCode::BAD_REQUEST, "No result file available for this job", None)
    })?;

    let content = fs::read_to_string(state.upload_dir.join(name)).map_err(|_| {
        ApiError::new(StatusCode::NOT_FOUND, "Result file not found on server", None)
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "chemical/x-xyz".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        content,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dft::engine::testing::FakeEngine;
    use crate::dft::Engine;
    use crate::jobs::JobStore;
    use crate::models::OptimizationSettings;
    use crate::web::router;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "autodft-test-boundary";
    const WATER_XYZ: &str = "3\nwater\nO 0.0 0.0 0.1173\nH 0.0 0.7572 -0.4692\nH 0.0 -0.7572 -0.4692\n";

    fn test_state(dir: &TempDir, max_pending_jobs: usize) -> AppState {
        let engine: Arc<dyn Engine> = Arc::new(FakeEngine::new(-76.4));
        AppState {
            store: Arc::new(JobStore::open(&dir.path().join("jobs.json")).unwrap()),
            engine,
            upload_dir: dir.path().to_path_buf(),
            max_pending_jobs,
        }
    }

    fn multipart_body(functional: &str, file: Option<(&str, &str)>) -> Body {
        let mut body = String::new();
        for (name, value) in [
            ("dielectric", "78.5"),
            ("functional", functional),
            ("basis", "def2-svpd"),
            ("charge", "0"),
        ] {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            ));
        }
        if let Some((file_name, content)) = file {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"structureFile\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n{}\r\n",
                BOUNDARY, file_name, content
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        Body::from(body)
    }

    fn post(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body)
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_page() {
        let dir = TempDir::new().unwrap();
        let resp = router(test_state(&dir, 5)).oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("optForm"));
    }

    #[tokio::test]
    async fn test_run_opt_success() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir, 5));

        let resp = app
            .oneshot(post("/api/run-opt", multipart_body("M06-2X", Some(("Water.xyz", WATER_XYZ)))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: RunOptResponse = serde_json::from_value(body_json(resp).await).unwrap();
        assert!((body.energy - (-200588.2)).abs() < 1e-6);
        assert_eq!(body.input_file_name, "water.xyz");
        assert_eq!(body.xyz_file_name, "water_opt.xyz");
        assert!(body.xyz.starts_with("3\nEnergy: -200588.20 kJ/mol\n"));
        assert_eq!(body.viewer_html.matches(".addModel(").count(), 2);

        let run_dir = dir.path().join(RUN_OPT_DIR).join(&body.run_id);
        assert!(run_dir.join("water.xyz").exists());
        assert!(run_dir.join("water_opt.xyz").exists());
        assert!(!dir.path().join("water.xyz").exists());
    }

    #[tokio::test]
    async fn test_run_opt_does_not_touch_job_files() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, 5);
        let app = router(state.clone());

        state.store.insert("water.xyz", OptimizationSettings::default()).unwrap();
        fs::write(dir.path().join("job1.xyz"), "1\nEnergy: -1.00 kJ/mol\nHe 0 0 0\n").unwrap();
        state.store.complete(1, -1.0, "job1.xyz").unwrap();

        // 与作业结果同名的上传，连续两次
        let mut run_ids = Vec::new();
        for _ in 0..2 {
            let resp = app
                .clone()
                .oneshot(post("/api/run-opt", multipart_body("PBE", Some(("job1.xyz", WATER_XYZ)))))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let body: RunOptResponse = serde_json::from_value(body_json(resp).await).unwrap();
            run_ids.push(body.run_id);
        }
        assert_ne!(run_ids[0], run_ids[1]);
        for run_id in &run_ids {
            assert!(dir.path().join(RUN_OPT_DIR).join(run_id).join("job1_opt.xyz").exists());
        }

        let resp = app.oneshot(get("/api/jobs/1/download")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("He 0 0 0"));
        assert!(!text.contains("water"));
    }

    #[test]
    fn test_save_job_input_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let (first, first_path) = save_job_input(dir.path(), "water.xyz", "first").unwrap();
        let (second, second_path) = save_job_input(dir.path(), "water.xyz", "second").unwrap();

        assert!(first.ends_with("-water.xyz"));
        assert!(second.ends_with("-water.xyz"));
        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(first_path).unwrap(), "first");
        assert_eq!(fs::read_to_string(second_path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_run_opt_validation_errors() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir, 5));

        let resp = app
            .clone()
            .oneshot(post("/api/run-opt", multipart_body("HF", Some(("water.xyz", WATER_XYZ)))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Invalid functional");
        assert_eq!(body["details"], "Must be M06-2X, B3LYP, or PBE");

        let resp = app
            .oneshot(post("/api/run-opt", multipart_body("PBE", None)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "No structure file uploaded");
    }

    #[tokio::test]
    async fn test_submit_and_query_jobs() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, 1);
        let app = router(state.clone());

        let resp = app
            .clone()
            .oneshot(post("/api/jobs/submit", multipart_body("B3LYP", Some(("water.xyz", WATER_XYZ)))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["jobId"], 1);

        let job = state.store.get(1).unwrap();
        assert!(job.input_file.ends_with("-water.xyz"));
        assert!(dir.path().join(&job.input_file).exists());
        assert_eq!(job.parameters.functional, "B3LYP");

        // 队列已满
        let resp = app
            .clone()
            .oneshot(post("/api/jobs/submit", multipart_body("B3LYP", Some(("water.xyz", WATER_XYZ)))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let resp = app.clone().oneshot(get("/api/jobs")).await.unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["jobs"].as_array().unwrap().len(), 1);

        let resp = app.clone().oneshot(get("/api/jobs?status=completed")).await.unwrap();
        assert!(body_json(resp).await["jobs"].as_array().unwrap().is_empty());

        let resp = app.clone().oneshot(get("/api/jobs/1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["jobId"], 1);
        assert_eq!(body["status"], "pending");

        let resp = app.clone().oneshot(get("/api/jobs/42")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app.clone().oneshot(get("/jobs/1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("Job #1"));
        assert!(html.contains("viewer_job1.addModel("));

        let resp = app.oneshot(get("/jobs")).await.unwrap();
        assert!(body_text(resp).await.contains("href=\"/jobs/1\""));
    }

    #[tokio::test]
    async fn test_download() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, 5);
        let app = router(state.clone());

        state.store.insert("water.xyz", OptimizationSettings::default()).unwrap();
        let resp = app.clone().oneshot(get("/api/jobs/1/download")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        fs::write(dir.path().join("job1.xyz"), "1\nEnergy: -1.00 kJ/mol\nHe 0 0 0\n").unwrap();
        state.store.complete(1, -1.0, "job1.xyz").unwrap();

        let resp = app.oneshot(get("/api/jobs/1/download")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"job1.xyz\""
        );
        assert!(body_text(resp).await.contains("He 0 0 0"));
    }

    #[test]
    fn test_result_file_name() {
        assert_eq!(result_file_name("aspirin.sdf"), "aspirin.xyz");
        assert_eq!(result_file_name("water.xyz"), "water_opt.xyz");
        assert_eq!(result_file_name("noext"), "noext.xyz");
    }

    #[test]
    fn test_error_mapping() {
        let e: ApiError = AutoDftError::JobNotFound(3).into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);

        let e: ApiError = AutoDftError::QueueFull { pending: 5, limit: 5 }.into();
        assert_eq!(e.status, StatusCode::TOO_MANY_REQUESTS);

        let e: ApiError = AutoDftError::InvalidArgument("odd".into()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);

        let e: ApiError = AutoDftError::CommandNotFound { command: "python3".into() }.into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.error, "Optimization failed");
    }
}
