//! # 后台作业处理
//!
//! 轮询作业存储，按提交顺序逐个执行优化。优化本身是阻塞调用，
//! 在 `spawn_blocking` 线程中运行。
//!
//! ## 依赖关系
//! - 被 `web/mod.rs` 使用
//! - 使用 `jobs/store.rs`, `dft/`, `parsers/`

use super::store::JobStore;
use crate::dft::{self, Engine, OptimizationReport};
use crate::error::{AutoDftError, Result};
use crate::models::Job;
use crate::parsers;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// 作业处理参数
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// 输入文件与结果文件所在目录
    pub upload_dir: PathBuf,
    /// 失败后最多重新排队的次数
    pub max_retries: u32,
    /// 队列为空时的等待间隔
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            upload_dir: PathBuf::from("uploads"),
            max_retries: 2,
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// 单个作业的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed { energy_kjmol: f64 },
    Retrying { attempt: u32 },
    Failed { error: String },
}

/// 常驻循环
pub async fn run_worker(store: Arc<JobStore>, engine: Arc<dyn Engine>, config: WorkerConfig) {
    log::info!(
        "Job worker started (max retries {}, poll every {}s)",
        config.max_retries,
        config.poll_interval.as_secs()
    );

    loop {
        match process_next(&store, &engine, &config).await {
            Ok(Some(_)) => {}
            Ok(None) => tokio::time::sleep(config.poll_interval).await,
            Err(e) => {
                log::error!("Worker error: {}", e);
                tokio::time::sleep(config.poll_interval).await;
            }
        }
    }
}

/// 处理最早的一个 pending 作业，队列为空时返回 `None`
pub async fn process_next(
    store: &Arc<JobStore>,
    engine: &Arc<dyn Engine>,
    config: &WorkerConfig,
) -> Result<Option<(u64, JobOutcome)>> {
    let Some(job) = store.claim_next_pending()? else {
        return Ok(None);
    };
    let job_id = job.job_id;
    log::info!("Processing job {} ({})", job_id, job.input_file);

    let engine = Arc::clone(engine);
    let upload_dir = config.upload_dir.clone();
    let task_job = job.clone();
    let result = tokio::task::spawn_blocking(move || run_job(&task_job, engine.as_ref(), &upload_dir))
        .await
        .unwrap_or_else(|e| Err(AutoDftError::Other(format!("optimization task aborted: {}", e))));

    let outcome = match result {
        Ok(report) => {
            store.complete(job_id, report.energy_kjmol, &job.output_name())?;
            log::info!("Job {} completed: {:.2} kJ/mol", job_id, report.energy_kjmol);
            JobOutcome::Completed {
                energy_kjmol: report.energy_kjmol,
            }
        }
        // 输入本身有误时重试没有意义
        Err(e) if !e.is_user_error() && job.retry_count < config.max_retries => {
            let attempt = job.retry_count + 1;
            store.requeue(job_id, &e.to_string())?;
            log::warn!(
                "Job {} failed, retrying ({}/{}): {}",
                job_id,
                attempt,
                config.max_retries,
                e
            );
            JobOutcome::Retrying { attempt }
        }
        Err(e) => {
            let error = e.to_string();
            store.mark_failed(job_id, &error)?;
            log::error!("Job {} failed after {} retries: {}", job_id, job.retry_count, error);
            JobOutcome::Failed { error }
        }
    };

    Ok(Some((job_id, outcome)))
}

/// 执行单个作业：读取上传的结构，结果写入 `<upload_dir>/job<id>.xyz`
pub fn run_job(job: &Job, engine: &dyn Engine, upload_dir: &Path) -> Result<OptimizationReport> {
    let input = upload_dir.join(&job.input_file);
    let molecule = parsers::parse_structure_file(&input)?;
    let xyz_path = upload_dir.join(job.output_name());
    dft::optimize_molecule(&molecule, &job.parameters, &xyz_path, engine)
}
