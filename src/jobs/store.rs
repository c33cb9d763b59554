//! # 作业存储
//!
//! 以单个 JSON 文件持久化作业记录，所有操作在互斥锁内完成并立即落盘。
//!
//! ## 文件格式
//! ```json
//! { "nextId": 3, "jobs": [ { "jobId": 1, "status": "completed", ... } ] }
//! ```
//!
//! ## 依赖关系
//! - 被 `jobs/worker.rs`、`web/` 使用
//! - 使用 `models/job.rs`

use crate::error::{AutoDftError, Result};
use crate::models::{Job, JobStatus, OptimizationSettings};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreData {
    next_id: u64,
    jobs: Vec<Job>,
}

/// 持久化作业存储
#[derive(Debug)]
pub struct JobStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JobStore {
    /// 打开（或新建）存储文件
    ///
    /// 上次进程退出时仍处于 running 的作业重新放回队列。
    pub fn open(path: &Path) -> Result<Self> {
        let mut data = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| AutoDftError::read(path, e))?;
            if content.trim().is_empty() {
                StoreData::default()
            } else {
                serde_json::from_str(&content).map_err(|e| AutoDftError::ParseError {
                    format: "job store".to_string(),
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?
            }
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| AutoDftError::write(parent, e))?;
            }
            StoreData::default()
        };

        // 保证新 ID 不与已有记录冲突
        let max_id = data.jobs.iter().map(|j| j.job_id).max().unwrap_or(0);
        data.next_id = data.next_id.max(max_id + 1);

        let mut recovered = 0;
        for job in data.jobs.iter_mut().filter(|j| j.status == JobStatus::Running) {
            job.status = JobStatus::Pending;
            recovered += 1;
        }
        if recovered > 0 {
            log::warn!("Re-queued {} job(s) interrupted by a previous shutdown", recovered);
        }

        let store = JobStore {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        };
        {
            let data = store.lock();
            store.save(&data)?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        // 持锁线程 panic 后数据仍然完整（每次修改后立即落盘）
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 先写临时文件再重命名
    fn save(&self, data: &StoreData) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(data)?).map_err(|e| AutoDftError::write(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| AutoDftError::write(&self.path, e))
    }

    /// 落盘成功后才替换内存中的数据
    fn commit(&self, data: &mut StoreData, next: StoreData) -> Result<()> {
        self.save(&next)?;
        *data = next;
        Ok(())
    }

    /// 修改单个作业并落盘
    fn update<F>(&self, job_id: u64, f: F) -> Result<Job>
    where
        F: FnOnce(&mut Job),
    {
        let mut data = self.lock();
        let mut next = data.clone();
        let job = next
            .jobs
            .iter_mut()
            .find(|j| j.job_id == job_id)
            .ok_or(AutoDftError::JobNotFound(job_id))?;
        f(job);
        let updated = job.clone();
        self.commit(&mut data, next)?;
        Ok(updated)
    }

    fn push_job(&self, data: &mut StoreData, input_file: &str, parameters: OptimizationSettings) -> Result<Job> {
        let mut next = data.clone();
        let job = Job::new(next.next_id, input_file, parameters);
        next.next_id += 1;
        next.jobs.push(job.clone());
        self.commit(data, next)?;
        Ok(job)
    }

    /// 新增一个 pending 作业
    pub fn insert(&self, input_file: &str, parameters: OptimizationSettings) -> Result<Job> {
        let mut data = self.lock();
        self.push_job(&mut data, input_file, parameters)
    }

    /// 队列未满时新增作业，否则返回 `QueueFull`
    pub fn submit(&self, input_file: &str, parameters: OptimizationSettings, max_pending: usize) -> Result<Job> {
        let mut data = self.lock();
        let pending = data.jobs.iter().filter(|j| j.status == JobStatus::Pending).count();
        if pending >= max_pending {
            return Err(AutoDftError::QueueFull {
                pending,
                limit: max_pending,
            });
        }
        self.push_job(&mut data, input_file, parameters)
    }

    pub fn get(&self, job_id: u64) -> Result<Job> {
        self.lock()
            .jobs
            .iter()
            .find(|j| j.job_id == job_id)
            .cloned()
            .ok_or(AutoDftError::JobNotFound(job_id))
    }

    /// 全部作业，新的在前
    pub fn list(&self) -> Vec<Job> {
        let mut jobs = self.lock().jobs.clone();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.job_id.cmp(&a.job_id)));
        jobs
    }

    pub fn count_pending(&self) -> usize {
        self.lock()
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .count()
    }

    /// 取出最早的 pending 作业并标记为 running
    pub fn claim_next_pending(&self) -> Result<Option<Job>> {
        let mut data = self.lock();
        let oldest = data
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| j.status == JobStatus::Pending)
            .min_by(|(_, a), (_, b)| a.created_at.cmp(&b.created_at).then(a.job_id.cmp(&b.job_id)))
            .map(|(idx, _)| idx);

        let Some(idx) = oldest else {
            return Ok(None);
        };
        let mut next = data.clone();
        next.jobs[idx].status = JobStatus::Running;
        let claimed = next.jobs[idx].clone();
        self.commit(&mut data, next)?;
        Ok(Some(claimed))
    }

    pub fn complete(&self, job_id: u64, energy_kjmol: f64, xyz_file: &str) -> Result<Job> {
        self.update(job_id, |job| {
            job.status = JobStatus::Completed;
            job.energy = Some(energy_kjmol);
            job.xyz_file = Some(xyz_file.to_string());
            job.completed_at = Some(Utc::now());
            job.error = None;
        })
    }

    pub fn mark_failed(&self, job_id: u64, error: &str) -> Result<Job> {
        self.update(job_id, |job| {
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
            job.error = Some(error.to_string());
        })
    }

    /// 失败后重新排队，重试次数加一
    pub fn requeue(&self, job_id: u64, error: &str) -> Result<Job> {
        self.update(job_id, |job| {
            job.status = JobStatus::Pending;
            job.retry_count += 1;
            job.error = Some(error.to_string());
        })
    }
}
