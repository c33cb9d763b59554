//! # 排队作业数据模型
//!
//! Web 界面提交的异步优化作业记录。
//!
//! ## 依赖关系
//! - 被 `jobs/` 和 `web/` 使用
//! - 使用 `models/settings.rs`

use super::OptimizationSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 作业状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 作业记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: u64,
    /// 上传目录中的输入结构文件名
    pub input_file: String,
    /// 上传目录中的优化结果文件名
    pub xyz_file: Option<String>,
    pub parameters: OptimizationSettings,
    /// 最终能量 (kJ/mol)
    pub energy: Option<f64>,
    pub status: JobStatus,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(job_id: u64, input_file: impl Into<String>, parameters: OptimizationSettings) -> Self {
        Job {
            job_id,
            input_file: input_file.into(),
            xyz_file: None,
            parameters,
            energy: None,
            status: JobStatus::Pending,
            retry_count: 0,
            created_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    /// 结果文件名 `job<id>.xyz`
    pub fn output_name(&self) -> String {
        format!("job{}.xyz", self.job_id)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}
