//! # serve 子命令 CLI 定义
//!
//! 所有参数都可以用环境变量设置。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/serve.rs`

use super::EngineArgs;
use clap::Args;
use std::path::PathBuf;

/// serve 子命令参数
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "AUTODFT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "AUTODFT_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Directory for uploaded structures and results
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Job store file (default: <upload-dir>/jobs.json)
    #[arg(long, env = "DATABASE_PATH")]
    pub db_path: Option<PathBuf>,

    /// Maximum number of pending jobs accepted by the queue
    #[arg(long, default_value_t = 5)]
    pub max_pending_jobs: usize,

    /// Retries before a failed job is given up
    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Queue polling interval in seconds
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,

    #[command(flatten)]
    pub engine: EngineArgs,
}
