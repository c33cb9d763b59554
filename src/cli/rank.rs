//! # rank 子命令 CLI 定义
//!
//! 按 XYZ 注释行中的能量对优化结果排序
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/rank.rs`

use clap::Args;
use std::path::PathBuf;

/// rank 子命令参数
#[derive(Args, Debug)]
pub struct RankArgs {
    /// Directory containing optimized XYZ files
    pub dir: PathBuf,

    /// Glob pattern for result files
    #[arg(short, long, default_value = "*.xyz")]
    pub pattern: String,

    /// Recurse into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Number of lowest-energy structures to show (0 = all)
    #[arg(short = 'n', long, default_value_t = 10)]
    pub top_n: usize,

    /// Export the full ranking to a CSV file
    #[arg(long)]
    pub output_csv: Option<PathBuf>,
}
