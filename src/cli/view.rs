//! # view 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/view.rs`

use clap::Args;
use std::path::PathBuf;

/// view 子命令参数
#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Structure file to display
    pub structure: PathBuf,

    /// Second structure overlaid in a different color (e.g. the optimized geometry)
    #[arg(long)]
    pub compare: Option<PathBuf>,

    /// Output HTML file
    #[arg(short, long, default_value = "viewer.html")]
    pub output: PathBuf,

    /// Stick radius in Å
    #[arg(long, default_value_t = 0.1)]
    pub stick_radius: f64,
}
