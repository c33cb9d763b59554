//! # optimize 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/optimize.rs`

use super::EngineArgs;
use crate::models::{DEFAULT_BASIS, DEFAULT_FUNCTIONAL};
use clap::Args;
use std::path::PathBuf;

/// optimize 子命令参数
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Input structure file (.xyz, .sdf, .mol, .mol2, .pdb)
    #[arg(short, long, visible_alias = "sdf-file-path")]
    pub input: PathBuf,

    /// Dielectric constant of the solvent
    #[arg(long, default_value_t = 78.5, conflicts_with = "solvent")]
    pub dielectric_constant: f64,

    /// Solvent preset name (e.g. water, dmso, chloroform)
    #[arg(long)]
    pub solvent: Option<String>,

    /// Exchange-correlation functional
    #[arg(long, default_value = DEFAULT_FUNCTIONAL)]
    pub functional: String,

    /// Basis set
    #[arg(long, default_value = DEFAULT_BASIS)]
    pub basis: String,

    /// Total molecular charge
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub charge: i32,

    /// Directory for the optimized XYZ file (default: current directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also write an HTML page overlaying input and optimized structures
    #[arg(long, default_value_t = false)]
    pub html: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}
