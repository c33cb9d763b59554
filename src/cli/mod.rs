//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `optimize` (别名 `run-opt`): 单个结构的溶剂化几何优化
//! - `convert`: 批量结构格式转换 / 生成查看器页面
//! - `view`: 生成 3D 查看器 HTML
//! - `rank`: 按能量排序优化结果
//! - `serve`: 启动浏览器界面与作业队列
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: optimize, convert, view, rank, serve

pub mod convert;
pub mod optimize;
pub mod rank;
pub mod serve;
pub mod view;

use crate::dft::{Backend, PyscfEngine};
use clap::{Args, Parser, Subcommand};

/// AutoDFT - 隐式溶剂 DFT 几何优化工具
#[derive(Parser)]
#[command(name = "autodft")]
#[command(version)]
#[command(about = "DFT geometry optimization with IEF-PCM implicit solvation", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Optimize a molecular geometry with DFT and implicit solvent
    #[command(alias = "run-opt")]
    Optimize(optimize::OptimizeArgs),

    /// Convert structure files to XYZ, SDF or HTML viewer pages
    Convert(convert::ConvertArgs),

    /// Write a standalone 3D viewer page for one or two structures
    View(view::ViewArgs),

    /// Rank optimized XYZ files by the energy in their comment line
    Rank(rank::RankArgs),

    /// Start the web interface and the background job queue
    Serve(serve::ServeArgs),
}

/// 量化引擎参数（optimize 与 serve 共用）
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Python interpreter with pyscf / gpu4pyscf installed
    #[arg(long, env = "AUTODFT_PYTHON", default_value = "python3")]
    pub python: String,

    /// Compute backend used by the engine
    #[arg(long, env = "AUTODFT_BACKEND", value_enum, default_value_t = Backend::Gpu)]
    pub backend: Backend,
}

impl EngineArgs {
    pub fn engine(&self) -> PyscfEngine {
        PyscfEngine::new(self.python.clone(), self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_opt_alias() {
        let cli = Cli::try_parse_from([
            "autodft",
            "run-opt",
            "--sdf-file-path",
            "aspirin.sdf",
            "--charge",
            "-1",
            "--backend",
            "cpu",
        ])
        .unwrap();
        match cli.command {
            Commands::Optimize(args) => {
                assert_eq!(args.input.to_str(), Some("aspirin.sdf"));
                assert_eq!(args.charge, -1);
                assert_eq!(args.dielectric_constant, 78.5);
                assert_eq!(args.functional, "M06-2X");
                assert_eq!(args.engine.backend, Backend::Cpu);
            }
            _ => panic!("expected optimize"),
        }
    }
}
