//! # AutoDFT - 隐式溶剂 DFT 几何优化
//!
//! 把分子结构交给外部量化引擎（PySCF / gpu4pyscf）做 DFT + IEF-PCM 几何优化，
//! 保存带能量的 XYZ 结果，并提供浏览器界面与作业队列。
//!
//! ## 子命令
//! - `optimize` (`run-opt`) - 单个结构的几何优化
//! - `convert` - 结构格式转换 / 查看器页面
//! - `view`    - 3D 查看器 HTML
//! - `rank`    - 按能量排序优化结果
//! - `serve`   - Web 界面与后台作业队列
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── dft/       (优化驱动与外部引擎)
//!   │     ├── parsers/   (结构读写)
//!   │     ├── viewer/    (3D 查看器)
//!   │     ├── web/       (HTTP 界面)
//!   │     ├── jobs/      (作业存储与后台处理)
//!   │     └── models/    (数据模型)
//!   ├── batch/      (批量处理)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod dft;
mod error;
mod jobs;
mod models;
mod parsers;
mod utils;
mod viewer;
mod web;

use clap::Parser;
use cli::Cli;
use log::LevelFilter;

fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    // RUST_LOG 可覆盖默认级别
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
