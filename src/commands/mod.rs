//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `dft/`, `parsers/`, `models/`, `utils/`, `web/`
//! - 子模块: optimize, convert, view, rank, serve

pub mod convert;
pub mod optimize;
pub mod rank;
pub mod serve;
pub mod view;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Optimize(args) => optimize::execute(args),
        Commands::Convert(args) => convert::execute(args),
        Commands::View(args) => view::execute(args),
        Commands::Rank(args) => rank::execute(args),
        Commands::Serve(args) => serve::execute(args),
    }
}
