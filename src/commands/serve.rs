//! # serve 命令实现
//!
//! 构建 tokio 运行时，启动 Web 界面与后台作业队列。
//!
//! ## 依赖关系
//! - 使用 `cli/serve.rs` 定义的参数
//! - 使用 `web/`, `dft/`

use crate::cli::serve::ServeArgs;
use crate::dft::Engine;
use crate::error::{AutoDftError, Result};
use crate::utils::output;
use crate::web::{self, ServerConfig};

use std::sync::Arc;
use std::time::Duration;

/// 执行 serve 命令
pub fn execute(args: ServeArgs) -> Result<()> {
    let config = server_config(&args)?;
    let engine: Arc<dyn Engine> = Arc::new(args.engine.engine());

    output::print_header("AutoDFT web interface");
    output::print_info(&format!("Engine: {}", engine.describe()));
    output::print_info(&format!("Uploads: {}", config.upload_dir.display()));
    output::print_info(&format!("Open http://{}:{}/ in a browser", config.host, config.port));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AutoDftError::Other(format!("Failed to start async runtime: {}", e)))?;

    runtime.block_on(web::serve(config, engine))
}

fn server_config(args: &ServeArgs) -> Result<ServerConfig> {
    if args.max_pending_jobs == 0 {
        return Err(AutoDftError::InvalidArgument(
            "--max-pending-jobs must be at least 1".to_string(),
        ));
    }
    if args.poll_interval == 0 {
        return Err(AutoDftError::InvalidArgument(
            "--poll-interval must be at least 1 second".to_string(),
        ));
    }

    Ok(ServerConfig {
        host: args.host.clone(),
        port: args.port,
        upload_dir: args.upload_dir.clone(),
        db_path: args
            .db_path
            .clone()
            .unwrap_or_else(|| args.upload_dir.join("jobs.json")),
        max_pending_jobs: args.max_pending_jobs,
        max_retries: args.max_retries,
        poll_interval: Duration::from_secs(args.poll_interval),
    })
}
