//! # 作业队列
//!
//! Web 界面提交的异步优化作业：JSON 文件持久化加一个后台处理循环。
//!
//! ## 依赖关系
//! - 被 `web/`、`commands/serve.rs` 使用
//! - 子模块: store, worker

pub mod store;
pub mod worker;

pub use store::JobStore;
pub use worker::{process_next, run_worker, JobOutcome, WorkerConfig};
