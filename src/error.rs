//! # 统一错误处理模块
//!
//! 定义 AutoDFT 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// AutoDFT 统一错误类型
#[derive(Error, Debug)]
pub enum AutoDftError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown element symbol: {0}")]
    UnknownElement(String),

    // ─────────────────────────────────────────────────────────────
    // 外部量化引擎错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Invalid engine output: {0}")]
    EngineOutput(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 作业队列错误
    // ─────────────────────────────────────────────────────────────
    #[error("Job {0} not found")]
    JobNotFound(u64),

    #[error("Job queue is full: {pending} pending jobs (limit {limit})")]
    QueueFull { pending: usize, limit: usize },

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, AutoDftError>;

impl AutoDftError {
    /// 构造带路径的读取错误
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        AutoDftError::FileReadError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 构造带路径的写入错误
    pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
        AutoDftError::FileWriteError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 是否属于用户输入错误（Web 层映射为 400）
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AutoDftError::ParseError { .. }
                | AutoDftError::UnsupportedFormat(_)
                | AutoDftError::UnknownElement(_)
                | AutoDftError::InvalidArgument(_)
        )
    }
}
