//! # PySCF 引擎
//!
//! 通过外部 Python 进程调用 PySCF / gpu4pyscf 完成 DFT + PCM 几何优化。
//!
//! ## 调用流程
//! 1. 在工作目录写入 `request.json` 和随程序分发的 `driver.py`
//! 2. 运行 `<python> driver.py request.json`
//! 3. stdout/stderr 合并写入 `engine.log`
//! 4. 读取 stdout 中的 `AUTODFT_RESULT {json}` 行
//!
//! ## 依赖关系
//! - 被 `dft/mod.rs`、`commands/`、`web/` 使用
//! - 使用 `dft/engine.rs`

use super::engine::{Backend, Engine, EngineOutput, EngineRequest};
use crate::error::{AutoDftError, Result};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};

/// 随程序分发的引擎驱动脚本
pub const DRIVER_SCRIPT: &str = include_str!("driver.py");

/// 结果标记行前缀
pub const RESULT_MARKER: &str = "AUTODFT_RESULT ";

/// 失败时保留的 stderr 末尾行数
const STDERR_TAIL_LINES: usize = 20;

/// 写入 `request.json` 的内容：请求本身加上后端选择
#[derive(Serialize)]
struct DriverInput<'a> {
    #[serde(flatten)]
    request: &'a EngineRequest,
    backend: Backend,
}

/// PySCF 引擎配置
#[derive(Debug, Clone)]
pub struct PyscfEngine {
    /// Python 解释器
    pub python: String,
    pub backend: Backend,
}

impl Default for PyscfEngine {
    fn default() -> Self {
        PyscfEngine {
            python: "python3".to_string(),
            backend: Backend::Gpu,
        }
    }
}

impl PyscfEngine {
    pub fn new(python: impl Into<String>, backend: Backend) -> Self {
        PyscfEngine {
            python: python.into(),
            backend,
        }
    }
}

impl Engine for PyscfEngine {
    fn describe(&self) -> String {
        match self.backend {
            Backend::Gpu => format!("gpu4pyscf via {}", self.python),
            Backend::Cpu => format!("pyscf via {}", self.python),
        }
    }

    fn optimize(&self, request: &EngineRequest, work_dir: &Path) -> Result<EngineOutput> {
        fs::create_dir_all(work_dir).map_err(|e| AutoDftError::write(work_dir, e))?;

        let driver_path = work_dir.join("driver.py");
        fs::write(&driver_path, DRIVER_SCRIPT).map_err(|e| AutoDftError::write(&driver_path, e))?;

        let request_path = work_dir.join("request.json");
        let input = DriverInput {
            request,
            backend: self.backend,
        };
        fs::write(&request_path, serde_json::to_string_pretty(&input)?)
            .map_err(|e| AutoDftError::write(&request_path, e))?;

        let command_line = format!("{} driver.py request.json", self.python);
        log::info!("Running '{}' in {}", command_line, work_dir.display());

        let output = Command::new(&self.python)
            .args(["driver.py", "request.json"])
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => AutoDftError::CommandNotFound {
                    command: self.python.clone(),
                },
                _ => AutoDftError::CommandFailed {
                    command: command_line.clone(),
                    stderr: e.to_string(),
                },
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let log_path = work_dir.join("engine.log");
        fs::write(&log_path, format!("{}\n{}", stdout, stderr))
            .map_err(|e| AutoDftError::write(&log_path, e))?;

        if !output.status.success() {
            log::warn!("Engine exited with {} (log: {})", output.status, log_path.display());
            return Err(AutoDftError::CommandFailed {
                command: command_line,
                stderr: tail_lines(&stderr, STDERR_TAIL_LINES),
            });
        }

        let result = parse_result_marker(&stdout)?;
        if !result.converged {
            log::warn!("Geometry optimization did not converge within the step limit");
        }
        Ok(result)
    }
}

/// 从引擎 stdout 中读取最后一条结果标记行
pub fn parse_result_marker(stdout: &str) -> Result<EngineOutput> {
    let payload = stdout
        .lines()
        .rev()
        .find_map(|line| line.trim_start().strip_prefix(RESULT_MARKER))
        .ok_or_else(|| {
            AutoDftError::EngineOutput(format!("no '{}' line in engine output", RESULT_MARKER.trim()))
        })?;

    let output: EngineOutput = serde_json::from_str(payload.trim())
        .map_err(|e| AutoDftError::EngineOutput(format!("malformed result line: {}", e)))?;

    if !output.energy_hartree.is_finite() {
        return Err(AutoDftError::EngineOutput(format!(
            "non-finite energy {}",
            output.energy_hartree
        )));
    }
    Ok(output)
}

/// 取文本末尾 n 行
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
