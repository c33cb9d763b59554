//! # 量化引擎接口
//!
//! 定义引擎请求/结果的数据结构以及 `Engine` trait。
//! 真正的 SCF、PCM 与几何优化都在外部引擎里完成。
//!
//! ## 依赖关系
//! - 被 `dft/mod.rs`、`dft/pyscf.rs` 使用
//! - 使用 `models/`

use crate::error::Result;
use crate::models::{Molecule, OptimizationSettings, Recipe};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 引擎后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// GPU-accelerated gpu4pyscf
    Gpu,
    /// CPU-only PySCF
    Cpu,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Gpu => write!(f, "gpu"),
            Backend::Cpu => write!(f, "cpu"),
        }
    }
}

/// 发送给引擎的计算请求
#[derive(Debug, Clone, Serialize)]
pub struct EngineRequest {
    /// (元素符号, 坐标 Å)
    pub atoms: Vec<(String, [f64; 3])>,
    pub basis: String,
    pub charge: i32,
    pub spin: u32,
    pub functional: String,
    pub dielectric: f64,
    pub recipe: Recipe,
}

impl EngineRequest {
    pub fn new(molecule: &Molecule, settings: &OptimizationSettings, recipe: Recipe) -> Self {
        EngineRequest {
            atoms: molecule
                .atoms
                .iter()
                .map(|a| (a.element.clone(), a.position))
                .collect(),
            basis: settings.basis.clone(),
            charge: settings.charge,
            spin: settings.spin,
            functional: settings.functional.clone(),
            dielectric: settings.dielectric,
            recipe,
        }
    }
}

/// 引擎返回的优化结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOutput {
    /// 优化构型上的最终总能量 (Hartree)
    pub energy_hartree: f64,
    /// 优化后的 (元素符号, 坐标 Å)
    pub atoms: Vec<(String, [f64; 3])>,
    /// 几何优化是否达到收敛判据
    #[serde(default = "default_converged")]
    pub converged: bool,
}

fn default_converged() -> bool {
    true
}

/// 外部量化引擎
pub trait Engine: Send + Sync {
    /// 引擎描述（用于日志与输出）
    fn describe(&self) -> String;

    /// 执行一次几何优化
    ///
    /// `work_dir` 用于存放输入文件与日志，不存在时由实现创建。
    fn optimize(&self, request: &EngineRequest, work_dir: &Path) -> Result<EngineOutput>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! 测试用的假引擎：把输入坐标整体平移后返回固定能量

    use super::*;
    use crate::error::AutoDftError;
    use std::sync::atomic::{AtomicU32, Ordering};

    pub struct FakeEngine {
        pub energy_hartree: f64,
        pub shift: f64,
        /// 前若干次调用失败
        pub failures_left: AtomicU32,
        pub calls: AtomicU32,
    }

    impl FakeEngine {
        pub fn new(energy_hartree: f64) -> Self {
            FakeEngine {
                energy_hartree,
                shift: 0.01,
                failures_left: AtomicU32::new(0),
                calls: AtomicU32::new(0),
            }
        }

        pub fn failing(energy_hartree: f64, failures: u32) -> Self {
            let engine = Self::new(energy_hartree);
            engine.failures_left.store(failures, Ordering::SeqCst);
            engine
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Engine for FakeEngine {
        fn describe(&self) -> String {
            "fake engine".to_string()
        }

        fn optimize(&self, request: &EngineRequest, _work_dir: &Path) -> Result<EngineOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(AutoDftError::CommandFailed {
                    command: "fake".to_string(),
                    stderr: "SCF did not converge".to_string(),
                });
            }
            Ok(EngineOutput {
                energy_hartree: self.energy_hartree,
                atoms: request
                    .atoms
                    .iter()
                    .map(|(s, p)| (s.clone(), [p[0] + self.shift, p[1], p[2]]))
                    .collect(),
                converged: true,
            })
        }
    }
}
