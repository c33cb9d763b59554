//! # 优化参数与固定计算方案
//!
//! `OptimizationSettings` 是用户可调的部分（介电常数、泛函、基组、电荷），
//! `Recipe` 是写死的收敛判据、积分格点和 PCM 设置。
//!
//! ## 依赖关系
//! - 被 `dft/`、`web/`、`jobs/` 使用
//! - 使用 `models/molecule.rs`

use super::Molecule;
use crate::error::{AutoDftError, Result};
use serde::{Deserialize, Serialize};

/// Hartree -> kJ/mol 换算系数
pub const HARTREE_TO_KJMOL: f64 = 2625.5;

pub const DEFAULT_DIELECTRIC: f64 = 78.5;
pub const DEFAULT_FUNCTIONAL: &str = "M06-2X";
pub const DEFAULT_BASIS: &str = "def2-svpd";

/// 用户可调的优化参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSettings {
    /// 溶剂介电常数 (PCM eps)
    pub dielectric: f64,
    /// 交换相关泛函
    pub functional: String,
    /// 基组
    pub basis: String,
    /// 总电荷
    pub charge: i32,
    /// 2S，始终为 0（闭壳层 RKS）
    pub spin: u32,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        OptimizationSettings {
            dielectric: DEFAULT_DIELECTRIC,
            functional: DEFAULT_FUNCTIONAL.to_string(),
            basis: DEFAULT_BASIS.to_string(),
            charge: 0,
            spin: 0,
        }
    }
}

impl OptimizationSettings {
    pub fn new(dielectric: f64, functional: &str, basis: &str, charge: i32) -> Self {
        OptimizationSettings {
            dielectric,
            functional: functional.trim().to_string(),
            basis: basis.trim().to_string(),
            charge,
            spin: 0,
        }
    }

    /// 校验参数本身
    pub fn validate(&self) -> Result<()> {
        if !self.dielectric.is_finite() || self.dielectric <= 0.0 {
            return Err(AutoDftError::InvalidArgument(format!(
                "Dielectric constant must be a positive number, got {}",
                self.dielectric
            )));
        }
        if self.functional.trim().is_empty() {
            return Err(AutoDftError::InvalidArgument(
                "Functional must not be empty".to_string(),
            ));
        }
        if self.basis.trim().is_empty() {
            return Err(AutoDftError::InvalidArgument(
                "Basis set must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// 结合分子校验：非空，且闭壳层要求电子数为偶数
    pub fn validate_for(&self, molecule: &Molecule) -> Result<()> {
        self.validate()?;

        if molecule.is_empty() {
            return Err(AutoDftError::InvalidArgument(format!(
                "Structure '{}' contains no atoms",
                molecule.name
            )));
        }

        let electrons = molecule.electron_count(self.charge)?;
        if electrons <= 0 {
            return Err(AutoDftError::InvalidArgument(format!(
                "Charge {} leaves {} electrons in {}",
                self.charge,
                electrons,
                molecule.formula()
            )));
        }
        if (electrons - self.spin as i64) % 2 != 0 {
            return Err(AutoDftError::InvalidArgument(format!(
                "{} with charge {} has {} electrons; a closed-shell (spin 0) calculation needs an even count",
                molecule.formula(),
                self.charge,
                electrons
            )));
        }
        Ok(())
    }
}

/// 固定计算方案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub density_fit: bool,
    /// SCF 能量收敛阈值
    pub conv_tol: f64,
    /// SCF 梯度收敛阈值
    pub conv_tol_grad: f64,
    pub max_cycle: u32,
    /// DFT 积分格点 (径向, 角向)
    pub atom_grid: (u32, u32),
    /// PCM 表面 Lebedev 阶数 (29 -> 302 点)
    pub lebedev_order: u32,
    pub solvent_method: String,
    /// 几何优化器参数
    pub max_steps: u32,
    pub xtol: f64,
    pub gtol: f64,
    pub etol: f64,
    /// 引擎输出详细程度
    pub verbose: u32,
}

impl Default for Recipe {
    fn default() -> Self {
        Recipe {
            density_fit: true,
            conv_tol: 1e-8,
            conv_tol_grad: 3e-4,
            max_cycle: 70,
            atom_grid: (99, 590),
            lebedev_order: 29,
            solvent_method: "IEF-PCM".to_string(),
            max_steps: 200,
            xtol: 1e-8,
            gtol: 3e-4,
            etol: 1e-8,
            verbose: 4,
        }
    }
}

/// Hartree 转 kJ/mol
pub fn hartree_to_kjmol(hartree: f64) -> f64 {
    hartree * HARTREE_TO_KJMOL
}
