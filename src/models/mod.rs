//! # 数据模型模块
//!
//! 定义统一的分子结构、优化参数、溶剂预设和作业记录。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`dft/`、`jobs/`、`web/` 和 `commands/` 使用
//! - 子模块: elements, molecule, settings, solvent, job

pub mod elements;
pub mod job;
pub mod molecule;
pub mod settings;
pub mod solvent;

pub use job::{Job, JobStatus};
pub use molecule::{Atom, Bond, Molecule, BOND_CUTOFF_ANGSTROM};
pub use settings::{
    hartree_to_kjmol, OptimizationSettings, Recipe, DEFAULT_BASIS, DEFAULT_DIELECTRIC, DEFAULT_FUNCTIONAL,
    HARTREE_TO_KJMOL,
};
