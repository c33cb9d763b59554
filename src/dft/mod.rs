//! # DFT 几何优化驱动
//!
//! 把分子交给外部量化引擎做 DFT + IEF-PCM 几何优化，
//! 换算能量并写出结果 XYZ 文件。
//!
//! ## 流程
//! 解析输入 -> 参数校验 -> 引擎优化 -> Hartree 转 kJ/mol -> 写 `<stem>.xyz`
//!
//! ## 依赖关系
//! - 被 `commands/optimize.rs`、`jobs/worker.rs`、`web/handlers.rs` 使用
//! - 使用 `models/`, `parsers/`
//! - 子模块: engine, pyscf, report

pub mod engine;
pub mod pyscf;
pub mod report;

pub use engine::{Backend, Engine, EngineOutput, EngineRequest};
pub use pyscf::PyscfEngine;

use crate::error::{AutoDftError, Result};
use crate::models::{elements, hartree_to_kjmol, Atom, Molecule, OptimizationSettings, Recipe};
use crate::parsers;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// 一次优化的结果汇总
#[derive(Debug, Clone)]
pub struct OptimizationReport {
    /// 输入结构
    pub input: Molecule,
    /// 优化后结构（带能量）
    pub optimized: Molecule,
    pub energy_hartree: f64,
    pub energy_kjmol: f64,
    /// 写出的 XYZ 文件
    pub xyz_path: PathBuf,
    pub converged: bool,
    pub elapsed: Duration,
}

/// 读取结构文件并优化，结果写入 `<output_dir>/<stem>.xyz`
pub fn run_optimization(
    input: &Path,
    settings: &OptimizationSettings,
    output_dir: Option<&Path>,
    engine: &dyn Engine,
) -> Result<OptimizationReport> {
    let molecule = parsers::parse_structure_file(input)?;
    let xyz_path = report::output_xyz_path(input, output_dir)?;
    optimize_molecule(&molecule, settings, &xyz_path, engine)
}

/// 优化已解析的分子并把结果写到指定路径
pub fn optimize_molecule(
    molecule: &Molecule,
    settings: &OptimizationSettings,
    xyz_path: &Path,
    engine: &dyn Engine,
) -> Result<OptimizationReport> {
    settings.validate_for(molecule)?;

    log::info!(
        "Optimizing {} ({} atoms) with {}/{} eps={} charge={} using {}",
        molecule.name,
        molecule.len(),
        settings.functional,
        settings.basis,
        settings.dielectric,
        settings.charge,
        engine.describe()
    );

    let start = Instant::now();
    let request = EngineRequest::new(molecule, settings, Recipe::default());
    let output = engine.optimize(&request, &report::work_dir_for(xyz_path))?;

    let energy_kjmol = hartree_to_kjmol(output.energy_hartree);
    let optimized = build_optimized(molecule, &output, energy_kjmol)?;
    report::write_xyz(&optimized, xyz_path)?;

    let elapsed = start.elapsed();
    log::info!(
        "Finished {} in {:.2}s: {:.8} Hartree ({:.2} kJ/mol) -> {}",
        molecule.name,
        elapsed.as_secs_f64(),
        output.energy_hartree,
        energy_kjmol,
        xyz_path.display()
    );

    Ok(OptimizationReport {
        input: molecule.clone(),
        optimized,
        energy_hartree: output.energy_hartree,
        energy_kjmol,
        xyz_path: xyz_path.to_path_buf(),
        converged: output.converged,
        elapsed,
    })
}

/// 由引擎结果构造优化后分子，原子数与元素顺序必须与输入一致
fn build_optimized(input: &Molecule, output: &EngineOutput, energy_kjmol: f64) -> Result<Molecule> {
    let atoms: Vec<Atom> = output
        .atoms
        .iter()
        .map(|(symbol, position)| {
            let element = elements::normalize_symbol(symbol).unwrap_or(symbol.as_str());
            Atom::new(element, *position)
        })
        .collect();

    let mut optimized = Molecule::new(input.name.clone(), atoms);
    if !optimized.same_composition_order(input) {
        return Err(AutoDftError::EngineOutput(format!(
            "optimized structure {} does not match input {}",
            optimized.formula(),
            input.formula()
        )));
    }

    // 原子顺序不变，沿用输入的连接关系
    optimized.bonds = input.bonds.clone();
    optimized.energy_kjmol = Some(energy_kjmol);
    optimized.source_format = Some("xyz".to_string());
    Ok(optimized)
}
