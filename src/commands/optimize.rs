//! # optimize 命令实现
//!
//! 对单个结构做 DFT + IEF-PCM 几何优化。
//!
//! ## 功能
//! - 介电常数来自 `--dielectric-constant` 或 `--solvent` 预设
//! - 引擎运行期间显示 spinner
//! - 输出最终能量、结果路径与耗时
//! - 可选生成输入/优化结构叠加的查看器页面
//!
//! 所有错误统一加上 `Error in optimization:` 前缀。
//!
//! ## 依赖关系
//! - 使用 `cli/optimize.rs` 定义的参数
//! - 使用 `dft/`, `models/solvent.rs`, `viewer/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::cli::optimize::OptimizeArgs;
use crate::dft::{self, Engine, OptimizationReport};
use crate::error::{AutoDftError, Result};
use crate::models::{solvent, OptimizationSettings};
use crate::utils::{output, progress};
use crate::viewer::{self, ViewerOptions};

use std::fs;
use std::path::PathBuf;

/// 执行 optimize 命令
pub fn execute(args: OptimizeArgs) -> Result<()> {
    optimize(&args).map_err(|e| AutoDftError::Other(format!("Error in optimization: {}", e)))
}

fn optimize(args: &OptimizeArgs) -> Result<()> {
    let dielectric = resolve_dielectric(args.solvent.as_deref(), args.dielectric_constant)?;
    let settings = OptimizationSettings::new(dielectric, &args.functional, &args.basis, args.charge);
    settings.validate()?;

    output::print_header(&format!("Optimizing {}", args.input.display()));
    output::print_info(&format!(
        "{}/{} | eps = {} | charge = {}",
        settings.functional, settings.basis, settings.dielectric, settings.charge
    ));

    let engine = args.engine.engine();
    output::print_info(&format!("Engine: {}", engine.describe()));

    let spinner = progress::create_spinner("Running DFT geometry optimization...");
    let result = dft::run_optimization(&args.input, &settings, args.output_dir.as_deref(), &engine);
    spinner.finish_and_clear();
    let report = result?;

    if !report.converged {
        output::print_warning("Geometry optimizer stopped before convergence; the last geometry was saved");
    }

    output::print_energy(report.energy_hartree, report.energy_kjmol);
    output::print_success(&format!("Optimized structure saved to '{}'", report.xyz_path.display()));

    if args.html {
        let page = write_comparison_page(&report)?;
        output::print_success(&format!("Viewer page saved to '{}'", page.display()));
    }

    output::print_info(&format!("OPT time: {:.2} s", report.elapsed.as_secs_f64()));
    output::print_done(&format!(
        "Optimized geometry with energy: {:.2} kJ/mol",
        report.energy_kjmol
    ));

    Ok(())
}

/// `--solvent` 优先于 `--dielectric-constant`
fn resolve_dielectric(solvent_name: Option<&str>, dielectric: f64) -> Result<f64> {
    match solvent_name {
        Some(name) => solvent::find(name).map(|s| s.dielectric).ok_or_else(|| {
            AutoDftError::InvalidArgument(format!(
                "Unknown solvent '{}'. Known solvents: {}",
                name,
                solvent::names().join(", ")
            ))
        }),
        None => Ok(dielectric),
    }
}

/// 在 XYZ 旁边写出 `<stem>.html`
fn write_comparison_page(report: &OptimizationReport) -> Result<PathBuf> {
    let path = report.xyz_path.with_extension("html");
    let body = viewer::render_molecules(
        &[&report.input, &report.optimized],
        &ViewerOptions::default(),
    );
    let page = viewer::viewer_page(
        &format!(
            "{}: input (grey) vs. optimized (green), {:.2} kJ/mol",
            report.input.name, report.energy_kjmol
        ),
        &body,
    );
    fs::write(&path, page).map_err(|e| AutoDftError::write(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dft::engine::testing::FakeEngine;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_dielectric() {
        assert_eq!(resolve_dielectric(None, 4.8).unwrap(), 4.8);
        assert_eq!(resolve_dielectric(Some("DMSO"), 78.5).unwrap(), 46.7);
        assert!(matches!(
            resolve_dielectric(Some("lava"), 78.5),
            Err(AutoDftError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_comparison_page() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("water.xyz");
        fs::write(&input, "3\nwater\nO 0.0 0.0 0.1173\nH 0.0 0.7572 -0.4692\nH 0.0 -0.7572 -0.4692\n").unwrap();

        let out = dir.path().join("out");
        let report = dft::run_optimization(
            &input,
            &OptimizationSettings::default(),
            Some(&out),
            &FakeEngine::new(-76.4),
        )
        .unwrap();

        let page = write_comparison_page(&report).unwrap();
        assert_eq!(page, out.join("water.html"));
        let html = fs::read_to_string(page).unwrap();
        assert!(html.contains("<!DOCTYPE html>"));
        assert_eq!(html.matches(".addModel(").count(), 2);
    }
}
