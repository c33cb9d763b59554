//! # rank 命令实现
//!
//! 扫描优化得到的 XYZ 文件，按注释行中的能量排序。
//!
//! ## 功能
//! - 读取 `Energy: <v> kJ/mol` 注释
//! - 终端表格显示前 N 个结构与相对能量
//! - 可选导出完整排名 CSV
//!
//! ## 依赖关系
//! - 使用 `cli/rank.rs` 定义的参数
//! - 使用 `batch/collector.rs`, `parsers/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::batch::FileCollector;
use crate::cli::rank::RankArgs;
use crate::error::{AutoDftError, Result};
use crate::parsers;
use crate::utils::{output, progress};

use std::path::Path;
use tabled::{Table, Tabled};

/// 一个带能量的结果
#[derive(Debug, Clone, PartialEq)]
pub struct RankedStructure {
    pub rank: usize,
    pub structure: String,
    pub formula: String,
    pub energy_kjmol: f64,
    /// 相对最低能量
    pub delta_kjmol: f64,
}

/// 表格行
#[derive(Debug, Clone, Tabled)]
struct ResultRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Structure")]
    structure: String,
    #[tabled(rename = "Formula")]
    formula: String,
    #[tabled(rename = "Energy (kJ/mol)")]
    energy: String,
    #[tabled(rename = "ΔE (kJ/mol)")]
    delta_e: String,
}

/// 执行 rank 命令
pub fn execute(args: RankArgs) -> Result<()> {
    output::print_header("Ranking Optimized Structures");

    let files = FileCollector::new(args.dir.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect()?;

    if files.is_empty() {
        return Err(AutoDftError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }

    let pb = progress::create_progress_bar(files.len() as u64, "Reading");
    let mut entries = Vec::new();
    for path in &files {
        match read_energy(path) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => pb.suspend(|| {
                output::print_skip(&format!("{}: no energy in comment line", path.display()))
            }),
            Err(e) => pb.suspend(|| output::print_warning(&format!("{}", e))),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if entries.is_empty() {
        output::print_warning("No structures with an energy comment found.");
        return Ok(());
    }

    let ranked = rank_structures(entries);
    output::print_info(&format!("Ranked {} of {} files", ranked.len(), files.len()));

    let shown = if args.top_n == 0 {
        ranked.len()
    } else {
        args.top_n.min(ranked.len())
    };
    let rows: Vec<ResultRow> = ranked
        .iter()
        .take(shown)
        .map(|r| ResultRow {
            rank: r.rank,
            structure: r.structure.clone(),
            formula: r.formula.clone(),
            energy: format!("{:.2}", r.energy_kjmol),
            delta_e: format!("{:.2}", r.delta_kjmol),
        })
        .collect();

    output::print_header(&format!("Top {} Structures by Energy", shown));
    println!("{}", Table::new(&rows));

    if let Some(csv_path) = &args.output_csv {
        save_ranking_csv(&ranked, csv_path)?;
        output::print_success(&format!("Full ranking saved to '{}'", csv_path.display()));
    }

    Ok(())
}

/// 读取单个文件，没有能量时返回 `None`
fn read_energy(path: &Path) -> Result<Option<(String, String, f64)>> {
    let molecule = parsers::parse_structure_file(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| molecule.name.clone());
    Ok(molecule
        .energy_kjmol
        .map(|e| (name, molecule.formula(), e)))
}

/// 按能量升序排列并计算相对能量
pub fn rank_structures(mut entries: Vec<(String, String, f64)>) -> Vec<RankedStructure> {
    entries.sort_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.0.cmp(&b.0)));
    let min = entries.first().map(|e| e.2).unwrap_or(0.0);
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (structure, formula, energy))| RankedStructure {
            rank: i + 1,
            structure,
            formula,
            energy_kjmol: energy,
            delta_kjmol: energy - min,
        })
        .collect()
}

fn save_ranking_csv(ranked: &[RankedStructure], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["rank", "structure", "formula", "energy_kJ_mol", "delta_kJ_mol"])?;
    for r in ranked {
        wtr.write_record([
            r.rank.to_string(),
            r.structure.clone(),
            r.formula.clone(),
            format!("{:.6}", r.energy_kjmol),
            format!("{:.6}", r.delta_kjmol),
        ])?;
    }

    wtr.flush().map_err(|e| AutoDftError::write(output_path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_rank_structures() {
        let ranked = rank_structures(vec![
            ("b".into(), "H2O".into(), -200588.20),
            ("a".into(), "H2O".into(), -200590.70),
            ("c".into(), "H2O".into(), -200580.00),
        ]);
        assert_eq!(ranked[0].structure, "a");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].delta_kjmol, 0.0);
        assert!((ranked[2].delta_kjmol - 10.70).abs() < 1e-6);
    }

    #[test]
    fn test_execute_writes_csv_and_skips_files_without_energy() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("conf1.xyz"),
            "2\nEnergy: -2950.10 kJ/mol\nH 0 0 0\nH 0 0 0.74\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("conf2.xyz"),
            "2\nEnergy: -2952.35 kJ/mol\nH 0 0 0\nH 0 0 0.7414\n",
        )
        .unwrap();
        fs::write(dir.path().join("raw.xyz"), "2\nh2\nH 0 0 0\nH 0 0 0.8\n").unwrap();

        let csv_path = dir.path().join("ranking.csv");
        execute(RankArgs {
            dir: dir.path().to_path_buf(),
            pattern: "*.xyz".to_string(),
            recursive: false,
            top_n: 10,
            output_csv: Some(csv_path.clone()),
        })
        .unwrap();

        let csv = fs::read_to_string(csv_path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,conf2,H2,"));
        assert!(lines[2].starts_with("2,conf1,H2,"));
    }

    #[test]
    fn test_no_matching_files() {
        let dir = TempDir::new().unwrap();
        let err = execute(RankArgs {
            dir: dir.path().to_path_buf(),
            pattern: "*.xyz".to_string(),
            recursive: false,
            top_n: 10,
            output_csv: None,
        });
        assert!(matches!(err, Err(AutoDftError::NoFilesFound { .. })));
    }
}
