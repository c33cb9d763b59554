//! # convert 命令实现
//!
//! 批量转换结构文件格式。
//!
//! ## 功能
//! - 读取 .xyz / .sdf / .mol / .mol2 / .pdb
//! - 转换为 .xyz、.sdf 或独立的 3D 查看器页面
//! - 并行处理，已存在的输出默认跳过
//!
//! ## 依赖关系
//! - 使用 `cli/convert.rs` 定义的参数
//! - 使用 `batch/`, `parsers/`, `viewer/`
//! - 使用 `utils/output.rs`

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::convert::{ConvertArgs, OutputFormat};
use crate::error::{AutoDftError, Result};
use crate::parsers::{self, sdf::to_sdf_string, xyz::to_xyz_string};
use crate::utils::output;
use crate::viewer;

use std::fs;
use std::path::{Path, PathBuf};

/// 执行 convert 命令
pub fn execute(args: ConvertArgs) -> Result<()> {
    output::print_header(&format!("Converting to {} format", args.target));

    if !args.input.exists() {
        return Err(AutoDftError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    fs::create_dir_all(&args.output).map_err(|e| AutoDftError::write(&args.output, e))?;

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect()?;

    if files.is_empty() {
        output::print_warning(&format!(
            "No files matched '{}' under {}",
            args.pattern,
            args.input.display()
        ));
        return Ok(());
    }

    output::print_info(&format!("Found {} files to convert", files.len()));

    let runner = BatchRunner::new(args.jobs).with_message("Converting");
    let result = runner.run(files, |path| {
        match convert_file(path, &args.output, args.target, args.overwrite) {
            Ok(ConvertStatus::Converted(out)) => ProcessResult::Success(out.display().to_string()),
            Ok(ConvertStatus::Skipped(out)) => ProcessResult::Skipped(out.display().to_string()),
            Err(e) => ProcessResult::Failed(path.display().to_string(), e.to_string()),
        }
    });

    for (path, err) in &result.failures {
        output::print_error(&format!("{}: {}", path, err));
    }

    output::print_done(&format!(
        "Converted {} file(s) to '{}' in '{}' ({} skipped, {} failed)",
        result.success,
        args.target,
        args.output.display(),
        result.skipped,
        result.failed
    ));

    Ok(())
}

#[derive(Debug, PartialEq)]
enum ConvertStatus {
    Converted(PathBuf),
    Skipped(PathBuf),
}

/// 转换单个文件到 `<output_dir>/<stem>.<ext>`
fn convert_file(
    input_path: &Path,
    output_dir: &Path,
    target: OutputFormat,
    overwrite: bool,
) -> Result<ConvertStatus> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("structure");
    let output_path = output_dir.join(format!("{}.{}", stem, target.extension()));

    if output_path.exists() && !overwrite {
        return Ok(ConvertStatus::Skipped(output_path));
    }

    let molecule = parsers::parse_structure_file(input_path)?;

    let content = match target {
        OutputFormat::Xyz => to_xyz_string(&molecule),
        OutputFormat::Sdf => to_sdf_string(&molecule)?,
        OutputFormat::Html => viewer::viewer_page(
            &format!("{} ({})", molecule.name, molecule.formula()),
            &viewer::render_molecule(&molecule),
        ),
    };

    fs::write(&output_path, content).map_err(|e| AutoDftError::write(&output_path, e))?;

    Ok(ConvertStatus::Converted(output_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WATER_PDB: &str = "\
HETATM    1  O   HOH A   1       0.000   0.000   0.117  1.00  0.00           O
HETATM    2  H1  HOH A   1       0.000   0.757  -0.469  1.00  0.00           H
HETATM    3  H2  HOH A   1       0.000  -0.757  -0.469  1.00  0.00           H
END
";

    #[test]
    fn test_convert_file_targets() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("water.pdb");
        fs::write(&input, WATER_PDB).unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();

        let status = convert_file(&input, &out, OutputFormat::Xyz, false).unwrap();
        assert_eq!(status, ConvertStatus::Converted(out.join("water.xyz")));
        let xyz = fs::read_to_string(out.join("water.xyz")).unwrap();
        assert!(xyz.starts_with("3\n"));

        let status = convert_file(&input, &out, OutputFormat::Sdf, false).unwrap();
        assert_eq!(status, ConvertStatus::Converted(out.join("water.sdf")));
        assert!(fs::read_to_string(out.join("water.sdf")).unwrap().contains("M  END"));

        convert_file(&input, &out, OutputFormat::Html, false).unwrap();
        assert!(fs::read_to_string(out.join("water.html")).unwrap().contains("$3Dmol.createViewer"));
    }

    #[test]
    fn test_existing_output_skipped_unless_overwrite() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("water.pdb");
        fs::write(&input, WATER_PDB).unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("water.xyz"), "old").unwrap();

        let status = convert_file(&input, &out, OutputFormat::Xyz, false).unwrap();
        assert_eq!(status, ConvertStatus::Skipped(out.join("water.xyz")));
        assert_eq!(fs::read_to_string(out.join("water.xyz")).unwrap(), "old");

        convert_file(&input, &out, OutputFormat::Xyz, true).unwrap();
        assert_ne!(fs::read_to_string(out.join("water.xyz")).unwrap(), "old");
    }

    #[test]
    fn test_unparsable_input_fails() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.xyz");
        fs::write(&input, "5\n\nC 0 0 0\n").unwrap();
        assert!(convert_file(&input, dir.path(), OutputFormat::Sdf, false).is_err());
    }
}
