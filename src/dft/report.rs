//! # 优化结果输出
//!
//! 决定结果文件路径并写出带能量注释的 XYZ。
//!
//! ## 依赖关系
//! - 被 `dft/mod.rs` 使用
//! - 使用 `parsers/xyz.rs`

use crate::error::{AutoDftError, Result};
use crate::models::Molecule;
use crate::parsers::xyz::to_xyz_string;
use std::fs;
use std::path::{Path, PathBuf};

/// 结果路径 `<output_dir>/<输入文件名主干>.xyz`，未指定目录时为当前目录
///
/// 目录不存在时创建。
pub fn output_xyz_path(input: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AutoDftError::InvalidArgument(format!("Invalid input file name: {}", input.display()))
        })?;

    let dir = match output_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| AutoDftError::write(dir, e))?;
            dir.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    Ok(dir.join(format!("{}.xyz", stem)))
}

/// 引擎工作目录，与结果文件同级：`<stem>.dft/`
pub fn work_dir_for(xyz_path: &Path) -> PathBuf {
    xyz_path.with_extension("dft")
}

/// 写出 XYZ 文件
pub fn write_xyz(molecule: &Molecule, path: &Path) -> Result<()> {
    fs::write(path, to_xyz_string(molecule)).map_err(|e| AutoDftError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Atom;
    use tempfile::TempDir;

    #[test]
    fn test_output_path_creates_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("results");
        let path = output_xyz_path(Path::new("inputs/aspirin.sdf"), Some(&out)).unwrap();

        assert!(out.is_dir());
        assert_eq!(path, out.join("aspirin.xyz"));
        assert_eq!(work_dir_for(&path), out.join("aspirin.dft"));
    }

    #[test]
    fn test_output_path_defaults_to_cwd() {
        let path = output_xyz_path(Path::new("/data/water.mol2"), None).unwrap();
        assert_eq!(path, PathBuf::from("./water.xyz"));
    }

    #[test]
    fn test_write_xyz() {
        let dir = TempDir::new().unwrap();
        let mut mol = Molecule::new("he", vec![Atom::new("He", [0.0, 0.0, 0.0])]);
        mol.energy_kjmol = Some(-7553.123);

        let path = dir.path().join("he.xyz");
        write_xyz(&mol, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1\nEnergy: -7553.12 kJ/mol\nHe 0.00000000 0.00000000 0.00000000\n");
    }
}
