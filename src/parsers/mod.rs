//! # 解析器模块
//!
//! 提供各种分子结构文件格式的解析器与写出器。
//!
//! ## 依赖关系
//! - 被 `commands/`、`dft/`、`web/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: xyz, sdf, mol2, pdb

pub mod mol2;
pub mod pdb;
pub mod sdf;
pub mod xyz;

use crate::error::{AutoDftError, Result};
use crate::models::Molecule;
use std::fs;
use std::path::Path;

/// 支持的结构文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureFormat {
    Xyz,
    Sdf,
    Mol2,
    Pdb,
}

impl StructureFormat {
    /// 由扩展名或格式名识别（忽略大小写，可带前导点）
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('.').to_lowercase().as_str() {
            "xyz" => Some(StructureFormat::Xyz),
            "sdf" | "mol" | "sd" => Some(StructureFormat::Sdf),
            "mol2" => Some(StructureFormat::Mol2),
            "pdb" | "ent" => Some(StructureFormat::Pdb),
            _ => None,
        }
    }

    /// 由文件路径扩展名识别
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }

    /// 所有可接受的扩展名
    pub fn extensions() -> &'static [&'static str] {
        &["xyz", "sdf", "mol", "mol2", "pdb"]
    }
}

impl std::fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureFormat::Xyz => write!(f, "xyz"),
            StructureFormat::Sdf => write!(f, "sdf"),
            StructureFormat::Mol2 => write!(f, "mol2"),
            StructureFormat::Pdb => write!(f, "pdb"),
        }
    }
}

/// 从文件路径推断格式并解析
pub fn parse_structure_file(path: &Path) -> Result<Molecule> {
    let format = StructureFormat::from_path(path).ok_or_else(|| {
        AutoDftError::UnsupportedFormat(format!(
            "Cannot determine format for: {} (expected one of: {})",
            path.display(),
            StructureFormat::extensions().join(", ")
        ))
    })?;

    if !path.exists() {
        return Err(AutoDftError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| AutoDftError::read(path, e))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("molecule");

    parse_structure_content(&content, format, name).map_err(|e| match e {
        // 补上真实路径，便于定位
        AutoDftError::ParseError { format, reason, .. } => AutoDftError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析指定格式
pub fn parse_structure_content(
    content: &str,
    format: StructureFormat,
    default_name: &str,
) -> Result<Molecule> {
    let molecule = match format {
        StructureFormat::Xyz => xyz::parse_xyz_content(content, default_name)?,
        StructureFormat::Sdf => sdf::parse_sdf_content(content, default_name)?,
        StructureFormat::Mol2 => mol2::parse_mol2_content(content, default_name)?,
        StructureFormat::Pdb => pdb::parse_pdb_content(content, default_name)?,
    };
    molecule.validate_bonds()?;
    Ok(molecule)
}

/// 构造解析错误（路径以结构名代替，文件入口会替换为真实路径）
pub(crate) fn parse_error(format: StructureFormat, name: &str, reason: impl Into<String>) -> AutoDftError {
    AutoDftError::ParseError {
        format: format.to_string(),
        path: name.to_string(),
        reason: reason.into(),
    }
}
