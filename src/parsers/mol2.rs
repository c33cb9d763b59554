//! # Tripos MOL2 格式解析器
//!
//! ## MOL2 格式说明
//! ```text
//! @<TRIPOS>MOLECULE
//! name
//!  3 2 0 0 0
//! SMALL
//! NO_CHARGES
//!
//! @<TRIPOS>ATOM
//!       1 O1   0.0000   0.0000   0.1173 O.3   1 HOH  -0.8340
//! @<TRIPOS>BOND
//!      1     1     2    1
//! ```
//! 元素取自 SYBYL 原子类型点号前的部分（`C.ar` -> C），
//! 类型无法识别时退回原子名。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/molecule.rs`

use super::{parse_error, StructureFormat};
use crate::error::Result;
use crate::models::{elements, Atom, Bond, Molecule};
use std::collections::HashMap;

const FORMAT: StructureFormat = StructureFormat::Mol2;

#[derive(PartialEq)]
enum Section {
    None,
    Molecule,
    Atom,
    Bond,
    Other,
}

/// 从字符串内容解析第一个 MOL2 分子
pub fn parse_mol2_content(content: &str, default_name: &str) -> Result<Molecule> {
    let mut section = Section::None;
    let mut molecule_line = 0usize;
    let mut name = default_name.to_string();
    let mut molecules_seen = 0usize;

    let mut atoms: Vec<Atom> = Vec::new();
    // MOL2 原子 ID 不一定连续，记录 ID -> 下标
    let mut id_to_index: HashMap<usize, usize> = HashMap::new();
    let mut bonds: Vec<Bond> = Vec::new();

    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(tag) = line.strip_prefix("@<TRIPOS>") {
            section = match tag.trim().to_uppercase().as_str() {
                "MOLECULE" => {
                    molecules_seen += 1;
                    if molecules_seen > 1 {
                        // 多分子文件只取第一个
                        break;
                    }
                    molecule_line = 0;
                    Section::Molecule
                }
                "ATOM" => Section::Atom,
                "BOND" => Section::Bond,
                _ => Section::Other,
            };
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match section {
            Section::Molecule => {
                if molecule_line == 0 && !line.is_empty() {
                    name = line.to_string();
                }
                molecule_line += 1;
            }
            Section::Atom => {
                if parts.len() < 6 {
                    return Err(parse_error(
                        FORMAT,
                        default_name,
                        format!("Invalid ATOM record on line {}: '{}'", line_no + 1, line),
                    ));
                }
                let id: usize = parts[0].parse().map_err(|_| {
                    parse_error(FORMAT, default_name, format!("Invalid atom id '{}'", parts[0]))
                })?;

                let mut position = [0.0; 3];
                for k in 0..3 {
                    position[k] = parts[2 + k].parse().map_err(|_| {
                        parse_error(
                            FORMAT,
                            default_name,
                            format!("Invalid coordinate '{}' on line {}", parts[2 + k], line_no + 1),
                        )
                    })?;
                }

                let element = element_from_type(parts[5])
                    .or_else(|| elements::guess_from_atom_name(parts[1]))
                    .ok_or_else(|| {
                        parse_error(
                            FORMAT,
                            default_name,
                            format!("Cannot determine element for atom '{}' (type '{}')", parts[1], parts[5]),
                        )
                    })?;

                id_to_index.insert(id, atoms.len());
                atoms.push(Atom::new(element, position));
            }
            Section::Bond => {
                if parts.len() < 4 {
                    return Err(parse_error(
                        FORMAT,
                        default_name,
                        format!("Invalid BOND record on line {}: '{}'", line_no + 1, line),
                    ));
                }
                let lookup = |raw: &str| -> Result<usize> {
                    raw.parse::<usize>()
                        .ok()
                        .and_then(|id| id_to_index.get(&id).copied())
                        .ok_or_else(|| {
                            parse_error(
                                FORMAT,
                                default_name,
                                format!("Bond on line {} references unknown atom '{}'", line_no + 1, raw),
                            )
                        })
                };
                let a = lookup(parts[1])?;
                let b = lookup(parts[2])?;
                bonds.push(Bond::new(a, b, bond_order(parts[3])));
            }
            Section::None | Section::Other => {}
        }
    }

    if molecules_seen == 0 {
        return Err(parse_error(FORMAT, default_name, "Missing @<TRIPOS>MOLECULE record"));
    }
    if atoms.is_empty() {
        return Err(parse_error(FORMAT, default_name, "No @<TRIPOS>ATOM records found"));
    }

    let mut molecule = Molecule::new(name, atoms);
    molecule.bonds = bonds;
    molecule.source_format = Some(FORMAT.to_string());
    Ok(molecule)
}

/// SYBYL 原子类型 -> 元素（"C.ar" -> C，"Du"/"LP" 等伪原子返回 None）
fn element_from_type(sybyl: &str) -> Option<&'static str> {
    let base = sybyl.split('.').next().unwrap_or(sybyl);
    match base.to_uppercase().as_str() {
        "DU" | "LP" | "ANY" | "HEV" | "HET" | "HAL" => None,
        _ => elements::normalize_symbol(base),
    }
}

/// SYBYL 键类型 -> 键级（芳香 4，酰胺按单键）
fn bond_order(kind: &str) -> u8 {
    match kind.to_lowercase().as_str() {
        "2" => 2,
        "3" => 3,
        "ar" => 4,
        _ => 1,
    }
}
