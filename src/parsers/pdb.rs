//! # PDB 格式解析器
//!
//! 读取 `ATOM`/`HETATM` 定宽记录与 `CONECT` 连接记录。
//!
//! ## 列定义（从 1 开始）
//! - 7-11 原子序号，13-16 原子名
//! - 31-38 x，39-46 y，47-54 z
//! - 77-78 元素符号（缺失时由原子名推断）
//!
//! 文件没有 `CONECT` 记录时按原子间距推断单键。多模型文件只取第一个 MODEL。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/molecule.rs`

use super::{parse_error, StructureFormat};
use crate::error::Result;
use crate::models::{elements, Atom, Bond, Molecule};
use std::collections::{BTreeSet, HashMap};

const FORMAT: StructureFormat = StructureFormat::Pdb;

/// 从字符串内容解析 PDB
pub fn parse_pdb_content(content: &str, default_name: &str) -> Result<Molecule> {
    let mut name = default_name.to_string();
    let mut atoms: Vec<Atom> = Vec::new();
    let mut serial_to_index: HashMap<usize, usize> = HashMap::new();
    let mut conect: Vec<(usize, usize)> = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let record = line.get(0..6).unwrap_or(line).trim_end();

        match record {
            "COMPND" | "HEADER" if atoms.is_empty() && name == default_name => {
                if let Some(text) = compound_name(line) {
                    name = text;
                }
            }
            "ATOM" | "HETATM" => {
                let (serial, atom) = parse_atom_record(line).ok_or_else(|| {
                    parse_error(
                        FORMAT,
                        default_name,
                        format!("Invalid {} record on line {}: '{}'", record, line_no + 1, line),
                    )
                })?;
                if let Some(serial) = serial {
                    serial_to_index.insert(serial, atoms.len());
                }
                atoms.push(atom);
            }
            "CONECT" => {
                let serials = parse_conect_record(line);
                if let Some((&first, rest)) = serials.split_first() {
                    for &other in rest {
                        conect.push((first, other));
                    }
                }
            }
            "ENDMDL" => break,
            _ => {}
        }
    }

    if atoms.is_empty() {
        return Err(parse_error(FORMAT, default_name, "No ATOM/HETATM records found"));
    }

    let mut molecule = Molecule::new(name, atoms);
    molecule.source_format = Some(FORMAT.to_string());

    if conect.is_empty() {
        molecule.infer_bonds();
    } else {
        // CONECT 中同一键常出现两次，去重；重复列出的序号表示多重键
        let mut counts: HashMap<(usize, usize), u8> = HashMap::new();
        let mut seen_lines: BTreeSet<(usize, usize)> = BTreeSet::new();
        for (a, b) in conect {
            let (Some(&i), Some(&j)) = (serial_to_index.get(&a), serial_to_index.get(&b)) else {
                continue;
            };
            if i == j {
                continue;
            }
            let key = (i.min(j), i.max(j));
            if i < j {
                *counts.entry(key).or_insert(0) += 1;
            }
            seen_lines.insert(key);
        }
        molecule.bonds = seen_lines
            .into_iter()
            .map(|(i, j)| {
                let order = counts.get(&(i, j)).copied().unwrap_or(1).clamp(1, 3);
                Bond::new(i, j, order)
            })
            .collect();
    }

    Ok(molecule)
}

/// 解析单条 ATOM/HETATM 记录，返回 (原子序号, 原子)
fn parse_atom_record(line: &str) -> Option<(Option<usize>, Atom)> {
    let serial = line.get(6..11).and_then(|s| s.trim().parse().ok());
    let atom_name = line.get(12..16).unwrap_or("").trim();

    let x: f64 = line.get(30..38)?.trim().parse().ok()?;
    let y: f64 = line.get(38..46)?.trim().parse().ok()?;
    let z: f64 = line.get(46..54)?.trim().parse().ok()?;

    let element = line
        .get(76..78)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(elements::normalize_symbol)
        .or_else(|| elements::guess_from_atom_name(atom_name))?;

    Some((serial, Atom::new(element, [x, y, z])))
}

/// 解析 CONECT 记录中的原子序号（每 5 列一个）
fn parse_conect_record(line: &str) -> Vec<usize> {
    let mut serials = Vec::new();
    let mut start = 6;
    while start < line.len() {
        let end = (start + 5).min(line.len());
        match line.get(start..end).map(str::trim) {
            Some(field) if !field.is_empty() => match field.parse() {
                Ok(v) => serials.push(v),
                Err(_) => break,
            },
            _ => {}
        }
        start = end;
    }
    serials
}

/// COMPND/HEADER 记录中的分子名
fn compound_name(line: &str) -> Option<String> {
    let text = line.get(10..)?.trim();
    let text = text.strip_prefix("MOLECULE:").unwrap_or(text).trim();
    let text = text.trim_end_matches(';').trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
