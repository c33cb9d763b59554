//! # SDF / MOL (V2000) 格式解析器
//!
//! ## MOL 块格式说明
//! ```text
//! name
//!   program/timestamp line
//! comment
//!   3  2  0  0  0  0  0  0  0  0999 V2000
//!     0.0000    0.0000    0.1173 O   0  0  0  0  0  0  0  0  0  0  0  0
//!     ...
//!   1  2  1  0
//! M  END
//! $$$$
//! ```
//! 原子行为定宽列 (x 1-10, y 11-20, z 21-30, 符号 32-34)，
//! 对不规范的文件退回按空白切分。多记录 SDF 只取第一个分子。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`、`viewer/` 使用
//! - 使用 `models/molecule.rs`

use super::{parse_error, StructureFormat};
use crate::error::{AutoDftError, Result};
use crate::models::{elements, Atom, Bond, Molecule};

const FORMAT: StructureFormat = StructureFormat::Sdf;

/// 从字符串内容解析第一个 MOL 块
pub fn parse_sdf_content(content: &str, default_name: &str) -> Result<Molecule> {
    let lines: Vec<&str> = content
        .lines()
        .take_while(|l| l.trim() != "$$$$")
        .collect();

    if lines.len() < 4 {
        return Err(parse_error(FORMAT, default_name, "Missing header or counts line"));
    }

    let counts_line = lines[3];
    if counts_line.contains("V3000") {
        return Err(parse_error(
            FORMAT,
            default_name,
            "V3000 molfiles are not supported; convert to V2000",
        ));
    }
    let (num_atoms, num_bonds) = parse_counts_line(counts_line)
        .ok_or_else(|| parse_error(FORMAT, default_name, format!("Invalid counts line: '{}'", counts_line)))?;

    let block_end = num_atoms
        .checked_add(num_bonds)
        .and_then(|n| n.checked_add(4))
        .filter(|&end| end <= lines.len());
    if block_end.is_none() {
        return Err(parse_error(
            FORMAT,
            default_name,
            format!(
                "Counts line declares {} atoms and {} bonds but the block is truncated",
                num_atoms, num_bonds
            ),
        ));
    }

    let mut atoms = Vec::with_capacity(num_atoms);
    for (i, line) in lines[4..4 + num_atoms].iter().enumerate() {
        let (symbol, position) = parse_atom_line(line).ok_or_else(|| {
            parse_error(FORMAT, default_name, format!("Invalid atom line {}: '{}'", i + 1, line))
        })?;
        let element = elements::normalize_symbol(&symbol).ok_or_else(|| {
            parse_error(FORMAT, default_name, format!("Unknown element '{}' on atom line {}", symbol, i + 1))
        })?;
        atoms.push(Atom::new(element, position));
    }

    let mut bonds = Vec::with_capacity(num_bonds);
    let bond_start = 4 + num_atoms;
    for (i, line) in lines[bond_start..bond_start + num_bonds].iter().enumerate() {
        let (a, b, order) = parse_bond_line(line).ok_or_else(|| {
            parse_error(FORMAT, default_name, format!("Invalid bond line {}: '{}'", i + 1, line))
        })?;
        if a == 0 || b == 0 || a > num_atoms || b > num_atoms {
            return Err(parse_error(
                FORMAT,
                default_name,
                format!("Bond line {} references atom outside 1..={}", i + 1, num_atoms),
            ));
        }
        bonds.push(Bond::new(a - 1, b - 1, order));
    }

    let name = match lines[0].trim() {
        "" => default_name,
        n => n,
    };

    let mut molecule = Molecule::new(name, atoms);
    molecule.bonds = bonds;
    molecule.source_format = Some(FORMAT.to_string());
    Ok(molecule)
}

/// 解析计数行，返回 (原子数, 键数)
///
/// 定宽字段须右对齐且不溢出到第 7 列；`1000  0` 这类溢出的计数行按空白分隔读取。
fn parse_counts_line(line: &str) -> Option<(usize, usize)> {
    let overflowed = line.as_bytes().get(6).is_some_and(u8::is_ascii_digit);
    let field = |range: std::ops::Range<usize>| -> Option<usize> {
        if overflowed {
            return None;
        }
        let raw = line.get(range)?;
        if !raw.ends_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        raw.trim().parse().ok()
    };
    if let (Some(a), Some(b)) = (field(0..3), field(3..6)) {
        return Some((a, b));
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let a = parts.first()?.parse().ok()?;
    let b = parts.get(1)?.parse().ok()?;
    Some((a, b))
}

/// 解析原子行，返回 (元素符号, 坐标)
fn parse_atom_line(line: &str) -> Option<(String, [f64; 3])> {
    let fixed = || -> Option<(String, [f64; 3])> {
        let x = line.get(0..10)?.trim().parse().ok()?;
        let y = line.get(10..20)?.trim().parse().ok()?;
        let z = line.get(20..30)?.trim().parse().ok()?;
        let sym = line.get(31..34)?.trim();
        if sym.is_empty() {
            return None;
        }
        Some((sym.to_string(), [x, y, z]))
    };
    if let Some(parsed) = fixed() {
        return Some(parsed);
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }
    let x = parts[0].parse().ok()?;
    let y = parts[1].parse().ok()?;
    let z = parts[2].parse().ok()?;
    Some((parts[3].to_string(), [x, y, z]))
}

/// 解析键行，返回 (原子1, 原子2, 键级)，原子下标从 1 开始
fn parse_bond_line(line: &str) -> Option<(usize, usize, u8)> {
    let fixed = || -> Option<(usize, usize, u8)> {
        let a = line.get(0..3)?.trim().parse().ok()?;
        let b = line.get(3..6)?.trim().parse().ok()?;
        let order = line.get(6..9)?.trim().parse().ok()?;
        Some((a, b, order))
    };
    if let Some(parsed) = fixed() {
        return Some(parsed);
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }
    Some((parts[0].parse().ok()?, parts[1].parse().ok()?, parts[2].parse().ok()?))
}

/// V2000 计数行每个字段 3 列
pub const V2000_MAX_COUNT: usize = 999;

/// 将分子转换为 V2000 MOL 块（以 `M  END` 结尾）
///
/// 原子数或键数超过 999 时计数行放不下，返回错误。
pub fn to_mol_block(molecule: &Molecule) -> Result<String> {
    if molecule.atoms.len() > V2000_MAX_COUNT || molecule.bonds.len() > V2000_MAX_COUNT {
        return Err(AutoDftError::UnsupportedFormat(format!(
            "V2000 MOL block holds at most {} atoms and {} bonds; '{}' has {} atoms and {} bonds",
            V2000_MAX_COUNT,
            V2000_MAX_COUNT,
            molecule.name,
            molecule.atoms.len(),
            molecule.bonds.len()
        )));
    }

    let mut result = String::new();
    result.push_str(&format!("{}\n", molecule.name));
    result.push_str("  AutoDFT\n");
    match molecule.energy_kjmol {
        Some(e) => result.push_str(&format!("Energy: {:.2} kJ/mol\n", e)),
        None => result.push('\n'),
    }
    result.push_str(&format!(
        "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000\n",
        molecule.atoms.len(),
        molecule.bonds.len()
    ));

    for atom in &molecule.atoms {
        result.push_str(&format!(
            "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0\n",
            atom.position[0], atom.position[1], atom.position[2], atom.element
        ));
    }

    for bond in &molecule.bonds {
        result.push_str(&format!(
            "{:>3}{:>3}{:>3}  0\n",
            bond.a + 1,
            bond.b + 1,
            bond.order
        ));
    }

    result.push_str("M  END\n");
    Ok(result)
}

/// 将分子转换为单记录 SDF（附带能量数据项）
pub fn to_sdf_string(molecule: &Molecule) -> Result<String> {
    let mut result = to_mol_block(molecule)?;
    if let Some(e) = molecule.energy_kjmol {
        result.push_str(&format!("> <energy_kjmol>\n{:.2}\n\n", e));
    }
    result.push_str("$$$$\n");
    Ok(result)
}
