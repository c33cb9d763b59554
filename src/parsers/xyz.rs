//! # XYZ 格式解析器
//!
//! ## XYZ 格式说明
//! ```text
//! 3
//! Energy: -200588.20 kJ/mol
//! O  0.00000000  0.00000000  0.11730000
//! H  0.00000000  0.75720000 -0.46920000
//! H  0.00000000 -0.75720000 -0.46920000
//! ```
//! 第一行为原子数，第二行为注释（优化结果在此写入能量），之后每行一个原子。
//! XYZ 不含键信息，读入后按原子间距推断单键。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`、`dft/report.rs`、`commands/rank.rs` 使用
//! - 使用 `models/molecule.rs`

use super::{parse_error, StructureFormat};
use crate::error::Result;
use crate::models::{elements, Atom, Molecule};
use regex::Regex;
use std::sync::OnceLock;

const FORMAT: StructureFormat = StructureFormat::Xyz;

fn energy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Energy:\s*([-+]?[\d.]+(?:[eE][-+]?\d+)?)\s*kJ/mol").unwrap())
}

/// 从注释行提取能量 (kJ/mol)
pub fn parse_energy_comment(comment: &str) -> Option<f64> {
    energy_regex()
        .captures(comment)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// 从字符串内容解析 XYZ（多帧文件只取第一帧）
pub fn parse_xyz_content(content: &str, default_name: &str) -> Result<Molecule> {
    // 去掉首尾空行，但保留可能为空的注释行
    let trimmed = content.trim_matches(|c| c == '\n' || c == '\r');
    let mut lines = trimmed.lines();

    let count_line = lines
        .next()
        .ok_or_else(|| parse_error(FORMAT, default_name, "Empty file"))?;
    let num_atoms: usize = count_line.trim().parse().map_err(|_| {
        parse_error(
            FORMAT,
            default_name,
            format!("First line must be the atom count, got '{}'", count_line.trim()),
        )
    })?;

    let comment = lines.next().unwrap_or("").trim().to_string();

    // 原子数来自文件本身，预分配不超过剩余行数
    let remaining = trimmed.lines().count().saturating_sub(2);
    let mut atoms = Vec::with_capacity(num_atoms.min(remaining));
    for (i, line) in lines.filter(|l| !l.trim().is_empty()).take(num_atoms).enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(parse_error(
                FORMAT,
                default_name,
                format!("Atom line {} needs 'symbol x y z': '{}'", i + 1, line.trim()),
            ));
        }

        let element = resolve_symbol(parts[0]).ok_or_else(|| {
            parse_error(
                FORMAT,
                default_name,
                format!("Unknown element '{}' on atom line {}", parts[0], i + 1),
            )
        })?;

        let mut position = [0.0; 3];
        for (k, raw) in parts[1..4].iter().enumerate() {
            position[k] = raw.parse().map_err(|_| {
                parse_error(
                    FORMAT,
                    default_name,
                    format!("Invalid coordinate '{}' on atom line {}", raw, i + 1),
                )
            })?;
        }

        atoms.push(Atom::new(element, position));
    }

    if atoms.len() != num_atoms {
        return Err(parse_error(
            FORMAT,
            default_name,
            format!("Header declares {} atoms but {} were found", num_atoms, atoms.len()),
        ));
    }

    let mut molecule = Molecule::new(default_name, atoms);
    molecule.energy_kjmol = parse_energy_comment(&comment);
    molecule.source_format = Some(FORMAT.to_string());
    molecule.infer_bonds();

    Ok(molecule)
}

/// 元素符号，或以原子序数书写的元素
fn resolve_symbol(raw: &str) -> Option<&'static str> {
    match raw.parse::<u32>() {
        Ok(z) => elements::symbol_for(z),
        Err(_) => elements::normalize_symbol(raw),
    }
}

/// 将分子转换为 XYZ 格式字符串
///
/// 有能量时注释行写 `Energy: {:.2} kJ/mol`，否则写分子名。
pub fn to_xyz_string(molecule: &Molecule) -> String {
    let mut result = String::new();
    result.push_str(&format!("{}\n", molecule.atoms.len()));

    match molecule.energy_kjmol {
        Some(energy) => result.push_str(&format!("Energy: {:.2} kJ/mol\n", energy)),
        None => result.push_str(&format!("{}\n", molecule.name)),
    }

    for atom in &molecule.atoms {
        result.push_str(&format!(
            "{} {:.8} {:.8} {:.8}\n",
            atom.element, atom.position[0], atom.position[1], atom.position[2]
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutoDftError;

    const WATER: &str = "3
Energy: -200588.20 kJ/mol
O  0.00000000  0.00000000  0.11730000
H  0.00000000  0.75720000 -0.46920000
H  0.00000000 -0.75720000 -0.46920000
";

    #[test]
    fn test_parse_xyz_basic() {
        let mol = parse_xyz_content(WATER, "water").unwrap();
        assert_eq!(mol.name, "water");
        assert_eq!(mol.len(), 3);
        assert_eq!(mol.atoms[0].element, "O");
        assert!((mol.atoms[1].position[1] - 0.7572).abs() < 1e-12);
        assert_eq!(mol.energy_kjmol, Some(-200588.20));
        assert_eq!(mol.bonds.len(), 3);
    }

    #[test]
    fn test_parse_xyz_huge_atom_count() {
        for count in ["18446744073709551615", "100000000000"] {
            let content = format!("{}\n\nH 0 0 0\n", count);
            let err = parse_xyz_content(&content, "huge").unwrap_err();
            assert!(matches!(err, AutoDftError::ParseError { .. }));
            assert!(err.to_string().contains("but 1 were found"));
        }
    }

    #[test]
    fn test_parse_xyz_empty_comment_and_lowercase_symbols() {
        let content = "2\n\nc 0 0 0\ncl 1.77 0 0\n";
        let mol = parse_xyz_content(content, "ccl").unwrap();
        assert_eq!(mol.atoms[0].element, "C");
        assert_eq!(mol.atoms[1].element, "Cl");
        assert_eq!(mol.energy_kjmol, None);
        // 1.77 Å 超过判键阈值
        assert!(mol.bonds.is_empty());
    }

    #[test]
    fn test_parse_xyz_atomic_numbers_and_extra_columns() {
        let content = "2\ncomment\n6 0.0 0.0 0.0 0.12\n8 1.2 0.0 0.0 -0.12\n";
        let mol = parse_xyz_content(content, "co").unwrap();
        assert_eq!(mol.atoms[0].element, "C");
        assert_eq!(mol.atoms[1].element, "O");
        assert_eq!(mol.bonds.len(), 1);
    }

    #[test]
    fn test_parse_xyz_first_frame_only() {
        let content = "1\nframe 1\nHe 0 0 0\n1\nframe 2\nHe 5 5 5\n";
        let mol = parse_xyz_content(content, "he").unwrap();
        assert_eq!(mol.len(), 1);
        assert_eq!(mol.atoms[0].position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_parse_xyz_count_mismatch() {
        let content = "4\n\nO 0 0 0\nH 0 0.75 -0.47\n";
        let err = parse_xyz_content(content, "short").unwrap_err();
        assert!(err.to_string().contains("declares 4 atoms"));
    }

    #[test]
    fn test_parse_xyz_bad_inputs() {
        assert!(parse_xyz_content("", "empty").is_err());
        assert!(parse_xyz_content("three\n\nO 0 0 0\n", "bad").is_err());
        assert!(parse_xyz_content("1\n\nXx 0 0 0\n", "bad").is_err());
        assert!(parse_xyz_content("1\n\nO 0 zero 0\n", "bad").is_err());
        assert!(parse_xyz_content("1\n\nO 0 0\n", "bad").is_err());
    }

    #[test]
    fn test_xyz_write_then_read_keeps_coordinates() {
        let mut mol = parse_xyz_content(WATER, "water").unwrap();
        mol.energy_kjmol = Some(-200588.2049);

        let text = to_xyz_string(&mol);
        assert!(text.contains("Energy: -200588.20 kJ/mol"));
        assert!(text.contains("H 0.00000000 0.75720000 -0.46920000"));

        let back = parse_xyz_content(&text, "water").unwrap();
        assert_eq!(back.len(), mol.len());
        for (a, b) in back.atoms.iter().zip(mol.atoms.iter()) {
            assert_eq!(a.element, b.element);
            for k in 0..3 {
                assert!((a.position[k] - b.position[k]).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_parse_energy_comment() {
        assert_eq!(parse_energy_comment("Energy: -1234.56 kJ/mol"), Some(-1234.56));
        assert_eq!(parse_energy_comment("Energy:12 kJ/mol extra"), Some(12.0));
        assert_eq!(parse_energy_comment("Energy: -2.5e5 kJ/mol"), Some(-2.5e5));
        assert_eq!(parse_energy_comment("water"), None);
    }
}
