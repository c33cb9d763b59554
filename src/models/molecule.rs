//! # 分子结构数据模型
//!
//! 定义统一的分子表示（原子符号 + 笛卡尔坐标 + 键），
//! 可以从不同格式解析并转换为不同格式，也是量化引擎的输入与输出。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`dft/`、`viewer/` 使用
//! - 使用 `models/elements.rs`

use super::elements;
use crate::error::{AutoDftError, Result};
use serde::{Deserialize, Serialize};

/// 距离判键阈值 (Å)：两原子间距小于该值即视为单键
pub const BOND_CUTOFF_ANGSTROM: f64 = 1.6;

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 笛卡尔坐标 [x, y, z] (Å)
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
        }
    }
}

/// 化学键（原子下标从 0 开始，a < b）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    /// 键级：1 单键，2 双键，3 三键，4 芳香
    pub order: u8,
}

impl Bond {
    pub fn new(a: usize, b: usize, order: u8) -> Self {
        if a <= b {
            Bond { a, b, order }
        } else {
            Bond { a: b, b: a, order }
        }
    }
}

/// 分子
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Molecule {
    /// 分子名称（通常取文件名）
    pub name: String,

    /// 原子列表
    pub atoms: Vec<Atom>,

    /// 键列表
    pub bonds: Vec<Bond>,

    /// 能量 (kJ/mol)，来自优化结果或 XYZ 注释行
    pub energy_kjmol: Option<f64>,

    /// 来源文件格式
    pub source_format: Option<String>,
}

impl Molecule {
    pub fn new(name: impl Into<String>, atoms: Vec<Atom>) -> Self {
        Molecule {
            name: name.into(),
            atoms,
            bonds: Vec::new(),
            energy_kjmol: None,
            source_format: None,
        }
    }

    /// 原子数
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// 两原子间距 (Å)
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        let p = self.atoms[i].position;
        let q = self.atoms[j].position;
        ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2)).sqrt()
    }

    /// 按原子间距推断单键，覆盖已有的键
    ///
    /// 原子按 x 排序后，只比较 x 差小于截断距离的原子对。
    pub fn infer_bonds(&mut self) {
        let mut order: Vec<usize> = (0..self.atoms.len()).collect();
        order.sort_by(|&i, &j| self.atoms[i].position[0].total_cmp(&self.atoms[j].position[0]));

        let mut bonds = Vec::new();
        for (k, &i) in order.iter().enumerate() {
            let x = self.atoms[i].position[0];
            for &j in &order[k + 1..] {
                if self.atoms[j].position[0] - x >= BOND_CUTOFF_ANGSTROM {
                    break;
                }
                if self.distance(i, j) < BOND_CUTOFF_ANGSTROM {
                    bonds.push(Bond::new(i, j, 1));
                }
            }
        }
        bonds.sort_by_key(|b| (b.a, b.b));
        self.bonds = bonds;
    }

    /// 计算化学式（Hill 顺序：C、H 在前，其余按字母）
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        let fmt = |el: &str, count: usize| {
            if count == 1 {
                el.to_string()
            } else {
                format!("{}{}", el, count)
            }
        };

        let mut parts = Vec::new();
        if let Some(c) = counts.remove("C") {
            parts.push(fmt("C", c));
            if let Some(h) = counts.remove("H") {
                parts.push(fmt("H", h));
            }
        }
        parts.extend(counts.into_iter().map(|(el, count)| fmt(el, count)));
        parts.join("")
    }

    /// 总电子数 = ΣZ - 电荷
    pub fn electron_count(&self, charge: i32) -> Result<i64> {
        let mut total: i64 = 0;
        for atom in &self.atoms {
            let z = elements::atomic_number(&atom.element)
                .ok_or_else(|| AutoDftError::UnknownElement(atom.element.clone()))?;
            total += z as i64;
        }
        Ok(total - charge as i64)
    }

    /// 元素顺序是否与另一分子一致（优化前后必须一致）
    pub fn same_composition_order(&self, other: &Molecule) -> bool {
        self.atoms.len() == other.atoms.len()
            && self
                .atoms
                .iter()
                .zip(other.atoms.iter())
                .all(|(a, b)| a.element.eq_ignore_ascii_case(&b.element))
    }

    /// 校验键下标均在范围内
    pub fn validate_bonds(&self) -> Result<()> {
        let n = self.atoms.len();
        for bond in &self.bonds {
            if bond.a >= n || bond.b >= n || bond.a == bond.b {
                return Err(AutoDftError::InvalidArgument(format!(
                    "Bond {}-{} references atoms outside 1..={} in '{}'",
                    bond.a + 1,
                    bond.b + 1,
                    n,
                    self.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Molecule {
        Molecule::new(
            "water",
            vec![
                Atom::new("O", [0.0, 0.0, 0.1173]),
                Atom::new("H", [0.0, 0.7572, -0.4692]),
                Atom::new("H", [0.0, -0.7572, -0.4692]),
            ],
        )
    }

    #[test]
    fn test_infer_bonds_water() {
        let mut mol = water();
        mol.infer_bonds();
        // O-H 约 0.96 Å，H-H 约 1.51 Å 也小于 1.6 Å
        assert_eq!(mol.bonds.len(), 3);
        assert!(mol.bonds.contains(&Bond::new(0, 1, 1)));
        assert!(mol.bonds.contains(&Bond::new(0, 2, 1)));
    }

    #[test]
    fn test_infer_bonds_threshold_is_strict() {
        let mut mol = Molecule::new(
            "pair",
            vec![
                Atom::new("C", [0.0, 0.0, 0.0]),
                Atom::new("C", [BOND_CUTOFF_ANGSTROM, 0.0, 0.0]),
            ],
        );
        mol.infer_bonds();
        assert!(mol.bonds.is_empty());

        mol.atoms[1].position[0] = 1.54;
        mol.infer_bonds();
        assert_eq!(mol.bonds, vec![Bond::new(0, 1, 1)]);
    }

    #[test]
    fn test_infer_bonds_matches_all_pairs() {
        // 线性同余生成的伪随机坐标，边长 12 Å 的盒子
        let mut seed: u64 = 42;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 11) as f64 / (1u64 << 53) as f64 * 12.0
        };
        let atoms: Vec<Atom> = (0..300)
            .map(|_| Atom::new("C", [next(), next(), next()]))
            .collect();
        let mut mol = Molecule::new("cloud", atoms);
        mol.infer_bonds();

        let mut expected = Vec::new();
        for i in 0..mol.len() {
            for j in (i + 1)..mol.len() {
                if mol.distance(i, j) < BOND_CUTOFF_ANGSTROM {
                    expected.push(Bond::new(i, j, 1));
                }
            }
        }
        assert!(!expected.is_empty());
        assert_eq!(mol.bonds, expected);
    }

    #[test]
    fn test_formula_hill_order() {
        let mol = Molecule::new(
            "ethanol",
            vec![
                Atom::new("O", [0.0; 3]),
                Atom::new("C", [0.0; 3]),
                Atom::new("H", [0.0; 3]),
                Atom::new("C", [0.0; 3]),
                Atom::new("H", [0.0; 3]),
                Atom::new("H", [0.0; 3]),
                Atom::new("H", [0.0; 3]),
                Atom::new("H", [0.0; 3]),
                Atom::new("H", [0.0; 3]),
            ],
        );
        assert_eq!(mol.formula(), "C2H6O");
        assert_eq!(water().formula(), "H2O");
    }

    #[test]
    fn test_electron_count() {
        let mol = water();
        assert_eq!(mol.electron_count(0).unwrap(), 10);
        assert_eq!(mol.electron_count(1).unwrap(), 9);
        assert_eq!(mol.electron_count(-1).unwrap(), 11);

        let bad = Molecule::new("bad", vec![Atom::new("Qq", [0.0; 3])]);
        assert!(bad.electron_count(0).is_err());
    }

    #[test]
    fn test_bond_new_orders_indices() {
        let bond = Bond::new(5, 2, 2);
        assert_eq!((bond.a, bond.b, bond.order), (2, 5, 2));
    }

    #[test]
    fn test_validate_bonds() {
        let mut mol = water();
        mol.bonds.push(Bond::new(0, 7, 1));
        assert!(mol.validate_bonds().is_err());
    }
}
