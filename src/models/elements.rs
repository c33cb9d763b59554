//! # 元素周期表
//!
//! 元素符号与原子序数的对应关系，用于校验输入结构和计算电子数。
//!
//! ## 依赖关系
//! - 被 `models/molecule.rs` 和 `parsers/` 使用
//! - 无外部模块依赖

/// 元素符号表，下标 + 1 即原子序数
pub const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// 规范化元素符号（首字母大写，其余小写），未知元素返回 None
///
/// 接受 "c", "CL", " Fe " 等写法。
pub fn normalize_symbol(raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    SYMBOLS
        .iter()
        .copied()
        .find(|s| s.eq_ignore_ascii_case(raw))
}

/// 原子序数
pub fn atomic_number(symbol: &str) -> Option<u32> {
    SYMBOLS
        .iter()
        .position(|s| s.eq_ignore_ascii_case(symbol.trim()))
        .map(|i| i as u32 + 1)
}

/// 由原子序数取元素符号
pub fn symbol_for(z: u32) -> Option<&'static str> {
    if z == 0 {
        return None;
    }
    SYMBOLS.get(z as usize - 1).copied()
}

/// 从 PDB/MOL2 原子名推断元素（如 "CA" -> C, "Cl1" -> Cl, "1HB" -> H）
pub fn guess_from_atom_name(name: &str) -> Option<&'static str> {
    let letters: String = name
        .trim()
        .chars()
        .skip_while(|c| c.is_ascii_digit())
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    if letters.is_empty() {
        return None;
    }

    // 优先两字母元素，但只在第二个字母为小写时（"CA" 是 α 碳而不是钙）
    let mut chars = letters.chars();
    let first = chars.next()?;
    if let Some(second) = chars.next() {
        if second.is_ascii_lowercase() {
            let two: String = [first, second].iter().collect();
            if let Some(sym) = normalize_symbol(&two) {
                return Some(sym);
            }
        }
    }
    normalize_symbol(&first.to_string())
}
