//! # 溶剂介电常数预设
//!
//! 界面下拉框与 `--solvent` 参数共用的溶剂表。
//!
//! ## 依赖关系
//! - 被 `commands/optimize.rs`、`web/pages.rs` 使用
//! - 无外部模块依赖

/// 溶剂预设
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solvent {
    pub name: &'static str,
    /// 常用别名（小写）
    pub aliases: &'static [&'static str],
    pub dielectric: f64,
    /// 是否出现在下拉框的主列表中
    pub featured: bool,
}

/// 所有已知溶剂
pub const SOLVENTS: &[Solvent] = &[
    Solvent { name: "Vacuum", aliases: &["gas", "none"], dielectric: 1.0, featured: true },
    Solvent { name: "Water", aliases: &["h2o"], dielectric: 78.5, featured: true },
    Solvent { name: "Dimethyl sulfoxide (DMSO)", aliases: &["dmso"], dielectric: 46.7, featured: true },
    Solvent { name: "Acetone", aliases: &[], dielectric: 20.7, featured: true },
    Solvent { name: "Chloroform", aliases: &["chcl3"], dielectric: 4.8, featured: true },
    Solvent { name: "Methanol", aliases: &["meoh"], dielectric: 32.7, featured: false },
    Solvent { name: "Ethanol", aliases: &["etoh"], dielectric: 24.3, featured: false },
    Solvent { name: "Acetonitrile", aliases: &["mecn"], dielectric: 36.6, featured: false },
    Solvent { name: "Benzene", aliases: &[], dielectric: 2.3, featured: false },
    Solvent { name: "Hexane", aliases: &["n-hexane"], dielectric: 1.9, featured: false },
    Solvent { name: "Toluene", aliases: &[], dielectric: 2.4, featured: false },
    Solvent { name: "Diethyl ether", aliases: &["ether"], dielectric: 4.3, featured: false },
    Solvent { name: "Dichloromethane (DCM)", aliases: &["dcm"], dielectric: 8.9, featured: false },
    Solvent { name: "Dimethylformamide (DMF)", aliases: &["dmf"], dielectric: 36.7, featured: false },
    Solvent { name: "Ethyl acetate", aliases: &["etoac"], dielectric: 6.0, featured: false },
];

/// 按名称或别名查找（忽略大小写；"Acetone (20.7)" 这样的标签也可识别）
pub fn find(name: &str) -> Option<&'static Solvent> {
    let key = name.split(" (").next().unwrap_or(name).trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    SOLVENTS.iter().find(|s| {
        s.name.to_lowercase() == key
            || s.name.to_lowercase().split(" (").next() == Some(key.as_str())
            || s.aliases.contains(&key.as_str())
    })
}

/// 所有已知溶剂名，用于报错提示
pub fn names() -> Vec<&'static str> {
    SOLVENTS.iter().map(|s| s.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_name_and_alias() {
        assert_eq!(find("water").unwrap().dielectric, 78.5);
        assert_eq!(find("DMSO").unwrap().dielectric, 46.7);
        assert_eq!(find("Dimethyl sulfoxide").unwrap().dielectric, 46.7);
        assert_eq!(find("Acetone (20.7)").unwrap().dielectric, 20.7);
        assert_eq!(find("n-hexane").unwrap().dielectric, 1.9);
        assert!(find("plasma").is_none());
        assert!(find("").is_none());
    }

    #[test]
    fn test_featured_presets() {
        let featured: Vec<_> = SOLVENTS.iter().filter(|s| s.featured).collect();
        assert_eq!(featured.len(), 5);
        assert_eq!(featured[0].name, "Vacuum");
        assert!(names().contains(&"Toluene"));
    }
}
