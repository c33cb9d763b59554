//! # 上传表单解析与校验
//!
//! `/api/run-opt` 与 `/api/jobs/submit` 共用同一套字段与校验规则。
//!
//! ## 字段
//! - `structureFile`（兼容旧名 `sdfFile`）：结构文件，≤ 10 MiB，≤ 999 个原子
//! - `dielectric`：正数
//! - `functional`：M06-2X / B3LYP / PBE
//! - `basis`：def2-svpd / 6-31G / cc-pVDZ
//! - `charge`：整数，且规范写法必须与输入一致（拒绝 `+1`、`01`）
//!
//! ## 依赖关系
//! - 被 `web/handlers.rs` 使用
//! - 使用 `parsers/`, `models/settings.rs`

use crate::models::{Molecule, OptimizationSettings};
use crate::parsers::{self, sdf, StructureFormat};
use axum::extract::Multipart;

/// 上传文件大小上限
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// 上传结构的原子数上限（与 V2000 计数行一致）
pub const MAX_UPLOAD_ATOMS: usize = sdf::V2000_MAX_COUNT;

/// 可选泛函
pub const FUNCTIONALS: [&str; 3] = ["M06-2X", "B3LYP", "PBE"];

/// 可选基组
pub const BASIS_SETS: [&str; 3] = ["def2-svpd", "6-31G", "cc-pVDZ"];

/// 表单错误（对应 400 响应的 `error` / `details`）
#[derive(Debug, Clone, PartialEq)]
pub struct FormError {
    pub error: String,
    pub details: String,
}

impl FormError {
    fn new(error: &str, details: impl Into<String>) -> Self {
        FormError {
            error: error.to_string(),
            details: details.into(),
        }
    }
}

/// 未校验的原始表单
#[derive(Debug, Default)]
pub struct RawForm {
    pub file_name: Option<String>,
    pub file: Option<Vec<u8>>,
    pub dielectric: Option<String>,
    pub functional: Option<String>,
    pub basis: Option<String>,
    pub charge: Option<String>,
}

/// 校验通过的上传
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    /// 清洗后的文件名
    pub file_name: String,
    pub content: String,
    pub molecule: Molecule,
    pub settings: OptimizationSettings,
}

impl RawForm {
    /// 读取 multipart 表单
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, FormError> {
        let mut form = RawForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| FormError::new("Invalid form data", e.body_text()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "structureFile" | "sdfFile" => {
                    form.file_name = field.file_name().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| FormError::new("Invalid form data", e.body_text()))?;
                    form.file = Some(bytes.to_vec());
                }
                "dielectric" | "functional" | "basis" | "charge" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| FormError::new("Invalid form data", e.body_text()))?;
                    match name.as_str() {
                        "dielectric" => form.dielectric = Some(text),
                        "functional" => form.functional = Some(text),
                        "basis" => form.basis = Some(text),
                        _ => form.charge = Some(text),
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// 按顺序校验所有字段，并解析结构文件
    pub fn validate(self) -> Result<ValidatedUpload, FormError> {
        let (Some(raw_name), Some(bytes)) = (self.file_name, self.file) else {
            return Err(FormError::new(
                "No structure file uploaded",
                format!("Please upload one of: {}", extension_list()),
            ));
        };

        let file_name = sanitize_file_name(&raw_name);
        let format = StructureFormat::from_path(std::path::Path::new(&file_name)).ok_or_else(|| {
            FormError::new(
                "Invalid file type",
                format!("Supported formats: {}", extension_list()),
            )
        })?;

        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(FormError::new(
                "File too large",
                "Structure file must be smaller than 10MB",
            ));
        }

        let dielectric = match self.dielectric.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(FormError::new(
                    "Dielectric constant missing",
                    "Please provide a dielectric constant",
                ))
            }
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| FormError::new("Invalid dielectric constant", "Must be a positive number"))?,
        };

        let functional = self
            .functional
            .filter(|f| FUNCTIONALS.contains(&f.as_str()))
            .ok_or_else(|| FormError::new("Invalid functional", "Must be M06-2X, B3LYP, or PBE"))?;

        let basis = self
            .basis
            .filter(|b| BASIS_SETS.contains(&b.as_str()))
            .ok_or_else(|| FormError::new("Invalid basis", "Must be def2-svpd, 6-31G, or cc-pVDZ"))?;

        let charge = match self.charge.as_deref() {
            None | Some("") => return Err(FormError::new("Charge missing", "Please provide a charge")),
            Some(raw) => parse_charge(raw).ok_or_else(|| FormError::new("Invalid charge", "Must be an integer"))?,
        };

        let content = String::from_utf8(bytes)
            .map_err(|_| FormError::new("Invalid structure file", "File is not valid UTF-8 text"))?;

        let too_many_atoms = || {
            FormError::new(
                "Too many atoms",
                format!("Structure files are limited to {} atoms", MAX_UPLOAD_ATOMS),
            )
        };
        if atom_line_bound(&content, format).is_some_and(|n| n > MAX_UPLOAD_ATOMS) {
            return Err(too_many_atoms());
        }

        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&file_name);
        let molecule = parsers::parse_structure_content(&content, format, stem)
            .map_err(|e| FormError::new("Invalid structure file", e.to_string()))?;
        if molecule.len() > MAX_UPLOAD_ATOMS {
            return Err(too_many_atoms());
        }

        let settings = OptimizationSettings::new(dielectric, &functional, &basis, charge);
        settings
            .validate_for(&molecule)
            .map_err(|e| FormError::new("Invalid parameters", e.to_string()))?;

        Ok(ValidatedUpload {
            file_name,
            content,
            molecule,
            settings,
        })
    }
}

/// 文件名清洗：`[^A-Za-z0-9.-]` 替换为 `_` 并转小写
pub fn sanitize_file_name(name: &str) -> String {
    // 只取最后一段，去掉客户端带来的目录
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    // 避免 "." / ".." 这类名称
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// 解析前的原子数上界，只针对按距离判键的格式
///
/// XYZ 取首行以外的非空行数，PDB 取 ATOM/HETATM 行数。SDF/MOL2 自带键表，解析后再检查。
fn atom_line_bound(content: &str, format: StructureFormat) -> Option<usize> {
    match format {
        StructureFormat::Xyz => Some(
            content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .count()
                .saturating_sub(1),
        ),
        StructureFormat::Pdb => Some(
            content
                .lines()
                .filter(|l| l.starts_with("ATOM") || l.starts_with("HETATM"))
                .count(),
        ),
        StructureFormat::Sdf | StructureFormat::Mol2 => None,
    }
}

/// 电荷必须是整数的规范写法
fn parse_charge(raw: &str) -> Option<i32> {
    let value: i32 = raw.parse().ok()?;
    (value.to_string() == raw).then_some(value)
}

fn extension_list() -> String {
    StructureFormat::extensions()
        .iter()
        .map(|e| format!(".{}", e))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATER_XYZ: &str = "3\nwater\nO 0.0 0.0 0.1173\nH 0.0 0.7572 -0.4692\nH 0.0 -0.7572 -0.4692\n";

    fn form() -> RawForm {
        RawForm {
            file_name: Some("My Water.XYZ".to_string()),
            file: Some(WATER_XYZ.as_bytes().to_vec()),
            dielectric: Some("78.5".to_string()),
            functional: Some("M06-2X".to_string()),
            basis: Some("def2-svpd".to_string()),
            charge: Some("0".to_string()),
        }
    }

    #[test]
    fn test_valid_form() {
        let upload = form().validate().unwrap();
        assert_eq!(upload.file_name, "my_water.xyz");
        assert_eq!(upload.molecule.name, "my_water");
        assert_eq!(upload.molecule.len(), 3);
        assert_eq!(upload.settings.dielectric, 78.5);
        assert_eq!(upload.settings.charge, 0);
    }

    #[test]
    fn test_missing_and_bad_file() {
        let mut f = form();
        f.file = None;
        assert_eq!(f.validate().unwrap_err().error, "No structure file uploaded");

        let mut f = form();
        f.file_name = Some("notes.txt".to_string());
        assert_eq!(f.validate().unwrap_err().error, "Invalid file type");

        let mut f = form();
        f.file = Some(vec![b' '; MAX_UPLOAD_BYTES + 1]);
        assert_eq!(f.validate().unwrap_err().error, "File too large");

        let mut f = form();
        f.file = Some(b"not a structure".to_vec());
        assert_eq!(f.validate().unwrap_err().error, "Invalid structure file");
    }

    fn expect_error(mutate: impl FnOnce(&mut RawForm), expected: &str) {
        let mut f = form();
        mutate(&mut f);
        assert_eq!(f.validate().unwrap_err().error, expected);
    }

    #[test]
    fn test_parameter_validation() {
        expect_error(|f| f.dielectric = None, "Dielectric constant missing");
        expect_error(|f| f.dielectric = Some("-1".into()), "Invalid dielectric constant");
        expect_error(|f| f.dielectric = Some("water".into()), "Invalid dielectric constant");
        expect_error(|f| f.functional = Some("HF".into()), "Invalid functional");
        expect_error(|f| f.functional = None, "Invalid functional");
        expect_error(|f| f.basis = Some("sto-3g".into()), "Invalid basis");
        expect_error(|f| f.charge = Some("".into()), "Charge missing");
        expect_error(|f| f.charge = Some("1.5".into()), "Invalid charge");
        expect_error(|f| f.charge = Some("+2".into()), "Invalid charge");
        expect_error(|f| f.charge = Some("01".into()), "Invalid charge");
    }

    #[test]
    fn test_odd_electron_count_rejected() {
        let mut f = form();
        f.charge = Some("-1".to_string());
        let err = f.validate().unwrap_err();
        assert_eq!(err.error, "Invalid parameters");
        assert!(err.details.contains("even"));
    }

    fn helium_xyz(n: usize) -> String {
        let mut content = format!("{}\nhelium cluster\n", n);
        for i in 0..n {
            content.push_str(&format!("He {} 0 0\n", i as f64 * 3.0));
        }
        content
    }

    #[test]
    fn test_atom_count_limit() {
        let mut f = form();
        f.file = Some(helium_xyz(MAX_UPLOAD_ATOMS).into_bytes());
        assert_eq!(f.validate().unwrap().molecule.len(), MAX_UPLOAD_ATOMS);

        let mut f = form();
        f.file = Some(helium_xyz(MAX_UPLOAD_ATOMS + 1).into_bytes());
        assert_eq!(f.validate().unwrap_err().error, "Too many atoms");

        // 全部重叠的原子在判键前就被拒绝
        let mut f = form();
        f.file = Some(format!("200000\n\n{}", "H 0 0 0\n".repeat(200_000)).into_bytes());
        assert_eq!(f.validate().unwrap_err().error, "Too many atoms");

        let mut f = form();
        f.file_name = Some("big.pdb".to_string());
        let pdb: String = (0..=MAX_UPLOAD_ATOMS)
            .map(|i| format!("HETATM{:>5}  HE  HE  A   1    {:>8.3}   0.000   0.000  1.00  0.00          HE\n", i + 1, i as f64 * 3.0))
            .collect();
        f.file = Some(pdb.into_bytes());
        assert_eq!(f.validate().unwrap_err().error, "Too many atoms");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Aspirin (1).SDF"), "aspirin__1_.sdf");
        assert_eq!(sanitize_file_name("../../etc/passwd.pdb"), "passwd.pdb");
        assert_eq!(sanitize_file_name("C:\\mols\\Benzene.mol2"), "benzene.mol2");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("água.xyz"), "_gua.xyz");
    }

    #[test]
    fn test_parse_charge() {
        assert_eq!(parse_charge("0"), Some(0));
        assert_eq!(parse_charge("-2"), Some(-2));
        assert_eq!(parse_charge("-0"), None);
        assert_eq!(parse_charge(" 1"), None);
    }
}
