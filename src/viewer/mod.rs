//! # 3D 结构查看器
//!
//! 生成嵌入 3Dmol.js 的 HTML 片段与独立页面，可叠加显示优化前后的结构。
//!
//! ## 依赖关系
//! - 被 `commands/view.rs`、`commands/convert.rs`、`commands/optimize.rs`、`web/` 使用
//! - 使用 `models/molecule.rs`, `parsers/sdf.rs`, `parsers/xyz.rs`

use crate::models::Molecule;
use crate::parsers::sdf::to_mol_block;
use crate::parsers::xyz::to_xyz_string;

/// 3Dmol.js 脚本地址
pub const VIEWER_SCRIPT_URL: &str = "https://3Dmol.org/build/3Dmol-min.js";

/// 叠加显示时第二个及之后结构的碳原子配色
const OVERLAY_COLORSCHEMES: [&str; 3] = ["greenCarbon", "cyanCarbon", "magentaCarbon"];

/// 查看器参数
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    /// 容器元素 id（同一页面多个查看器时需不同）
    pub element_id: String,
    pub width: u32,
    pub height: u32,
    /// 棍状模型半径 (Å)
    pub stick_radius: f64,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        ViewerOptions {
            element_id: "molViewer".to_string(),
            width: 800,
            height: 600,
            stick_radius: 0.1,
        }
    }
}

impl ViewerOptions {
    pub fn with_id(element_id: impl Into<String>) -> Self {
        ViewerOptions {
            element_id: element_id.into(),
            ..Default::default()
        }
    }
}

/// 单个分子的查看器片段
pub fn render_molecule(molecule: &Molecule) -> String {
    render_molecules(&[molecule], &ViewerOptions::default())
}

/// 多个分子叠加显示（如输入结构与优化结构）
pub fn render_molecules(molecules: &[&Molecule], options: &ViewerOptions) -> String {
    let id = sanitize_id(&options.element_id);
    let var = format!("viewer_{}", id);

    let mut html = String::new();
    html.push_str(&format!(
        "<div id=\"{}\" class=\"mol-viewer\" style=\"height: {}px; width: {}px; position: relative;\"></div>\n",
        id, options.height, options.width
    ));
    html.push_str(&format!("<script src=\"{}\"></script>\n", VIEWER_SCRIPT_URL));
    html.push_str("<script>\n");
    html.push_str(&format!(
        "  let {} = $3Dmol.createViewer(document.getElementById('{}'), {{backgroundColor: \"white\"}});\n",
        var, id
    ));

    for (i, molecule) in molecules.iter().enumerate() {
        // V2000 放不下时改用 XYZ（3Dmol 自行判键）
        let (model, format) = match to_mol_block(molecule) {
            Ok(block) => (block, "sdf"),
            Err(_) => (to_xyz_string(molecule), "xyz"),
        };
        html.push_str(&format!(
            "  {}.addModel(`{}`, '{}');\n",
            var,
            escape_template_literal(&model),
            format
        ));
        let style = if i == 0 {
            format!("{{stick: {{radius: {}}}}}", options.stick_radius)
        } else {
            format!(
                "{{stick: {{radius: {}, colorscheme: '{}'}}}}",
                options.stick_radius,
                OVERLAY_COLORSCHEMES[(i - 1) % OVERLAY_COLORSCHEMES.len()]
            )
        };
        html.push_str(&format!("  {}.setStyle({{model: {}}}, {});\n", var, i, style));
    }

    html.push_str(&format!("  {}.zoomTo();\n", var));
    html.push_str(&format!("  {}.render();\n", var));
    html.push_str("</script>\n");
    html
}

/// 独立 HTML 页面
pub fn viewer_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<h2>{}</h2>\n{}</body>\n</html>\n",
        escape_html(title),
        escape_html(title),
        body
    )
}

/// 转义 HTML 文本
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 转义 JS 模板字符串内容
fn escape_template_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
        .replace("</", "<\\/")
}

/// 元素 id 同时用作 JS 变量名，只保留字母数字和 `_`
fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "molViewer".to_string()
    } else {
        cleaned
    }
}
