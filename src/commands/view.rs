//! # view 命令实现
//!
//! 生成独立的 3D 查看器页面，可叠加第二个结构做对比。
//!
//! ## 依赖关系
//! - 使用 `cli/view.rs` 定义的参数
//! - 使用 `parsers/`, `viewer/`, `utils/output.rs`

use crate::cli::view::ViewArgs;
use crate::error::{AutoDftError, Result};
use crate::parsers;
use crate::utils::output;
use crate::viewer::{self, ViewerOptions};

use std::fs;

/// 执行 view 命令
pub fn execute(args: ViewArgs) -> Result<()> {
    if !args.stick_radius.is_finite() || args.stick_radius <= 0.0 {
        return Err(AutoDftError::InvalidArgument(format!(
            "Stick radius must be positive, got {}",
            args.stick_radius
        )));
    }

    let first = parsers::parse_structure_file(&args.structure)?;
    let second = args
        .compare
        .as_deref()
        .map(parsers::parse_structure_file)
        .transpose()?;

    let mut molecules = vec![&first];
    let title = match &second {
        Some(other) => {
            molecules.push(other);
            format!("{} vs. {}", first.name, other.name)
        }
        None => format!("{} ({})", first.name, first.formula()),
    };

    let options = ViewerOptions {
        stick_radius: args.stick_radius,
        ..Default::default()
    };
    let page = viewer::viewer_page(&title, &viewer::render_molecules(&molecules, &options));

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AutoDftError::write(parent, e))?;
    }
    fs::write(&args.output, page).map_err(|e| AutoDftError::write(&args.output, e))?;

    output::print_success(&format!(
        "Viewer for {} structure(s) saved to '{}'",
        molecules.len(),
        args.output.display()
    ));
    Ok(())
}
