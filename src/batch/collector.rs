//! # 文件收集器
//!
//! 根据输入路径和模式收集待处理的结构文件。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - 逗号分隔的多个 glob 模式，匹配时忽略大小写
//! - 递归目录搜索
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs`、`commands/rank.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use crate::error::{AutoDftError, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// 文件收集器
pub struct FileCollector {
    input: PathBuf,
    patterns: Vec<String>,
    recursive: bool,
}

impl FileCollector {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            patterns: vec!["*".to_string()],
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = pattern
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.patterns.is_empty() {
            self.patterns = vec!["*".to_string()];
        }
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件（按路径排序）
    ///
    /// 单文件输入直接返回，不做模式匹配。
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if self.input.is_file() {
            return Ok(vec![self.input.clone()]);
        }
        if !self.input.is_dir() {
            return Err(AutoDftError::DirectoryNotFound {
                path: self.input.display().to_string(),
            });
        }

        let patterns = self
            .patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    AutoDftError::InvalidArgument(format!("Invalid pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| matches_any(&patterns, e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        Ok(files)
    }
}

fn matches_any(patterns: &[Pattern], path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => patterns.iter().any(|p| p.matches_with(name, MATCH_OPTIONS)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        if let Some(parent) = dir.join(name).parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn test_collect_with_patterns() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.xyz");
        touch(dir.path(), "a.SDF");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "sub/c.xyz");

        let files = FileCollector::new(dir.path())
            .with_pattern("*.xyz, *.sdf")
            .collect()
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.SDF", "b.xyz"]);

        let files = FileCollector::new(dir.path())
            .with_pattern("*.xyz")
            .recursive(true)
            .collect()
            .unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_single_file_and_missing_input() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "water.pdb");

        let files = FileCollector::new(dir.path().join("water.pdb"))
            .with_pattern("*.xyz")
            .collect()
            .unwrap();
        assert_eq!(files.len(), 1);

        assert!(matches!(
            FileCollector::new(dir.path().join("missing")).collect(),
            Err(AutoDftError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = TempDir::new().unwrap();
        let err = FileCollector::new(dir.path()).with_pattern("[").collect();
        assert!(matches!(err, Err(AutoDftError::InvalidArgument(_))));
    }
}
