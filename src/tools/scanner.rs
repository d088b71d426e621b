//! 文件扫描模块
//!
//! 负责扫描目录中的强度矩阵文件（`*.im.json`），可选递归子目录。

use super::constants::defaults;
use super::utils;
use crate::error::{GcmsError, GcmsResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 扫描目录中的强度矩阵文件（按路径排序）
pub fn scan_matrix_files(dir_path: &Path, recursive: bool) -> GcmsResult<Vec<PathBuf>> {
    if !dir_path.exists() {
        return Err(GcmsError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("目录不存在: {}", dir_path.display()),
        )));
    }

    if !dir_path.is_dir() {
        return Err(GcmsError::InvalidInput(format!(
            "路径不是目录: {}",
            dir_path.display()
        )));
    }

    let suffix = format!(".{}", defaults::MATRIX_EXTENSION);
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut files = Vec::new();
    for entry in WalkDir::new(dir_path).max_depth(max_depth) {
        let entry = entry.map_err(|e| {
            GcmsError::IoError(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("目录遍历失败")),
            )
        })?;
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.to_lowercase().ends_with(&suffix))
        {
            files.push(entry.into_path());
        }
    }

    // 按文件名排序，保证样本顺序稳定
    files.sort();
    Ok(files)
}

/// 显示文件扫描结果
pub fn show_scan_results(input_dir: &Path, files: &[PathBuf], verbose: bool) {
    if files.is_empty() {
        println!(
            "⚠️  在目录 {} 中没有找到强度矩阵文件 / No intensity-matrix files found",
            input_dir.display()
        );
        println!("   支持的格式 / Supported: *.{}", defaults::MATRIX_EXTENSION);
        return;
    }

    println!("📁 扫描目录 / Scanning: {}", input_dir.display());
    println!("🧪 找到 {} 个样本 / samples found", files.len());

    if verbose {
        for (i, file) in files.iter().enumerate() {
            println!("   {}. {}", i + 1, utils::extract_filename_lossy(file));
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.im.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.im.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.im.json"), "{}").unwrap();

        let flat = scan_matrix_files(dir.path(), false).unwrap();
        let names: Vec<String> = flat.iter().map(|p| utils::extract_filename_lossy(p)).collect();
        assert_eq!(names, vec!["a.im.json", "b.im.json"]);

        let deep = scan_matrix_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_missing_dir() {
        let result = scan_matrix_files(Path::new("/definitely/not/here"), false);
        assert!(matches!(result, Err(GcmsError::IoError(_))));
    }
}
