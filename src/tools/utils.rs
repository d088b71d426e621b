//! 工具函数模块
//!
//! 提供文件路径处理、并发度计算等通用工具函数。

use super::constants::parallel_limits;

/// 文件路径处理工具函数
pub mod path {
    use crate::tools::constants::defaults;
    use std::path::Path;

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 从强度矩阵文件名提取样本代码：`run01.im.json` → `run01`
    pub fn sample_code(path: &Path) -> String {
        let name = extract_filename_lossy(path);
        let suffix = format!(".{}", defaults::MATRIX_EXTENSION);
        match name.strip_suffix(&suffix) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "sample".to_string()),
        }
    }
}

/// 实际并发度：限制在 [MIN, MAX] 内，且不超过任务数
pub fn effective_parallel_degree(requested: usize, task_count: Option<usize>) -> usize {
    let degree = requested.clamp(
        parallel_limits::MIN_PARALLEL_DEGREE,
        parallel_limits::MAX_PARALLEL_DEGREE,
    );
    match task_count {
        Some(n) => degree.min(n.max(1)),
        None => degree,
    }
}

// 重新导出为平级函数
pub use path::{extract_filename_lossy, sample_code};
