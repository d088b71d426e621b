//! 样本文件处理模块
//!
//! 负责单个强度矩阵文件的读取、峰检测与实验保存，以及串行批处理。
//! 单个样本失败只记录统计，不影响其他样本。

use super::batch_state::{BatchStatsSnapshot, SerialBatchStats};
use super::{persistence, utils};
use crate::config::PipelineConfig;
use crate::error::{ErrorCategory, GcmsError, GcmsResult};
use crate::processing::{SampleReport, run_sample};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 单个样本的处理结果（保留输入索引用于排序）
#[derive(Debug)]
pub struct SampleOutcome {
    /// 原始文件索引
    pub index: usize,
    /// 文件路径
    pub path: PathBuf,
    /// 样本代码
    pub code: String,
    /// 处理结果
    pub result: GcmsResult<SampleReport>,
}

/// 批处理结果：按输入顺序排列的逐样本结果与统计快照
#[derive(Debug)]
pub struct BatchOutcome {
    pub outcomes: Vec<SampleOutcome>,
    pub stats: BatchStatsSnapshot,
}

impl BatchOutcome {
    /// 处理成功的样本代码（输入顺序）
    pub fn succeeded_codes(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.code.clone())
            .collect()
    }

    /// 成功样本的报告
    pub fn reports(&self) -> impl Iterator<Item = &SampleReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// 检查样本代码唯一（递归扫描时不同目录可能出现同名文件）
pub fn check_unique_codes(files: &[PathBuf]) -> GcmsResult<()> {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for file in files {
        let code = utils::sample_code(file);
        if let Some(previous) = seen.insert(code.clone(), file) {
            return Err(GcmsError::InvalidInput(format!(
                "样本代码 '{code}' 重复: {} 与 {}",
                previous.display(),
                file.display()
            )));
        }
    }
    Ok(())
}

/// 处理单个强度矩阵文件：读取 → 峰检测与定量 → 保存实验
pub fn process_sample_file(
    path: &Path,
    config: &PipelineConfig,
    out_dir: &Path,
) -> GcmsResult<SampleReport> {
    let code = utils::sample_code(path);
    let matrix = persistence::read_matrix(path)?;
    let (experiment, report) = run_sample(&code, matrix, config)?;
    persistence::save_experiment(&experiment, out_dir)?;
    Ok(report)
}

/// 打印失败信息（verbose 显示详细原因）
pub fn report_failure(
    position: usize,
    total: usize,
    path: &Path,
    error: &GcmsError,
    verbose: bool,
) {
    let category = ErrorCategory::from_gcms_error(error);
    if verbose {
        println!("   [FAIL] 处理失败 / Processing failed");
        println!("      文件 / File: {}", path.display());
        println!("      类别 / Category: {}", category.display_name());
        println!("      错误 / Error: {error}");
        if let Some(source) = std::error::Error::source(error) {
            println!("      原因 / Cause: {source}");
        }
    } else {
        println!(
            "[FAIL] [{position}/{total}] {} - [{}] {error} / 处理失败",
            utils::extract_filename_lossy(path),
            category.display_name()
        );
    }
}

/// 串行批处理
pub fn process_batch_serial(
    files: &[PathBuf],
    config: &PipelineConfig,
    out_dir: &Path,
    verbose: bool,
) -> BatchOutcome {
    let mut stats = SerialBatchStats::new();
    let mut outcomes = Vec::with_capacity(files.len());

    for (index, path) in files.iter().enumerate() {
        let code = utils::sample_code(path);
        if verbose {
            println!(
                "[PROCESSING] [{}/{}] 处理 / Processing: {}",
                index + 1,
                files.len(),
                utils::extract_filename_lossy(path)
            );
        }

        let result = process_sample_file(path, config, out_dir);
        match &result {
            Ok(report) => {
                stats.inc_processed();
                if verbose {
                    println!(
                        "   [OK] {} 个峰 / peaks ({:.2}s)",
                        report.final_peaks,
                        report.elapsed.as_secs_f64()
                    );
                }
            }
            Err(e) => {
                report_failure(index + 1, files.len(), path, e, verbose);
                stats.inc_failed(ErrorCategory::from_gcms_error(e), code.clone());
            }
        }

        outcomes.push(SampleOutcome {
            index,
            path: path.clone(),
            code,
            result,
        });
    }

    BatchOutcome {
        outcomes,
        stats: stats.snapshot(),
    }
}
