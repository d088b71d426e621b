//! 多样本并行处理模块
//!
//! 使用rayon实现样本级并行峰检测，保证结果顺序与输入一致

use super::batch_state::ParallelBatchStats;
use super::processor::{BatchOutcome, SampleOutcome, process_sample_file, report_failure};
use super::utils;
use crate::config::PipelineConfig;
use crate::error::{ErrorCategory, GcmsError, GcmsResult};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// 多样本并行处理
///
/// - 使用独立rayon线程池精确控制并发度
/// - 每个工作线程独占自己的强度矩阵
/// - 单个样本失败只记录统计，不中断其他样本
/// - 按输入索引重新排序结果
pub fn process_batch_parallel(
    files: &[PathBuf],
    config: &PipelineConfig,
    out_dir: &Path,
    parallel_degree: usize,
    verbose: bool,
) -> GcmsResult<BatchOutcome> {
    println!("⚡ 启用多样本并行处理 / Parallel detection: {parallel_degree} 并发度 / workers");

    let stats = ParallelBatchStats::new();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_degree)
        .thread_name(|i| format!("gcms-worker-{i}"))
        .build()
        .map_err(|e| GcmsError::ResourceError(format!("线程池创建失败: {e}")))?;

    let mut outcomes: Vec<SampleOutcome> = pool.install(|| {
        files
            .par_iter()
            .enumerate()
            .map(|(index, path)| {
                if !verbose {
                    print!(".");
                    use std::io::Write;
                    std::io::stdout().flush().ok();
                }

                let code = utils::sample_code(path);
                let result = process_sample_file(path, config, out_dir);

                match &result {
                    Ok(report) => {
                        let count = stats.inc_processed();
                        if verbose {
                            println!(
                                "✅ [{count}/{}] {} - {} 个峰 / peaks",
                                files.len(),
                                code,
                                report.final_peaks
                            );
                        }
                    }
                    Err(e) => {
                        let count = stats.inc_failed(ErrorCategory::from_gcms_error(e), code.clone());
                        if verbose {
                            report_failure(count, files.len(), path, e, true);
                        }
                    }
                }

                SampleOutcome {
                    index,
                    path: path.clone(),
                    code,
                    result,
                }
            })
            .collect()
    });

    if !verbose {
        println!(); // 进度点换行
        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                report_failure(outcome.index + 1, files.len(), &outcome.path, e, false);
            }
        }
    }

    outcomes.sort_by_key(|o| o.index);
    Ok(BatchOutcome {
        outcomes,
        stats: stats.snapshot(),
    })
}
