//! 单样本处理流程
//!
//! 质量裁剪 → 逐通道平滑与基线校正 → TIC 噪声估计 → 峰检测 → 峰定量
//! → 保留时间范围过滤 → `Experiment`。
//!
//! 每次调用独占自己的强度矩阵，不共享可变状态，可在多个工作线程上并发执行。

use crate::config::PipelineConfig;
use crate::core::{
    Experiment, IntensityMatrix, detect_peaks, estimate_noise, preprocess_matrix, preprocess_tic,
    quantify,
};
use crate::error::{GcmsResult, PipelineWarning};
use std::time::{Duration, Instant};

/// 单样本处理报告
#[derive(Debug, Clone)]
pub struct SampleReport {
    /// 样本代码
    pub code: String,
    /// 扫描数
    pub n_scans: usize,
    /// 质量裁剪后的通道数
    pub n_channels: usize,
    /// TIC 噪声水平
    pub noise_level: f64,
    /// 合并后的初始峰数
    pub initial_peaks: usize,
    /// 强度裁剪后的峰数
    pub detected_peaks: usize,
    /// 保留时间范围过滤后的峰数
    pub final_peaks: usize,
    /// 处理耗时
    pub elapsed: Duration,
    pub warnings: Vec<PipelineWarning>,
}

impl SampleReport {
    /// 被保留时间范围过滤掉的峰数
    #[inline]
    pub fn rt_filtered(&self) -> usize {
        self.detected_peaks - self.final_peaks
    }
}

/// 处理一个样本，返回实验与报告
pub fn run_sample(
    code: &str,
    mut matrix: IntensityMatrix,
    config: &PipelineConfig,
) -> GcmsResult<(Experiment, SampleReport)> {
    config.validate()?;
    let start = Instant::now();
    let (lo_rt, hi_rt) = config.rt_range_secs()?;
    let mut warnings = Vec::new();

    // 噪声基于全质量范围的原始 TIC
    let raw_tic = matrix.tic();

    let (lo_mass, hi_mass) = config.mass_range;
    matrix.crop_mass(lo_mass, hi_mass)?;
    preprocess_matrix(&mut matrix, &config.smoothing)?;

    let tic = preprocess_tic(&raw_tic, &config.smoothing)?;
    let noise_level = estimate_noise(&tic, &config.noise)?;
    log::debug!("[{code}] 噪声水平 {noise_level:.4}");

    let outcome = detect_peaks(&matrix, &config.detection, noise_level)?;
    let mut peaks = outcome.peaks;
    for peak in peaks.iter_mut() {
        quantify(&matrix, peak, &config.quantification)?;
    }
    let detected_peaks = peaks.len();

    let mut experiment = Experiment::new(code, peaks);
    let removed = experiment.select_rt_range(lo_rt, hi_rt);
    log::debug!("[{code}] 保留时间范围 [{lo_rt}s, {hi_rt}s] 过滤 {removed} 个峰");

    if experiment.is_empty() {
        log::warn!("[{code}] 没有检测到任何峰");
        warnings.push(PipelineWarning::EmptyResult {
            context: code.to_string(),
        });
    }

    let report = SampleReport {
        code: code.to_string(),
        n_scans: matrix.n_scans(),
        n_channels: matrix.n_channels(),
        noise_level,
        initial_peaks: outcome.initial_count,
        detected_peaks,
        final_peaks: experiment.len(),
        elapsed: start.elapsed(),
        warnings,
    };
    log::info!(
        "[{code}] 初始 {} 个峰, 裁剪后 {} 个, 最终 {} 个",
        report.initial_peaks,
        report.detected_peaks,
        report.final_peaks
    );
    Ok((experiment, report))
}
