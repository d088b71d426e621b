//! 窗口局部极大值峰检测（Biller-Biemann 方法）
//!
//! ## 算法
//! 1. **映射阶段**：每个质量通道独立寻找窗口局部极大值，写入极大值矩阵
//! 2. **合并阶段**：每个扫描行指向 `scans/2` 半径内极大值总和最大的行，
//!    沿指针链收敛到不动点，所有极大值并入该代表行
//! 3. 相对强度裁剪：低于该峰最强离子 R% 的离子置零
//! 4. 数量-噪声裁剪：高于噪声截断值的离子数少于 N 的峰被丢弃
//!
//! 全部使用扫描/通道索引数组实现，不构造链式峰对象。

use super::matrix::IntensityMatrix;
use super::peak::{MassSpectrum, Peak};
use crate::error::{GcmsResult, configuration_error};

/// 峰检测配置
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 局部极大值搜索窗口宽度（扫描数，半径为 window/2）
    pub window: usize,
    /// 跨通道合并窗口宽度（扫描数，半径为 scans/2）
    pub scans: usize,
    /// 相对强度阈值（百分比，0-100）
    pub rel_threshold_percent: f64,
    /// 高于噪声截断值的最少离子数
    pub min_ions: usize,
    /// 噪声倍数：截断值 = 噪声水平 × 倍数
    pub noise_multiplier: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        use crate::tools::constants::detection;
        Self {
            window: detection::WINDOW,
            scans: detection::SCANS,
            rel_threshold_percent: detection::REL_THRESHOLD_PERCENT,
            min_ions: detection::MIN_IONS,
            noise_multiplier: detection::NOISE_MULTIPLIER,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> GcmsResult<()> {
        if self.window < 3 {
            return Err(configuration_error(
                "window",
                format!("局部极大值窗口至少为3个扫描，当前 {}", self.window),
            ));
        }
        if self.scans == 0 {
            return Err(configuration_error("scans", "合并窗口必须为正"));
        }
        if !(0.0..=100.0).contains(&self.rel_threshold_percent) {
            return Err(configuration_error(
                "rel_threshold",
                format!("百分比必须在 [0, 100] 内，当前 {}", self.rel_threshold_percent),
            ));
        }
        if !(self.noise_multiplier.is_finite() && self.noise_multiplier >= 0.0) {
            return Err(configuration_error(
                "noise_multiplier",
                format!("必须为非负有限值，当前 {}", self.noise_multiplier),
            ));
        }
        Ok(())
    }
}

/// 单样本检测结果（含各阶段计数，供报告使用）
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub peaks: Vec<Peak>,
    /// 合并后的初始峰数
    pub initial_count: usize,
    /// 噪声截断值
    pub cutoff: f64,
}

/// 单通道窗口局部极大值
///
/// 扫描 i 为极大值当且仅当：强度 > 0、不小于右侧窗口内所有扫描、
/// 严格大于左侧窗口内所有扫描（平台取最早扫描）。距两端不足半径的扫描不参与。
pub fn local_maxima(values: &[f64], window: usize) -> Vec<usize> {
    let radius = window / 2;
    let n = values.len();
    if n < 2 * radius + 1 {
        return Vec::new();
    }
    (radius..n - radius)
        .filter(|&i| {
            let current = values[i];
            current > 0.0
                && values[i - radius..i].iter().all(|&v| v < current)
                && values[i + 1..=i + radius].iter().all(|&v| v <= current)
        })
        .collect()
}

/// 映射阶段：构造行主序的极大值矩阵（非极大值位置为0）
pub fn maxima_matrix(im: &IntensityMatrix, window: usize) -> Vec<f64> {
    let (n_scans, n_channels) = im.size();
    let mut maxima = vec![0.0; n_scans * n_channels];
    for channel in 0..n_channels {
        let values = im.channel_intensities(channel);
        for scan in local_maxima(&values, window) {
            maxima[scan * n_channels + channel] = values[scan];
        }
    }
    maxima
}

/// 每行指向的代表行（`scans/2` 半径内行极大值总和最大者，同值取最早）
fn representative_rows(row_tic: &[f64], scans: usize) -> Vec<usize> {
    let half = scans / 2;
    let n = row_tic.len();
    let target: Vec<usize> = (0..n)
        .map(|row| {
            let lo = row.saturating_sub(half);
            let hi = (row + half).min(n.saturating_sub(1));
            (lo..=hi).fold(lo, |best, r| if row_tic[r] > row_tic[best] { r } else { best })
        })
        .collect();

    // 沿指针链收敛：每一步总和严格增大，或总和相同而索引减小，必然终止
    (0..n)
        .map(|row| {
            let mut current = row;
            while target[current] != current {
                current = target[current];
            }
            current
        })
        .collect()
}

/// 合并阶段：相邻扫描上的极大值并入代表行（同通道保留较大值）
pub fn group_maxima(maxima: &[f64], n_scans: usize, n_channels: usize, scans: usize) -> Vec<f64> {
    let row_tic: Vec<f64> = (0..n_scans)
        .map(|r| maxima[r * n_channels..(r + 1) * n_channels].iter().sum())
        .collect();
    let roots = representative_rows(&row_tic, scans);

    let mut grouped = vec![0.0; maxima.len()];
    for (row, &root) in roots.iter().enumerate() {
        if row_tic[row] <= 0.0 {
            continue;
        }
        for channel in 0..n_channels {
            let v = maxima[row * n_channels + channel];
            let slot = &mut grouped[root * n_channels + channel];
            if v > *slot {
                *slot = v;
            }
        }
    }
    grouped
}

/// Biller-Biemann 峰检测：返回按保留时间排序的初始峰列表
pub fn biller_biemann(im: &IntensityMatrix, window: usize, scans: usize) -> Vec<Peak> {
    let (n_scans, n_channels) = im.size();
    if n_scans == 0 || n_channels == 0 {
        return Vec::new();
    }
    let maxima = maxima_matrix(im, window);
    let grouped = group_maxima(&maxima, n_scans, n_channels, scans);

    (0..n_scans)
        .filter_map(|scan| {
            let row = &grouped[scan * n_channels..(scan + 1) * n_channels];
            row.iter().any(|&v| v > 0.0).then(|| {
                Peak::new(
                    scan,
                    im.times()[scan],
                    MassSpectrum::new(im.masses().to_vec(), row.to_vec()),
                )
            })
        })
        .collect()
}

/// 相对强度裁剪：低于最强离子 `percent`% 的离子置零
pub fn rel_threshold(peaks: &mut [Peak], percent: f64) {
    for peak in peaks.iter_mut() {
        let cutoff = peak.spectrum.max_intensity() * percent / 100.0;
        for v in peak.spectrum.intensities.iter_mut() {
            if *v < cutoff {
                *v = 0.0;
            }
        }
    }
}

/// 数量-噪声裁剪：保留强度高于 `cutoff` 的离子数不少于 `min_ions` 的峰
pub fn num_ions_threshold(peaks: Vec<Peak>, min_ions: usize, cutoff: f64) -> Vec<Peak> {
    peaks
        .into_iter()
        .filter(|p| p.spectrum.count_above(cutoff) >= min_ions)
        .collect()
}

/// 完整峰检测：极大值检测 + 相对强度裁剪 + 数量-噪声裁剪
pub fn detect_peaks(
    im: &IntensityMatrix,
    config: &DetectionConfig,
    noise_level: f64,
) -> GcmsResult<DetectionOutcome> {
    config.validate()?;
    let mut peaks = biller_biemann(im, config.window, config.scans);
    let initial_count = peaks.len();

    rel_threshold(&mut peaks, config.rel_threshold_percent);
    let cutoff = noise_level * config.noise_multiplier;
    let peaks = num_ions_threshold(peaks, config.min_ions, cutoff);

    log::debug!(
        "峰检测: 初始 {initial_count} 个, 截断值 {cutoff:.3}, 保留 {} 个",
        peaks.len()
    );
    Ok(DetectionOutcome {
        peaks,
        initial_count,
        cutoff,
    })
}
