//! 噪声水平估计
//!
//! 将基线校正后的TIC按固定窗口划分，对每个窗口计算中位数绝对偏差（MAD），
//! 取最小的窗口MAD作为全局噪声水平。MAD不受窗口内真实峰的影响，
//! 最安静的窗口代表背景起伏；对整体强度常数偏移不敏感。

use super::matrix::IonChromatogram;
use crate::error::{GcmsResult, configuration_error, insufficient_data};

/// 噪声估计配置
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// 窗口点数
    pub window_points: usize,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            window_points: crate::tools::constants::preprocessing::NOISE_WINDOW_POINTS,
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> GcmsResult<()> {
        if self.window_points < 2 {
            return Err(configuration_error(
                "noise_window",
                format!("窗口至少2点，当前 {}", self.window_points),
            ));
        }
        Ok(())
    }
}

/// 中位数（输入会被排序）
fn median_in_place(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

/// 中位数绝对偏差
pub fn median_abs_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut scratch = values.to_vec();
    let median = median_in_place(&mut scratch);
    for (s, v) in scratch.iter_mut().zip(values) {
        *s = (v - median).abs();
    }
    median_in_place(&mut scratch)
}

/// 窗口划分：末尾不足半窗的残段并入前一窗口
fn window_bounds(len: usize, window: usize) -> Vec<(usize, usize)> {
    let window = window.min(len).max(1);
    let mut bounds = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + window).min(len);
        let remaining = len - end;
        if remaining > 0 && remaining < window / 2 {
            bounds.push((start, len));
            break;
        }
        bounds.push((start, end));
        start = end;
    }
    bounds
}

/// 估计TIC的噪声水平
pub fn estimate_noise(tic: &IonChromatogram, config: &NoiseConfig) -> GcmsResult<f64> {
    estimate_noise_values(tic.intensities(), config)
}

/// 在原始强度序列上估计噪声水平
pub fn estimate_noise_values(values: &[f64], config: &NoiseConfig) -> GcmsResult<f64> {
    config.validate()?;
    if values.is_empty() {
        return Err(insufficient_data("noise", "TIC为空，无法估计噪声"));
    }

    let noise = window_bounds(values.len(), config.window_points)
        .into_iter()
        .map(|(start, end)| median_abs_deviation(&values[start..end]))
        .fold(f64::INFINITY, f64::min);

    log::debug!(
        "噪声估计: {} 点, 窗口 {} 点, 噪声水平 {noise:.4}",
        values.len(),
        config.window_points
    );
    Ok(noise)
}
