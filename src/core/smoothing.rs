//! 平滑与基线校正（Savitzky-Golay + 白色顶帽变换）
//!
//! ## 处理顺序
//! 1. Savitzky-Golay 多项式平滑，对每个质量通道连续应用 `smoothing_passes` 次（默认2次）
//! 2. 白色顶帽（top-hat）基线扣除：输入减去形态学开运算结果
//!
//! 两次平滑是流水线既定行为：以少量峰锐度换取更强的噪声抑制。
//! 该步骤以 `smoothing_passes` 参数显式暴露，可调但不可静默省略。
//!
//! 顶帽结构元素按**时间宽度**给出（如 90 秒），再用色谱的平均扫描间隔换算成点数，
//! 因此不同扫描速率下基线物理宽度保持一致。

use super::matrix::{IntensityMatrix, IonChromatogram};
use crate::error::{GcmsResult, calculation_error, configuration_error, insufficient_data};
use std::collections::VecDeque;

/// 平滑与基线校正配置
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Savitzky-Golay 窗口点数（奇数）
    pub sg_window: usize,
    /// Savitzky-Golay 多项式阶数
    pub sg_degree: usize,
    /// 每个质量通道的平滑遍数
    pub smoothing_passes: usize,
    /// TIC（噪声估计用）的平滑遍数
    pub tic_smoothing_passes: usize,
    /// 顶帽结构元素的时间宽度（秒）
    pub tophat_struct_secs: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        use crate::tools::constants::preprocessing;
        Self {
            sg_window: preprocessing::SG_WINDOW,
            sg_degree: preprocessing::SG_DEGREE,
            smoothing_passes: preprocessing::SMOOTHING_PASSES,
            tic_smoothing_passes: preprocessing::TIC_SMOOTHING_PASSES,
            tophat_struct_secs: preprocessing::TOPHAT_STRUCT_SECS,
        }
    }
}

impl SmoothingConfig {
    /// 基本合法性检查
    pub fn validate(&self) -> GcmsResult<()> {
        if self.sg_window % 2 == 0 || self.sg_window < 3 {
            return Err(configuration_error(
                "sg_window",
                format!("必须为不小于3的奇数，当前 {}", self.sg_window),
            ));
        }
        if self.sg_window < self.sg_degree + 2 {
            return Err(configuration_error(
                "sg_degree",
                format!("窗口 {} 过小，无法拟合 {} 阶多项式", self.sg_window, self.sg_degree),
            ));
        }
        if !(self.tophat_struct_secs.is_finite() && self.tophat_struct_secs > 0.0) {
            return Err(configuration_error(
                "tophat_struct",
                format!("结构元素宽度必须为正，当前 {}", self.tophat_struct_secs),
            ));
        }
        Ok(())
    }
}

/// 计算 Savitzky-Golay 平滑（零阶导数）卷积系数
///
/// 系数为 Vandermonde 矩阵伪逆的第0行：`c = (AᵀA)⁻¹Aᵀ e₀`。
pub fn savitzky_golay_coefficients(window: usize, degree: usize) -> GcmsResult<Vec<f64>> {
    if window % 2 == 0 || window < degree + 2 {
        return Err(configuration_error(
            "Savitzky-Golay",
            format!("窗口 {window} 必须为奇数且大于阶数 {degree} + 1"),
        ));
    }
    let half = (window / 2) as i64;
    let order = degree + 1;

    // 正规方程 AᵀA，A[k][i] = k^i
    let mut normal = vec![vec![0.0_f64; order + 1]; order];
    for k in -half..=half {
        let k = k as f64;
        for (i, row) in normal.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().take(order).enumerate() {
                *cell += k.powi((i + j) as i32);
            }
        }
    }
    // 右端项 e₀
    normal[0][order] = 1.0;

    let x = solve_augmented(normal)
        .ok_or_else(|| calculation_error("Savitzky-Golay", "正规方程奇异"))?;

    Ok((-half..=half)
        .map(|k| {
            let k = k as f64;
            x.iter()
                .enumerate()
                .map(|(i, xi)| xi * k.powi(i as i32))
                .sum()
        })
        .collect())
}

/// 高斯-约当消元求解增广矩阵（部分主元）
fn solve_augmented(mut m: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let n = m.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        let p = m[col][col];
        for v in m[col].iter_mut() {
            *v /= p;
        }
        for row in 0..n {
            if row != col {
                let factor = m[row][col];
                if factor != 0.0 {
                    for k in col..=n {
                        m[row][k] -= factor * m[col][k];
                    }
                }
            }
        }
    }
    Some(m.into_iter().map(|row| row[n]).collect())
}

/// 对强度序列应用一次 Savitzky-Golay 平滑
///
/// 两端以端点为中心做奇对称延拓后再卷积，输出长度不变。
pub fn savitzky_golay(values: &[f64], window: usize, degree: usize) -> GcmsResult<Vec<f64>> {
    if values.len() < window {
        return Err(insufficient_data(
            "Savitzky-Golay",
            format!("色谱长度 {} 小于平滑窗口 {window}", values.len()),
        ));
    }
    let coeffs = savitzky_golay_coefficients(window, degree)?;
    let half = window / 2;
    let n = values.len();
    let first = values[0];
    let last = values[n - 1];

    let mut padded = Vec::with_capacity(n + 2 * half);
    padded.extend((1..=half).rev().map(|k| first - (values[k] - first).abs()));
    padded.extend_from_slice(values);
    padded.extend((1..=half).map(|k| last + (values[n - 1 - k] - last).abs()));

    Ok(padded
        .windows(window)
        .map(|w| w.iter().zip(&coeffs).map(|(v, c)| v * c).sum())
        .collect())
}

/// 滑动窗口极值（单调队列，O(n)）
///
/// 位置 x 的窗口为 `[x-left, x+right]`，越界部分裁剪。
fn sliding_extreme(values: &[f64], left: usize, right: usize, take_min: bool) -> Vec<f64> {
    let n = values.len();
    let mut out = Vec::with_capacity(n);
    let mut deque: VecDeque<usize> = VecDeque::new();
    let dominates = |new: f64, old: f64| if take_min { new <= old } else { new >= old };

    let mut next = 0;
    for x in 0..n {
        let hi = (x + right).min(n - 1);
        while next <= hi {
            while let Some(&back) = deque.back() {
                if dominates(values[next], values[back]) {
                    deque.pop_back();
                } else {
                    break;
                }
            }
            deque.push_back(next);
            next += 1;
        }
        let lo = x.saturating_sub(left);
        while let Some(&front) = deque.front() {
            if front < lo {
                deque.pop_front();
            } else {
                break;
            }
        }
        out.push(values[deque[0]]);
    }
    out
}

/// 将时间宽度（秒）换算为半窗口点数
pub fn half_window_points(time_step: f64, window_secs: f64) -> GcmsResult<usize> {
    if !(time_step > 0.0) {
        return Err(insufficient_data("tophat_struct", "色谱点数不足，无法确定扫描间隔"));
    }
    let points = (0.5 * window_secs / time_step).floor() as usize;
    if points < 1 {
        return Err(configuration_error(
            "tophat_struct",
            format!("窗口过小（半窗口 {points} 点，扫描间隔 {time_step:.3}s）"),
        ));
    }
    Ok(points)
}

/// 白色顶帽变换：`f - opening(f)`，结构元素为 `size` 点的平坦窗口
pub fn white_tophat(values: &[f64], size: usize) -> Vec<f64> {
    if values.is_empty() || size == 0 {
        return values.to_vec();
    }
    let left = size / 2;
    let right = size - 1 - left;
    let eroded = sliding_extreme(values, left, right, true);
    // 膨胀使用镜像偏移，保证开运算不超过原信号
    let opened = sliding_extreme(&eroded, right, left, false);
    values
        .iter()
        .zip(&opened)
        .map(|(v, o)| (v - o).max(0.0))
        .collect()
}

/// 对色谱做顶帽基线校正，结构元素以时间宽度给出
///
/// 时间宽度按 [`half_window_points`] 换算为 `half` 点，该点数直接作为平坦结构元素的
/// 总宽度（不是 `2*half+1`）：宽度不小于 `half` 点的平台被开运算保留，从而被扣除。
pub fn tophat(ic: &IonChromatogram, struct_secs: f64) -> GcmsResult<IonChromatogram> {
    let size = half_window_points(ic.time_step(), struct_secs)?;
    Ok(ic.with_intensities(white_tophat(ic.intensities(), size)))
}

/// 平滑 `passes` 次后做基线校正
pub fn smooth_and_correct(
    ic: &IonChromatogram,
    passes: usize,
    config: &SmoothingConfig,
) -> GcmsResult<IonChromatogram> {
    let mut values = ic.intensities().to_vec();
    for _ in 0..passes {
        values = savitzky_golay(&values, config.sg_window, config.sg_degree)?;
    }
    tophat(&ic.with_intensities(values), config.tophat_struct_secs)
}

/// 就地预处理强度矩阵的每个质量通道
pub fn preprocess_matrix(im: &mut IntensityMatrix, config: &SmoothingConfig) -> GcmsResult<()> {
    for channel in 0..im.n_channels() {
        let ic = im.ic_at_index(channel)?;
        let cleaned = smooth_and_correct(&ic, config.smoothing_passes, config)?;
        im.set_ic_at_index(channel, &cleaned)?;
    }
    Ok(())
}

/// 预处理 TIC（噪声估计输入）
pub fn preprocess_tic(tic: &IonChromatogram, config: &SmoothingConfig) -> GcmsResult<IonChromatogram> {
    smooth_and_correct(tic, config.tic_smoothing_passes, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GcmsError;

    fn ic_from(values: Vec<f64>) -> IonChromatogram {
        let times = (0..values.len()).map(|i| i as f64).collect();
        IonChromatogram::new(times, values).unwrap()
    }

    #[test]
    fn test_sg_coefficients_window7_degree2() {
        let coeffs = savitzky_golay_coefficients(7, 2).unwrap();
        let expected = [-2.0, 3.0, 6.0, 7.0, 6.0, 3.0, -2.0].map(|v| v / 21.0);
        for (c, e) in coeffs.iter().zip(expected) {
            assert!((c - e).abs() < 1e-10, "{c} != {e}");
        }
    }

    #[test]
    fn test_sg_preserves_quadratic() {
        let values: Vec<f64> = (0..30).map(|i| 0.5 * (i as f64).powi(2) + 3.0).collect();
        let smoothed = savitzky_golay(&values, 7, 2).unwrap();
        for i in 3..27 {
            assert!((smoothed[i] - values[i]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_sg_short_input_is_insufficient() {
        let result = savitzky_golay(&[1.0, 2.0, 3.0], 7, 2);
        assert!(matches!(result, Err(GcmsError::InsufficientData(_))));
    }

    #[test]
    fn test_sg_rejects_even_window() {
        assert!(savitzky_golay_coefficients(6, 2).is_err());
    }

    #[test]
    fn test_tophat_element_is_half_window_points() {
        // 扫描间隔1秒、结构宽度10秒 → 元素5点
        let plateau = |width: usize| {
            let times = (0..60).map(|i| i as f64).collect();
            let values = (0..60)
                .map(|i| if (20..20 + width).contains(&i) { 10.0 } else { 0.0 })
                .collect();
            IonChromatogram::new(times, values).unwrap()
        };
        assert_eq!(half_window_points(1.0, 10.0).unwrap(), 5);

        // 6点平台比元素宽，被视为基线
        let wide = tophat(&plateau(6), 10.0).unwrap();
        assert!(wide.intensities().iter().all(|&v| v == 0.0));

        // 4点平台比元素窄，作为峰保留
        let narrow = tophat(&plateau(4), 10.0).unwrap();
        assert_eq!(&narrow.intensities()[20..24], &[10.0; 4]);
        assert_eq!(narrow.intensities().iter().sum::<f64>(), 40.0);
    }

    #[test]
    fn test_tophat_removes_constant_baseline() {
        let mut values = vec![10.0; 100];
        for (i, v) in values.iter_mut().enumerate().skip(45).take(10) {
            *v += 50.0 - 10.0 * (i as f64 - 50.0).abs();
        }
        let corrected = white_tophat(&values, 31);
        assert!(corrected[..40].iter().all(|v| v.abs() < 1e-12));
        assert!((corrected[50] - 50.0).abs() < 1e-12);
        assert!(corrected.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_tophat_struct_too_small() {
        let ic = ic_from(vec![1.0; 50]);
        let result = tophat(&ic, 1.0);
        assert!(matches!(result, Err(GcmsError::ConfigurationError(_))));
    }

    #[test]
    fn test_sliding_extreme_matches_naive() {
        let values: Vec<f64> = (0..40).map(|i| ((i * 37) % 11) as f64).collect();
        for &(left, right) in &[(0, 0), (2, 2), (3, 1), (1, 4)] {
            let fast = sliding_extreme(&values, left, right, true);
            for x in 0..values.len() {
                let lo = x.saturating_sub(left);
                let hi = (x + right).min(values.len() - 1);
                let naive = values[lo..=hi].iter().copied().fold(f64::INFINITY, f64::min);
                assert_eq!(fast[x], naive);
            }
        }
    }

    #[test]
    fn test_preprocess_applies_configured_passes() {
        let config = SmoothingConfig {
            tophat_struct_secs: 20.0,
            ..SmoothingConfig::default()
        };
        let values: Vec<f64> = (0..80).map(|i| ((i * 13) % 7) as f64 + 5.0).collect();
        let ic = ic_from(values.clone());

        let once = savitzky_golay(&values, 7, 2).unwrap();
        let twice = savitzky_golay(&once, 7, 2).unwrap();
        let manual = tophat(&ic.with_intensities(twice), 20.0).unwrap();

        let result = smooth_and_correct(&ic, config.smoothing_passes, &config).unwrap();
        assert_eq!(config.smoothing_passes, 2);
        assert_eq!(result, manual);
    }
}
