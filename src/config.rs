//! 流水线配置
//!
//! `PipelineConfig` 汇总各组件的配置，显式传入每个组件调用；
//! 可从 JSON 文件加载（缺省字段取默认值），并在任何数值计算之前整体校验。

use crate::alignment::AlignmentConfig;
use crate::core::{DetectionConfig, NoiseConfig, QuantConfig, SmoothingConfig};
use crate::error::{GcmsError, GcmsResult, configuration_error};
use crate::tools::constants::{defaults, parallel_limits, ranges};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 完整流水线配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub smoothing: SmoothingConfig,
    pub noise: NoiseConfig,
    pub detection: DetectionConfig,
    pub quantification: QuantConfig,
    pub alignment: AlignmentConfig,
    /// 质量范围 `[lo, hi]`
    pub mass_range: (f64, f64),
    /// 保留时间范围，时间字符串（如 `"3m"`、`"645s"`）
    pub rt_range: (String, String),
    /// 峰检测并发度
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smoothing: SmoothingConfig::default(),
            noise: NoiseConfig::default(),
            detection: DetectionConfig::default(),
            quantification: QuantConfig::default(),
            alignment: AlignmentConfig::default(),
            mass_range: (ranges::LO_MASS, ranges::HI_MASS),
            rt_range: (ranges::LO_RT.to_string(), ranges::HI_RT.to_string()),
            workers: defaults::PARALLEL_SAMPLES_DEGREE,
        }
    }
}

impl PipelineConfig {
    /// 从 JSON 文件加载配置
    pub fn from_json_file(path: &Path) -> GcmsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            configuration_error(&format!("配置文件 {}", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 保留时间范围（秒）
    pub fn rt_range_secs(&self) -> GcmsResult<(f64, f64)> {
        let lo = parse_time_secs(&self.rt_range.0)?;
        let hi = parse_time_secs(&self.rt_range.1)?;
        if lo > hi {
            return Err(configuration_error(
                "rt_range",
                format!("下限 {lo}s 大于上限 {hi}s"),
            ));
        }
        Ok((lo, hi))
    }

    /// 整体校验：正窗口、有序范围、百分比、容差与罚分
    pub fn validate(&self) -> GcmsResult<()> {
        self.smoothing.validate()?;
        self.noise.validate()?;
        self.detection.validate()?;
        self.quantification.validate()?;
        self.alignment.validate()?;

        let (lo_mass, hi_mass) = self.mass_range;
        if !(lo_mass.is_finite() && hi_mass.is_finite()) || lo_mass > hi_mass {
            return Err(configuration_error(
                "mass_range",
                format!("无效质量范围 [{lo_mass}, {hi_mass}]"),
            ));
        }
        self.rt_range_secs()?;

        if !(parallel_limits::MIN_PARALLEL_DEGREE..=parallel_limits::MAX_PARALLEL_DEGREE)
            .contains(&self.workers)
        {
            return Err(configuration_error(
                "workers",
                format!(
                    "并发度必须在 [{}, {}] 内，当前 {}",
                    parallel_limits::MIN_PARALLEL_DEGREE,
                    parallel_limits::MAX_PARALLEL_DEGREE,
                    self.workers
                ),
            ));
        }
        Ok(())
    }

    /// 峰检测参数前缀，如 `w9s3r5i3n2`
    pub fn detection_prefix(&self) -> String {
        let d = &self.detection;
        format!(
            "w{}s{}r{}i{}n{}",
            d.window, d.scans, d.rel_threshold_percent, d.min_ions, d.noise_multiplier
        )
    }

    /// 导出文件前缀，如 `com10w9s3r5i3n2d1.1g0.35`
    pub fn file_prefix(&self) -> String {
        let a = &self.alignment;
        format!(
            "com{}{}d{}g{}",
            a.min_occurrence,
            self.detection_prefix(),
            a.rt_tolerance_within,
            a.gap_within
        )
    }
}

/// 解析时间字符串为秒：`"3m"`、`"90s"`、`"10.75m"`
pub fn parse_time_secs(text: &str) -> GcmsResult<f64> {
    let text = text.trim();
    let (number, scale) = if let Some(n) = text.strip_suffix('m') {
        (n, 60.0)
    } else if let Some(n) = text.strip_suffix('s') {
        (n, 1.0)
    } else {
        return Err(GcmsError::ConfigurationError(format!(
            "时间字符串必须以 's' 或 'm' 结尾: '{text}'"
        )));
    };
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|e| configuration_error(&format!("时间字符串 '{text}'"), e))?;
    if !value.is_finite() || value < 0.0 {
        return Err(GcmsError::ConfigurationError(format!(
            "时间必须为非负有限值: '{text}'"
        )));
    }
    Ok(value * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_secs() {
        assert_eq!(parse_time_secs("3m").unwrap(), 180.0);
        assert_eq!(parse_time_secs("10.75m").unwrap(), 645.0);
        assert_eq!(parse_time_secs(" 90s ").unwrap(), 90.0);
        assert!(parse_time_secs("90").is_err());
        assert!(parse_time_secs("-1m").is_err());
        assert!(parse_time_secs("abcm").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.rt_range_secs().unwrap(), (180.0, 645.0));
        assert_eq!(config.file_prefix(), "com10w9s3r5i3n2d1.1g0.35");
    }

    #[test]
    fn test_reversed_ranges_rejected() {
        let config = PipelineConfig {
            mass_range: (340.0, 40.0),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(GcmsError::ConfigurationError(_))));

        let config = PipelineConfig {
            rt_range: ("10m".into(), "3m".into()),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"workers": 2, "mass_range": [50.0, 300.0]}"#).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.mass_range, (50.0, 300.0));
        assert_eq!(config.detection, DetectionConfig::default());
    }
}
