//! 峰、质谱与实验（样本）数据结构
//!
//! 生命周期：`Peak` 由峰检测器创建，由定量器就地补充面积字段，
//! 此后除保留时间范围过滤（可能整体丢弃）外不再修改。

use crate::error::GcmsError;
use serde::{Deserialize, Serialize};

/// 质量容差：用于按质量值匹配两个质谱的通道
const MASS_MATCH_TOLERANCE: f64 = 1e-6;

/// 顶点处的质谱（可能稀疏：被裁剪的离子强度置零）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSpectrum {
    pub masses: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl MassSpectrum {
    pub fn new(masses: Vec<f64>, intensities: Vec<f64>) -> Self {
        debug_assert_eq!(masses.len(), intensities.len());
        Self {
            masses,
            intensities,
        }
    }

    /// 最强离子强度（空质谱为0）
    pub fn max_intensity(&self) -> f64 {
        self.intensities.iter().copied().fold(0.0, f64::max)
    }

    /// 强度严格大于 `cutoff` 的离子数
    pub fn count_above(&self, cutoff: f64) -> usize {
        self.intensities.iter().filter(|&&v| v > cutoff).count()
    }

    /// 非零离子的通道索引
    pub fn nonzero_channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.intensities
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .map(|(i, _)| i)
    }

    /// 强度最高的前 `n` 个离子的通道索引（同强度时质量较小者优先）
    pub fn top_channels(&self, n: usize) -> Vec<usize> {
        let mut channels: Vec<usize> = self.nonzero_channels().collect();
        channels.sort_by(|&a, &b| {
            self.intensities[b]
                .total_cmp(&self.intensities[a])
                .then(a.cmp(&b))
        });
        channels.truncate(n);
        channels
    }

    /// 强度最高的前 `n` 个离子的质量值
    pub fn top_ions(&self, n: usize) -> Vec<f64> {
        self.top_channels(n)
            .into_iter()
            .map(|c| self.masses[c])
            .collect()
    }

    /// 与另一质谱的余弦相似度 [0, 1]
    ///
    /// 质量轴相同时逐通道点积，否则按质量值归并匹配，未匹配离子视为0。
    pub fn cosine(&self, other: &MassSpectrum) -> f64 {
        let norm_a: f64 = self.intensities.iter().map(|v| v * v).sum();
        let norm_b: f64 = other.intensities.iter().map(|v| v * v).sum();
        if norm_a <= 0.0 || norm_b <= 0.0 {
            return 0.0;
        }

        let dot = if self.masses == other.masses {
            self.intensities
                .iter()
                .zip(&other.intensities)
                .map(|(a, b)| a * b)
                .sum()
        } else {
            let (mut i, mut j, mut dot) = (0, 0, 0.0);
            while i < self.masses.len() && j < other.masses.len() {
                let diff = self.masses[i] - other.masses[j];
                if diff.abs() < MASS_MATCH_TOLERANCE {
                    dot += self.intensities[i] * other.intensities[j];
                    i += 1;
                    j += 1;
                } else if diff < 0.0 {
                    i += 1;
                } else {
                    j += 1;
                }
            }
            dot
        };

        (dot / (norm_a * norm_b).sqrt()).clamp(0.0, 1.0)
    }
}

/// 单个离子（质量通道）的积分面积
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IonArea {
    pub mass: f64,
    pub area: f64,
}

/// 色谱峰
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// 顶点扫描索引（对应预处理后的强度矩阵）
    pub apex_scan: usize,
    /// 保留时间（秒）
    pub rt: f64,
    /// 顶点质谱
    pub spectrum: MassSpectrum,
    /// 全离子求和面积
    #[serde(default)]
    pub area: f64,
    /// 前N个最强离子的面积，按顶点强度降序
    #[serde(default)]
    pub ion_areas: Vec<IonArea>,
}

impl Peak {
    pub fn new(apex_scan: usize, rt: f64, spectrum: MassSpectrum) -> Self {
        Self {
            apex_scan,
            rt,
            spectrum,
            area: 0.0,
            ion_areas: Vec::new(),
        }
    }

    /// 查询某质量的离子面积
    pub fn ion_area(&self, mass: f64) -> Option<f64> {
        self.ion_areas
            .iter()
            .find(|ia| (ia.mass - mass).abs() < MASS_MATCH_TOLERANCE)
            .map(|ia| ia.area)
    }

    /// 峰标识：`<最强离子>-<次强离子>-<强度比%>-<保留时间(分钟)>`
    pub fn uid(&self) -> String {
        let top = self.spectrum.top_channels(2);
        let (m1, i1) = top
            .first()
            .map(|&c| (self.spectrum.masses[c], self.spectrum.intensities[c]))
            .unwrap_or((0.0, 0.0));
        let (m2, i2) = top
            .get(1)
            .map(|&c| (self.spectrum.masses[c], self.spectrum.intensities[c]))
            .unwrap_or((0.0, 0.0));
        let ratio = if i1 > 0.0 {
            (100.0 * i2 / i1).floor() as u32
        } else {
            0
        };
        format!(
            "{}-{}-{}-{:.2}",
            m1.round() as i64,
            m2.round() as i64,
            ratio,
            self.rt / 60.0
        )
    }
}

/// 磁盘文档形式（反序列化后再经 `TryFrom` 校验峰的保留时间顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExperimentDoc {
    code: String,
    peaks: Vec<Peak>,
}

/// 一个样本的峰列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExperimentDoc", into = "ExperimentDoc")]
pub struct Experiment {
    /// 样本代码（标识符）
    pub code: String,
    /// 按保留时间排序的峰
    pub peaks: Vec<Peak>,
}

impl TryFrom<ExperimentDoc> for Experiment {
    type Error = GcmsError;

    fn try_from(doc: ExperimentDoc) -> Result<Self, Self::Error> {
        if let Some(peak) = doc.peaks.iter().find(|p| !p.rt.is_finite()) {
            return Err(GcmsError::InvalidInput(format!(
                "实验 '{}' 含非有限保留时间的峰（扫描 {}）",
                doc.code, peak.apex_scan
            )));
        }
        if let Some(k) = doc.peaks.windows(2).position(|w| w[1].rt < w[0].rt) {
            return Err(GcmsError::InvalidInput(format!(
                "实验 '{}' 的峰未按保留时间排序: {} 之后出现 {}",
                doc.code,
                doc.peaks[k].rt,
                doc.peaks[k + 1].rt
            )));
        }
        Ok(Self {
            code: doc.code,
            peaks: doc.peaks,
        })
    }
}

impl From<Experiment> for ExperimentDoc {
    fn from(experiment: Experiment) -> Self {
        Self {
            code: experiment.code,
            peaks: experiment.peaks,
        }
    }
}

impl Experiment {
    pub fn new(code: impl Into<String>, mut peaks: Vec<Peak>) -> Self {
        peaks.sort_by(|a, b| a.rt.total_cmp(&b.rt).then(a.apex_scan.cmp(&b.apex_scan)));
        Self {
            code: code.into(),
            peaks,
        }
    }

    /// 仅保留保留时间位于 `[lo, hi]`（秒，闭区间）内的峰，返回被移除的峰数
    pub fn select_rt_range(&mut self, lo: f64, hi: f64) -> usize {
        let before = self.peaks.len();
        self.peaks.retain(|p| p.rt >= lo && p.rt <= hi);
        before - self.peaks.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}
