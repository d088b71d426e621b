//! 强度矩阵与离子色谱数据结构
//!
//! `IntensityMatrix` 是原始仪器文件解析后的结构化输出：扫描 × 质量通道的
//! 非负强度网格，附带逐扫描的保留时间（秒）与逐列的质量值。
//!
//! ## 不变量
//! - 保留时间严格递增
//! - 质量范围可裁剪，但通道顺序保持不变
//! - 强度为有限非负值

use crate::error::{GcmsError, GcmsResult};
use serde::{Deserialize, Serialize};

/// 单个质量通道（或TIC）随扫描变化的强度序列
#[derive(Debug, Clone, PartialEq)]
pub struct IonChromatogram {
    times: Vec<f64>,
    intensities: Vec<f64>,
}

impl IonChromatogram {
    /// 创建离子色谱（长度必须一致）
    pub fn new(times: Vec<f64>, intensities: Vec<f64>) -> GcmsResult<Self> {
        if times.len() != intensities.len() {
            return Err(GcmsError::InvalidInput(format!(
                "保留时间长度({})与强度长度({})不一致",
                times.len(),
                intensities.len()
            )));
        }
        Ok(Self { times, intensities })
    }

    /// 以相同时间轴替换强度，返回新色谱
    pub fn with_intensities(&self, intensities: Vec<f64>) -> Self {
        debug_assert_eq!(intensities.len(), self.times.len());
        Self {
            times: self.times.clone(),
            intensities,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[inline]
    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    /// 平均扫描间隔（秒）；少于2个点时返回0
    pub fn time_step(&self) -> f64 {
        mean_time_step(&self.times)
    }
}

/// 磁盘文档形式（反序列化后再经 `TryFrom` 校验）
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntensityMatrixDoc {
    times: Vec<f64>,
    masses: Vec<f64>,
    intensities: Vec<Vec<f64>>,
}

/// 扫描 × 质量通道强度矩阵（行主序存储）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IntensityMatrixDoc", into = "IntensityMatrixDoc")]
pub struct IntensityMatrix {
    times: Vec<f64>,
    masses: Vec<f64>,
    data: Vec<f64>,
}

impl TryFrom<IntensityMatrixDoc> for IntensityMatrix {
    type Error = GcmsError;

    fn try_from(doc: IntensityMatrixDoc) -> Result<Self, Self::Error> {
        Self::from_rows(doc.times, doc.masses, doc.intensities)
    }
}

impl From<IntensityMatrix> for IntensityMatrixDoc {
    fn from(im: IntensityMatrix) -> Self {
        let width = im.masses.len().max(1);
        let intensities = if im.masses.is_empty() {
            vec![Vec::new(); im.times.len()]
        } else {
            im.data.chunks(width).map(<[f64]>::to_vec).collect()
        };
        Self {
            times: im.times,
            masses: im.masses,
            intensities,
        }
    }
}

impl IntensityMatrix {
    /// 从行主序平铺数据创建矩阵
    pub fn new(times: Vec<f64>, masses: Vec<f64>, data: Vec<f64>) -> GcmsResult<Self> {
        if data.len() != times.len() * masses.len() {
            return Err(GcmsError::InvalidInput(format!(
                "矩阵尺寸不匹配: {} 扫描 × {} 通道 != {} 个强度值",
                times.len(),
                masses.len(),
                data.len()
            )));
        }
        if let Some(pos) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(GcmsError::InvalidInput(format!(
                "保留时间必须严格递增（扫描 {} -> {}）",
                pos,
                pos + 1
            )));
        }
        if let Some(v) = data.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(GcmsError::InvalidInput(format!("强度必须为有限非负值: {v}")));
        }
        Ok(Self {
            times,
            masses,
            data,
        })
    }

    /// 从逐扫描的行数据创建矩阵
    pub fn from_rows(times: Vec<f64>, masses: Vec<f64>, rows: Vec<Vec<f64>>) -> GcmsResult<Self> {
        if rows.len() != times.len() {
            return Err(GcmsError::InvalidInput(format!(
                "行数({})与保留时间数({})不一致",
                rows.len(),
                times.len()
            )));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != masses.len()) {
            return Err(GcmsError::InvalidInput(format!(
                "第 {i} 行有 {} 个通道，期望 {}",
                row.len(),
                masses.len()
            )));
        }
        let data = rows.into_iter().flatten().collect();
        Self::new(times, masses, data)
    }

    /// 返回 (扫描数, 通道数)
    #[inline]
    pub fn size(&self) -> (usize, usize) {
        (self.times.len(), self.masses.len())
    }

    #[inline]
    pub fn n_scans(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.masses.len()
    }

    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[inline]
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    #[inline]
    pub fn intensity(&self, scan: usize, channel: usize) -> f64 {
        self.data[scan * self.masses.len() + channel]
    }

    /// 单个扫描的质谱（所有通道）
    #[inline]
    pub fn scan(&self, scan: usize) -> &[f64] {
        let width = self.masses.len();
        &self.data[scan * width..(scan + 1) * width]
    }

    /// 单个通道的强度序列
    pub fn channel_intensities(&self, channel: usize) -> Vec<f64> {
        let width = self.masses.len();
        self.data
            .iter()
            .skip(channel)
            .step_by(width.max(1))
            .copied()
            .collect()
    }

    /// 取出第 `channel` 列的离子色谱
    pub fn ic_at_index(&self, channel: usize) -> GcmsResult<IonChromatogram> {
        if channel >= self.masses.len() {
            return Err(GcmsError::InvalidInput(format!(
                "通道索引越界: {channel} >= {}",
                self.masses.len()
            )));
        }
        IonChromatogram::new(self.times.clone(), self.channel_intensities(channel))
    }

    /// 用处理后的色谱替换第 `channel` 列
    pub fn set_ic_at_index(&mut self, channel: usize, ic: &IonChromatogram) -> GcmsResult<()> {
        if channel >= self.masses.len() {
            return Err(GcmsError::InvalidInput(format!(
                "通道索引越界: {channel} >= {}",
                self.masses.len()
            )));
        }
        if ic.len() != self.times.len() {
            return Err(GcmsError::InvalidInput(format!(
                "色谱长度({})与扫描数({})不一致",
                ic.len(),
                self.times.len()
            )));
        }
        let width = self.masses.len();
        for (scan, &v) in ic.intensities().iter().enumerate() {
            self.data[scan * width + channel] = v.max(0.0);
        }
        Ok(())
    }

    /// 总离子流色谱（TIC）：每个扫描所有通道强度之和
    pub fn tic(&self) -> IonChromatogram {
        let width = self.masses.len().max(1);
        let sums = if self.masses.is_empty() {
            vec![0.0; self.times.len()]
        } else {
            self.data.chunks(width).map(|row| row.iter().sum()).collect()
        };
        IonChromatogram {
            times: self.times.clone(),
            intensities: sums,
        }
    }

    /// 裁剪质量范围到 `[lo, hi]`（闭区间），保持通道顺序
    pub fn crop_mass(&mut self, lo: f64, hi: f64) -> GcmsResult<()> {
        if lo > hi {
            return Err(GcmsError::ConfigurationError(format!(
                "质量范围下限 {lo} 大于上限 {hi}"
            )));
        }
        let keep: Vec<usize> = self
            .masses
            .iter()
            .enumerate()
            .filter(|(_, m)| **m >= lo && **m <= hi)
            .map(|(i, _)| i)
            .collect();
        if keep.is_empty() {
            return Err(GcmsError::InvalidInput(format!(
                "质量范围 [{lo}, {hi}] 内没有任何通道"
            )));
        }
        if keep.len() == self.masses.len() {
            return Ok(());
        }

        let width = self.masses.len();
        let mut data = Vec::with_capacity(self.times.len() * keep.len());
        for scan in 0..self.times.len() {
            let row = &self.data[scan * width..(scan + 1) * width];
            data.extend(keep.iter().map(|&c| row[c]));
        }
        self.masses = keep.iter().map(|&c| self.masses[c]).collect();
        self.data = data;
        Ok(())
    }

    /// 平均扫描间隔（秒）
    pub fn time_step(&self) -> f64 {
        mean_time_step(&self.times)
    }

    /// 质量值对应的通道索引（容差 1e-6）
    pub fn index_of_mass(&self, mass: f64) -> Option<usize> {
        self.masses.iter().position(|m| (m - mass).abs() < 1e-6)
    }
}

fn mean_time_step(times: &[f64]) -> f64 {
    match times {
        [first, .., last] => (last - first) / (times.len() - 1) as f64,
        _ => 0.0,
    }
}
