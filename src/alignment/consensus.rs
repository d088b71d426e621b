//! 共识表：根节点对齐结果的表格视图
//!
//! 列按输入实验顺序排列，行按平均保留时间排序。每行附带聚合质谱（参与峰质谱的均值）
//! 与公共离子（在参与峰的前N离子集合中出现次数最多的质量）。

use super::engine::Alignment;
use crate::core::{Experiment, MassSpectrum, Peak};

const MASS_TOLERANCE: f64 = 1e-6;

/// 共识表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusRow {
    /// 每个样本列中的峰（按输入实验顺序）
    pub peaks: Vec<Option<Peak>>,
    /// 平均保留时间（秒）
    pub rt: f64,
    /// 聚合质谱
    pub spectrum: MassSpectrum,
    /// 行标识（由平均保留时间与聚合质谱生成）
    pub uid: String,
    /// 公共离子质量
    pub common_ion: Option<f64>,
}

impl ConsensusRow {
    fn from_peaks(peaks: Vec<Option<Peak>>) -> Self {
        let present: Vec<&Peak> = peaks.iter().flatten().collect();
        let rt = if present.is_empty() {
            0.0
        } else {
            present.iter().map(|p| p.rt).sum::<f64>() / present.len() as f64
        };
        let spectrum = mean_spectrum(&present);
        let common_ion = common_ion(&present);
        let apex_scan = present.first().map_or(0, |p| p.apex_scan);
        let uid = Peak::new(apex_scan, rt, spectrum.clone()).uid();
        Self {
            peaks,
            rt,
            spectrum,
            uid,
            common_ion,
        }
    }

    /// 出现的样本数
    pub fn occurrences(&self) -> usize {
        self.peaks.iter().filter(|p| p.is_some()).count()
    }
}

/// 参与峰质谱的逐离子均值（以第一个质谱的质量轴为准）
fn mean_spectrum(peaks: &[&Peak]) -> MassSpectrum {
    let Some(first) = peaks.first() else {
        return MassSpectrum::new(Vec::new(), Vec::new());
    };
    let masses = first.spectrum.masses.clone();
    let mut sums = vec![0.0; masses.len()];
    for peak in peaks {
        if peak.spectrum.masses == masses {
            for (s, v) in sums.iter_mut().zip(&peak.spectrum.intensities) {
                *s += v;
            }
        } else {
            for (m, v) in peak.spectrum.masses.iter().zip(&peak.spectrum.intensities) {
                if let Some(pos) = masses.iter().position(|x| (x - m).abs() < MASS_TOLERANCE) {
                    sums[pos] += v;
                }
            }
        }
    }
    let n = peaks.len() as f64;
    MassSpectrum::new(masses, sums.into_iter().map(|s| s / n).collect())
}

/// 公共离子：出现次数最多 → 面积总和最大 → 质量较小
fn common_ion(peaks: &[&Peak]) -> Option<f64> {
    // (质量, 出现次数, 面积总和)
    let mut tally: Vec<(f64, usize, f64)> = Vec::new();
    for peak in peaks {
        for ia in &peak.ion_areas {
            match tally
                .iter_mut()
                .find(|(m, _, _)| (m - ia.mass).abs() < MASS_TOLERANCE)
            {
                Some(entry) => {
                    entry.1 += 1;
                    entry.2 += ia.area;
                }
                None => tally.push((ia.mass, 1, ia.area)),
            }
        }
    }
    tally
        .into_iter()
        .max_by(|a, b| {
            a.1.cmp(&b.1)
                .then(a.2.total_cmp(&b.2))
                .then(b.0.total_cmp(&a.0))
        })
        .map(|(mass, _, _)| mass)
}

/// 共识表
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusTable {
    sample_codes: Vec<String>,
    rows: Vec<ConsensusRow>,
}

impl ConsensusTable {
    /// 从根节点构建，列恢复为输入实验顺序，行按平均保留时间排序
    pub fn from_alignment(root: &Alignment, experiments: &[Experiment]) -> Self {
        let mut rows: Vec<ConsensusRow> = root
            .slots()
            .iter()
            .map(|slot| {
                let mut peaks = vec![None; experiments.len()];
                for (cell, &sample) in slot.iter().zip(root.samples()) {
                    if let Some(k) = cell {
                        peaks[sample] = experiments[sample].peaks.get(*k).cloned();
                    }
                }
                ConsensusRow::from_peaks(peaks)
            })
            .collect();
        rows.sort_by(|a, b| a.rt.total_cmp(&b.rt));

        Self {
            sample_codes: experiments.iter().map(|e| e.code.clone()).collect(),
            rows,
        }
    }

    #[inline]
    pub fn sample_codes(&self) -> &[String] {
        &self.sample_codes
    }

    #[inline]
    pub fn rows(&self) -> &[ConsensusRow] {
        &self.rows
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.sample_codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn peak(&self, row: usize, sample: usize) -> Option<&Peak> {
        self.rows.get(row)?.peaks.get(sample)?.as_ref()
    }

    /// `(row, sample)` 处峰的保留时间（秒）
    pub fn rt(&self, row: usize, sample: usize) -> Option<f64> {
        self.peak(row, sample).map(|p| p.rt)
    }

    /// `(row, sample)` 处峰的全离子面积
    pub fn area(&self, row: usize, sample: usize) -> Option<f64> {
        self.peak(row, sample).map(|p| p.area)
    }

    pub fn common_ion(&self, row: usize) -> Option<f64> {
        self.rows.get(row)?.common_ion
    }

    /// `(row, sample)` 处峰在该行公共离子上的面积
    pub fn common_ion_area(&self, row: usize, sample: usize) -> Option<f64> {
        let mass = self.common_ion(row)?;
        self.peak(row, sample)?.ion_area(mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IonArea;

    fn quantified(rt: f64, ions: &[(f64, f64)]) -> Peak {
        let mut peak = Peak::new(0, rt, MassSpectrum::new(vec![50.0, 51.0], vec![1.0, 3.0]));
        peak.ion_areas = ions
            .iter()
            .map(|&(mass, area)| IonArea { mass, area })
            .collect();
        peak
    }

    #[test]
    fn test_common_ion_prefers_frequency_then_area_then_mass() {
        let a = quantified(10.0, &[(73.0, 5.0), (147.0, 50.0)]);
        let b = quantified(10.0, &[(73.0, 5.0), (91.0, 1.0)]);
        assert_eq!(common_ion(&[&a, &b]), Some(73.0));

        let c = quantified(10.0, &[(73.0, 5.0), (147.0, 50.0)]);
        let d = quantified(10.0, &[(73.0, 5.0), (147.0, 50.0)]);
        assert_eq!(common_ion(&[&c, &d]), Some(147.0));

        let e = quantified(10.0, &[(91.0, 5.0), (73.0, 5.0)]);
        assert_eq!(common_ion(&[&e]), Some(73.0));
        assert_eq!(common_ion(&[]), None);
    }

    #[test]
    fn test_mean_spectrum_and_rt() {
        let a = Peak::new(0, 100.0, MassSpectrum::new(vec![50.0, 51.0], vec![2.0, 4.0]));
        let b = Peak::new(0, 102.0, MassSpectrum::new(vec![50.0, 51.0], vec![4.0, 0.0]));
        let row = ConsensusRow::from_peaks(vec![Some(a), None, Some(b)]);
        assert_eq!(row.rt, 101.0);
        assert_eq!(row.spectrum.intensities, vec![3.0, 2.0]);
        assert_eq!(row.occurrences(), 2);
    }
}
