//! 峰定量：全离子求和面积与前N离子面积
//!
//! 单离子面积：从顶点沿该通道向两侧行走，强度不增时累加，遇到零值、
//! 强度回升或超出 `max_bound` 扫描时停止；顶点只计一次。

use super::matrix::IntensityMatrix;
use super::peak::{IonArea, Peak};
use crate::error::{GcmsError, GcmsResult, configuration_error};

/// 定量配置
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QuantConfig {
    /// 记录面积的最强离子数
    pub top_ions: usize,
    /// 单侧最大行走扫描数（0 表示不限）
    pub max_bound: usize,
}

impl Default for QuantConfig {
    fn default() -> Self {
        Self {
            top_ions: crate::tools::constants::detection::TOP_IONS,
            max_bound: 0,
        }
    }
}

impl QuantConfig {
    pub fn validate(&self) -> GcmsResult<()> {
        if self.top_ions == 0 {
            return Err(configuration_error("top_ions", "至少记录1个离子"));
        }
        Ok(())
    }
}

/// 单侧积分结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfArea {
    /// 不含顶点的累加面积
    pub area: f64,
    /// 行走的扫描数
    pub extent: usize,
}

/// 从 `values[0]`（顶点）向后行走的单侧面积（不含顶点）
pub fn half_area<'a>(values: impl IntoIterator<Item = &'a f64>, max_bound: usize) -> HalfArea {
    let mut iter = values.into_iter();
    let Some(&apex) = iter.next() else {
        return HalfArea {
            area: 0.0,
            extent: 0,
        };
    };

    let mut prev = apex;
    let mut area = 0.0;
    let mut extent = 0;
    for &v in iter {
        if max_bound > 0 && extent >= max_bound {
            break;
        }
        if v <= 0.0 || v > prev {
            break;
        }
        area += v;
        extent += 1;
        prev = v;
    }
    HalfArea { area, extent }
}

/// 单离子面积：`(面积, 左边界扫描, 右边界扫描)`
pub fn ion_area(values: &[f64], apex: usize, max_bound: usize) -> (f64, usize, usize) {
    let Some(&top) = values.get(apex) else {
        return (0.0, apex, apex);
    };
    let right = half_area(&values[apex..], max_bound);
    let left = half_area(values[..=apex].iter().rev(), max_bound);
    (
        top + left.area + right.area,
        apex - left.extent,
        apex + right.extent,
    )
}

fn channel_for_mass(im: &IntensityMatrix, mass: f64) -> GcmsResult<usize> {
    im.index_of_mass(mass)
        .ok_or_else(|| GcmsError::InvalidInput(format!("质量 {mass} 不在强度矩阵的质量轴上")))
}

fn check_apex(im: &IntensityMatrix, peak: &Peak) -> GcmsResult<()> {
    if peak.apex_scan >= im.n_scans() {
        return Err(GcmsError::InvalidInput(format!(
            "峰顶点扫描 {} 超出矩阵范围 {}",
            peak.apex_scan,
            im.n_scans()
        )));
    }
    Ok(())
}

/// 全离子求和面积：对峰质谱中每个非零离子的面积求和
pub fn peak_sum_area(im: &IntensityMatrix, peak: &Peak, max_bound: usize) -> GcmsResult<f64> {
    check_apex(im, peak)?;
    let mut total = 0.0;
    for channel in peak.spectrum.nonzero_channels() {
        let column = channel_for_mass(im, peak.spectrum.masses[channel])?;
        let (area, _, _) = ion_area(&im.channel_intensities(column), peak.apex_scan, max_bound);
        total += area;
    }
    Ok(total)
}

/// 前 `n` 个最强离子的面积（同强度时质量较小者优先）
pub fn top_ion_areas(
    im: &IntensityMatrix,
    peak: &Peak,
    n: usize,
    max_bound: usize,
) -> GcmsResult<Vec<IonArea>> {
    check_apex(im, peak)?;
    peak.spectrum
        .top_ions(n)
        .into_iter()
        .map(|mass| {
            let column = channel_for_mass(im, mass)?;
            let (area, _, _) = ion_area(&im.channel_intensities(column), peak.apex_scan, max_bound);
            Ok(IonArea { mass, area })
        })
        .collect()
}

/// 就地补充峰的 `area` 与 `ion_areas`
pub fn quantify(im: &IntensityMatrix, peak: &mut Peak, config: &QuantConfig) -> GcmsResult<()> {
    peak.area = peak_sum_area(im, peak, config.max_bound)?;
    peak.ion_areas = top_ion_areas(im, peak, config.top_ions, config.max_bound)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::peak::MassSpectrum;

    #[test]
    fn test_ion_area_walks_until_rise_or_zero() {
        //            0    1    2    3    4    5    6    7
        let values = [5.0, 1.0, 2.0, 4.0, 8.0, 3.0, 0.0, 9.0];
        let (area, left, right) = ion_area(&values, 4, 0);
        // 左: 4, 2, 1（遇5回升停止）；右: 3（遇0停止）
        assert_eq!(area, 8.0 + 4.0 + 2.0 + 1.0 + 3.0);
        assert_eq!((left, right), (1, 5));
    }

    #[test]
    fn test_ion_area_plateau_and_bound() {
        let values = [1.0, 2.0, 2.0, 2.0, 1.0];
        assert_eq!(ion_area(&values, 2, 0).0, 8.0);
        let (area, left, right) = ion_area(&values, 2, 1);
        assert_eq!(area, 6.0);
        assert_eq!((left, right), (1, 3));
    }

    #[test]
    fn test_quantify_fills_areas() {
        let times = (0..7).map(|i| i as f64).collect();
        let rows = vec![
            vec![0.0, 0.0, 0.0],
            vec![1.0, 2.0, 0.0],
            vec![3.0, 4.0, 0.0],
            vec![6.0, 8.0, 1.0],
            vec![3.0, 4.0, 0.0],
            vec![1.0, 2.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ];
        let im = IntensityMatrix::from_rows(times, vec![50.0, 51.0, 52.0], rows).unwrap();
        let mut peak = Peak::new(
            3,
            3.0,
            MassSpectrum::new(vec![50.0, 51.0, 52.0], vec![6.0, 8.0, 0.0]),
        );
        quantify(&im, &mut peak, &QuantConfig::default()).unwrap();

        assert_eq!(peak.area, 14.0 + 20.0);
        assert_eq!(peak.ion_areas.len(), 2);
        assert_eq!(peak.ion_areas[0], IonArea { mass: 51.0, area: 20.0 });
        assert_eq!(peak.ion_area(50.0), Some(14.0));
    }

    #[test]
    fn test_quantify_rejects_foreign_peak() {
        let im = IntensityMatrix::new(vec![0.0, 1.0], vec![50.0], vec![1.0, 1.0]).unwrap();
        let mut peak = Peak::new(9, 0.0, MassSpectrum::new(vec![50.0], vec![1.0]));
        assert!(quantify(&im, &mut peak, &QuantConfig::default()).is_err());
    }
}
