//! GC-MS 测试固件生成器
//!
//! 为流水线和对齐测试生成带高斯峰、均匀噪声的合成强度矩阵。

#![allow(dead_code)]

use gcms_aligner::core::{Experiment, MassSpectrum, Peak};
use gcms_aligner::IntensityMatrix;

/// 扫描间隔（秒）
pub const SCAN_INTERVAL: f64 = 0.5;

/// 可复现的线性同余发生器
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    /// [0, 1) 均匀分布
    pub fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// [lo, hi) 内的整数
    pub fn range(&mut self, lo: usize, hi: usize) -> usize {
        lo + (self.next_u64() % (hi - lo) as u64) as usize
    }
}

/// 合成化合物：保留时间需落在扫描时间上，保证各离子顶点位于同一扫描
#[derive(Debug, Clone)]
pub struct SyntheticCompound {
    pub rt: f64,
    pub sigma: f64,
    pub height: f64,
    /// (质量, 相对强度)
    pub ions: Vec<(f64, f64)>,
}

impl SyntheticCompound {
    pub fn new(rt: f64, height: f64, ions: &[(f64, f64)]) -> Self {
        Self {
            rt,
            sigma: 2.0,
            height,
            ions: ions.to_vec(),
        }
    }
}

/// 合成矩阵描述
#[derive(Debug, Clone)]
pub struct SyntheticRun {
    pub n_scans: usize,
    pub masses: Vec<f64>,
    pub compounds: Vec<SyntheticCompound>,
    /// 均匀噪声幅度，`[0, noise)`
    pub noise: f64,
    pub seed: u64,
}

impl SyntheticRun {
    /// 800 秒色谱，质量 40-60
    pub fn standard(compounds: Vec<SyntheticCompound>, seed: u64) -> Self {
        Self {
            n_scans: 1600,
            masses: (40..=60).map(f64::from).collect(),
            compounds,
            noise: 2.0,
            seed,
        }
    }

    pub fn build(&self) -> IntensityMatrix {
        let n_channels = self.masses.len();
        let times: Vec<f64> = (0..self.n_scans).map(|i| i as f64 * SCAN_INTERVAL).collect();
        let mut rng = Lcg(self.seed);
        let mut data: Vec<f64> = (0..self.n_scans * n_channels)
            .map(|_| self.noise * rng.uniform())
            .collect();

        for compound in &self.compounds {
            for (scan, &t) in times.iter().enumerate() {
                let z = (t - compound.rt) / compound.sigma;
                if z.abs() > 8.0 {
                    continue;
                }
                let profile = (-0.5 * z * z).exp();
                for &(mass, rel) in &compound.ions {
                    if let Some(channel) = self.masses.iter().position(|&m| m == mass) {
                        data[scan * n_channels + channel] += compound.height * rel * profile;
                    }
                }
            }
        }

        IntensityMatrix::new(times, self.masses.clone(), data).expect("合成矩阵无效")
    }
}

/// 一组在默认保留时间范围（180-645 秒）内外分布的标准化合物
pub fn standard_compounds() -> Vec<SyntheticCompound> {
    vec![
        // 范围外：被保留时间过滤
        SyntheticCompound::new(100.0, 800.0, &[(41.0, 1.0), (43.0, 0.6), (55.0, 0.4), (57.0, 0.3)]),
        SyntheticCompound::new(240.0, 1000.0, &[(44.0, 1.0), (45.0, 0.5), (58.0, 0.7), (60.0, 0.3)]),
        SyntheticCompound::new(300.0, 600.0, &[(42.0, 0.4), (47.0, 1.0), (51.0, 0.8), (53.0, 0.5)]),
        SyntheticCompound::new(420.0, 1500.0, &[(40.0, 0.3), (49.0, 1.0), (50.0, 0.9), (59.0, 0.6)]),
        SyntheticCompound::new(560.0, 900.0, &[(46.0, 1.0), (48.0, 0.5), (52.0, 0.5), (54.0, 0.8)]),
    ]
}

/// 由 (保留时间, 三通道强度) 直接构造实验（对齐测试用）
pub fn experiment(code: &str, peaks: &[(f64, [f64; 3])]) -> Experiment {
    let peaks = peaks
        .iter()
        .enumerate()
        .map(|(i, (rt, ints))| {
            let mut peak = Peak::new(i, *rt, MassSpectrum::new(vec![50.0, 51.0, 52.0], ints.to_vec()));
            peak.area = ints.iter().sum::<f64>() * 10.0;
            peak
        })
        .collect();
    Experiment::new(code, peaks)
}
