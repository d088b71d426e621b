//! gcms-synth - 合成 GC-MS 强度矩阵生成工具
//!
//! 生成一组共享化合物、带保留时间漂移的 `*.im.json` 样本，
//! 用于流水线的端到端演示与性能基准。

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use gcms_aligner::IntensityMatrix;
use gcms_aligner::tools::write_matrix;

// ============================================================================
// CLI 定义
// ============================================================================

#[derive(Parser)]
#[command(name = "gcms-synth")]
#[command(about = "合成 GC-MS 强度矩阵 / Synthetic GC-MS intensity matrices")]
#[command(version)]
struct Cli {
    /// 输出目录
    /// Output directory
    #[arg(long, short = 'o', default_value = "synthetic")]
    out: PathBuf,

    /// 样本数
    /// Number of samples
    #[arg(long, short = 'n', default_value_t = 4)]
    samples: usize,

    /// 化合物数
    /// Number of compounds
    #[arg(long, short = 'k', default_value_t = 12)]
    compounds: usize,

    /// 扫描数
    /// Number of scans
    #[arg(long, default_value_t = 2400)]
    scans: usize,

    /// 扫描间隔（秒）
    /// Scan interval in seconds
    #[arg(long, default_value_t = 0.25)]
    scan_interval: f64,

    /// 最低/最高质量
    /// Mass range
    #[arg(long, default_value_t = 35)]
    lo_mass: u32,
    #[arg(long, default_value_t = 350)]
    hi_mass: u32,

    /// 样本间保留时间漂移上限（秒）
    /// Max RT drift between samples (seconds)
    #[arg(long, default_value_t = 1.5)]
    drift: f64,

    /// 化合物在某样本中缺失的概率
    /// Probability that a compound is absent from a sample
    #[arg(long, default_value_t = 0.1)]
    dropout: f64,

    /// 噪声标准差
    /// Noise standard deviation
    #[arg(long, default_value_t = 2.0)]
    noise: f64,

    /// 随机种子
    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

// ============================================================================
// 随机数
// ============================================================================

/// 线性同余发生器（可复现）
struct Lcg(u64);

impl Lcg {
    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    /// [0, 1) 均匀分布
    fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// 标准正态分布（Box-Muller）
    fn gaussian(&mut self) -> f64 {
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

// ============================================================================
// 化合物模型
// ============================================================================

struct Compound {
    rt: f64,
    sigma: f64,
    height: f64,
    /// (通道索引, 相对强度)
    ions: Vec<(usize, f64)>,
}

fn make_compounds(cli: &Cli, n_channels: usize, rng: &mut Lcg) -> Vec<Compound> {
    let duration = cli.scans as f64 * cli.scan_interval;
    let span = duration * 0.8;
    (0..cli.compounds)
        .map(|k| {
            // 均匀分布在色谱中段，避免相互重叠
            let rt = duration * 0.1 + span * (k as f64 + 0.5) / cli.compounds as f64;
            let n_ions = 4 + (rng.next_u64() % 6) as usize;
            let ions = (0..n_ions)
                .map(|i| {
                    let channel = (rng.next_u64() % n_channels as u64) as usize;
                    let rel = if i == 0 { 1.0 } else { 0.1 + 0.8 * rng.uniform() };
                    (channel, rel)
                })
                .collect();
            Compound {
                rt,
                sigma: 1.0 + 1.5 * rng.uniform(),
                height: 500.0 + 4500.0 * rng.uniform(),
                ions,
            }
        })
        .collect()
}

fn make_sample(
    cli: &Cli,
    compounds: &[Compound],
    masses: &[f64],
    rng: &mut Lcg,
) -> Result<IntensityMatrix> {
    let n_channels = masses.len();
    let times: Vec<f64> = (0..cli.scans).map(|i| i as f64 * cli.scan_interval).collect();
    let mut data = vec![0.0; cli.scans * n_channels];

    // 缓慢上升的基线
    let baseline_slope = 5.0 * rng.uniform() / cli.scans as f64;
    for scan in 0..cli.scans {
        let base = baseline_slope * scan as f64;
        for channel in 0..n_channels {
            let noise = cli.noise * rng.gaussian();
            data[scan * n_channels + channel] = (base + noise).max(0.0);
        }
    }

    let shift = cli.drift * (2.0 * rng.uniform() - 1.0);
    for compound in compounds {
        if rng.uniform() < cli.dropout {
            continue;
        }
        let rt = compound.rt + shift;
        let scale = compound.height * (0.7 + 0.6 * rng.uniform());
        for (scan, &t) in times.iter().enumerate() {
            let z = (t - rt) / compound.sigma;
            if z.abs() > 6.0 {
                continue;
            }
            let profile = (-0.5 * z * z).exp();
            for &(channel, rel) in &compound.ions {
                data[scan * n_channels + channel] += scale * rel * profile;
            }
        }
    }

    IntensityMatrix::new(times, masses.to_vec(), data).context("构建强度矩阵失败")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ensure!(cli.samples > 0, "样本数必须大于0 / samples must be > 0");
    ensure!(cli.scans > 1, "扫描数必须大于1 / scans must be > 1");
    ensure!(cli.scan_interval > 0.0, "扫描间隔必须为正 / scan interval must be positive");
    ensure!(
        cli.lo_mass < cli.hi_mass,
        "质量范围无效 / invalid mass range: {}-{}",
        cli.lo_mass,
        cli.hi_mass
    );

    let masses: Vec<f64> = (cli.lo_mass..=cli.hi_mass).map(f64::from).collect();
    let mut rng = Lcg(cli.seed);
    let compounds = make_compounds(&cli, masses.len(), &mut rng);

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("无法创建输出目录 {}", cli.out.display()))?;

    for index in 0..cli.samples {
        let matrix = make_sample(&cli, &compounds, &masses, &mut rng)?;
        let path = cli.out.join(format!("sample{:02}.im.json", index + 1));
        write_matrix(&matrix, &path)
            .with_context(|| format!("写出 {} 失败", path.display()))?;
        println!("✅ {} ({} scans × {} channels)", path.display(), cli.scans, masses.len());
    }

    println!(
        "🧪 生成 {} 个样本, {} 个化合物 / Generated {} samples with {} compounds",
        cli.samples, cli.compounds, cli.samples, cli.compounds
    );
    Ok(())
}
