//! 位置相似度与得分矩阵
//!
//! 两个峰的相似度 = 质谱余弦 × 保留时间高斯调制 `exp(-(ΔRT/D)²/2)`；
//! 两个对齐位点的匹配代价 = 所有峰对 `1 - 相似度` 的均值。

use crate::core::Peak;

/// 单个位点对的得分
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    /// 匹配代价 `1 - 平均相似度`
    pub cost: f64,
    /// 两位点平均保留时间之差（秒，绝对值）
    pub rt_diff: f64,
    /// 平均质谱余弦相似度
    pub similarity: f64,
}

/// 两个峰的位置相似度
#[inline]
pub fn peak_similarity(a: &Peak, b: &Peak, rt_tolerance: f64) -> f64 {
    let z = (a.rt - b.rt) / rt_tolerance;
    a.spectrum.cosine(&b.spectrum) * (-0.5 * z * z).exp()
}

fn mean_rt(peaks: &[&Peak]) -> f64 {
    if peaks.is_empty() {
        return 0.0;
    }
    peaks.iter().map(|p| p.rt).sum::<f64>() / peaks.len() as f64
}

/// 两个位点（各自若干样本中的峰）之间的得分
pub fn slot_score(left: &[&Peak], right: &[&Peak], rt_tolerance: f64) -> PairScore {
    let pairs = left.len() * right.len();
    if pairs == 0 {
        return PairScore {
            cost: 1.0,
            rt_diff: f64::INFINITY,
            similarity: 0.0,
        };
    }

    let mut cost = 0.0;
    let mut cosine = 0.0;
    for a in left {
        for b in right {
            cost += 1.0 - peak_similarity(a, b, rt_tolerance);
            cosine += a.spectrum.cosine(&b.spectrum);
        }
    }
    PairScore {
        cost: cost / pairs as f64,
        rt_diff: (mean_rt(left) - mean_rt(right)).abs(),
        similarity: cosine / pairs as f64,
    }
}

/// 行主序得分矩阵（左位点 × 右位点）
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<PairScore>,
}

impl ScoreMatrix {
    /// 逐格调用 `score(i, j)` 构造矩阵
    pub fn build(rows: usize, cols: usize, mut score: impl FnMut(usize, usize) -> PairScore) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                cells.push(score(i, j));
            }
        }
        Self { rows, cols, cells }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> &PairScore {
        &self.cells[i * self.cols + j]
    }
}
