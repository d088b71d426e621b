//! 全局动态规划对齐
//!
//! 在两组有序位点之间求最小代价的非交叉匹配：对角移动为匹配（代价取自得分矩阵），
//! 纵向/横向移动为空位（代价 G）。代价以展平的 `(n+1)×(m+1)` 行主序表存储。
//!
//! 平局规则（代价差小于容差视为相等）均按整条路径的累计量比较：匹配数较多者优先，
//! 其次累计保留时间差较小，再次累计质谱相似度较高，最后右侧空位优先于左侧空位。

use super::scoring::ScoreMatrix;
use crate::tools::constants::alignment::COST_EPSILON;
use std::cmp::Ordering;

/// 对齐路径中的一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 左位点 i 与右位点 j 匹配
    Match(usize, usize),
    /// 左位点 i 对应右侧空位
    GapRight(usize),
    /// 右位点 j 对应左侧空位
    GapLeft(usize),
}

/// 动态规划结果
#[derive(Debug, Clone)]
pub struct DpResult {
    /// 按顺序排列的路径
    pub trace: Vec<Step>,
    /// 总代价
    pub cost: f64,
}

impl DpResult {
    /// 匹配数
    pub fn n_matches(&self) -> usize {
        self.trace
            .iter()
            .filter(|s| matches!(s, Step::Match(..)))
            .count()
    }

    /// 空位数
    pub fn n_gaps(&self) -> usize {
        self.trace.len() - self.n_matches()
    }

    /// 合并相似度 `(Σ(1 - 匹配代价) - G × 空位数) / 路径长度`
    ///
    /// 空路径（两侧均无位点）返回0。
    pub fn similarity(&self, scores: &ScoreMatrix, gap: f64) -> f64 {
        if self.trace.is_empty() {
            return 0.0;
        }
        let matched: f64 = self
            .trace
            .iter()
            .filter_map(|s| match *s {
                Step::Match(i, j) => Some(1.0 - scores.get(i, j).cost),
                _ => None,
            })
            .sum();
        (matched - gap * self.n_gaps() as f64) / self.trace.len() as f64
    }
}

/// 单元格状态：总代价与用于平局判定的累计量
#[derive(Debug, Clone, Copy)]
struct Cell {
    cost: f64,
    matches: usize,
    rt_diff: f64,
    similarity: f64,
    step: Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Move {
    Diagonal,
    Up,
    Left,
    Start,
}

fn compare_within(a: f64, b: f64) -> Ordering {
    if (a - b).abs() <= COST_EPSILON {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// 候选排序：代价 → 累计匹配数（降序）→ 累计保留时间差 → 累计相似度（降序）→ 方向
fn rank(a: &Cell, b: &Cell) -> Ordering {
    compare_within(a.cost, b.cost)
        .then_with(|| b.matches.cmp(&a.matches))
        .then_with(|| compare_within(a.rt_diff, b.rt_diff))
        .then_with(|| compare_within(b.similarity, a.similarity))
        .then_with(|| a.step.cmp(&b.step))
}

/// 全局对齐两组位点
pub fn align(scores: &ScoreMatrix, gap: f64) -> DpResult {
    let n = scores.rows();
    let m = scores.cols();
    let idx = |i: usize, j: usize| -> usize { i * (m + 1) + j };

    let mut table = vec![
        Cell {
            cost: 0.0,
            matches: 0,
            rt_diff: 0.0,
            similarity: 0.0,
            step: Move::Start,
        };
        (n + 1) * (m + 1)
    ];
    for i in 1..=n {
        table[idx(i, 0)] = Cell {
            cost: i as f64 * gap,
            step: Move::Up,
            ..table[idx(i - 1, 0)]
        };
    }
    for j in 1..=m {
        table[idx(0, j)] = Cell {
            cost: j as f64 * gap,
            step: Move::Left,
            ..table[idx(0, j - 1)]
        };
    }

    for i in 1..=n {
        for j in 1..=m {
            let pair = scores.get(i - 1, j - 1);
            let diag = table[idx(i - 1, j - 1)];
            let up = table[idx(i - 1, j)];
            let left = table[idx(i, j - 1)];

            let candidates = [
                Cell {
                    cost: diag.cost + pair.cost,
                    matches: diag.matches + 1,
                    rt_diff: diag.rt_diff + pair.rt_diff,
                    similarity: diag.similarity + pair.similarity,
                    step: Move::Diagonal,
                },
                Cell {
                    cost: up.cost + gap,
                    step: Move::Up,
                    ..up
                },
                Cell {
                    cost: left.cost + gap,
                    step: Move::Left,
                    ..left
                },
            ];
            let mut best = candidates[0];
            for candidate in &candidates[1..] {
                if rank(candidate, &best) == Ordering::Less {
                    best = *candidate;
                }
            }
            table[idx(i, j)] = best;
        }
    }

    let mut trace = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        match table[idx(i, j)].step {
            Move::Diagonal => {
                trace.push(Step::Match(i - 1, j - 1));
                i -= 1;
                j -= 1;
            }
            Move::Up => {
                trace.push(Step::GapRight(i - 1));
                i -= 1;
            }
            Move::Left | Move::Start => {
                trace.push(Step::GapLeft(j - 1));
                j -= 1;
            }
        }
    }
    trace.reverse();

    DpResult {
        trace,
        cost: table[idx(n, m)].cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::scoring::PairScore;

    fn matrix(costs: &[&[f64]]) -> ScoreMatrix {
        let cols = costs.first().map_or(0, |r| r.len());
        ScoreMatrix::build(costs.len(), cols, |i, j| PairScore {
            cost: costs[i][j],
            rt_diff: 0.0,
            similarity: 1.0 - costs[i][j],
        })
    }

    #[test]
    fn test_diagonal_identity() {
        let scores = matrix(&[&[0.0, 1.0, 1.0], &[1.0, 0.0, 1.0], &[1.0, 1.0, 0.0]]);
        let result = align(&scores, 0.35);
        assert_eq!(
            result.trace,
            vec![Step::Match(0, 0), Step::Match(1, 1), Step::Match(2, 2)]
        );
        assert_eq!(result.cost, 0.0);
        assert!((result.similarity(&scores, 0.35) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_expensive_match_becomes_gaps() {
        // 匹配代价1.0 > 两个空位 0.7
        let scores = matrix(&[&[1.0]]);
        let result = align(&scores, 0.35);
        // 终点处纵向（右侧空位）优先，回溯后其位于路径末尾
        assert_eq!(result.trace, vec![Step::GapLeft(0), Step::GapRight(0)]);
        assert!((result.cost - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_tie_prefers_match() {
        let scores = matrix(&[&[0.7]]);
        let result = align(&scores, 0.35);
        assert_eq!(result.trace, vec![Step::Match(0, 0)]);
    }

    #[test]
    fn test_equal_cost_prefers_lower_rt_difference() {
        // 两条路径均为一次匹配加一个空位，代价相同，保留时间差较小的位点胜出
        let scores = ScoreMatrix::build(1, 2, |_, j| PairScore {
            cost: 0.1,
            rt_diff: [0.1, 0.9][j],
            similarity: 0.9,
        });
        let result = align(&scores, 0.35);
        assert_eq!(result.trace, vec![Step::Match(0, 0), Step::GapLeft(1)]);
        assert!((result.cost - 0.45).abs() < 1e-12);

        let mirrored = ScoreMatrix::build(1, 2, |_, j| PairScore {
            cost: 0.1,
            rt_diff: [0.9, 0.1][j],
            similarity: 0.9,
        });
        let result = align(&mirrored, 0.35);
        assert_eq!(result.trace, vec![Step::GapLeft(0), Step::Match(0, 1)]);
    }

    #[test]
    fn test_equal_cost_and_rt_prefers_higher_similarity() {
        let scores = ScoreMatrix::build(2, 1, |i, _| PairScore {
            cost: 0.2,
            rt_diff: 0.4,
            similarity: [0.6, 0.95][i],
        });
        let result = align(&scores, 0.35);
        assert_eq!(result.trace, vec![Step::GapRight(0), Step::Match(1, 0)]);
    }

    #[test]
    fn test_empty_sides() {
        let scores = matrix(&[]);
        let result = align(&scores, 0.3);
        assert!(result.trace.is_empty());
        assert_eq!(result.similarity(&scores, 0.3), 0.0);

        let scores = ScoreMatrix::build(2, 0, |_, _| unreachable!());
        let result = align(&scores, 0.3);
        assert_eq!(result.trace, vec![Step::GapRight(0), Step::GapRight(1)]);
    }

    #[test]
    fn test_matches_never_cross() {
        let mut state = 12345_u64;
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as f64 / (1u64 << 31) as f64
        };
        for _ in 0..50 {
            let rows = 1 + (next() * 8.0) as usize;
            let cols = 1 + (next() * 8.0) as usize;
            let cells: Vec<f64> = (0..rows * cols).map(|_| next()).collect();
            let scores = ScoreMatrix::build(rows, cols, |i, j| PairScore {
                cost: cells[i * cols + j],
                rt_diff: 0.0,
                similarity: 0.0,
            });
            let result = align(&scores, 0.3);

            let matches: Vec<(usize, usize)> = result
                .trace
                .iter()
                .filter_map(|s| match *s {
                    Step::Match(i, j) => Some((i, j)),
                    _ => None,
                })
                .collect();
            for w in matches.windows(2) {
                assert!(w[0].0 < w[1].0 && w[0].1 < w[1].1, "交叉匹配: {w:?}");
            }
            // 每个位点恰好出现一次
            assert_eq!(result.trace.len(), rows + cols - matches.len());
        }
    }
}
