//! 多样本对齐引擎
//!
//! 流程：叶节点对齐两两求相似度 → 平均连接引导树 → 按节点表顺序自底向上合并
//! → 最少出现次数过滤 → 共识表。
//!
//! 对齐节点以"位点 × 样本列"的索引矩阵表示，单元格为该样本实验中的峰索引
//! （`None` 表示空位），峰本身始终只存放在 `Experiment` 中。

use super::consensus::ConsensusTable;
use super::dp;
use super::guide_tree::GuideTree;
use super::scoring::{ScoreMatrix, slot_score};
use crate::core::{Experiment, Peak};
use crate::error::{GcmsError, GcmsResult, PipelineWarning, configuration_error};

/// 对齐配置
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// 叶节点之间合并时的保留时间容差 Dw（秒）
    pub rt_tolerance_within: f64,
    /// 叶节点之间合并时的空位罚分 Gw
    pub gap_within: f64,
    /// 涉及聚合节点的合并的保留时间容差 Db（秒）
    pub rt_tolerance_between: f64,
    /// 涉及聚合节点的合并的空位罚分 Gb
    pub gap_between: f64,
    /// 共识表每行最少出现的样本数 M
    pub min_occurrence: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        use crate::tools::constants::alignment;
        Self {
            rt_tolerance_within: alignment::DW,
            gap_within: alignment::GW,
            rt_tolerance_between: alignment::DB,
            gap_between: alignment::GB,
            min_occurrence: alignment::MIN_OCCURRENCE,
        }
    }
}

impl AlignmentConfig {
    pub fn validate(&self) -> GcmsResult<()> {
        for (name, d) in [
            ("Dw", self.rt_tolerance_within),
            ("Db", self.rt_tolerance_between),
        ] {
            if !(d.is_finite() && d > 0.0) {
                return Err(configuration_error(name, format!("保留时间容差必须为正，当前 {d}")));
            }
        }
        for (name, g) in [("Gw", self.gap_within), ("Gb", self.gap_between)] {
            if !(g.is_finite() && g >= 0.0) {
                return Err(configuration_error(name, format!("空位罚分必须非负，当前 {g}")));
            }
        }
        if self.min_occurrence == 0 {
            return Err(configuration_error("min_occurrence", "至少为1"));
        }
        Ok(())
    }
}

/// 对齐节点：位点 × 样本列的峰索引矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// 样本列对应的实验编号（输入顺序中的索引）
    samples: Vec<usize>,
    /// 每个位点在各样本列中的峰索引
    slots: Vec<Vec<Option<usize>>>,
    /// 产生该节点的合并相似度（叶节点为1）
    similarity: f64,
}

impl Alignment {
    /// 叶节点：一个实验的每个峰占一个位点
    pub fn from_experiment(index: usize, experiment: &Experiment) -> Self {
        Self {
            samples: vec![index],
            slots: (0..experiment.len()).map(|k| vec![Some(k)]).collect(),
            similarity: 1.0,
        }
    }

    #[inline]
    pub fn samples(&self) -> &[usize] {
        &self.samples
    }

    #[inline]
    pub fn slots(&self) -> &[Vec<Option<usize>>] {
        &self.slots
    }

    #[inline]
    pub fn n_slots(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    /// 位点中出现的峰
    pub fn slot_peaks<'a>(&self, slot: usize, experiments: &'a [Experiment]) -> Vec<&'a Peak> {
        self.slots[slot]
            .iter()
            .zip(&self.samples)
            .filter_map(|(cell, &sample)| cell.map(|k| &experiments[sample].peaks[k]))
            .collect()
    }

    /// 位点出现的样本数
    pub fn occurrences(&self, slot: usize) -> usize {
        self.slots[slot].iter().filter(|c| c.is_some()).count()
    }

    /// 删除出现次数少于 `min` 的位点，返回删除数
    pub fn retain_min_occurrence(&mut self, min: usize) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|row| row.iter().filter(|c| c.is_some()).count() >= min);
        before - self.slots.len()
    }

    /// 以全局动态规划合并两个节点
    pub fn merge(
        left: &Alignment,
        right: &Alignment,
        experiments: &[Experiment],
        rt_tolerance: f64,
        gap: f64,
    ) -> Alignment {
        let left_peaks: Vec<Vec<&Peak>> = (0..left.n_slots())
            .map(|s| left.slot_peaks(s, experiments))
            .collect();
        let right_peaks: Vec<Vec<&Peak>> = (0..right.n_slots())
            .map(|s| right.slot_peaks(s, experiments))
            .collect();

        let scores = ScoreMatrix::build(left.n_slots(), right.n_slots(), |i, j| {
            slot_score(&left_peaks[i], &right_peaks[j], rt_tolerance)
        });
        let result = dp::align(&scores, gap);

        let left_width = left.samples.len();
        let right_width = right.samples.len();
        let slots = result
            .trace
            .iter()
            .map(|step| match *step {
                dp::Step::Match(i, j) => {
                    let mut row = left.slots[i].clone();
                    row.extend_from_slice(&right.slots[j]);
                    row
                }
                dp::Step::GapRight(i) => {
                    let mut row = left.slots[i].clone();
                    row.resize(left_width + right_width, None);
                    row
                }
                dp::Step::GapLeft(j) => {
                    let mut row = vec![None; left_width];
                    row.extend_from_slice(&right.slots[j]);
                    row
                }
            })
            .collect();

        let mut samples = left.samples.clone();
        samples.extend_from_slice(&right.samples);

        log::trace!(
            "合并 {:?} + {:?}: {} 匹配, {} 空位, 代价 {:.4}",
            left.samples,
            right.samples,
            result.n_matches(),
            result.n_gaps(),
            result.cost
        );

        Alignment {
            samples,
            slots,
            similarity: result.similarity(&scores, gap),
        }
    }
}

/// 两两叶节点对齐的距离矩阵（`1 - 相似度`，展平 n×n 行主序）
pub fn pairwise_distances(experiments: &[Experiment], config: &AlignmentConfig) -> Vec<f64> {
    let n = experiments.len();
    let leaves: Vec<Alignment> = experiments
        .iter()
        .enumerate()
        .map(|(i, e)| Alignment::from_experiment(i, e))
        .collect();

    let mut dist = vec![0.0_f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let merged = Alignment::merge(
                &leaves[i],
                &leaves[j],
                experiments,
                config.rt_tolerance_within,
                config.gap_within,
            );
            let d = 1.0 - merged.similarity;
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }
    dist
}

/// 按引导树自底向上合并，返回根节点（未过滤）
///
/// 两个子节点均为叶节点时使用 (Dw, Gw)，否则使用 (Db, Gb)。
pub fn align_with_tree(
    experiments: &[Experiment],
    tree: &GuideTree,
    config: &AlignmentConfig,
) -> GcmsResult<Alignment> {
    if tree.n_leaves() != experiments.len() {
        return Err(GcmsError::AlignmentError(format!(
            "引导树叶节点数 {} 与实验数 {} 不一致",
            tree.n_leaves(),
            experiments.len()
        )));
    }

    let mut arena: Vec<Option<Alignment>> = experiments
        .iter()
        .enumerate()
        .map(|(i, e)| Some(Alignment::from_experiment(i, e)))
        .collect();

    for node in tree.nodes() {
        let take = |arena: &mut Vec<Option<Alignment>>, id: usize| {
            arena.get_mut(id).and_then(Option::take).ok_or_else(|| {
                GcmsError::AlignmentError(format!("引导树节点 {id} 缺失或被重复使用"))
            })
        };
        let left = take(&mut arena, node.left)?;
        let right = take(&mut arena, node.right)?;

        let (d, g) = if tree.is_leaf(node.left) && tree.is_leaf(node.right) {
            (config.rt_tolerance_within, config.gap_within)
        } else {
            (config.rt_tolerance_between, config.gap_between)
        };
        arena.push(Some(Alignment::merge(&left, &right, experiments, d, g)));
    }

    arena
        .get_mut(tree.root())
        .and_then(Option::take)
        .ok_or_else(|| GcmsError::AlignmentError("引导树没有根节点".into()))
}

/// 对齐结果
#[derive(Debug, Clone)]
pub struct AlignmentOutcome {
    pub table: ConsensusTable,
    /// 引导树（单样本时为 `None`）
    pub tree: Option<GuideTree>,
    /// 被最少出现次数过滤掉的行数
    pub filtered_rows: usize,
    pub warnings: Vec<PipelineWarning>,
}

/// 多样本对齐入口
pub fn align_experiments(
    experiments: &[Experiment],
    config: &AlignmentConfig,
) -> GcmsResult<AlignmentOutcome> {
    config.validate()?;
    let mut warnings = Vec::new();

    match experiments.len() {
        0 => Err(GcmsError::AlignmentError("没有可对齐的实验".into())),
        1 => {
            let reason = format!("只有一个样本 '{}'，跳过聚类", experiments[0].code);
            log::warn!("{reason}");
            warnings.push(PipelineWarning::DegenerateAlignment { reason });
            let root = Alignment::from_experiment(0, &experiments[0]);
            let table = ConsensusTable::from_alignment(&root, experiments);
            if table.is_empty() {
                warnings.push(PipelineWarning::EmptyResult {
                    context: experiments[0].code.clone(),
                });
            }
            Ok(AlignmentOutcome {
                table,
                tree: None,
                filtered_rows: 0,
                warnings,
            })
        }
        n => {
            if config.min_occurrence > n {
                log::warn!(
                    "最少出现次数 {} 大于样本数 {n}，共识表将为空",
                    config.min_occurrence
                );
            }
            if experiments.iter().all(Experiment::is_empty) {
                warnings.push(PipelineWarning::DegenerateAlignment {
                    reason: "所有样本均无峰，结果全为空位".into(),
                });
            }

            let dist = pairwise_distances(experiments, config);
            let tree = GuideTree::average_linkage(&dist, n)?;
            let mut root = align_with_tree(experiments, &tree, config)?;
            let filtered_rows = root.retain_min_occurrence(config.min_occurrence);
            log::info!(
                "对齐完成: {n} 个样本, {} 行保留, {filtered_rows} 行因出现次数不足被过滤",
                root.n_slots()
            );

            let table = ConsensusTable::from_alignment(&root, experiments);
            if table.is_empty() {
                warnings.push(PipelineWarning::EmptyResult {
                    context: "共识表".into(),
                });
            }
            Ok(AlignmentOutcome {
                table,
                tree: Some(tree),
                filtered_rows,
                warnings,
            })
        }
    }
}
