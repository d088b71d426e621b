//! 平均连接（UPGMA）层次聚类引导树
//!
//! 以节点表形式存储：编号 `0..n` 为叶节点（样本），编号 `n..2n-1` 为内部节点，
//! 按创建顺序排列，因此节点表顺序即自底向上的合并顺序。

use crate::error::{GcmsError, GcmsResult};

/// 内部节点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode {
    /// 左子节点编号
    pub left: usize,
    /// 右子节点编号
    pub right: usize,
    /// 合并时的簇间距离
    pub height: f64,
}

/// 引导树
#[derive(Debug, Clone, PartialEq)]
pub struct GuideTree {
    n_leaves: usize,
    nodes: Vec<TreeNode>,
}

impl GuideTree {
    /// 从展平的 `n×n` 行主序距离矩阵构建平均连接树
    ///
    /// 每步合并距离最小的一对活动簇（同距离取编号最小的一对），
    /// 新簇到其他簇的距离按簇大小加权平均。
    pub fn average_linkage(dist: &[f64], n: usize) -> GcmsResult<Self> {
        if n == 0 {
            return Err(GcmsError::AlignmentError("没有可聚类的样本".into()));
        }
        if dist.len() != n * n {
            return Err(GcmsError::AlignmentError(format!(
                "距离矩阵尺寸不匹配: {} != {n}×{n}",
                dist.len()
            )));
        }

        let total = 2 * n - 1;
        let mut d = vec![0.0_f64; total * total];
        for i in 0..n {
            for j in 0..n {
                d[i * total + j] = dist[i * n + j];
            }
        }
        let mut size = vec![1_usize; total];
        let mut active: Vec<usize> = (0..n).collect();
        let mut nodes = Vec::with_capacity(n.saturating_sub(1));

        while active.len() > 1 {
            let mut best = (active[0], active[1]);
            let mut best_d = f64::INFINITY;
            for (ai, &i) in active.iter().enumerate() {
                for &j in &active[(ai + 1)..] {
                    let dij = d[i * total + j];
                    if dij < best_d {
                        best_d = dij;
                        best = (i, j);
                    }
                }
            }
            let (a, b) = best;
            let new_id = n + nodes.len();
            let (sa, sb) = (size[a] as f64, size[b] as f64);

            for &k in &active {
                if k != a && k != b {
                    let dk = (sa * d[a * total + k] + sb * d[b * total + k]) / (sa + sb);
                    d[new_id * total + k] = dk;
                    d[k * total + new_id] = dk;
                }
            }
            size[new_id] = size[a] + size[b];
            nodes.push(TreeNode {
                left: a,
                right: b,
                height: best_d,
            });

            active.retain(|&k| k != a && k != b);
            active.push(new_id);
        }

        Ok(Self { n_leaves: n, nodes })
    }

    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// 内部节点（自底向上的合并顺序）
    #[inline]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    #[inline]
    pub fn is_leaf(&self, id: usize) -> bool {
        id < self.n_leaves
    }

    /// 根节点编号（单样本时为叶节点0）
    pub fn root(&self) -> usize {
        self.n_leaves + self.nodes.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_leaves() {
        // 0-1 最近，随后与 2 合并，距离为平均值
        #[rustfmt::skip]
        let dist = vec![
            0.0, 0.1, 0.5,
            0.1, 0.0, 0.7,
            0.5, 0.7, 0.0,
        ];
        let tree = GuideTree::average_linkage(&dist, 3).unwrap();
        assert_eq!(tree.nodes().len(), 2);
        assert_eq!((tree.nodes()[0].left, tree.nodes()[0].right), (0, 1));
        assert_eq!((tree.nodes()[1].left, tree.nodes()[1].right), (2, 3));
        assert!((tree.nodes()[1].height - 0.6).abs() < 1e-12);
        assert_eq!(tree.root(), 4);
    }

    #[test]
    fn test_ties_pick_lowest_pair() {
        let dist = vec![0.0, 0.2, 0.2, 0.2, 0.0, 0.2, 0.2, 0.2, 0.0];
        let tree = GuideTree::average_linkage(&dist, 3).unwrap();
        assert_eq!((tree.nodes()[0].left, tree.nodes()[0].right), (0, 1));
    }

    #[test]
    fn test_single_and_empty() {
        let tree = GuideTree::average_linkage(&[0.0], 1).unwrap();
        assert!(tree.nodes().is_empty());
        assert_eq!(tree.root(), 0);
        assert!(GuideTree::average_linkage(&[], 0).is_err());
    }
}
