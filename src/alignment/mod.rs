//! 多样本峰对齐模块
//!
//! 位点得分、全局动态规划、引导树与共识表。

pub mod consensus;
pub mod dp;
pub mod engine;
pub mod guide_tree;
pub mod scoring;

pub use consensus::{ConsensusRow, ConsensusTable};
pub use engine::{Alignment, AlignmentConfig, AlignmentOutcome, align_experiments, align_with_tree};
pub use guide_tree::GuideTree;
