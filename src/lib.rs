//! GCMS Aligner
//!
//! GC-MS 峰检测与多样本峰对齐工具。
//!
//! ## 流程
//! - 逐通道 Savitzky-Golay 平滑与 top-hat 基线校正
//! - 基于 TIC 的噪声估计（滑动窗口中位绝对偏差）
//! - Biller-Biemann 峰检测与强度裁剪
//! - 峰定量：全离子面积与前N离子面积
//! - 动态规划成对对齐 + 平均连接引导树的渐进式多样本对齐
//! - 共识表 CSV 导出

pub mod alignment;
pub mod config;
pub mod core;
pub mod error;
pub mod processing;
pub mod tools;

// 重新导出核心类型
pub use alignment::{AlignmentConfig, AlignmentOutcome, ConsensusTable, align_experiments};
pub use config::PipelineConfig;
pub use core::{Experiment, IntensityMatrix, Peak};
pub use error::{GcmsError, GcmsResult, PipelineWarning};
pub use processing::{SampleReport, run_sample};
