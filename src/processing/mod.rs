//! 样本处理模块
//!
//! 组合预处理、噪声估计、峰检测与定量，完成单个样本的处理。

pub mod sample_runner;

// 重新导出公共接口
pub use sample_runner::{SampleReport, run_sample};
