//! 核心算法模块
//!
//! 包含强度矩阵、峰数据结构，以及预处理、噪声估计、峰检测和峰定量的算法实现。

pub mod matrix;
pub mod noise;
pub mod peak;
pub mod peak_detection;
pub mod quantification;
pub mod smoothing;

// 重新导出公共接口
pub use matrix::{IntensityMatrix, IonChromatogram};
pub use noise::{NoiseConfig, estimate_noise};
pub use peak::{Experiment, IonArea, MassSpectrum, Peak};
pub use peak_detection::{DetectionConfig, DetectionOutcome, detect_peaks};
pub use quantification::{QuantConfig, quantify};
pub use smoothing::{SmoothingConfig, preprocess_matrix, preprocess_tic};
