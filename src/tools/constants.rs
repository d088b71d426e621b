//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 预处理（平滑、基线校正、噪声估计）常量
pub mod preprocessing {
    /// Savitzky-Golay 窗口点数
    pub const SG_WINDOW: usize = 7;

    /// Savitzky-Golay 多项式阶数
    pub const SG_DEGREE: usize = 2;

    /// 质量通道平滑遍数
    ///
    /// 流水线对每个通道连续平滑两次，峰形略钝但噪声明显降低
    pub const SMOOTHING_PASSES: usize = 2;

    /// TIC 平滑遍数（仅用于噪声估计）
    pub const TIC_SMOOTHING_PASSES: usize = 1;

    /// 顶帽结构元素时间宽度（秒），即 "1.5m"
    pub const TOPHAT_STRUCT_SECS: f64 = 90.0;

    /// 噪声估计窗口点数
    pub const NOISE_WINDOW_POINTS: usize = 256;
}

/// 峰检测与定量常量
pub mod detection {
    /// 局部极大值窗口宽度（扫描数）
    pub const WINDOW: usize = 9;

    /// 跨通道合并窗口宽度（扫描数）
    pub const SCANS: usize = 3;

    /// 相对强度阈值（%）
    pub const REL_THRESHOLD_PERCENT: f64 = 5.0;

    /// 高于噪声截断值的最少离子数
    pub const MIN_IONS: usize = 3;

    /// 噪声倍数
    pub const NOISE_MULTIPLIER: f64 = 2.0;

    /// 记录面积的最强离子数
    pub const TOP_IONS: usize = 5;
}

/// 动态规划对齐常量
pub mod alignment {
    /// 样本内（叶节点之间）保留时间容差（秒）
    pub const DW: f64 = 1.1;

    /// 样本内空位罚分
    pub const GW: f64 = 0.35;

    /// 样本间（聚合节点）保留时间容差（秒）
    pub const DB: f64 = 1.0;

    /// 样本间空位罚分
    pub const GB: f64 = 0.30;

    /// 最终表中每行至少出现的样本数
    pub const MIN_OCCURRENCE: usize = 10;

    /// 代价比较容差：差值小于该值视为相等，进入平局规则
    pub const COST_EPSILON: f64 = 1e-12;
}

/// 质量与保留时间范围默认值
pub mod ranges {
    /// 质量下限
    pub const LO_MASS: f64 = 40.0;

    /// 质量上限
    pub const HI_MASS: f64 = 340.0;

    /// 保留时间下限，"3m"
    pub const LO_RT: &str = "3m";

    /// 保留时间上限，"10.75m"
    pub const HI_RT: &str = "10.75m";
}

/// 默认配置值
pub mod defaults {
    /// 默认多样本并行并发度
    ///
    /// 峰检测按样本并行，8个工作线程与原流程的进程池规模一致
    pub const PARALLEL_SAMPLES_DEGREE: usize = 8;

    /// 中间结果文件扩展名
    pub const EXPERIMENT_EXTENSION: &str = "expr.json";

    /// 强度矩阵输入文件扩展名
    pub const MATRIX_EXTENSION: &str = "im.json";

    /// 缺失单元格占位符
    pub const MISSING_CELL: &str = "NA";
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    ///
    /// 任何并行处理至少需要1个线程/工作单元
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    ///
    /// 限制最大并发度为16，避免过度并发导致的：
    /// - 上下文切换开销
    /// - 内存占用过高
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}
