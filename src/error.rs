//! 统一错误处理框架
//!
//! 峰检测与对齐流水线的错误类型定义，以及非致命的流水线预警。

use std::fmt;
use std::io;

/// GC-MS 处理相关的统一错误类型
#[derive(Debug)]
pub enum GcmsError {
    /// 输入验证错误（矩阵形状、保留时间非递增等）
    InvalidInput(String),

    /// 文件I/O错误
    IoError(io::Error),

    /// 中间结果序列化/反序列化错误
    SerializationError(String),

    /// 数据长度不足（色谱短于平滑窗口等）
    InsufficientData(String),

    /// 参数配置错误，在任何数值计算之前快速失败
    ConfigurationError(String),

    /// 计算异常
    CalculationError(String),

    /// 对齐失败（对整次运行是致命的）
    AlignmentError(String),

    /// 资源访问错误（线程池等）
    ResourceError(String),
}

impl fmt::Display for GcmsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcmsError::InvalidInput(msg) => write!(f, "输入验证失败: {msg}"),
            GcmsError::IoError(err) => write!(f, "文件I/O错误: {err}"),
            GcmsError::SerializationError(msg) => write!(f, "序列化错误: {msg}"),
            GcmsError::InsufficientData(msg) => write!(f, "数据不足: {msg}"),
            GcmsError::ConfigurationError(msg) => write!(f, "参数配置错误: {msg}"),
            GcmsError::CalculationError(msg) => write!(f, "计算异常: {msg}"),
            GcmsError::AlignmentError(msg) => write!(f, "对齐失败: {msg}"),
            GcmsError::ResourceError(msg) => write!(f, "资源访问错误: {msg}"),
        }
    }
}

impl std::error::Error for GcmsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GcmsError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for GcmsError {
    fn from(err: io::Error) -> Self {
        GcmsError::IoError(err)
    }
}

impl From<serde_json::Error> for GcmsError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            GcmsError::IoError(err.into())
        } else {
            GcmsError::SerializationError(err.to_string())
        }
    }
}

impl From<csv::Error> for GcmsError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io_err) => GcmsError::IoError(io_err),
                other => GcmsError::SerializationError(format!("{other:?}")),
            }
        } else {
            GcmsError::SerializationError(format!("CSV写入错误: {err}"))
        }
    }
}

/// 流水线操作的标准Result类型
pub type GcmsResult<T> = Result<T, GcmsError>;

// ==================== 错误转换Helper函数 ====================

/// 创建配置错误的helper函数
#[inline]
pub fn configuration_error<E: fmt::Display>(context: &str, err: E) -> GcmsError {
    GcmsError::ConfigurationError(format!("{context}: {err}"))
}

/// 创建数据不足错误的helper函数
#[inline]
pub fn insufficient_data<E: fmt::Display>(context: &str, err: E) -> GcmsError {
    GcmsError::InsufficientData(format!("{context}: {err}"))
}

/// 创建计算错误的helper函数
#[inline]
pub fn calculation_error<E: fmt::Display>(context: &str, err: E) -> GcmsError {
    GcmsError::CalculationError(format!("{context}: {err}"))
}

// ==================== 非致命预警 ====================

/// 流水线预警：不中断处理，以空结构或回退路径继续
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    /// 样本或成对对齐没有产生任何峰/匹配
    EmptyResult {
        /// 样本代码或对齐节点描述
        context: String,
    },
    /// 退化对齐（单样本或全空位），走显式回退路径
    DegenerateAlignment {
        /// 退化原因
        reason: String,
    },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::EmptyResult { context } => write!(f, "空结果: {context}"),
            PipelineWarning::DegenerateAlignment { reason } => write!(f, "退化对齐: {reason}"),
        }
    }
}

// ==================== 错误分类系统 ====================
// 用于批量处理中的错误统计和CLI退出码映射

/// 错误类别枚举（用于批量处理统计）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub enum ErrorCategory {
    /// 输入/格式相关错误
    Input,
    /// I/O与序列化相关错误
    Io,
    /// 配置相关错误
    Configuration,
    /// 计算相关错误（数据不足、数值异常、对齐失败）
    Calculation,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从GcmsError提取错误类别
    pub fn from_gcms_error(e: &GcmsError) -> Self {
        match e {
            GcmsError::InvalidInput(_) => Self::Input,
            GcmsError::IoError(_) | GcmsError::SerializationError(_) => Self::Io,
            GcmsError::ConfigurationError(_) => Self::Configuration,
            GcmsError::InsufficientData(_)
            | GcmsError::CalculationError(_)
            | GcmsError::AlignmentError(_) => Self::Calculation,
            GcmsError::ResourceError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Input => "输入错误",
            Self::Io => "I/O错误",
            Self::Configuration => "配置错误",
            Self::Calculation => "计算错误",
            Self::Other => "其他错误",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_constructors_prefix_context() {
        let err = insufficient_data("noise", "TIC为空");
        assert!(matches!(&err, GcmsError::InsufficientData(msg) if msg == "noise: TIC为空"));
        let err = calculation_error("Savitzky-Golay", "正规方程奇异");
        assert!(matches!(&err, GcmsError::CalculationError(msg) if msg.starts_with("Savitzky-Golay: ")));
        assert_eq!(ErrorCategory::from_gcms_error(&err), ErrorCategory::Calculation);
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            ErrorCategory::from_gcms_error(&GcmsError::InsufficientData("x".into())),
            ErrorCategory::Calculation
        );
        assert_eq!(
            ErrorCategory::from_gcms_error(&GcmsError::SerializationError("x".into())),
            ErrorCategory::Io
        );
        assert_eq!(
            ErrorCategory::from_gcms_error(&configuration_error("window", "must be odd")),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err: GcmsError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let bad: Result<Vec<f64>, _> = serde_json::from_str("[1.0, oops]");
        let err: GcmsError = bad.unwrap_err().into();
        assert!(matches!(err, GcmsError::SerializationError(_)));
    }
}
