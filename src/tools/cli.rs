//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。

use super::constants::{defaults, parallel_limits};
use crate::config::PipelineConfig;
use crate::error::{GcmsError, GcmsResult};
use clap::{Arg, ArgAction, Command, value_parser};
use std::path::{Path, PathBuf};

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 运行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 峰检测 + 对齐 + 导出
    Full,
    /// 仅峰检测，保存实验文件
    DetectOnly,
    /// 跳过峰检测，直接对齐输出目录中已有的实验文件
    AlignOnly,
}

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 强度矩阵文件所在目录
    pub input_dir: PathBuf,

    /// 输出目录（实验文件与 CSV 表），未指定时按参数组合自动生成
    pub output_dir: Option<PathBuf>,

    /// 参数配置文件（JSON，可选）
    pub config_file: Option<PathBuf>,

    /// 并发度覆盖（None 表示使用配置中的 workers）
    pub jobs: Option<usize>,

    /// 强制串行处理
    pub serial: bool,

    /// 递归扫描子目录
    pub recursive: bool,

    pub mode: RunMode,

    /// 是否显示详细信息
    pub verbose: bool,
}

impl AppConfig {
    /// 加载流水线参数：配置文件（若有）+ 命令行并发度覆盖
    pub fn pipeline_config(&self) -> GcmsResult<PipelineConfig> {
        let mut config = match &self.config_file {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(jobs) = self.jobs {
            config.workers = jobs;
        }
        config.validate()?;
        Ok(config)
    }

    /// 输出目录：`<input>/gcms_out_<检测参数前缀>`
    pub fn resolve_output_dir(&self, config: &PipelineConfig) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => default_output_dir(&self.input_dir, config),
        }
    }

    /// 有效并发度（串行模式为1）
    pub fn parallel_degree(&self, config: &PipelineConfig) -> usize {
        if self.serial { 1 } else { config.workers }
    }
}

/// 默认输出目录
pub fn default_output_dir(input_dir: &Path, config: &PipelineConfig) -> PathBuf {
    input_dir.join(format!("gcms_out_{}", config.detection_prefix()))
}

fn build_command() -> Command {
    Command::new("gcms-align")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("GCMS Aligner Team")
        .arg(
            Arg::new("INPUT")
                .help(format!(
                    "包含 *.{} 强度矩阵文件的目录 / Directory of *.{} intensity matrices",
                    defaults::MATRIX_EXTENSION,
                    defaults::MATRIX_EXTENSION
                ))
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("输出目录 / Output directory")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON 参数文件 / JSON parameter file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("jobs")
                .long("jobs")
                .short('j')
                .help(format!(
                    "并发样本数 ({}-{}) / Parallel samples",
                    parallel_limits::MIN_PARALLEL_DEGREE,
                    parallel_limits::MAX_PARALLEL_DEGREE
                ))
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .help("串行处理 / Process samples serially")
                .action(ArgAction::SetTrue)
                .conflicts_with("jobs"),
        )
        .arg(
            Arg::new("recursive")
                .long("recursive")
                .short('r')
                .help("递归扫描子目录 / Scan subdirectories")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("detect-only")
                .long("detect-only")
                .help("只做峰检测 / Only detect peaks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("align-only")
                .long("align-only")
                .help("只对齐已有实验文件 / Only align saved experiments")
                .action(ArgAction::SetTrue)
                .conflicts_with("detect-only"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息 / Verbose output")
                .action(ArgAction::SetTrue),
        )
}

fn config_from_matches(matches: &clap::ArgMatches) -> AppConfig {
    let mode = if matches.get_flag("detect-only") {
        RunMode::DetectOnly
    } else if matches.get_flag("align-only") {
        RunMode::AlignOnly
    } else {
        RunMode::Full
    };

    AppConfig {
        input_dir: matches
            .get_one::<String>("INPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        output_dir: matches.get_one::<String>("output").map(PathBuf::from),
        config_file: matches.get_one::<String>("config").map(PathBuf::from),
        jobs: matches.get_one::<usize>("jobs").copied(),
        serial: matches.get_flag("serial"),
        recursive: matches.get_flag("recursive"),
        mode,
        verbose: matches.get_flag("verbose"),
    }
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> AppConfig {
    config_from_matches(&build_command().get_matches())
}

/// 从给定参数解析（测试与嵌入调用）
pub fn parse_from<I, T>(args: I) -> GcmsResult<AppConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = build_command()
        .try_get_matches_from(args)
        .map_err(|e| GcmsError::InvalidInput(e.to_string()))?;
    Ok(config_from_matches(&matches))
}

/// 显示程序启动信息
pub fn show_startup_info(app: &AppConfig, config: &PipelineConfig) {
    println!("🚀 GCMS Aligner v{VERSION} 启动 / started");
    println!("📝 {DESCRIPTION}");
    println!(
        "🔧 参数 / Parameters: {} (输入 / input: {})",
        config.file_prefix(),
        app.input_dir.display()
    );
    if app.verbose {
        let (lo_mass, hi_mass) = config.mass_range;
        println!("   质量范围 / Mass range: {lo_mass}-{hi_mass}");
        println!(
            "   保留时间范围 / RT range: {}-{}",
            config.rt_range.0, config.rt_range.1
        );
        println!("   运行模式 / Mode: {:?}", app.mode);
    }
    println!();
}

/// 显示程序完成信息
pub fn show_completion_info(app: &AppConfig, output_dir: &Path) {
    println!("✅ 所有任务处理完成 / All tasks completed");
    if app.verbose {
        println!("   输出目录 / Output directory: {}", output_dir.display());
    }
}
