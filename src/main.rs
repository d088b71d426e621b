//! GCMS Aligner - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成峰检测、对齐与导出任务。

use gcms_aligner::{
    PipelineConfig, align_experiments,
    error::{ErrorCategory, GcmsError},
    tools::{self, AppConfig, BatchOutcome, RunMode},
};
use std::path::{Path, PathBuf};
use std::process;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 输入错误
    pub const INPUT_ERROR: i32 = 2;
    /// 配置错误
    pub const CONFIGURATION_ERROR: i32 = 3;
    /// 计算/对齐错误
    pub const CALCULATION_ERROR: i32 = 4;
    /// 资源/并发错误
    pub const RESOURCE_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &GcmsError) -> &'static str {
    match error {
        GcmsError::InvalidInput(_) => {
            "检查命令行参数与输入文件是否正确，使用 --help 查看完整用法 / Check arguments and input files, use --help to see full usage"
        }
        GcmsError::ResourceError(_) => {
            "资源不可用，尝试 --serial 串行模式或降低并发度 / Resource unavailable, try --serial or reduce --jobs"
        }
        GcmsError::AlignmentError(_) => {
            "确认至少有一个样本峰检测成功 / Make sure at least one sample was detected successfully"
        }
        _ => match ErrorCategory::from_gcms_error(error) {
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读写 / Check that paths exist and are readable/writable"
            }
            ErrorCategory::Configuration => {
                "检查参数文件中的窗口、范围与罚分设置 / Check windows, ranges and penalties in the parameter file"
            }
            ErrorCategory::Calculation => {
                "色谱可能过短或数据无效，请检查强度矩阵 / Chromatogram may be too short or invalid, check the intensity matrix"
            }
            ErrorCategory::Input | ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input files and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: GcmsError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    let exit_code = match &error {
        GcmsError::ResourceError(_) => exit_codes::RESOURCE_ERROR,
        _ => match ErrorCategory::from_gcms_error(&error) {
            ErrorCategory::Input => exit_codes::INPUT_ERROR,
            ErrorCategory::Configuration => exit_codes::CONFIGURATION_ERROR,
            ErrorCategory::Calculation => exit_codes::CALCULATION_ERROR,
            ErrorCategory::Io | ErrorCategory::Other => exit_codes::GENERAL_ERROR,
        },
    };

    process::exit(exit_code);
}

/// 峰检测阶段：按并发度选择串行或并行
fn detect_batch(
    app: &AppConfig,
    config: &PipelineConfig,
    files: &[PathBuf],
    out_dir: &Path,
) -> BatchOutcome {
    let degree = tools::utils::effective_parallel_degree(
        app.parallel_degree(config),
        Some(files.len()),
    );

    if degree == 1 {
        if app.verbose {
            println!("[INFO] 并发度为1，使用串行模式 / Parallelism=1, using serial mode");
        }
        return tools::process_batch_serial(files, config, out_dir, app.verbose);
    }

    // 尝试并行处理，失败则降级串行
    tools::process_batch_parallel(files, config, out_dir, degree, app.verbose).unwrap_or_else(|e| {
        eprintln!("[WARNING] 并行处理失败 / Parallel processing failed: {e}，回退到串行模式 / fallback to serial");
        tools::process_batch_serial(files, config, out_dir, app.verbose)
    })
}

/// 对齐阶段：读取实验 → 渐进式对齐 → 导出共识表
fn align_and_export(
    config: &PipelineConfig,
    codes: &[String],
    out_dir: &Path,
    batch: Option<&BatchOutcome>,
) -> Result<(), GcmsError> {
    let experiments = tools::load_experiments(out_dir, codes)?;
    println!(
        "🔗 对齐 {} 个样本 / Aligning {} samples...",
        experiments.len(),
        experiments.len()
    );

    let outcome = align_experiments(&experiments, &config.alignment)?;
    for warning in &outcome.warnings {
        println!("[WARNING] {warning}");
    }

    let prefix = config.file_prefix();
    let paths = tools::export_consensus(&outcome.table, out_dir, &prefix)?;
    println!("{}", tools::alignment_summary_table(&outcome));

    let summary =
        tools::create_run_summary(config, batch.map(|b| &b.stats), &outcome, &paths);
    tools::write_output(&out_dir.join(format!("{prefix}_summary.txt")), &summary)?;

    println!(
        "📄 共识表 / Consensus table: {} 行 / rows → {}",
        outcome.table.n_rows(),
        paths.aligned_rt.display()
    );
    Ok(())
}

/// 应用程序主逻辑（便于测试和复用）
fn run() -> Result<(), GcmsError> {
    // 1. 解析命令行参数与流水线配置
    let app = tools::parse_args();
    let config = app.pipeline_config()?;
    let out_dir = app.resolve_output_dir(&config);

    // 2. 显示启动信息
    tools::show_startup_info(&app, &config);

    // 3. 扫描强度矩阵文件
    let files = tools::scan_matrix_files(&app.input_dir, app.recursive)?;
    tools::show_scan_results(&app.input_dir, &files, app.verbose);
    if files.is_empty() {
        return Ok(());
    }
    tools::check_unique_codes(&files)?;

    // 4. 按模式执行
    match app.mode {
        RunMode::AlignOnly => {
            let codes: Vec<String> = files.iter().map(|f| tools::utils::sample_code(f)).collect();
            align_and_export(&config, &codes, &out_dir, None)?;
        }
        RunMode::DetectOnly | RunMode::Full => {
            let batch = detect_batch(&app, &config, &files, &out_dir);
            println!("{}", tools::sample_summary_table(batch.reports()));
            print!("{}", tools::format_batch_stats(&batch.stats));

            if app.mode == RunMode::Full {
                align_and_export(&config, &batch.succeeded_codes(), &out_dir, Some(&batch))?;
            }
        }
    }

    tools::show_completion_info(&app, &out_dir);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // 可选：CPU火焰图分析（需开启 feature: flame-prof 且设置 GCMS_FLAME=1）
    #[cfg(feature = "flame-prof")]
    let _guard = {
        let enabled = std::env::var("GCMS_FLAME").map(|v| v == "1").unwrap_or(false);
        if enabled {
            // 采样频率：每秒 250 次
            match pprof::ProfilerGuard::new(250) {
                Ok(g) => Some(g),
                Err(e) => {
                    eprintln!(
                        "[WARNING] 启用火焰图采样失败 / Failed to enable flame graph sampling: {e}"
                    );
                    None
                }
            }
        } else {
            None
        }
    };

    // 执行主逻辑，统一处理错误
    let result = run();

    // 在退出前生成火焰图（仅在启用时）
    #[cfg(feature = "flame-prof")]
    if let Some(guard) = _guard
        && let Ok(report) = guard.report().build()
    {
        use std::fs::File;
        let mut options = pprof::flamegraph::Options::default();
        let out_path =
            std::env::var("GCMS_FLAME_FILE").unwrap_or_else(|_| "flamegraph.svg".to_string());
        if let Ok(file) = File::create(&out_path)
            && report.flamegraph_with_options(file, &mut options).is_ok()
        {
            eprintln!("FlameGraph generated successfully / 生成成功: {out_path}");
        }
    }

    if let Err(error) = result {
        handle_error(error);
    }
}
