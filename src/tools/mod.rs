//! 工具模块集合
//!
//! 包含CLI、文件扫描、批处理、持久化、导出与格式化等工具模块，支持main.rs的流程控制。

pub mod batch_state;
pub mod cli;
pub mod constants;
pub mod exporter;
pub mod formatter;
pub mod parallel_processor;
pub mod persistence;
pub mod processor;
pub mod scanner;
pub mod utils;

// 重新导出主要的公共接口
pub use batch_state::{BatchStatsSnapshot, ParallelBatchStats, SerialBatchStats};
pub use cli::{AppConfig, RunMode, parse_args, show_completion_info, show_startup_info};
pub use exporter::{ExportPaths, export_consensus};
pub use formatter::{
    alignment_summary_table, create_run_summary, format_batch_stats, sample_summary_table,
    write_output,
};
pub use parallel_processor::process_batch_parallel;
pub use persistence::{load_experiment, load_experiments, read_matrix, save_experiment, write_matrix};
pub use processor::{
    BatchOutcome, SampleOutcome, check_unique_codes, process_batch_serial, process_sample_file,
};
pub use scanner::{scan_matrix_files, show_scan_results};
pub use utils::path;
