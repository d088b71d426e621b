//! 输出格式化模块
//!
//! 负责样本峰检测报告、批处理统计与对齐结果的终端表格输出，
//! 以及运行摘要文件的生成。

use super::batch_state::BatchStatsSnapshot;
use super::exporter::ExportPaths;
use crate::alignment::AlignmentOutcome;
use crate::config::PipelineConfig;
use crate::error::GcmsResult;
use crate::processing::SampleReport;
use chrono::Local;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use std::path::Path;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn right(text: impl ToString) -> Cell {
    Cell::new(text.to_string()).set_alignment(CellAlignment::Right)
}

/// 样本峰检测汇总表
pub fn sample_summary_table<'a>(reports: impl IntoIterator<Item = &'a SampleReport>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Sample / 样本",
        "Scans / 扫描",
        "Channels / 通道",
        "Noise / 噪声",
        "Initial / 初始峰",
        "Detected / 检测峰",
        "Final / 最终峰",
        "Time (s) / 耗时",
    ]);

    for report in reports {
        table.add_row(vec![
            Cell::new(&report.code),
            right(report.n_scans),
            right(report.n_channels),
            right(format!("{:.2}", report.noise_level)),
            right(report.initial_peaks),
            right(report.detected_peaks),
            right(report.final_peaks),
            right(format!("{:.3}", report.elapsed.as_secs_f64())),
        ]);
    }
    table
}

/// 批处理统计文本
pub fn format_batch_stats(stats: &BatchStatsSnapshot) -> String {
    let mut text = format!(
        "📊 峰检测统计 / Detection: {} 成功 / succeeded, {} 失败 / failed ({:.1}%)\n",
        stats.processed,
        stats.failed,
        stats.success_rate()
    );
    for (category, samples) in stats.sorted_failures() {
        text.push_str(&format!(
            "   [{}] {} 个 / samples: {}\n",
            category.display_name(),
            samples.len(),
            samples.join(", ")
        ));
    }
    text
}

/// 对齐结果汇总表
pub fn alignment_summary_table(outcome: &AlignmentOutcome) -> Table {
    let table_data = &outcome.table;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Sample / 样本", "Aligned peaks / 对齐峰", "Coverage / 覆盖率"]);

    let n_rows = table_data.n_rows();
    for (sample, code) in table_data.sample_codes().iter().enumerate() {
        let present = (0..n_rows)
            .filter(|&row| table_data.peak(row, sample).is_some())
            .count();
        let coverage = if n_rows == 0 {
            0.0
        } else {
            present as f64 / n_rows as f64 * 100.0
        };
        table.add_row(vec![
            Cell::new(code),
            right(present),
            right(format!("{coverage:.1}%")),
        ]);
    }
    table
}

/// 运行摘要（写入 `<prefix>_summary.txt`）
pub fn create_run_summary(
    config: &PipelineConfig,
    stats: Option<&BatchStatsSnapshot>,
    outcome: &AlignmentOutcome,
    paths: &ExportPaths,
) -> String {
    let mut text = String::new();
    text.push_str(&format!("GCMS Aligner v{VERSION}\n"));
    text.push_str(&format!(
        "时间 / Timestamp: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    text.push_str(&format!("参数 / Parameters: {}\n", config.file_prefix()));
    text.push_str(&format!(
        "质量范围 / Mass range: {}-{}, 保留时间 / RT range: {}-{}\n",
        config.mass_range.0, config.mass_range.1, config.rt_range.0, config.rt_range.1
    ));
    text.push_str(&"=".repeat(60));
    text.push('\n');

    if let Some(stats) = stats {
        text.push_str(&format_batch_stats(stats));
    }
    text.push_str(&format!(
        "对齐 / Alignment: {} 行 / rows × {} 样本 / samples, {} 行被过滤 / rows filtered (min_occurrence = {})\n",
        outcome.table.n_rows(),
        outcome.table.n_samples(),
        outcome.filtered_rows,
        config.alignment.min_occurrence
    ));
    if let Some(tree) = &outcome.tree
        && let Some(root) = tree.nodes().last()
    {
        text.push_str(&format!("引导树高度 / Guide tree height: {:.4}\n", root.height));
    }
    for warning in &outcome.warnings {
        text.push_str(&format!("[WARNING] {warning}\n"));
    }

    text.push_str("\n输出文件 / Output files:\n");
    for path in paths.all() {
        text.push_str(&format!("  {}\n", path.display()));
    }
    text
}

/// 写出文本摘要
pub fn write_output(path: &Path, content: &str) -> GcmsResult<()> {
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::align_experiments;
    use crate::core::{Experiment, MassSpectrum, Peak};
    use std::time::Duration;

    fn report(code: &str) -> SampleReport {
        SampleReport {
            code: code.into(),
            n_scans: 100,
            n_channels: 10,
            noise_level: 1.5,
            initial_peaks: 7,
            detected_peaks: 5,
            final_peaks: 4,
            elapsed: Duration::from_millis(20),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_sample_table_has_row_per_report() {
        let reports = [report("a"), report("b")];
        let rendered = sample_summary_table(&reports).to_string();
        assert!(rendered.contains("a"));
        assert!(rendered.contains("b"));
        assert!(rendered.contains("1.50"));
    }

    #[test]
    fn test_run_summary_mentions_rows_and_files() {
        let peak = Peak::new(3, 300.0, MassSpectrum::new(vec![73.0], vec![10.0]));
        let experiments = vec![Experiment::new("only", vec![peak])];
        let outcome = align_experiments(&experiments, &Default::default()).unwrap();
        let paths = ExportPaths::new(Path::new("out"), "prefix");
        let text = create_run_summary(&PipelineConfig::default(), None, &outcome, &paths);
        assert!(text.contains("1 行 / rows"));
        assert!(text.contains("prefix_aligned_rt.csv"));
        assert!(text.contains("[WARNING]"));
    }
}
