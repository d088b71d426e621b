//! 工具层集成测试
//!
//! 测试文件扫描、批处理（串行/并行）、持久化与共识表导出的端到端流程。

mod gcms_test_fixtures;

use gcms_aligner::alignment::{AlignmentConfig, align_experiments};
use gcms_aligner::tools::{self, RunMode};
use gcms_aligner::PipelineConfig;
use gcms_test_fixtures::{SyntheticRun, standard_compounds};
use std::path::{Path, PathBuf};

/// 在目录中写出若干合成样本，返回文件路径
fn write_samples(dir: &Path, seeds: &[u64]) -> Vec<PathBuf> {
    seeds
        .iter()
        .enumerate()
        .map(|(i, &seed)| {
            let path = dir.join(format!("sample{:02}.im.json", i + 1));
            let matrix = SyntheticRun::standard(standard_compounds(), seed).build();
            tools::write_matrix(&matrix, &path).unwrap();
            path
        })
        .collect()
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

// ============================================================================
// 扫描与批处理
// ============================================================================

/// 串行与并行批处理结果一致，单个损坏文件不影响其他样本
#[test]
fn test_serial_and_parallel_batches_agree() {
    let input = tempfile::tempdir().unwrap();
    write_samples(input.path(), &[1, 7, 42]);
    std::fs::write(input.path().join("broken.im.json"), "{ not json").unwrap();

    let files = tools::scan_matrix_files(input.path(), false).unwrap();
    assert_eq!(files.len(), 4);
    tools::check_unique_codes(&files).unwrap();

    let config = PipelineConfig::default();
    let serial_out = tempfile::tempdir().unwrap();
    let parallel_out = tempfile::tempdir().unwrap();

    let serial = tools::process_batch_serial(&files, &config, serial_out.path(), false);
    let parallel =
        tools::process_batch_parallel(&files, &config, parallel_out.path(), 3, false).unwrap();

    for batch in [&serial, &parallel] {
        assert_eq!(batch.stats.processed, 3);
        assert_eq!(batch.stats.failed, 1);
        assert_eq!(batch.succeeded_codes(), vec!["sample01", "sample02", "sample03"]);
        assert_eq!(batch.outcomes[0].code, "broken");
    }

    let serial_peaks: Vec<usize> = serial.reports().map(|r| r.final_peaks).collect();
    let parallel_peaks: Vec<usize> = parallel.reports().map(|r| r.final_peaks).collect();
    assert_eq!(serial_peaks, parallel_peaks);
    assert_eq!(serial_peaks, vec![4, 4, 4]);

    // 两种模式写出的实验文件完全一致
    for code in serial.succeeded_codes() {
        let a = tools::load_experiment(&serial_out.path().join(format!("{code}.expr.json"))).unwrap();
        let b =
            tools::load_experiment(&parallel_out.path().join(format!("{code}.expr.json"))).unwrap();
        assert_eq!(a, b);
    }
    println!("  ✓ 串行与并行结果一致");
}

/// 流水线产生的实验经保存/读取后逐位还原
#[test]
fn test_experiment_roundtrip_after_detection() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_samples(dir.path(), &[99]);
    let report =
        tools::process_sample_file(&files[0], &PipelineConfig::default(), dir.path()).unwrap();
    assert_eq!(report.code, "sample01");

    let path = dir.path().join("sample01.expr.json");
    let loaded = tools::load_experiment(&path).unwrap();
    tools::save_experiment(&loaded, dir.path()).unwrap();
    let reloaded = tools::load_experiment(&path).unwrap();

    assert_eq!(loaded, reloaded);
    assert_eq!(loaded.len(), report.final_peaks);
    for (a, b) in loaded.peaks.iter().zip(&reloaded.peaks) {
        assert_eq!(a.rt.to_bits(), b.rt.to_bits());
        assert_eq!(a.area.to_bits(), b.area.to_bits());
        assert_eq!(a.ion_areas, b.ion_areas);
    }
}

// ============================================================================
// 对齐与导出
// ============================================================================

/// 检测 → 对齐 → 导出四张 CSV 表
#[test]
fn test_detect_align_export_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_samples(dir.path(), &[3, 5, 11]);
    let config = PipelineConfig {
        alignment: AlignmentConfig {
            min_occurrence: 2,
            ..AlignmentConfig::default()
        },
        ..PipelineConfig::default()
    };

    let out = dir.path().join("out");
    let batch = tools::process_batch_serial(&files, &config, &out, false);
    let codes = batch.succeeded_codes();
    let experiments = tools::load_experiments(&out, &codes).unwrap();
    let outcome = align_experiments(&experiments, &config.alignment).unwrap();

    let table = &outcome.table;
    assert_eq!(table.n_rows(), 4);
    assert_eq!(table.n_samples(), 3);
    for row in table.rows() {
        assert_eq!(row.occurrences(), 3);
        assert!(row.common_ion.is_some());
    }

    let prefix = config.file_prefix();
    assert_eq!(prefix, "com2w9s3r5i3n2d1.1g0.35");
    let paths = tools::export_consensus(table, &out, &prefix).unwrap();
    for path in paths.all() {
        assert!(path.exists(), "缺少输出文件 {}", path.display());
    }

    let (header, rows) = read_csv(&paths.aligned_rt);
    assert_eq!(header, vec!["UID", "RT", "sample01", "sample02", "sample03"]);
    assert_eq!(rows.len(), 4);
    let minutes: Vec<&str> = rows.iter().map(|r| r[1].as_str()).collect();
    assert_eq!(minutes, vec!["4.000", "5.000", "7.000", "9.333"]);
    assert!(rows.iter().all(|r| r[2..].iter().all(|c| c != "NA")));

    let (header, rows) = read_csv(&paths.aligned_area);
    assert_eq!(header.len(), 5);
    for row in &rows {
        for cell in &row[2..] {
            assert!(cell.parse::<f64>().unwrap() > 0.0);
        }
    }

    let (header, rows) = read_csv(&paths.area_common_ion);
    assert_eq!(header[2], "CommonIon");
    assert_eq!(header.len(), 6);
    for row in &rows {
        assert!(row[2].parse::<f64>().is_ok());
    }

    let (_, rows) = read_csv(&paths.aligned_ions);
    let ions: serde_json::Value = serde_json::from_str(&rows[0][2]).unwrap();
    assert!(ions.as_object().is_some_and(|m| !m.is_empty()));
    println!("  ✓ 四张共识表导出完成");
}

/// 运行摘要包含参数前缀与输出文件
#[test]
fn test_run_summary_written() {
    let dir = tempfile::tempdir().unwrap();
    let experiments = vec![gcms_test_fixtures::experiment("only", &[(300.0, [1.0, 2.0, 3.0])])];
    let config = PipelineConfig::default();
    let outcome = align_experiments(&experiments, &config.alignment).unwrap();
    let paths = tools::export_consensus(&outcome.table, dir.path(), &config.file_prefix()).unwrap();

    let summary = tools::create_run_summary(&config, None, &outcome, &paths);
    let path = dir.path().join("summary.txt");
    tools::write_output(&path, &summary).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("com10w9s3r5i3n2d1.1g0.35"));
    assert!(text.contains("_aligned_area.csv"));
}

// ============================================================================
// CLI配置测试
// ============================================================================

/// 仅对齐模式与默认输出目录
#[test]
fn test_cli_align_only_mode() {
    let app = tools::cli::parse_from(["gcms-align", "data", "--align-only", "--serial"]).unwrap();
    assert_eq!(app.mode, RunMode::AlignOnly);
    let config = app.pipeline_config().unwrap();
    assert_eq!(app.parallel_degree(&config), 1);
    assert_eq!(
        app.resolve_output_dir(&config),
        Path::new("data").join("gcms_out_w9s3r5i3n2")
    );
}
