//! 中间结果持久化
//!
//! 实验（`<code>.expr.json`）与强度矩阵（`<code>.im.json`）均以 JSON 存储；
//! serde_json 启用 `float_roundtrip`，保留时间、面积等浮点数逐位还原。

use super::constants::defaults;
use crate::core::{Experiment, IntensityMatrix};
use crate::error::GcmsResult;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// 实验文件路径：`<dir>/<code>.expr.json`
pub fn experiment_path(dir: &Path, code: &str) -> PathBuf {
    dir.join(format!("{code}.{}", defaults::EXPERIMENT_EXTENSION))
}

/// 保存实验，返回写入的文件路径
pub fn save_experiment(experiment: &Experiment, dir: &Path) -> GcmsResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = experiment_path(dir, &experiment.code);
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(&mut writer, experiment)?;
    writer.flush()?;
    log::debug!("实验 '{}' 已保存到 {}", experiment.code, path.display());
    Ok(path)
}

/// 读取实验文件
pub fn load_experiment(path: &Path) -> GcmsResult<Experiment> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// 按样本代码依次读取实验（保持给定顺序）
pub fn load_experiments(dir: &Path, codes: &[String]) -> GcmsResult<Vec<Experiment>> {
    codes
        .iter()
        .map(|code| load_experiment(&experiment_path(dir, code)))
        .collect()
}

/// 读取强度矩阵文档（反序列化时校验形状与保留时间单调性）
pub fn read_matrix(path: &Path) -> GcmsResult<IntensityMatrix> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// 写出强度矩阵文档
pub fn write_matrix(matrix: &IntensityMatrix, path: &Path) -> GcmsResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, matrix)?;
    writer.flush()?;
    Ok(())
}
