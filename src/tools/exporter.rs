//! 共识表导出
//!
//! 生成四个 CSV 文件：
//! - `<prefix>_aligned_rt.csv`：各样本峰的保留时间（分钟）
//! - `<prefix>_aligned_area.csv`：各样本峰的全离子面积
//! - `<prefix>_area_common_ion.csv`：各样本峰在公共离子上的面积
//! - `<prefix>_aligned_ions.csv`：各样本峰的前N离子面积（JSON 对象）
//!
//! 列为 `UID`、`RT`（行平均保留时间，分钟）以及每个样本一列；缺失单元格写 `NA`。

use super::constants::defaults::MISSING_CELL;
use crate::alignment::ConsensusTable;
use crate::core::Peak;
use crate::error::GcmsResult;
use std::path::{Path, PathBuf};

/// 导出文件路径
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub aligned_rt: PathBuf,
    pub aligned_area: PathBuf,
    pub area_common_ion: PathBuf,
    pub aligned_ions: PathBuf,
}

impl ExportPaths {
    pub fn new(dir: &Path, prefix: &str) -> Self {
        Self {
            aligned_rt: dir.join(format!("{prefix}_aligned_rt.csv")),
            aligned_area: dir.join(format!("{prefix}_aligned_area.csv")),
            area_common_ion: dir.join(format!("{prefix}_area_common_ion.csv")),
            aligned_ions: dir.join(format!("{prefix}_aligned_ions.csv")),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [
            &self.aligned_rt,
            &self.aligned_area,
            &self.area_common_ion,
            &self.aligned_ions,
        ]
    }
}

fn format_minutes(secs: f64) -> String {
    format!("{:.3}", secs / 60.0)
}

fn format_area(area: f64) -> String {
    format!("{area:.4}")
}

fn cell_or_missing(value: Option<String>) -> String {
    value.unwrap_or_else(|| MISSING_CELL.to_string())
}

/// 峰的离子面积映射（质量 → 面积）序列化为 JSON 对象
pub fn ion_areas_json(peak: &Peak) -> GcmsResult<String> {
    let map: serde_json::Map<String, serde_json::Value> = peak
        .ion_areas
        .iter()
        .map(|ia| (format!("{}", ia.mass), serde_json::Value::from(ia.area)))
        .collect();
    Ok(serde_json::to_string(&map)?)
}

/// 按行写出一张表：固定列之后每个样本一列
fn write_table(
    path: &Path,
    table: &ConsensusTable,
    extra_headers: &[&str],
    mut row_fields: impl FnMut(usize) -> GcmsResult<Vec<String>>,
) -> GcmsResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<String> = vec!["UID".into(), "RT".into()];
    header.extend(extra_headers.iter().map(|s| s.to_string()));
    header.extend(table.sample_codes().iter().cloned());
    writer.write_record(&header)?;

    for (index, row) in table.rows().iter().enumerate() {
        let mut record = vec![row.uid.clone(), format_minutes(row.rt)];
        record.extend(row_fields(index)?);
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// 写出保留时间表
pub fn write_aligned_rt(table: &ConsensusTable, path: &Path) -> GcmsResult<()> {
    write_table(path, table, &[], |row| {
        Ok((0..table.n_samples())
            .map(|s| cell_or_missing(table.rt(row, s).map(format_minutes)))
            .collect())
    })
}

/// 写出全离子面积表
pub fn write_aligned_area(table: &ConsensusTable, path: &Path) -> GcmsResult<()> {
    write_table(path, table, &[], |row| {
        Ok((0..table.n_samples())
            .map(|s| cell_or_missing(table.area(row, s).map(format_area)))
            .collect())
    })
}

/// 写出公共离子面积表（附加 `CommonIon` 列）
pub fn write_common_ion_area(table: &ConsensusTable, path: &Path) -> GcmsResult<()> {
    write_table(path, table, &["CommonIon"], |row| {
        let ion = cell_or_missing(table.common_ion(row).map(|m| format!("{m}")));
        let mut fields = vec![ion];
        fields.extend(
            (0..table.n_samples())
                .map(|s| cell_or_missing(table.common_ion_area(row, s).map(format_area))),
        );
        Ok(fields)
    })
}

/// 写出前N离子面积表
pub fn write_aligned_ions(table: &ConsensusTable, path: &Path) -> GcmsResult<()> {
    write_table(path, table, &[], |row| {
        (0..table.n_samples())
            .map(|s| match table.peak(row, s) {
                Some(peak) => ion_areas_json(peak),
                None => Ok(MISSING_CELL.to_string()),
            })
            .collect()
    })
}

/// 导出全部四张表
pub fn export_consensus(
    table: &ConsensusTable,
    dir: &Path,
    prefix: &str,
) -> GcmsResult<ExportPaths> {
    std::fs::create_dir_all(dir)?;
    let paths = ExportPaths::new(dir, prefix);
    write_aligned_rt(table, &paths.aligned_rt)?;
    write_aligned_area(table, &paths.aligned_area)?;
    write_common_ion_area(table, &paths.area_common_ion)?;
    write_aligned_ions(table, &paths.aligned_ions)?;
    log::info!(
        "共识表已导出: {} 行 × {} 样本 -> {}",
        table.n_rows(),
        table.n_samples(),
        dir.display()
    );
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IonArea, MassSpectrum};

    #[test]
    fn test_ion_areas_json() {
        let mut peak = Peak::new(0, 0.0, MassSpectrum::new(vec![73.0], vec![1.0]));
        peak.ion_areas = vec![
            IonArea {
                mass: 73.0,
                area: 10.5,
            },
            IonArea {
                mass: 147.0,
                area: 2.0,
            },
        ];
        let json = ion_areas_json(&peak).unwrap();
        let back: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back["73"], 10.5);
        assert_eq!(back["147"], 2.0);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_minutes(645.0), "10.750");
        assert_eq!(cell_or_missing(None), "NA");
    }
}
