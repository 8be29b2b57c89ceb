//! Batch scan report export.

use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::api::FaceRecord;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

/// Scan outcome for one image in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub path: String,
    #[serde(rename = "faceNum")]
    pub face_num: usize,
    pub faces: Vec<FaceRecord>,
}

/// Flat per-face row used for CSV output.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    path: &'a str,
    face: usize,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    score: f32,
}

/// Write a batch report to `output_path` in the given format.
pub fn export_report(reports: &[ImageReport], output_path: &Path, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => export_json(reports, output_path),
        ReportFormat::Csv => export_csv(reports, output_path),
    }
}

fn export_json(reports: &[ImageReport], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    let mut file = File::create(output_path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// One CSV row per face; images without faces contribute no rows.
fn export_csv(reports: &[ImageReport], output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)?;

    for report in reports {
        for (face_index, record) in report.faces.iter().enumerate() {
            writer.serialize(CsvRow {
                path: &report.path,
                face: face_index,
                x1: record.x1,
                y1: record.y1,
                x2: record.x2,
                y2: record.y2,
                score: record.score,
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}
