use crate::domain::model::Table;
use crate::utils::error::{CrmError, Result};
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const BUNDLE_FILE: &str = "crm_report_bundle.zip";

/// Load 階段產出的單一檔案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub data: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// 將表格輸出為 CSV，缺值寫成空欄位
pub fn table_to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.into_inner().map_err(|e| CrmError::ProcessingError {
        message: format!("CSV buffer error: {}", e),
    })
}

pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_string_pretty(value)?.into_bytes())
}

/// 將所有產出打包成一個 ZIP 檔
pub fn bundle(artifacts: &[Artifact]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for artifact in artifacts {
        zip.start_file::<_, ()>(artifact.name.as_str(), FileOptions::default())?;
        zip.write_all(&artifact.data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
