use crate::domain::model::{Cell, Table};
use crate::utils::error::{CrmError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;

pub const SUPPORTED_EXTENSIONS: [&str; 8] = ["csv", "tsv", "tab", "txt", "xlsx", "xlsm", "xls", "ods"];

/// 除空白儲存格外，視為缺值的字串
pub const DEFAULT_NA_VALUES: [&str; 10] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited(u8),
    /// 純文字檔：標頭含 tab 時以 tab 分隔
    Sniffed,
    Spreadsheet,
}

impl InputFormat {
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(InputFormat::Delimited(b',')),
            "tsv" | "tab" => Ok(InputFormat::Delimited(b'\t')),
            "txt" => Ok(InputFormat::Sniffed),
            "xlsx" | "xls" | "xlsm" | "ods" => Ok(InputFormat::Spreadsheet),
            _ => Err(CrmError::UnsupportedFormat { extension }),
        }
    }
}

/// 讀取輸入表格的選項
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub na_values: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            na_values: DEFAULT_NA_VALUES.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl LoadOptions {
    fn to_cell(&self, raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() || self.na_values.iter().any(|na| na == trimmed) {
            None
        } else {
            Some(raw.to_string())
        }
    }
}

pub fn load_table(data: &[u8], path: &str, options: &LoadOptions) -> Result<Table> {
    let table = match InputFormat::from_path(path)? {
        InputFormat::Delimited(delimiter) => read_delimited(data, delimiter, options)?,
        InputFormat::Sniffed => {
            let header_line = data.split(|&b| b == b'\n').next().unwrap_or_default();
            let delimiter = if header_line.contains(&b'\t') { b'\t' } else { b',' };
            read_delimited(data, delimiter, options)?
        }
        InputFormat::Spreadsheet => read_spreadsheet(data, options)?,
    };

    if table.columns.is_empty() {
        return Err(CrmError::EmptyInput {
            path: path.to_string(),
        });
    }

    tracing::info!(
        "📥 Loaded {} rows × {} columns from {}",
        table.row_count(),
        table.column_count(),
        path
    );
    Ok(table)
}

fn read_delimited(data: &[u8], delimiter: u8, options: &LoadOptions) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data);

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    // 標頭全為空白代表檔案是空的
    if columns.iter().all(|c| c.trim().is_empty()) {
        return Ok(Table::default());
    }

    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(|field| options.to_cell(field)).collect());
    }
    Ok(table)
}

fn read_spreadsheet(data: &[u8], options: &LoadOptions) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Table::default()),
    };

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };

    let mut table = Table::new(header.iter().map(data_to_string).collect());
    for row in rows {
        table.push_row(
            row.iter()
                .map(|value| match value {
                    Data::Empty => None,
                    other => options.to_cell(&data_to_string(other)),
                })
                .collect(),
        );
    }
    Ok(table)
}

fn data_to_string(value: &Data) -> String {
    match value {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_xlsx_first_sheet() {
        use rust_xlsxwriter::{Format, Workbook};

        let mut workbook = Workbook::new();
        let date = Format::new().set_num_format("yyyy-mm-dd");
        let sheet = workbook.add_worksheet();
        for (col, header) in ["Account", "Deals", "Timestamp", "Notes"].into_iter().enumerate() {
            sheet.write_string(0, col as u16, header).unwrap();
        }
        sheet.write_string(1, 0, "Acme").unwrap();
        sheet.write_number(1, 1, 3.0).unwrap();
        sheet.write_number_with_format(1, 2, 45356.0, &date).unwrap();
        sheet.write_string(1, 3, "N/A").unwrap();
        sheet.write_string(2, 0, "Globex").unwrap();
        sheet.write_number(2, 1, 2.5).unwrap();
        let data = workbook.save_to_buffer().unwrap();

        let table = load_table(&data, "crm.xlsx", &LoadOptions::default()).unwrap();
        assert_eq!(table.columns, vec!["Account", "Deals", "Timestamp", "Notes"]);
        assert_eq!(table.row_count(), 2);
        // 整數值的浮點數不保留小數點
        assert_eq!(table.value(0, 1), Some("3"));
        assert_eq!(table.value(1, 1), Some("2.5"));
        assert_eq!(table.value(0, 2), Some("2024-03-05 00:00:00"));
        assert_eq!(table.value(0, 3), None);
        assert_eq!(table.value(1, 2), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(InputFormat::from_path("a.CSV").unwrap(), InputFormat::Delimited(b','));
        assert_eq!(InputFormat::from_path("a.tsv").unwrap(), InputFormat::Delimited(b'\t'));
        assert_eq!(InputFormat::from_path("a.xlsx").unwrap(), InputFormat::Spreadsheet);
        assert!(matches!(
            InputFormat::from_path("a.pdf"),
            Err(CrmError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_load_csv_marks_na_tokens_missing() {
        let csv = "Name,Email,Notes\nAnn,ann@x.com,loves it\nBo,N/A,\nCy,,NaN\n";
        let table = load_table(csv.as_bytes(), "crm.csv", &LoadOptions::default()).unwrap();

        assert_eq!(table.columns, vec!["Name", "Email", "Notes"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.value(0, 2), Some("loves it"));
        assert_eq!(table.value(1, 1), None);
        assert_eq!(table.value(2, 1), None);
        assert_eq!(table.value(2, 2), None);
    }

    #[test]
    fn test_load_ragged_rows() {
        let csv = "A,B,C\n1,2\n1,2,3,4\n";
        let table = load_table(csv.as_bytes(), "crm.csv", &LoadOptions::default()).unwrap();
        assert_eq!(table.rows[0], vec![Some("1".into()), Some("2".into()), None]);
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn test_sniffed_txt_uses_tabs() {
        let txt = "Name\tNotes\nAnn\tcurious, asked a lot\n";
        let table = load_table(txt.as_bytes(), "export.txt", &LoadOptions::default()).unwrap();
        assert_eq!(table.columns, vec!["Name", "Notes"]);
        assert_eq!(table.value(0, 1), Some("curious, asked a lot"));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let result = load_table(b"", "crm.csv", &LoadOptions::default());
        assert!(matches!(result, Err(CrmError::EmptyInput { .. })));
    }

    #[test]
    fn test_header_only_is_allowed() {
        let table = load_table(b"Name,Email\n", "crm.csv", &LoadOptions::default()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 2);
    }
}
