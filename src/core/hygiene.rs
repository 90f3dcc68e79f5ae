use crate::domain::model::{Cell, ColumnMissing, DuplicateReport, HygieneReport, KeyConflict, Table, Warning};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_KEY_COLUMN: &str = "Email";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HygieneOptions {
    pub key_column: String,
    pub case_insensitive_keys: bool,
    pub trim_values: bool,
}

impl Default for HygieneOptions {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            case_insensitive_keys: false,
            trim_values: true,
        }
    }
}

pub fn missing_counts(table: &Table) -> Vec<ColumnMissing> {
    table
        .columns
        .iter()
        .enumerate()
        .filter_map(|(index, column)| {
            let count = table
                .rows
                .iter()
                .filter(|row| !matches!(row.get(index), Some(Some(_))))
                .count();
            (count > 0).then(|| ColumnMissing {
                column: column.clone(),
                count,
            })
        })
        .collect()
}

/// 將所有欄位都相同的列分組，原始列與所有副本一起回報
pub fn find_duplicates(table: &Table) -> DuplicateReport {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut seen: HashMap<&[Cell], usize> = HashMap::new();

    for (index, row) in table.rows.iter().enumerate() {
        match seen.get(row.as_slice()) {
            Some(&group) => groups[group].push(index),
            None => {
                seen.insert(row.as_slice(), groups.len());
                groups.push(vec![index]);
            }
        }
    }

    DuplicateReport {
        groups: groups.into_iter().filter(|g| g.len() > 1).collect(),
    }
}

/// 每段連續字母首字大寫、其餘小寫
pub fn title_case(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut previous_is_letter = false;

    for c in header.trim().chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

/// 就地標準化標頭，回傳有變動的 `(old, new)`
pub fn standardize_headers(table: &mut Table) -> Vec<(String, String)> {
    let mut renamed = Vec::new();
    for column in &mut table.columns {
        let standardized = title_case(column);
        if *column != standardized {
            renamed.push((std::mem::replace(column, standardized.clone()), standardized));
        }
    }
    renamed
}

/// 名稱重複的欄位（不分大小寫），每個名稱只回報一次
pub fn duplicate_headers(table: &Table) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    for column in &table.columns {
        let count = seen.entry(column.trim().to_lowercase()).or_insert(0);
        *count += 1;
        if *count == 2 {
            duplicates.push(column.clone());
        }
    }
    duplicates
}

/// 去除每個儲存格前後空白，變成空字串者視為缺值
pub fn trim_values(table: &mut Table) {
    for cell in table.rows.iter_mut().flatten() {
        let Some(value) = cell.take() else {
            continue;
        };
        let trimmed = value.trim();
        *cell = if trimmed.is_empty() {
            None
        } else if trimmed.len() == value.len() {
            Some(value)
        } else {
            Some(trimmed.to_string())
        };
    }
}

/// 鍵值相同的紀錄，缺值的鍵不視為衝突
///
/// 沒有鍵值欄位時回傳 `None`
pub fn find_conflicts(
    table: &Table,
    key_column: &str,
    case_insensitive: bool,
) -> Option<Vec<KeyConflict>> {
    let key_index = table.column_index(key_column)?;

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..table.row_count() {
        let Some(raw) = table.value(row, key_index) else {
            continue;
        };
        let key = if case_insensitive {
            raw.to_lowercase()
        } else {
            raw.to_string()
        };
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row);
    }

    let conflicts = order
        .into_iter()
        .filter_map(|key| {
            let rows = groups.remove(&key)?;
            if rows.len() < 2 {
                return None;
            }
            let differing_columns = table
                .columns
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != key_index)
                .filter(|(index, _)| {
                    let first = table.value(rows[0], *index);
                    rows.iter().any(|&r| table.value(r, *index) != first)
                })
                .map(|(_, name)| name.clone())
                .collect();
            let key = table.value(rows[0], key_index).unwrap_or(&key).to_string();
            Some(KeyConflict {
                key,
                rows,
                differing_columns,
            })
        })
        .collect();

    Some(conflicts)
}

/// 執行資料清理檢查並就地標準化表格
///
/// 缺值與重複列以載入時的表格計算；鍵值衝突在標頭標準化後檢查
pub fn run_hygiene(table: &mut Table, options: &HygieneOptions) -> (HygieneReport, Vec<Warning>) {
    let mut warnings = Vec::new();

    if options.trim_values {
        trim_values(table);
    }

    let missing = missing_counts(table);
    let duplicates = find_duplicates(table);
    let renamed_columns = standardize_headers(table);
    let duplicate_headers = duplicate_headers(table);
    warnings.extend(duplicate_headers.iter().map(|column| Warning::DuplicateHeader {
        column: column.clone(),
    }));

    let conflicts = find_conflicts(table, &options.key_column, options.case_insensitive_keys);
    if conflicts.is_none() {
        warnings.push(Warning::MissingColumn {
            feature: "key conflict detection".to_string(),
            expected: vec![options.key_column.clone()],
        });
    }

    tracing::info!(
        "🧹 Hygiene: {} missing value(s), {} duplicate group(s), {} header(s) standardized",
        missing.iter().map(|m| m.count).sum::<usize>(),
        duplicates.groups.len(),
        renamed_columns.len()
    );

    let report = HygieneReport {
        row_count: table.row_count(),
        column_count: table.column_count(),
        missing,
        duplicates,
        renamed_columns,
        duplicate_headers,
        key_column: options.key_column.clone(),
        conflicts,
    };
    (report, warnings)
}
