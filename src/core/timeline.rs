use crate::domain::model::{Table, Timeline, Warning, SENTIMENT_COLUMN};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

pub const DEFAULT_TIMESTAMP_COLUMN: &str = "Timestamp";

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// 解析時間戳記的日期，無法辨識時回傳 `None`
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}

/// 依日期與分類統計已標記的列
///
/// 時間戳記缺值的列直接略過；無法解析的列也會略過，並在警告中計數
pub fn build_timeline(table: &Table, timestamp_column: &str) -> (Option<Timeline>, Vec<Warning>) {
    let (Some(ts_index), Some(cat_index)) = (
        table.column_index(timestamp_column),
        table.column_index(SENTIMENT_COLUMN),
    ) else {
        return (
            None,
            vec![Warning::MissingColumn {
                feature: "sentiment timeline".to_string(),
                expected: vec![timestamp_column.to_string(), SENTIMENT_COLUMN.to_string()],
            }],
        );
    };

    let mut categories: Vec<String> = Vec::new();
    let mut per_date: BTreeMap<NaiveDate, Vec<(usize, usize)>> = BTreeMap::new();
    let mut unparsed = 0usize;

    for row in 0..table.row_count() {
        let Some(raw) = table.value(row, ts_index) else {
            continue;
        };
        let Some(date) = parse_date(raw) else {
            tracing::debug!("Unparseable timestamp in row {}: {:?}", row + 1, raw);
            unparsed += 1;
            continue;
        };
        let Some(category) = table.value(row, cat_index) else {
            continue;
        };

        let category_index = match categories.iter().position(|c| c == category) {
            Some(index) => index,
            None => {
                categories.push(category.to_string());
                categories.len() - 1
            }
        };

        let entry = per_date.entry(date).or_default();
        match entry.iter_mut().find(|(c, _)| *c == category_index) {
            Some((_, n)) => *n += 1,
            None => entry.push((category_index, 1)),
        }
    }

    let counts = per_date
        .into_iter()
        .map(|(date, sparse)| {
            let mut dense = vec![0; categories.len()];
            for (category, n) in sparse {
                dense[category] = n;
            }
            (date, dense)
        })
        .collect();

    let mut warnings = Vec::new();
    if unparsed > 0 {
        tracing::warn!(
            "⚠️ {} timestamp(s) in '{}' could not be parsed",
            unparsed,
            timestamp_column
        );
        warnings.push(Warning::UnparsedTimestamps {
            column: timestamp_column.to_string(),
            count: unparsed,
        });
    }

    (Some(Timeline { categories, counts }), warnings)
}
