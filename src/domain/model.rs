use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 單一儲存格，`None` 代表缺值
pub type Cell = Option<String>;

pub const SENTIMENT_COLUMN: &str = "Sentiment_Category";
pub const NARRATIVE_COLUMN: &str = "Narrative_Summary";

/// 從上傳檔案載入的表格，所有欄位皆為字串
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 新增一列，長度不足補缺值、過長則截斷
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        if row.len() > self.columns.len() {
            tracing::debug!(
                "Dropping {} extra cell(s) in row {}",
                row.len() - self.columns.len(),
                self.rows.len() + 1
            );
        }
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 以不分大小寫、忽略前後空白的方式尋找欄位
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.columns
            .iter()
            .position(|c| c.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    /// 設定整個欄位，同名欄位存在時直接覆寫
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        let index = match self.column_index(name) {
            Some(index) => index,
            None => {
                self.columns.push(name.to_string());
                self.columns.len() - 1
            }
        };

        // 外部建立的表格列長可能不一致，先補齊到欄位數
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, None);
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            if let Some(cell) = row.get_mut(index) {
                *cell = value;
            }
        }
    }

    pub fn is_tagged(&self) -> bool {
        self.has_column(SENTIMENT_COLUMN) && self.has_column(NARRATIVE_COLUMN)
    }
}

/// 本次執行要跑的工具
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Hygiene,
    Report,
    Visualize,
    #[default]
    All,
}

impl Tool {
    pub fn runs_hygiene(self) -> bool {
        matches!(self, Tool::Hygiene | Tool::All)
    }

    pub fn runs_report(self) -> bool {
        matches!(self, Tool::Report | Tool::All)
    }

    pub fn runs_visualize(self) -> bool {
        matches!(self, Tool::Visualize | Tool::All)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Area,
    Funnel,
}

/// 只略過單一功能、不中斷執行的問題
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    MissingColumn {
        feature: String,
        expected: Vec<String>,
    },
    UnparsedTimestamps {
        column: String,
        count: usize,
    },
    AccountNotFound {
        account: String,
    },
    DuplicateHeader {
        column: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingColumn { feature, expected } => write!(
                f,
                "No {} column found; skipped {}",
                expected
                    .iter()
                    .map(|c| format!("'{}'", c))
                    .collect::<Vec<_>>()
                    .join(" or "),
                feature
            ),
            Warning::UnparsedTimestamps { column, count } => write!(
                f,
                "{} value(s) in '{}' could not be parsed as dates and were left out",
                count, column
            ),
            Warning::AccountNotFound { account } => {
                write!(f, "No rows found for account '{}'", account)
            }
            Warning::DuplicateHeader { column } => write!(
                f,
                "Several columns are named '{}'; lookups by name use the first one",
                column
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMissing {
    pub column: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// 每組為完全相同的列索引，依首次出現排序
    pub groups: Vec<Vec<usize>>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 所有重複列的索引，由小到大
    pub fn flagged_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.groups.iter().flatten().copied().collect();
        rows.sort_unstable();
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConflict {
    pub key: String,
    pub rows: Vec<usize>,
    pub differing_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HygieneReport {
    pub row_count: usize,
    pub column_count: usize,
    pub missing: Vec<ColumnMissing>,
    pub duplicates: DuplicateReport,
    pub renamed_columns: Vec<(String, String)>,
    /// 標準化後名稱重複的欄位
    pub duplicate_headers: Vec<String>,
    pub key_column: String,
    /// 表格中沒有鍵值欄位時為 `None`
    pub conflicts: Option<Vec<KeyConflict>>,
}

impl HygieneReport {
    pub fn total_missing(&self) -> usize {
        self.missing.iter().map(|m| m.count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggingSummary {
    pub text_column: String,
    /// 不重複的敘述，依首次出現排序
    pub narratives: Vec<String>,
    pub category_counts: Vec<(String, usize)>,
}

impl TaggingSummary {
    pub fn lifetime_summary(&self) -> String {
        self.narratives.join("\n")
    }
}

/// 每日各分類的筆數，每個日期都包含所有分類
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub categories: Vec<String>,
    pub counts: BTreeMap<chrono::NaiveDate, Vec<usize>>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn series(&self, category_index: usize) -> Vec<(chrono::NaiveDate, usize)> {
        self.counts
            .iter()
            .map(|(date, counts)| (*date, counts.get(category_index).copied().unwrap_or(0)))
            .collect()
    }

    pub fn max_count(&self) -> usize {
        self.counts
            .values()
            .flat_map(|c| c.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: String,
    pub count: usize,
}

/// Transform 階段的產出，交給 Load 階段使用
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub table: Table,
    /// 清理後、加上分類欄位前的表格；清理後未再修改時為 `None`
    pub cleaned: Option<Table>,
    pub hygiene: Option<HygieneReport>,
    pub tagging: Option<TaggingSummary>,
    pub timeline: Option<Timeline>,
    pub funnel: Option<Vec<FunnelStage>>,
    pub warnings: Vec<Warning>,
}
