//! 自由文字備註的關鍵字標記
//!
//! 分類器先將備註轉為小寫，再依序比對 `(keyword, label)` 規則，第一個出現的關鍵字勝出；
//! 都沒有命中時使用預設標籤。敘述規則再把標籤轉成報告用的一句話。

use crate::domain::model::{Table, TaggingSummary, Warning, NARRATIVE_COLUMN, SENTIMENT_COLUMN};
use crate::utils::error::{CrmError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FALLBACK: &str = "Evaluating";

/// 依優先順序尋找的備註欄位
pub const TEXT_COLUMNS: [&str; 2] = ["Transcript", "Notes"];

const DEFAULT_RULES: [(&str, &str); 9] = [
    ("love", "Advocate"),
    ("curious", "Engaged"),
    ("not sure", "Uncertain"),
    ("budget", "Explore [Budget Concern] Further"),
    ("interested", "Interested but Missing [Feature]"),
    ("pass", "Not a Fit"),
    ("scope", "Transactional"),
    ("timeline", "Transactional"),
    ("pricing", "Transactional"),
];

const DEFAULT_NARRATIVE: &str = "Client engagement type unclear, possibly neutral.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct SentimentClassifier {
    rules: Vec<KeywordRule>,
    fallback: String,
}

impl Default for SentimentClassifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(keyword, label)| KeywordRule {
                    keyword: keyword.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }
}

impl SentimentClassifier {
    /// 以有序規則建立分類器，關鍵字先轉小寫以維持不分大小寫比對
    pub fn new(rules: Vec<KeywordRule>, fallback: impl Into<String>) -> Result<Self> {
        let fallback = fallback.into();
        if fallback.trim().is_empty() {
            return Err(CrmError::InvalidConfigValueError {
                field: "classifier.fallback".to_string(),
                value: fallback,
                reason: "Fallback label cannot be empty".to_string(),
            });
        }

        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(i, rule)| {
                if rule.keyword.is_empty() {
                    return Err(CrmError::InvalidConfigValueError {
                        field: format!("classifier.rules[{}].keyword", i),
                        value: rule.keyword,
                        reason: "Keyword cannot be empty".to_string(),
                    });
                }
                Ok(KeywordRule {
                    keyword: rule.keyword.to_lowercase(),
                    label: rule.label,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules, fallback })
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn classify(&self, text: &str) -> &str {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| lowered.contains(&rule.keyword))
            .map(|rule| rule.label.as_str())
            .unwrap_or(&self.fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelMatch {
    Exact { label: String },
    Contains { contains: String },
}

impl LabelMatch {
    fn matches(&self, label: &str) -> bool {
        match self {
            LabelMatch::Exact { label: wanted } => label == wanted,
            LabelMatch::Contains { contains } => label.contains(contains.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeRule {
    #[serde(flatten)]
    pub matcher: LabelMatch,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct NarrativeMap {
    rules: Vec<NarrativeRule>,
    default_text: String,
}

impl Default for NarrativeMap {
    fn default() -> Self {
        let exact = |label: &str, text: &str| NarrativeRule {
            matcher: LabelMatch::Exact {
                label: label.to_string(),
            },
            text: text.to_string(),
        };
        let contains = |needle: &str, text: &str| NarrativeRule {
            matcher: LabelMatch::Contains {
                contains: needle.to_string(),
            },
            text: text.to_string(),
        };

        Self {
            rules: vec![
                exact("Engaged", "Client expressed curiosity and participated in idea exploration."),
                exact("Evaluating", "Client is weighing options and mentioned areas of uncertainty."),
                exact("Advocate", "Client expressed clear enthusiasm or agreement."),
                exact("Transactional", "Client directed the conversation toward cost, scope, or terms."),
                exact("Uncertain", "Client seemed unsure or lacked clarity on next steps."),
                exact("Skeptical", "Client challenged the solution or requested validation."),
                exact("Distant", "Client engaged passively or gave minimal responses."),
                exact("Unreceptive", "Client indicated disinterest or resistance."),
                contains("missing", "Client interested, but noted a key missing feature or gap."),
                contains("pain point", "Client described an ongoing issue or business challenge."),
            ],
            default_text: DEFAULT_NARRATIVE.to_string(),
        }
    }
}

impl NarrativeMap {
    pub fn new(rules: Vec<NarrativeRule>, default_text: Option<String>) -> Self {
        Self {
            rules,
            default_text: default_text.unwrap_or_else(|| DEFAULT_NARRATIVE.to_string()),
        }
    }

    pub fn narrative_for(&self, label: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(label))
            .map(|rule| rule.text.as_str())
            .unwrap_or(&self.default_text)
    }
}

pub fn find_text_column(table: &Table) -> Option<usize> {
    TEXT_COLUMNS.iter().find_map(|name| table.column_index(name))
}

/// 在 `table` 加上情緒分類與敘述欄位
///
/// 找不到備註欄位時不修改表格，回傳 `Err(warning)`
pub fn tag_table(
    table: &mut Table,
    classifier: &SentimentClassifier,
    narratives: &NarrativeMap,
) -> std::result::Result<TaggingSummary, Warning> {
    let text_index = find_text_column(table).ok_or_else(|| Warning::MissingColumn {
        feature: "sentiment analysis".to_string(),
        expected: TEXT_COLUMNS.iter().map(|c| c.to_string()).collect(),
    })?;

    let mut sentiments = Vec::with_capacity(table.row_count());
    let mut summaries = Vec::with_capacity(table.row_count());
    let mut distinct: Vec<String> = Vec::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for row in 0..table.row_count() {
        let text = table.value(row, text_index).unwrap_or("");
        let label = classifier.classify(text);
        let narrative = narratives.narrative_for(label);

        match counts.iter_mut().find(|(l, _)| l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.to_string(), 1)),
        }
        if !distinct.iter().any(|n| n == narrative) {
            distinct.push(narrative.to_string());
        }

        sentiments.push(Some(label.to_string()));
        summaries.push(Some(narrative.to_string()));
    }

    let text_column = table.columns[text_index].clone();
    table.set_column(SENTIMENT_COLUMN, sentiments);
    table.set_column(NARRATIVE_COLUMN, summaries);

    tracing::debug!(
        "Tagged {} rows from '{}' into {} categories",
        table.row_count(),
        text_column,
        counts.len()
    );

    Ok(TaggingSummary {
        text_column,
        narratives: distinct,
        category_counts: counts,
    })
}
