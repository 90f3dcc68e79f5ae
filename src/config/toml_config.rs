use crate::core::charts::default_funnel;
use crate::core::classifier::{KeywordRule, NarrativeMap, NarrativeRule, SentimentClassifier, DEFAULT_FALLBACK};
use crate::core::hygiene::HygieneOptions;
use crate::core::loader::LoadOptions;
use crate::core::report::{default_next_steps, ReportOptions, DEFAULT_TITLE};
use crate::core::timeline::DEFAULT_TIMESTAMP_COLUMN;
use crate::domain::model::FunnelStage;
use crate::utils::error::{CrmError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// 從 TOML 載入的設定檔，每個區段皆可省略，省略時沿用內建預設值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub classifier: Option<ClassifierConfig>,
    pub narratives: Option<Vec<NarrativeRule>>,
    pub default_narrative: Option<String>,
    pub hygiene: Option<HygieneConfig>,
    pub report: Option<ReportConfig>,
    pub visualize: Option<VisualizeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub fallback: Option<String>,
    pub rules: Option<Vec<KeywordRule>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HygieneConfig {
    pub key_column: Option<String>,
    pub case_insensitive_keys: Option<bool>,
    pub trim_values: Option<bool>,
    pub na_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub title: Option<String>,
    pub company: Option<String>,
    pub next_steps: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizeConfig {
    pub timestamp_column: Option<String>,
    pub stage_column: Option<String>,
    pub funnel: Option<Vec<FunnelStage>>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| CrmError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${COMPANY_NAME})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let name = &caps[1];
                std::env::var(name).unwrap_or_else(|_| format!("${{{}}}", name))
            })
            .into_owned()
    }

    pub fn classifier(&self) -> Result<SentimentClassifier> {
        let Some(config) = &self.classifier else {
            return Ok(SentimentClassifier::default());
        };
        let defaults = SentimentClassifier::default();
        let rules = config
            .rules
            .clone()
            .unwrap_or_else(|| defaults.rules().to_vec());
        let fallback = config.fallback.as_deref().unwrap_or(DEFAULT_FALLBACK);
        SentimentClassifier::new(rules, fallback)
    }

    pub fn narratives(&self) -> NarrativeMap {
        match &self.narratives {
            Some(rules) => NarrativeMap::new(rules.clone(), self.default_narrative.clone()),
            None => NarrativeMap::default(),
        }
    }

    pub fn hygiene_options(&self) -> HygieneOptions {
        let defaults = HygieneOptions::default();
        match &self.hygiene {
            Some(h) => HygieneOptions {
                key_column: h.key_column.clone().unwrap_or(defaults.key_column),
                case_insensitive_keys: h
                    .case_insensitive_keys
                    .unwrap_or(defaults.case_insensitive_keys),
                trim_values: h.trim_values.unwrap_or(defaults.trim_values),
            },
            None => defaults,
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        match self.hygiene.as_ref().and_then(|h| h.na_values.clone()) {
            Some(na_values) => LoadOptions { na_values },
            None => LoadOptions::default(),
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        let Some(report) = &self.report else {
            return ReportOptions::default();
        };
        ReportOptions {
            title: report
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            company: report.company.clone(),
            next_steps: report.next_steps.clone().unwrap_or_else(default_next_steps),
        }
    }

    pub fn timestamp_column(&self) -> &str {
        self.visualize
            .as_ref()
            .and_then(|v| v.timestamp_column.as_deref())
            .unwrap_or(DEFAULT_TIMESTAMP_COLUMN)
    }

    pub fn stage_column(&self) -> Option<&str> {
        self.visualize.as_ref().and_then(|v| v.stage_column.as_deref())
    }

    pub fn funnel(&self) -> Vec<FunnelStage> {
        self.visualize
            .as_ref()
            .and_then(|v| v.funnel.clone())
            .unwrap_or_else(default_funnel)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        // 建構分類器時會檢查關鍵字與預設標籤
        let classifier = self.classifier()?;
        for (i, rule) in classifier.rules().iter().enumerate() {
            validate_non_empty_string(&format!("classifier.rules[{}].label", i), &rule.label)?;
        }

        if let Some(narratives) = &self.narratives {
            for (i, rule) in narratives.iter().enumerate() {
                validate_non_empty_string(&format!("narratives[{}].text", i), &rule.text)?;
            }
        }

        validate_non_empty_string("hygiene.key_column", &self.hygiene_options().key_column)?;
        validate_non_empty_string("report.title", &self.report_options().title)?;
        validate_non_empty_string("visualize.timestamp_column", self.timestamp_column())?;

        let funnel = self.funnel();
        if funnel.is_empty() {
            return Err(CrmError::InvalidConfigValueError {
                field: "visualize.funnel".to_string(),
                value: "[]".to_string(),
                reason: "At least one funnel stage is required".to_string(),
            });
        }
        for (i, stage) in funnel.iter().enumerate() {
            validate_non_empty_string(&format!("visualize.funnel[{}].stage", i), &stage.stage)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_profile_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.classifier().unwrap().classify("love"), "Advocate");
        assert_eq!(config.hygiene_options(), HygieneOptions::default());
        assert_eq!(config.timestamp_column(), "Timestamp");
        assert_eq!(config.funnel().len(), 5);
        assert_eq!(config.report_options().title, DEFAULT_TITLE);
    }

    #[test]
    fn test_parse_full_profile() {
        let toml_content = r#"
default_narrative = "Nothing notable."

[classifier]
fallback = "Neutral"

[[classifier.rules]]
keyword = "ROI"
label = "Value Focused"

[[classifier.rules]]
keyword = "competitor"
label = "Skeptical"

[[narratives]]
label = "Skeptical"
text = "Client compared us with another vendor."

[[narratives]]
contains = "Focused"
text = "Client cares about measurable returns."

[hygiene]
key_column = "Phone"
case_insensitive_keys = true
na_values = ["-"]

[report]
company = "Acme CRM Assistant"
next_steps = ["Call back"]

[visualize]
timestamp_column = "Last Contact"
stage_column = "Stage"

[[visualize.funnel]]
stage = "Leads"
count = 10

[[visualize.funnel]]
stage = "Won"
count = 2
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());

        let classifier = config.classifier().unwrap();
        assert_eq!(classifier.classify("what is the roi?"), "Value Focused");
        assert_eq!(classifier.classify("hello"), "Neutral");

        let narratives = config.narratives();
        assert_eq!(
            narratives.narrative_for("Skeptical"),
            "Client compared us with another vendor."
        );
        assert_eq!(
            narratives.narrative_for("Value Focused"),
            "Client cares about measurable returns."
        );
        assert_eq!(narratives.narrative_for("Neutral"), "Nothing notable.");

        let hygiene = config.hygiene_options();
        assert_eq!(hygiene.key_column, "Phone");
        assert!(hygiene.case_insensitive_keys);
        assert!(hygiene.trim_values);
        assert_eq!(config.load_options().na_values, vec!["-".to_string()]);

        let report = config.report_options();
        assert_eq!(report.company.as_deref(), Some("Acme CRM Assistant"));
        assert_eq!(report.next_steps, vec!["Call back".to_string()]);
        assert_eq!(report.title, DEFAULT_TITLE);

        assert_eq!(config.timestamp_column(), "Last Contact");
        assert_eq!(config.stage_column(), Some("Stage"));
        assert_eq!(config.funnel()[1].stage, "Won");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CRM_TEST_COMPANY", "Initech");

        let config = TomlConfig::from_toml_str(
            r#"
[report]
company = "${CRM_TEST_COMPANY}"
title = "${CRM_TEST_UNSET_TITLE}"
"#,
        )
        .unwrap();
        let report = config.report_options();
        assert_eq!(report.company.as_deref(), Some("Initech"));
        assert_eq!(report.title, "${CRM_TEST_UNSET_TITLE}");

        std::env::remove_var("CRM_TEST_COMPANY");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(
            r#"
[[classifier.rules]]
keyword = ""
label = "Empty"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str("[visualize]\nfunnel = []\n").unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str("[hygiene]\nkey_column = \" \"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[classifier\n").unwrap_err();
        assert!(matches!(err, CrmError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[report]\ntitle = \"Quarterly CRM Review\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.report_options().title, "Quarterly CRM Review");
    }
}
