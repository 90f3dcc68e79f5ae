use crate::config::toml_config::TomlConfig;
use crate::core::charts::{funnel_stages, render_funnel, render_timeline};
use crate::core::classifier::{find_text_column, tag_table, NarrativeMap, SentimentClassifier};
use crate::core::export::{bundle, table_to_csv, to_json, Artifact, BUNDLE_FILE};
use crate::core::hygiene::run_hygiene;
use crate::core::loader::load_table;
use crate::core::report::{
    account_file_name, account_rows, render_account_pdf, render_summary_pdf, ACCOUNT_COLUMN,
};
use crate::core::timeline::build_timeline;
use crate::domain::model::{AnalysisResult, ChartKind, Table, Tool, Warning};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::Result;

pub const CLEANED_FILE: &str = "cleaned.csv";
pub const TAGGED_FILE: &str = "tagged.csv";
pub const HYGIENE_FILE: &str = "hygiene.json";
pub const REPORT_FILE: &str = "crm_report.pdf";
pub const TIMELINE_FILE: &str = "timeline.svg";
pub const FUNNEL_FILE: &str = "funnel.svg";

/// 對單一上傳表格依序執行清理、標記、圖表與報告
pub struct CrmPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    profile: TomlConfig,
    classifier: SentimentClassifier,
    narratives: NarrativeMap,
}

impl<S: Storage, C: ConfigProvider> CrmPipeline<S, C> {
    /// 建立 Pipeline，設定檔中的分類規則無效時回傳錯誤
    pub fn new(storage: S, config: C, profile: TomlConfig) -> Result<Self> {
        let classifier = profile.classifier()?;
        let narratives = profile.narratives();
        Ok(Self {
            storage,
            config,
            profile,
            classifier,
            narratives,
        })
    }

    fn tag(&self, result: &mut AnalysisResult) {
        match tag_table(&mut result.table, &self.classifier, &self.narratives) {
            Ok(summary) => {
                tracing::info!(
                    "🏷️ Tagged {} rows from '{}' ({} distinct narratives)",
                    result.table.row_count(),
                    summary.text_column,
                    summary.narratives.len()
                );
                result.tagging = Some(summary);
            }
            Err(warning) => result.warnings.push(warning),
        }
    }

    fn report_artifacts(&self, result: &AnalysisResult, artifacts: &mut Vec<Artifact>) -> Result<()> {
        if !result.table.is_tagged() {
            tracing::warn!("⚠️ Skipping PDF report: no tagged notes to summarize");
            return Ok(());
        }

        let options = self.profile.report_options();
        artifacts.push(Artifact::new(TAGGED_FILE, table_to_csv(&result.table)?));
        artifacts.push(Artifact::new(REPORT_FILE, render_summary_pdf(result, &options)?));

        let Some(account) = self.config.account() else {
            return Ok(());
        };
        // 帳號相關警告已在 transform 階段記錄
        let (rows, _) = account_selection(&result.table, account);
        if rows.is_empty() {
            return Ok(());
        }

        let text_column = find_text_column(&result.table).map(|i| result.table.columns[i].clone());
        let pdf = render_account_pdf(&result.table, &rows, account, text_column.as_deref(), &options)?;
        artifacts.push(Artifact::new(account_file_name(account), pdf));
        Ok(())
    }

    fn chart_artifacts(&self, result: &AnalysisResult, artifacts: &mut Vec<Artifact>) -> Result<()> {
        let color = self.config.chart_color();

        if let Some(stages) = &result.funnel {
            artifacts.push(Artifact::new(FUNNEL_FILE, render_funnel(stages, color)?.into_bytes()));
        }
        if let Some(timeline) = result.timeline.as_ref().filter(|t| !t.is_empty()) {
            let kind = match self.config.chart_kind() {
                ChartKind::Funnel => ChartKind::Line,
                kind => kind,
            };
            artifacts.push(Artifact::new(
                TIMELINE_FILE,
                render_timeline(timeline, kind, color)?.into_bytes(),
            ));
        }
        Ok(())
    }
}

/// 依帳號選出要輸出的列
///
/// 沒有帳號欄位時使用全部列；找不到該帳號時回傳空列表。兩者都附帶警告。
fn account_selection(table: &Table, account: &str) -> (Vec<usize>, Option<Warning>) {
    match account_rows(table, account) {
        Some(rows) if rows.is_empty() => (
            rows,
            Some(Warning::AccountNotFound {
                account: account.to_string(),
            }),
        ),
        Some(rows) => (rows, None),
        None => (
            (0..table.row_count()).collect(),
            Some(Warning::MissingColumn {
                feature: "account filtering (all rows used)".to_string(),
                expected: vec![ACCOUNT_COLUMN.to_string()],
            }),
        ),
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CrmPipeline<S, C> {
    async fn extract(&self) -> Result<Table> {
        let path = self.config.input_path();
        tracing::info!("🚀 Reading CRM export from: {}", path);

        let data = self.storage.read_file(path).await?;
        tracing::debug!("Read {} bytes", data.len());

        load_table(&data, path, &self.profile.load_options())
    }

    async fn transform(&self, table: Table) -> Result<AnalysisResult> {
        let tool = self.config.tool();
        tracing::info!("🔧 Running {:?} on {} rows", tool, table.row_count());

        let mut result = AnalysisResult {
            table,
            ..Default::default()
        };

        if tool.runs_hygiene() {
            let (report, warnings) = run_hygiene(&mut result.table, &self.profile.hygiene_options());
            result.hygiene = Some(report);
            result.warnings.extend(warnings);
        }

        // 視覺化需要分類結果，若檔案尚未標記則先分類
        if tool.runs_report() || (tool.runs_visualize() && !result.table.is_tagged()) {
            // cleaned.csv 輸出分類前的表格
            if result.hygiene.is_some() {
                result.cleaned = Some(result.table.clone());
            }
            self.tag(&mut result);
        }

        if tool.runs_report() && result.table.is_tagged() {
            if let Some(account) = self.config.account() {
                let (_, warning) = account_selection(&result.table, account);
                result.warnings.extend(warning);
            }
        }

        if tool.runs_visualize() {
            if self.config.chart_kind() == ChartKind::Funnel || tool == Tool::All {
                result.funnel = Some(funnel_stages(
                    &result.table,
                    self.profile.stage_column(),
                    &self.profile.funnel(),
                ));
            }
            if self.config.chart_kind() != ChartKind::Funnel {
                let (timeline, warnings) = build_timeline(&result.table, self.profile.timestamp_column());
                result.timeline = timeline;
                result.warnings.extend(warnings);
            }
        }

        for warning in &result.warnings {
            tracing::warn!("⚠️ {}", warning);
        }
        Ok(result)
    }

    async fn load(&self, result: AnalysisResult) -> Result<String> {
        let tool = self.config.tool();
        let mut artifacts = Vec::new();

        if let Some(hygiene) = &result.hygiene {
            let cleaned = result.cleaned.as_ref().unwrap_or(&result.table);
            artifacts.push(Artifact::new(CLEANED_FILE, table_to_csv(cleaned)?));
            artifacts.push(Artifact::new(HYGIENE_FILE, to_json(hygiene)?));
        }
        if tool.runs_report() {
            self.report_artifacts(&result, &mut artifacts)?;
        }
        if tool.runs_visualize() {
            self.chart_artifacts(&result, &mut artifacts)?;
        }

        let output_dir = self.config.output_path().trim_end_matches('/');
        if self.config.bundle() {
            let data = bundle(&artifacts)?;
            tracing::debug!(
                "Writing ZIP bundle with {} file(s), {} bytes",
                artifacts.len(),
                data.len()
            );
            self.storage.write_file(BUNDLE_FILE, &data).await?;
            let output_path = format!("{}/{}", output_dir, BUNDLE_FILE);
            tracing::info!("📦 Bundle saved: {}", output_path);
            return Ok(output_path);
        }

        for artifact in &artifacts {
            self.storage.write_file(&artifact.name, &artifact.data).await?;
            tracing::info!("💾 Wrote {}/{}", output_dir, artifact.name);
        }
        Ok(output_dir.to_string())
    }
}
