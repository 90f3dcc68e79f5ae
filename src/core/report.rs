//! 可列印的 PDF 報告
//!
//! 產出兩種文件：整體摘要報告，以及指定帳號時的單一帳號報告。
//! 兩者都使用內建 Helvetica 字型，不需要額外字型檔。

use crate::domain::model::{AnalysisResult, HygieneReport, Table, NARRATIVE_COLUMN, SENTIMENT_COLUMN};
use crate::utils::error::{CrmError, Result};
use printpdf::*;
use serde::{Deserialize, Serialize};
use std::io::BufWriter;

pub const DEFAULT_TITLE: &str = "CRM Health & Account Insights Report";
pub const ACCOUNT_TITLE: &str = "Account Summary Report";
pub const ACCOUNT_COLUMN: &str = "Account";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 18.0;
const LEFT: f32 = 20.0;
const WRAP_WIDTH: usize = 90;

pub fn default_next_steps() -> Vec<String> {
    [
        "Wait for Response Until [Date]",
        "Explore [Pain Point] Further",
        "Get Clarification on [Point]",
        "Client Needs [Specific Need]",
        "May Be Responsive to Promotions",
        "Interested but Missing [Feature]",
        "Not a Fit - Consider Removing",
        "High Intent - Prioritize Outreach",
        "Loop in [Relevant Internal Role]",
        "Re-engagement Opportunity",
        "Deal at Risk - Escalate Internally",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    pub title: String,
    pub company: Option<String>,
    pub next_steps: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            company: None,
            next_steps: default_next_steps(),
        }
    }
}

/// 依 `width` 字元數斷行，超過一行的單字會被切開
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// 內建 PDF 字型只支援 Latin-1
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2022}' => '-',
            c if (c as u32) < 0x100 && !c.is_control() => c,
            _ => '?',
        })
        .collect()
}

/// 由上而下寫入文字，頁面寫滿時自動換頁
struct PdfCursor {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PdfCursor {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(CrmError::report)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(CrmError::report)?;

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
            pages: 1,
        })
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed >= BOTTOM {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
    }

    fn title(&mut self, text: &str) {
        let size = 16.0;
        // Helvetica 平均字寬約為字級的一半
        let approx_width = text.chars().count() as f32 * size * 0.5 * 0.3528;
        let x = ((PAGE_WIDTH - approx_width) / 2.0).max(LEFT);
        self.ensure_space(10.0);
        self.layer
            .use_text(pdf_safe(text), size, Mm(x), Mm(self.y), &self.bold);
        self.y -= 12.0;
    }

    fn heading(&mut self, text: &str) {
        self.ensure_space(14.0);
        self.y -= 2.0;
        self.layer
            .use_text(pdf_safe(text), 14.0, Mm(LEFT), Mm(self.y), &self.bold);
        self.y -= 8.0;
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_space(size * 0.55);
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(pdf_safe(text), size, Mm(LEFT), Mm(self.y), font);
        self.y -= size * 0.55;
    }

    fn paragraph(&mut self, text: &str, size: f32, indent: &str) {
        let width = WRAP_WIDTH.saturating_sub(indent.len());
        for (i, line) in wrap_text(text, width).into_iter().enumerate() {
            let prefix = if i == 0 { indent.to_string() } else { " ".repeat(indent.len() + 2) };
            self.line(&format!("{}{}", prefix, line), size, false);
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn finish(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc.save(&mut buf).map_err(CrmError::report)?;
        buf.into_inner().map_err(CrmError::report)
    }
}

fn hygiene_lines(hygiene: Option<&HygieneReport>) -> Vec<String> {
    let Some(report) = hygiene else {
        return vec!["- Hygiene checks were not run for this report.".to_string()];
    };

    let mut lines = vec![format!(
        "- Rows: {}, columns: {}",
        report.row_count, report.column_count
    )];

    if report.missing.is_empty() {
        lines.push("- No missing values found.".to_string());
    } else {
        lines.push(format!(
            "- Missing values flagged: {} across {} column(s)",
            report.total_missing(),
            report.missing.len()
        ));
        for m in &report.missing {
            lines.push(format!("    {}: {}", m.column, m.count));
        }
    }

    if report.duplicates.is_empty() {
        lines.push("- No duplicates found.".to_string());
    } else {
        lines.push(format!(
            "- Duplicate records: {} row(s) in {} group(s)",
            report.duplicates.flagged_rows().len(),
            report.duplicates.groups.len()
        ));
    }

    if !report.renamed_columns.is_empty() {
        lines.push(format!(
            "- Column headers standardized: {}",
            report.renamed_columns.len()
        ));
    }

    match &report.conflicts {
        Some(conflicts) if conflicts.is_empty() => {
            lines.push(format!("- No conflicts found based on {}.", report.key_column));
        }
        Some(conflicts) => {
            lines.push(format!(
                "- {} {} value(s) shared by more than one record",
                conflicts.len(),
                report.key_column
            ));
        }
        None => lines.push(format!(
            "- No '{}' column; conflicts were not checked.",
            report.key_column
        )),
    }

    lines
}

/// 產生整份表格的摘要報告
pub fn render_summary_pdf(result: &AnalysisResult, options: &ReportOptions) -> Result<Vec<u8>> {
    let mut pdf = PdfCursor::new(&options.title)?;
    pdf.title(&options.title);
    if let Some(company) = &options.company {
        pdf.line(&format!("Prepared by {}", company), 10.0, false);
    }
    pdf.line(
        &format!("Generated {}", chrono::Local::now().format("%Y-%m-%d %H:%M")),
        9.0,
        false,
    );
    pdf.gap(4.0);

    pdf.heading("1. Data Hygiene Summary");
    for line in hygiene_lines(result.hygiene.as_ref()) {
        pdf.paragraph(&line, 11.0, "");
    }
    for warning in &result.warnings {
        pdf.paragraph(&format!("Note: {}", warning), 10.0, "- ");
    }

    pdf.heading("2. Account-Level Summaries");
    match result.table.column_index(NARRATIVE_COLUMN) {
        Some(index) => {
            for row in 0..result.table.row_count() {
                if let Some(summary) = result.table.value(row, index) {
                    pdf.paragraph(summary, 11.0, "- ");
                    pdf.gap(1.0);
                }
            }
        }
        None => pdf.paragraph("No notes were classified.", 11.0, "- "),
    }

    if let Some(tagging) = &result.tagging {
        pdf.heading("3. Lifetime Summary");
        for narrative in &tagging.narratives {
            pdf.paragraph(narrative, 11.0, "");
        }
        pdf.gap(2.0);
        for (category, count) in &tagging.category_counts {
            pdf.line(&format!("{}: {}", category, count), 10.0, true);
        }
    }

    pdf.heading("4. Recommended Next Steps");
    for step in &options.next_steps {
        pdf.paragraph(step, 11.0, "- ");
    }

    tracing::debug!("Summary report spans {} page(s)", pdf.pages);
    pdf.finish()
}

/// 屬於 `account` 的列，比對時忽略大小寫與前後空白
///
/// 表格沒有帳號欄位時回傳 `None`
pub fn account_rows(table: &Table, account: &str) -> Option<Vec<usize>> {
    let index = table.column_index(ACCOUNT_COLUMN)?;
    let wanted = account.trim();
    Some(
        (0..table.row_count())
            .filter(|&row| {
                table
                    .value(row, index)
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case(wanted))
            })
            .collect(),
    )
}

/// 以指定的列產生單一帳號報告
pub fn render_account_pdf(
    table: &Table,
    rows: &[usize],
    account: &str,
    text_column: Option<&str>,
    options: &ReportOptions,
) -> Result<Vec<u8>> {
    let sentiment = table.column_index(SENTIMENT_COLUMN);
    let narrative = table.column_index(NARRATIVE_COLUMN);
    let notes = text_column.and_then(|c| table.column_index(c));

    let mut pdf = PdfCursor::new(ACCOUNT_TITLE)?;
    pdf.title(ACCOUNT_TITLE);
    if let Some(company) = &options.company {
        pdf.line(&format!("Prepared by {}", company), 10.0, false);
    }
    pdf.gap(4.0);
    pdf.heading(&format!("Account: {}", account));

    for &row in rows {
        let value = |column: Option<usize>| column.and_then(|c| table.value(row, c));

        pdf.line(
            &format!("- Sentiment: {}", value(sentiment).unwrap_or("N/A")),
            11.0,
            true,
        );
        pdf.paragraph(
            value(narrative).unwrap_or("No narrative available"),
            11.0,
            "  Summary: ",
        );
        if let Some(text) = value(notes).filter(|t| !t.trim().is_empty()) {
            pdf.paragraph(text, 10.0, "  Notes: ");
        }
        pdf.gap(3.0);
    }

    pdf.finish()
}

/// 帳號報告的檔名，只保留安全字元
pub fn account_file_name(account: &str) -> String {
    let stem: String = account
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "account".to_string() } else { stem };
    format!("{}_summary.pdf", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Cell, TaggingSummary, Warning};

    fn pdf_text(bytes: &[u8]) -> (usize, String) {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        let text = doc.extract_text(&pages).unwrap();
        (pages.len(), text)
    }

    fn tagged_table() -> Table {
        let mut table = Table::new(vec![
            "Account".into(),
            "Notes".into(),
            SENTIMENT_COLUMN.into(),
            NARRATIVE_COLUMN.into(),
        ]);
        let row = |a: &str, n: &str, s: &str, m: &str| -> Vec<Cell> {
            vec![Some(a.into()), Some(n.into()), Some(s.into()), Some(m.into())]
        };
        table.push_row(row("Acme", "love it", "Advocate", "Client expressed clear enthusiasm or agreement."));
        table.push_row(row("Globex", "pricing?", "Transactional", "Client directed the conversation toward cost, scope, or terms."));
        table.push_row(row(" acme ", "curious", "Engaged", "Client expressed curiosity and participated in idea exploration."));
        table
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("a bb ccc", 4), vec!["a bb", "ccc"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("", 10), vec![""]);
        assert_eq!(wrap_text("one\ntwo", 10), vec!["one", "two"]);
    }

    #[test]
    fn test_pdf_safe_replaces_unsupported_chars() {
        assert_eq!(pdf_safe("• Not a Fit – Consider"), "- Not a Fit - Consider");
        assert_eq!(pdf_safe("café 🚀"), "café ?");
    }

    #[test]
    fn test_account_rows() {
        let table = tagged_table();
        assert_eq!(account_rows(&table, "ACME"), Some(vec![0, 2]));
        assert_eq!(account_rows(&table, "Initech"), Some(vec![]));
        assert_eq!(account_rows(&Table::new(vec!["Notes".into()]), "Acme"), None);
    }

    #[test]
    fn test_account_file_name() {
        assert_eq!(account_file_name("Acme Corp"), "Acme_Corp_summary.pdf");
        assert_eq!(account_file_name("   "), "account_summary.pdf");
    }

    #[test]
    fn test_render_summary_pdf() {
        let result = AnalysisResult {
            table: tagged_table(),
            tagging: Some(TaggingSummary {
                text_column: "Notes".into(),
                narratives: vec!["Client expressed clear enthusiasm or agreement.".into()],
                category_counts: vec![("Advocate".into(), 1)],
            }),
            warnings: vec![Warning::AccountNotFound {
                account: "Initech".into(),
            }],
            ..Default::default()
        };
        let bytes = render_summary_pdf(&result, &ReportOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let (pages, text) = pdf_text(&bytes);
        assert_eq!(pages, 1);
        for expected in [
            DEFAULT_TITLE,
            "1. Data Hygiene Summary",
            "- Hygiene checks were not run for this report.",
            "- Note: No rows found for account",
            "2. Account-Level Summaries",
            "- Client directed the conversation toward cost, scope, or terms.",
            "3. Lifetime Summary",
            "Advocate: 1",
            "4. Recommended Next Steps",
        ] {
            assert!(text.contains(expected), "missing {:?} in {:?}", expected, text);
        }
    }

    #[test]
    fn test_render_account_pdf_blocks() {
        let table = tagged_table();
        let bytes =
            render_account_pdf(&table, &[0, 2], "Acme", Some("Notes"), &ReportOptions::default()).unwrap();

        let (pages, text) = pdf_text(&bytes);
        assert_eq!(pages, 1);
        for expected in [
            ACCOUNT_TITLE,
            "Account: Acme",
            "- Sentiment: Advocate",
            "Summary: Client expressed clear enthusiasm or agreement.",
            "Notes: love it",
            "- Sentiment: Engaged",
            "Notes: curious",
        ] {
            assert!(text.contains(expected), "missing {:?} in {:?}", expected, text);
        }
        assert!(!text.contains("Transactional"));
    }

    #[test]
    fn test_render_account_pdf_many_rows_paginates() {
        let mut table = tagged_table();
        for _ in 0..200 {
            table.push_row(table.rows[0].clone());
        }
        let rows: Vec<usize> = (0..table.row_count()).collect();
        let bytes =
            render_account_pdf(&table, &rows, "Acme", Some("Notes"), &ReportOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let (pages, _) = pdf_text(&bytes);
        assert!(pages > 1, "expected several pages, got {}", pages);
    }
}
