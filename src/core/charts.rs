//! 使用 plotters 繪製 SVG 圖表

use crate::domain::model::{ChartKind, FunnelStage, Table, Timeline};
use crate::utils::error::{CrmError, Result};
use crate::utils::validation::parse_hex_color;
use plotters::prelude::*;

pub const DEFAULT_COLOR: &str = "#1f77b4";

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 600;

pub fn default_funnel() -> Vec<FunnelStage> {
    [
        ("Leads", 100),
        ("MQLs", 70),
        ("SQLs", 45),
        ("Opportunities", 25),
        ("Closed Won", 10),
    ]
    .into_iter()
    .map(|(stage, count)| FunnelStage {
        stage: stage.to_string(),
        count,
    })
    .collect()
}

/// 有 `stage_column` 時依設定的階段順序從資料計數，否則直接使用設定值
pub fn funnel_stages(table: &Table, stage_column: Option<&str>, configured: &[FunnelStage]) -> Vec<FunnelStage> {
    let Some(index) = stage_column.and_then(|c| table.column_index(c)) else {
        return configured.to_vec();
    };

    configured
        .iter()
        .map(|stage| FunnelStage {
            stage: stage.stage.clone(),
            count: (0..table.row_count())
                .filter(|&row| {
                    table
                        .value(row, index)
                        .is_some_and(|v| v.trim().eq_ignore_ascii_case(&stage.stage))
                })
                .count(),
        })
        .collect()
}

fn base_color(hex: &str) -> Result<RGBColor> {
    let (r, g, b) = parse_hex_color(hex).ok_or_else(|| CrmError::InvalidConfigValueError {
        field: "color".to_string(),
        value: hex.to_string(),
        reason: "Expected a color like #1f77b4".to_string(),
    })?;
    Ok(RGBColor(r, g, b))
}

/// 第一條序列使用指定顏色，其餘取自調色盤
fn series_color(base: RGBColor, index: usize) -> RGBColor {
    if index == 0 {
        return base;
    }
    let (r, g, b) = Palette99::pick(index).rgb();
    RGBColor(r, g, b)
}

/// 將時間軸繪製成折線、長條或面積圖
pub fn render_timeline(timeline: &Timeline, kind: ChartKind, color: &str) -> Result<String> {
    let base = base_color(color)?;
    let dates: Vec<String> = timeline
        .counts
        .keys()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    let n = dates.len().max(1) as f64;
    let y_max = (timeline.max_count().max(1) as f64) * 1.1;
    let label_for = |x: &f64| {
        let rounded = x.round();
        if (x - rounded).abs() > 0.01 || rounded < 0.0 {
            return String::new();
        }
        dates.get(rounded as usize).cloned().unwrap_or_default()
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(CrmError::chart)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Sentiment Over Time", ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(50)
            .build_cartesian_2d(-0.5f64..(n - 0.5), 0f64..y_max)
            .map_err(CrmError::chart)?;

        chart
            .configure_mesh()
            .x_labels(dates.len().clamp(1, 12))
            .x_label_formatter(&label_for)
            .y_desc("Records")
            .draw()
            .map_err(CrmError::chart)?;

        let series_count = timeline.categories.len().max(1);
        for (index, category) in timeline.categories.iter().enumerate() {
            let color = series_color(base, index);
            let points: Vec<(f64, f64)> = timeline
                .series(index)
                .into_iter()
                .enumerate()
                .map(|(i, (_, count))| (i as f64, count as f64))
                .collect();

            let annotation = match kind {
                ChartKind::Line | ChartKind::Funnel => chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2)))
                    .map_err(CrmError::chart)?,
                ChartKind::Area => chart
                    .draw_series(
                        AreaSeries::new(points, 0.0, color.mix(0.25)).border_style(color.stroke_width(2)),
                    )
                    .map_err(CrmError::chart)?,
                ChartKind::Bar => {
                    // 每個日期內依類別並排
                    let slot = 0.8 / series_count as f64;
                    let offset = -0.4 + slot * index as f64;
                    chart
                        .draw_series(points.into_iter().map(|(x, y)| {
                            Rectangle::new(
                                [(x + offset, 0.0), (x + offset + slot * 0.9, y)],
                                color.filled(),
                            )
                        }))
                        .map_err(CrmError::chart)?
                }
            };
            annotation
                .label(category.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()
            .map_err(CrmError::chart)?;

        root.present().map_err(CrmError::chart)?;
    }
    Ok(svg)
}

/// 繪製置中的水平轉換漏斗
pub fn render_funnel(stages: &[FunnelStage], color: &str) -> Result<String> {
    let base = base_color(color)?;
    let widest = stages.iter().map(|s| s.count).max().unwrap_or(0).max(1) as f64;
    let n = stages.len().max(1) as f64;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(CrmError::chart)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Conversion Funnel", ("sans-serif", 28))
            .margin(20)
            .build_cartesian_2d(-widest * 0.6..widest * 0.6, 0f64..n)
            .map_err(CrmError::chart)?;

        chart
            .draw_series(stages.iter().enumerate().map(|(i, stage)| {
                let half = stage.count as f64 / 2.0;
                let top = n - i as f64 - 0.1;
                let bottom = n - i as f64 - 0.9;
                Rectangle::new([(-half, bottom), (half, top)], base.filled())
            }))
            .map_err(CrmError::chart)?;

        chart
            .draw_series(stages.iter().enumerate().map(|(i, stage)| {
                Text::new(
                    format!("{}: {}", stage.stage, stage.count),
                    (-widest * 0.58, n - i as f64 - 0.5),
                    ("sans-serif", 16).into_font(),
                )
            }))
            .map_err(CrmError::chart)?;

        root.present().map_err(CrmError::chart)?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn sample_timeline() -> Timeline {
        let mut counts = BTreeMap::new();
        counts.insert(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), vec![1, 2]);
        counts.insert(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), vec![3, 0]);
        Timeline {
            categories: vec!["Advocate".into(), "Engaged".into()],
            counts,
        }
    }

    #[test]
    fn test_render_timeline_kinds() {
        for kind in [ChartKind::Line, ChartKind::Bar, ChartKind::Area] {
            let svg = render_timeline(&sample_timeline(), kind, "#ff0000").unwrap();
            assert!(svg.contains("<svg"));
            assert!(svg.contains("Advocate"));
        }
    }

    #[test]
    fn test_render_rejects_bad_color() {
        assert!(render_timeline(&sample_timeline(), ChartKind::Line, "red").is_err());
    }

    #[test]
    fn test_render_funnel_labels_stages() {
        let svg = render_funnel(&default_funnel(), DEFAULT_COLOR).unwrap();
        assert!(svg.contains("Closed Won: 10"));
    }

    #[test]
    fn test_funnel_counts_from_stage_column() {
        let mut table = Table::new(vec!["Stage".into()]);
        for stage in ["leads", "Leads", "SQLs", "Unknown"] {
            table.push_row(vec![Some(stage.into())]);
        }
        let stages = funnel_stages(&table, Some("stage"), &default_funnel());
        let counts: Vec<usize> = stages.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![2, 0, 1, 0, 0]);

        let configured = funnel_stages(&table, None, &default_funnel());
        assert_eq!(configured[0].count, 100);
    }
}
