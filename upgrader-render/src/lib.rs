//! Rendering helpers for run reports: a terminal table, markdown, and a
//! versioned JSON envelope.

use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use std::time::Duration;
use upgrader_types::schema::UPGRADER_RUN_V1;
use upgrader_types::{CodemodReport, ReportTotals, VersionedCollection};
use uuid::Uuid;

const REPORT_HEADER: [&str; 7] = ["#", "Version", "Kind", "Name", "Affected", "Unchanged", "Duration"];

pub fn format_duration(d: Duration) -> String {
    format!("{:.3}s", d.as_secs_f64())
}

/// Per-codemod table with a totals row.
pub fn render_report_table(reports: &[CodemodReport]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(REPORT_HEADER.to_vec());

    for (i, r) in reports.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            r.codemod.version.to_string(),
            r.codemod.kind.to_string(),
            r.codemod.format(),
            r.report.ok.to_string(),
            r.report.nochange.to_string(),
            format_duration(r.report.time_elapsed),
        ]);
    }

    let totals = ReportTotals::from_reports(reports);
    table.add_row(vec![
        String::new(),
        String::new(),
        String::new(),
        "Total".to_string(),
        totals.ok.to_string(),
        totals.nochange.to_string(),
        format_duration(totals.time_elapsed),
    ]);

    for column in 4..7 {
        if let Some(col) = table.column_mut(column) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    table.to_string()
}

pub fn render_report_md(reports: &[CodemodReport]) -> String {
    let totals = ReportTotals::from_reports(reports);
    let mut out = String::new();
    out.push_str("# upgrader run\n\n");
    out.push_str(&format!(
        "- Codemods: {}\n- Affected: {}\n- Unchanged: {}\n- Skipped: {}\n- Errors: {}\n- Duration: {}\n\n",
        totals.codemods,
        totals.ok,
        totals.nochange,
        totals.skip,
        totals.error,
        format_duration(totals.time_elapsed)
    ));

    out.push_str("## Codemods\n\n");
    if reports.is_empty() {
        out.push_str("_No codemods ran._\n");
        return out;
    }

    out.push_str("| # | Version | Kind | Name | Affected | Unchanged | Skipped | Errors | Duration |\n");
    out.push_str("|---|---|---|---|---:|---:|---:|---:|---:|\n");
    for (i, r) in reports.iter().enumerate() {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            i + 1,
            r.codemod.version,
            r.codemod.kind,
            r.codemod.format(),
            r.report.ok,
            r.report.nochange,
            r.report.skip,
            r.report.error,
            format_duration(r.report.time_elapsed)
        ));
    }
    out
}

/// Codemods grouped by version, one row each.
pub fn render_codemods_table(collections: &[VersionedCollection]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Version", "Kind", "Name", "UID"]);

    for collection in collections {
        for codemod in &collection.codemods {
            table.add_row(vec![
                collection.version.to_string(),
                codemod.kind.to_string(),
                codemod.format(),
                codemod.uid(),
            ]);
        }
    }
    table.to_string()
}

/// Machine-readable run output.
#[derive(Debug, Clone, Serialize)]
pub struct RunEnvelope<'a> {
    pub schema: &'static str,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub totals: ReportTotals,
    pub reports: &'a [CodemodReport],
}

impl<'a> RunEnvelope<'a> {
    pub fn success(run_id: Uuid, reports: &'a [CodemodReport]) -> Self {
        Self {
            schema: UPGRADER_RUN_V1,
            run_id,
            generated_at: Utc::now(),
            success: true,
            error: None,
            totals: ReportTotals::from_reports(reports),
            reports,
        }
    }

    pub fn failure(run_id: Uuid, error: &anyhow::Error) -> Self {
        Self {
            schema: UPGRADER_RUN_V1,
            run_id,
            generated_at: Utc::now(),
            success: false,
            error: Some(format!("{error:#}")),
            totals: ReportTotals::default(),
            reports: &[],
        }
    }
}

pub fn render_json(envelope: &RunEnvelope<'_>) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(envelope)?;
    out.push('\n');
    Ok(out)
}
