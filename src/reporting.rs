// Reporting and output for Gauntlet
// Supports CSV, Markdown, and JSON export of test results

use chrono::Local;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ProbeError;
use crate::models::TestResult;

const CSV_HEADER: &str = "Name,Expected,Actual,Status,Response time (ms)";

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
pub fn escape_csv_field(field: &str) -> String {
    let Some(first_char) = field.chars().next() else {
        return String::new();
    };
    let needs_escaping = matches!(first_char, '=' | '+' | '-' | '@' | '\t');

    if needs_escaping {
        format!("\"'{}\"", field.replace('"', "\"\""))
    } else if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Pipe-safe single-line markdown cell.
fn escape_markdown_cell(field: &str) -> String {
    field.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn response_time_cell(result: &TestResult) -> String {
    result
        .response_time
        .map(|ms| ms.to_string())
        .unwrap_or_default()
}

pub fn render_csv(results: &[TestResult]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for result in results {
        let row = [
            escape_csv_field(&result.name),
            escape_csv_field(&result.expected),
            escape_csv_field(&result.actual),
            escape_csv_field(&result.status.to_string()),
            response_time_cell(result),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Count of results per verdict, keyed by the verdict's display form.
pub fn verdict_summary(results: &[TestResult]) -> BTreeMap<String, usize> {
    let mut summary = BTreeMap::new();
    for result in results {
        *summary.entry(result.status.to_string()).or_insert(0) += 1;
    }
    summary
}

pub fn render_markdown(title: &str, results: &[TestResult]) -> String {
    let mut out = format!("# Gauntlet Report: {}\n\n", escape_markdown_cell(title));

    let summary = verdict_summary(results);
    if !summary.is_empty() {
        let parts: Vec<String> = summary
            .iter()
            .map(|(verdict, count)| format!("{} {}", count, verdict))
            .collect();
        out.push_str(&format!("**{} checks:** {}\n\n", results.len(), parts.join(", ")));
    }

    out.push_str("| Check | Expected | Actual | Status | Time (ms) |\n");
    out.push_str("|---|---|---|---|---|\n");
    for result in results {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            escape_markdown_cell(&result.name),
            escape_markdown_cell(&result.expected),
            escape_markdown_cell(&result.actual),
            result.status,
            response_time_cell(result)
        ));
    }
    out
}

fn report_path(dir: &Path, extension: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("gauntlet_report_{}.{}", timestamp, extension))
}

fn write_report(dir: &Path, extension: &str, content: &str) -> Result<PathBuf, ProbeError> {
    let path = report_path(dir, extension);
    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    info!(path = %path.display(), "report written");
    Ok(path)
}

pub fn export_csv(results: &[TestResult], dir: impl AsRef<Path>) -> Result<PathBuf, ProbeError> {
    write_report(dir.as_ref(), "csv", &render_csv(results))
}

pub fn export_markdown(
    title: &str,
    results: &[TestResult],
    dir: impl AsRef<Path>,
) -> Result<PathBuf, ProbeError> {
    write_report(dir.as_ref(), "md", &render_markdown(title, results))
}

/// Full results, including captured requests and responses.
pub fn export_json(results: &[TestResult], dir: impl AsRef<Path>) -> Result<PathBuf, ProbeError> {
    let content = serde_json::to_string_pretty(results)?;
    write_report(dir.as_ref(), "json", &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Verdict;

    #[test]
    fn formula_prefixes_are_neutralized() {
        assert_eq!(escape_csv_field("=1+1"), "\"'=1+1\"");
        assert_eq!(escape_csv_field("-x"), "\"'-x\"");
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field(""), "");
    }

    #[test]
    fn newlines_force_quoting() {
        assert_eq!(escape_csv_field("a\nb"), "\"a\nb\"");
    }

    #[test]
    fn markdown_cells_escape_pipes() {
        let results = vec![TestResult::new("a|b", "2xx-3xx", "200 OK", Verdict::Pass)];
        let md = render_markdown("GET /", &results);
        assert!(md.contains("| a\\|b | 2xx-3xx | 200 OK | PASS |  |"));
        assert!(md.contains("**1 checks:** 1 PASS"));
    }

    #[test]
    fn summary_counts_each_verdict() {
        let results = vec![
            TestResult::new("a", "", "", Verdict::Pass),
            TestResult::new("b", "", "", Verdict::Bug),
            TestResult::new("c", "", "", Verdict::Pass),
        ];
        let summary = verdict_summary(&results);
        assert_eq!(summary.get("PASS"), Some(&2));
        assert_eq!(summary.get("BUG"), Some(&1));
    }
}
