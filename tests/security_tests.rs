/// Security tests for Gauntlet reports
/// Tests CSV injection protection and Markdown escaping of untrusted response text

use gauntlet::models::{TestResult, Verdict};
use gauntlet::reporting::{export_csv, export_markdown};
use std::fs;

fn result(name: &str, actual: &str) -> TestResult {
    TestResult::new(name, "2xx-3xx", actual, Verdict::Pass)
}

#[test]
fn test_csv_injection_protection() {
    // Server-controlled text lands in the actual column; formulas must not execute
    let results = vec![
        result("CORS", "=HYPERLINK(\"http://evil.com\")"),
        result("HSTS", "+cmd|'/C calc'!A1"),
        result("404 handling", "-2+3+cmd|'/C calc'!A1"),
        result("MIME sniffing", "@SUM(1+1)*cmd|'/C calc'!A1"),
        result("Cache-Control", "\t=1+1"),
    ];

    let dir = tempfile::tempdir().expect("temp dir");
    let path = export_csv(&results, dir.path()).expect("CSV export should succeed");
    let content = fs::read_to_string(&path).expect("Should be able to read CSV file");

    // Verify that dangerous characters are escaped with single quote prefix
    assert!(content.contains("\"'=HYPERLINK"), "CSV should escape = prefix");
    assert!(content.contains("\"'+cmd"), "CSV should escape + prefix");
    assert!(content.contains("\"'-2+3"), "CSV should escape - prefix");
    assert!(content.contains("\"'@SUM"), "CSV should escape @ prefix");
    assert!(content.contains("\"'\t=1+1"), "CSV should escape tab prefix");

    // Verify header is not escaped
    assert!(
        content.starts_with("Name,Expected,Actual,Status,Response time (ms)\n"),
        "CSV header should be intact"
    );
}

#[test]
fn test_csv_normal_content_not_escaped() {
    let results = vec![
        result("Baseline request", "200 OK").with_response_time(42),
        TestResult::new("Missing authorization", "401", "200 OK", Verdict::Fail),
    ];

    let dir = tempfile::tempdir().expect("temp dir");
    let path = export_csv(&results, dir.path()).expect("CSV export should succeed");
    let content = fs::read_to_string(&path).expect("Should be able to read CSV file");

    assert!(content.contains("Baseline request,2xx-3xx,200 OK,PASS,42"));
    assert!(content.contains("Missing authorization,401,200 OK,FAIL,\n"));
}

#[test]
fn test_csv_comma_and_quote_escaping() {
    let results = vec![result("name = \"x\"", "400 Bad Request, retry")];

    let dir = tempfile::tempdir().expect("temp dir");
    let path = export_csv(&results, dir.path()).expect("CSV export should succeed");
    let content = fs::read_to_string(&path).expect("Should be able to read CSV file");

    // Verify comma causes field to be quoted
    assert!(content.contains("\"400 Bad Request, retry\""), "Comma should cause quoting");
    // Verify quotes are escaped with double quotes
    assert!(content.contains("\"name = \"\"x\"\"\""), "Quotes should be doubled");
}

#[test]
fn test_csv_empty_fields() {
    let results = vec![TestResult::new("", "", "", Verdict::Info)];

    let dir = tempfile::tempdir().expect("temp dir");
    let path = export_csv(&results, dir.path()).expect("CSV export should succeed");
    let content = fs::read_to_string(&path).expect("Should be able to read CSV file");

    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2, "Should have header and one data row");
    assert_eq!(lines[1], ",,,INFO,");
}

#[test]
fn test_markdown_escapes_table_breakers() {
    // A response reason containing a pipe or newline must not split the table row
    let results = vec![result("Sensitive server header", "Apache | 2.4\nUbuntu")];

    let dir = tempfile::tempdir().expect("temp dir");
    let path = export_markdown("GET https://api.example.com/users", &results, dir.path())
        .expect("Markdown export should succeed");
    let content = fs::read_to_string(&path).expect("Should read markdown");

    assert!(content.starts_with("# Gauntlet Report: GET https://api.example.com/users\n"));
    assert!(content.contains("| Sensitive server header | 2xx-3xx | Apache \\| 2.4 Ubuntu | PASS |  |"));
    assert_eq!(content.lines().filter(|l| l.starts_with("| Sensitive")).count(), 1);
}
