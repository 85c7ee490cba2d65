// Main CLI entry point for Gauntlet
// Uses clap for argument parsing

use base64::{engine::general_purpose, Engine as _};
use clap::{Arg, ArgAction, ArgMatches, Command};
use gauntlet::config::{EngineConfig, LoadTestConfig};
use gauntlet::engine::{HttpEngine, HttpTransport};
use gauntlet::error::ProbeError;
use gauntlet::load::{LoadProgress, LoadTestRunner};
use gauntlet::logging::{init_logging, LogConfig, LogFormat};
use gauntlet::models::{Method, Request, RequestBody, TestOptions, TestResult};
use gauntlet::registry::count_checks;
use gauntlet::reporting::{export_csv, export_json, export_markdown};
use gauntlet::runner::{run_suites, ProgressHooks, SuiteSelection};
use gauntlet::suites::{ProbeHook, DATA_DRIVEN_SUITE, PERFORMANCE_SUITE, SECURITY_SUITE};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Runtime(#[from] ProbeError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Input(_) | CliError::Runtime(ProbeError::InvalidConfig(_)) => 2,
            CliError::Runtime(_) => 1,
        }
    }
}

/// Arguments shared by every subcommand that sends the baseline request.
fn request_args() -> Vec<Arg> {
    vec![
        Arg::new("url")
            .short('u')
            .long("url")
            .required(true)
            .num_args(1)
            .help("Baseline request URL"),
        Arg::new("method")
            .short('X')
            .long("method")
            .num_args(1)
            .default_value("GET")
            .help("HTTP method of the baseline request"),
        Arg::new("header")
            .short('H')
            .long("header")
            .action(ArgAction::Append)
            .help("Request header as 'Name: value' (repeatable)"),
        Arg::new("data")
            .short('d')
            .long("data")
            .num_args(1)
            .conflicts_with_all(["form", "body_base64"])
            .help("Request body; sent as JSON when it parses as an object or array"),
        Arg::new("form")
            .long("form")
            .action(ArgAction::Append)
            .conflicts_with("body_base64")
            .help("Form field as key=value (repeatable)"),
        Arg::new("body_base64")
            .long("body-base64")
            .num_args(1)
            .help("Binary request body, base64-encoded"),
    ]
}

fn cli() -> Command {
    Command::new("gauntlet")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Jake Abendroth")
        .about("Automated mutation, security and load testing for HTTP endpoints")
        .after_help("EXAMPLES:\n  gauntlet scan --url https://api.local/users -X POST -H 'Content-Type: application/json' --data '{\"email\":\"a@b.co\"}'\n  gauntlet scan --url 'https://api.local/search?q=shoes' --suite security --markdown-report\n  gauntlet load --url https://api.local/health --threads 20 --requests 500")
        .subcommand_required(true)
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .global(true)
            .num_args(1)
            .help("TOML engine configuration file"))
        .arg(Arg::new("log_level")
            .long("log-level")
            .global(true)
            .num_args(1)
            .default_value("info")
            .help("Log filter directive (RUST_LOG takes precedence)"))
        .arg(Arg::new("log_format")
            .long("log-format")
            .global(true)
            .num_args(1)
            .default_value("pretty")
            .value_parser(["pretty", "json"])
            .help("Log output format"))
        .subcommand(Command::new("scan")
            .about("Run the data-driven, security and performance suites against one request")
            .args(request_args())
            .arg(Arg::new("suite")
                .long("suite")
                .num_args(1)
                .default_value("all")
                .value_parser(["all", "data", "security", "performance"])
                .help("Suite to run"))
            .arg(Arg::new("csv_report")
                .long("csv-report")
                .action(ArgAction::SetTrue)
                .help("Write a CSV report"))
            .arg(Arg::new("markdown_report")
                .long("markdown-report")
                .action(ArgAction::SetTrue)
                .help("Write a Markdown report"))
            .arg(Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print results as JSON on stdout"))
            .arg(Arg::new("out_dir")
                .long("out-dir")
                .num_args(1)
                .default_value(".")
                .help("Directory for report files")))
        .subcommand(Command::new("load")
            .about("Send the request repeatedly from concurrent workers")
            .args(request_args())
            .arg(Arg::new("threads")
                .short('t')
                .long("threads")
                .num_args(1)
                .value_parser(clap::value_parser!(usize))
                .help("Concurrent workers (1-100)"))
            .arg(Arg::new("requests")
                .short('n')
                .long("requests")
                .num_args(1)
                .value_parser(clap::value_parser!(usize))
                .help("Total requests (1-10000)"))
            .arg(Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the load report as JSON on stdout")))
}

fn build_request(matches: &ArgMatches) -> Result<Request, CliError> {
    let url = matches
        .get_one::<String>("url")
        .ok_or_else(|| CliError::Input("--url is required".to_string()))?;
    reqwest::Url::parse(url).map_err(|e| CliError::Input(format!("invalid url {}: {}", url, e)))?;

    let method = matches
        .get_one::<String>("method")
        .map(|m| m.parse::<Method>().unwrap_or_else(|never| match never {}))
        .unwrap_or(Method::GET);
    let mut request = Request::new(method, url.as_str());

    if let Some(headers) = matches.get_many::<String>("header") {
        for raw in headers {
            let (name, value) = raw
                .split_once(':')
                .ok_or_else(|| CliError::Input(format!("header must be 'Name: value', got {:?}", raw)))?;
            request.set_header(name.trim(), value.trim());
        }
    }

    if let Some(data) = matches.get_one::<String>("data") {
        request.body = match serde_json::from_str::<Value>(data) {
            Ok(json) if json.is_object() || json.is_array() => RequestBody::Json(json),
            _ => RequestBody::Text(data.clone()),
        };
    } else if let Some(fields) = matches.get_many::<String>("form") {
        let mut pairs = Vec::new();
        for raw in fields {
            let (key, value) = raw
                .split_once('=')
                .ok_or_else(|| CliError::Input(format!("form field must be key=value, got {:?}", raw)))?;
            pairs.push((key.to_string(), value.to_string()));
        }
        request.body = RequestBody::Form(pairs);
    } else if let Some(encoded) = matches.get_one::<String>("body_base64") {
        let bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| CliError::Input(format!("invalid base64 body: {}", e)))?;
        request.body = RequestBody::Bytes(bytes);
    }

    Ok(request)
}

fn load_config(matches: &ArgMatches) -> Result<EngineConfig, CliError> {
    match matches.get_one::<String>("config") {
        Some(path) => EngineConfig::from_file(path)
            .map_err(|e| CliError::Input(format!("failed to load config {}: {}", path, e))),
        None => Ok(EngineConfig::default()),
    }
}

fn print_results(suite: &str, results: &[TestResult]) {
    println!("\n== {} ({} results) ==", suite, results.len());
    for result in results {
        println!("[{}] {}: {}", result.status, result.name, result.actual);
    }
}

async fn scan(matches: &ArgMatches, config: &EngineConfig) -> Result<(), CliError> {
    let request = build_request(matches)?;
    let suite = matches.get_one::<String>("suite").map(String::as_str).unwrap_or("all");
    let selection = SuiteSelection::only(suite)
        .ok_or_else(|| CliError::Input(format!("unknown suite {}", suite)))?;
    let json_output = matches.get_flag("json");

    let options = TestOptions::from_request(request);
    let counts = count_checks(&options);
    let mut planned = 0;
    if selection.data_driven || selection.performance {
        planned += counts.data_driven;
    }
    if selection.security {
        planned += counts.security;
    }
    if selection.performance {
        planned += counts.performance;
    }
    if !json_output {
        println!(
            "{} checks planned ({} data-driven, {} security, {} performance)",
            planned, counts.data_driven, counts.security, counts.performance
        );
    }

    let completed = Arc::new(AtomicUsize::new(0));
    let hook: Arc<ProbeHook> = Arc::new(move |result: &TestResult| {
        let n = completed.fetch_add(1, Ordering::SeqCst) + 1;
        eprintln!("[{}/{}] {}: {}", n, planned, result.name, result.status);
    });
    let hooks = ProgressHooks::new()
        .on(DATA_DRIVEN_SUITE, Arc::clone(&hook))
        .on(SECURITY_SUITE, Arc::clone(&hook))
        .on(PERFORMANCE_SUITE, hook);

    let transport: Arc<dyn HttpTransport> = Arc::new(HttpEngine::with_config(config)?);
    let report = run_suites(transport, &options, selection, &hooks).await;
    let all = report.all_results();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&all).map_err(ProbeError::from)?);
    } else {
        for (suite, results) in report.by_suite() {
            print_results(suite, results);
        }
    }

    let out_dir = PathBuf::from(
        matches
            .get_one::<String>("out_dir")
            .map(String::as_str)
            .unwrap_or("."),
    );
    let title = format!("{} {}", options.request.method, options.request.url);
    if matches.get_flag("csv_report") {
        let path = export_csv(&all, &out_dir)?;
        eprintln!("CSV report: {}", path.display());
    }
    if matches.get_flag("markdown_report") {
        let path = export_markdown(&title, &all, &out_dir)?;
        eprintln!("Markdown report: {}", path.display());
    }
    if json_output && (matches.get_flag("csv_report") || matches.get_flag("markdown_report")) {
        let path = export_json(&all, &out_dir)?;
        eprintln!("JSON report: {}", path.display());
    }
    Ok(())
}

async fn load(matches: &ArgMatches, config: &EngineConfig) -> Result<(), CliError> {
    let request = build_request(matches)?;
    let threads = matches
        .get_one::<usize>("threads")
        .copied()
        .unwrap_or(config.load.thread_count);
    let requests = matches
        .get_one::<usize>("requests")
        .copied()
        .unwrap_or(config.load.request_count);
    let load_config = LoadTestConfig::new(threads, requests)?;

    let transport: Arc<dyn HttpTransport> = Arc::new(HttpEngine::with_config(config)?);
    let progress: Arc<LoadProgress> = Arc::new(|sent: usize, total: usize| {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\rsent {}/{} ({}%)", sent, total, sent * 100 / total);
        let _ = stderr.flush();
    });
    let cancel = CancellationToken::new();
    let runner = LoadTestRunner::new(transport, load_config)
        .with_progress(progress)
        .with_cancellation(cancel.clone());

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping load test");
            on_interrupt.cancel();
        }
    });

    let report = runner.run(&request).await;
    eprintln!();

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report).map_err(ProbeError::from)?);
    } else {
        let result = report.to_test_result();
        println!("[{}] {}: {}", result.status, result.name, result.actual);
        if let (Some(p90), Some(p95)) = (report.p90, report.p95) {
            println!("p90 {} ms, p95 {} ms, {} transport errors", p90, p95, report.transport_errors);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let log_format = matches
        .get_one::<String>("log_format")
        .and_then(|f| f.parse::<LogFormat>().ok())
        .unwrap_or_default();
    let log_level = matches
        .get_one::<String>("log_level")
        .cloned()
        .unwrap_or_else(|| "info".to_string());
    if let Err(e) = init_logging(&LogConfig { format: log_format, level: log_level }) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let outcome = match load_config(&matches) {
        Ok(config) => match matches.subcommand() {
            Some(("scan", sub)) => scan(sub, &config).await,
            Some(("load", sub)) => load(sub, &config).await,
            _ => Err(CliError::Input("unknown subcommand".to_string())),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        error!(error = %e, "gauntlet failed");
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
