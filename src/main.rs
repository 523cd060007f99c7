use clap::Parser;
use futures::future::join_all;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use contractanalyzer::config::database_path_from_env;
use contractanalyzer::models::{AnalysisReport, StageStatus};
use contractanalyzer::{
    build_provider, read_document, CancellationFlag, Config, ContractAnalyzer, Orchestrator,
    PipelineConfig, Storage,
};

#[derive(Parser, Debug)]
#[command(name = "contractanalyzer")]
#[command(version = "0.1.0")]
#[command(about = "Extract key terms, compliance issues and risks from IT contracts")]
struct Args {
    /// Contract documents to analyze (TXT or Markdown)
    #[arg(required_unless_present = "history")]
    files: Vec<PathBuf>,

    /// List stored reports and exit
    #[arg(long)]
    history: bool,

    /// Output format (json, text, markdown)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Database path for the report history (overrides DATABASE_PATH)
    #[arg(long)]
    database: Option<String>,

    /// Reuse the latest stored report for a document if available
    #[arg(long)]
    cached: bool,

    /// Do not store new reports
    #[arg(long)]
    no_save: bool,

    /// Maximum characters per chunk for oversized documents
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Timeout for each LLM call in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("contractanalyzer=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if args.history {
        let storage = Storage::new(args.database.clone().unwrap_or_else(database_path_from_env))?;
        for summary in storage.list_reports()? {
            println!(
                "{}  {:<40} {:<12} {}",
                summary.analysis_date.format("%Y-%m-%d %H:%M:%S"),
                summary.document_name,
                summary.provider,
                if summary.complete { "complete" } else { "partial" }
            );
        }
        return Ok(());
    }

    // Missing credentials stop here, before any document is read
    let config = Config::from_env()?;

    let pipeline_config = PipelineConfig::from(&config).with_overrides(
        args.chunk_size,
        args.chunk_overlap,
        args.timeout.map(Duration::from_secs),
    );
    pipeline_config.validate()?;

    let database_path = args.database.clone().unwrap_or_else(|| config.database_path.clone());
    let storage = if args.cached || !args.no_save {
        Some(Storage::new(&database_path)?)
    } else {
        None
    };

    let cancellation = CancellationFlag::new();
    {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, skipping remaining stages");
                cancellation.cancel();
            }
        });
    }

    // Parse documents; failed parses never reach the pipeline
    let mut reports: Vec<AnalysisReport> = Vec::new();
    let mut pending = Vec::new();
    let mut unreadable = 0;

    for path in &args.files {
        let document = read_document(path).await;
        if !document.success {
            tracing::error!(
                "Failed to parse {}: {}",
                path.display(),
                document.error.as_deref().unwrap_or("unknown error")
            );
            unreadable += 1;
            continue;
        }

        if args.cached {
            if let Some(storage) = &storage {
                if let Some(report) = storage.latest_report(&document.name)? {
                    tracing::info!(
                        "Using cached report for {} from {}",
                        document.name,
                        report.analysis_date
                    );
                    reports.push(report);
                    continue;
                }
            }
            tracing::info!("No cached report for {}, performing fresh analysis", document.name);
        }

        pending.push(document);
    }

    if !pending.is_empty() {
        let llm = build_provider(&config.provider)?;
        let orchestrator = Orchestrator::new(llm, pipeline_config)?.with_cancellation(cancellation);
        let analyzer = ContractAnalyzer::new(orchestrator)?.with_progress(pending.len() == 1);

        let semaphore = Semaphore::new(config.concurrency_limit.max(1));
        let (semaphore, analyzer) = (&semaphore, &analyzer);
        let runs = pending.iter().map(|document| async move {
            let _permit = semaphore.acquire().await.ok();
            analyzer.analyze(document).await
        });
        let results = join_all(runs).await;

        for (document, result) in pending.iter().zip(results) {
            match result {
                Ok(report) => {
                    if let (Some(storage), false) = (&storage, args.no_save) {
                        storage.save_report(&report)?;
                        tracing::info!("Report for {} saved to {}", document.name, database_path);
                    }
                    reports.push(report);
                }
                Err(e) => tracing::error!("Analysis of {} failed: {}", document.name, e),
            }
        }
    }

    if reports.is_empty() {
        anyhow::bail!("No documents were analyzed ({} unreadable)", unreadable);
    }

    output_reports(&reports, &args)?;

    Ok(())
}

fn output_reports(reports: &[AnalysisReport], args: &Args) -> anyhow::Result<()> {
    let output = match args.format.as_str() {
        "json" if reports.len() == 1 => serde_json::to_string_pretty(&reports[0])?,
        "json" => serde_json::to_string_pretty(reports)?,
        "markdown" => reports.iter().map(format_markdown).collect::<Vec<_>>().join("\n"),
        _ => reports.iter().map(format_text).collect::<Vec<_>>().join("\n"),
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn section_title(stage: &str) -> String {
    stage
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn error_message(value: &Value) -> Option<&str> {
    value.get("error").and_then(|e| e.as_str())
}

fn status_marker(status: &StageStatus) -> &'static str {
    match status.status.as_str() {
        "success" => "",
        "extraction_fallback" => " (unstructured)",
        "failure" => " (failed)",
        _ => " (skipped)",
    }
}

fn format_text(report: &AnalysisReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n=== Contract Analysis: {} ===\n\n",
        report.document_name
    ));
    output.push_str(&format!("Provider: {}\n", report.provider));
    if let Some(ref chunking) = report.chunking {
        output.push_str(&format!(
            "Note: document has {} characters; only the first {} of {} chunks were analyzed\n",
            chunking.document_chars, chunking.analyzed_chunks, chunking.total_chunks
        ));
    }

    for (status, value) in report.ordered_sections() {
        output.push_str(&format!(
            "\n--- {}{} ---\n",
            section_title(&status.stage),
            status_marker(status)
        ));

        match (status.status.as_str(), value) {
            ("failure" | "skipped", _) => {
                output.push_str(&format!(
                    "  Unavailable: {}\n",
                    error_message(value).unwrap_or("unknown error")
                ));
            }
            (_, Value::String(text)) => {
                output.push_str(text);
                output.push('\n');
            }
            _ => {
                output.push_str(&serde_json::to_string_pretty(value).unwrap_or_default());
                output.push('\n');
            }
        }
    }

    output.push_str(&format!(
        "\nAnalyzed on: {}\n",
        report.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn format_markdown(report: &AnalysisReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Contract Analysis: {}\n\n", report.document_name));

    output.push_str("| Section | Status |\n|---------|--------|\n");
    for status in &report.stages {
        output.push_str(&format!(
            "| {} | {} |\n",
            section_title(&status.stage),
            status.status
        ));
    }

    if let Some(ref chunking) = report.chunking {
        output.push_str(&format!(
            "\n> Only the first {} of {} chunks ({} of {} characters) were analyzed.\n",
            chunking.analyzed_chunks,
            chunking.total_chunks,
            chunking.analyzed_chars,
            chunking.document_chars
        ));
    }

    for (status, value) in report.ordered_sections() {
        output.push_str(&format!("\n## {}\n\n", section_title(&status.stage)));

        match (status.status.as_str(), value) {
            ("failure" | "skipped", _) => {
                output.push_str(&format!(
                    "**Unavailable:** {}\n",
                    error_message(value).unwrap_or("unknown error")
                ));
            }
            (_, Value::String(text)) => {
                output.push_str(text);
                output.push('\n');
            }
            _ => {
                output.push_str("```json\n");
                output.push_str(&serde_json::to_string_pretty(value).unwrap_or_default());
                output.push_str("\n```\n");
            }
        }
    }

    output.push_str(&format!(
        "\n---\n*Analyzed on {} with {}*\n",
        report.analysis_date.format("%Y-%m-%d %H:%M:%S UTC"),
        report.provider
    ));

    output
}
