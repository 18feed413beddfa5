use anyhow::{Context, Result};
use clap::Parser;
use job_aggregator::{JobPipeline, JsonFileSink, ListingSink, LogSummarySink, PipelineConfig};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "job-aggregator")]
#[command(about = "Collect camera-department job postings into one ranked list")]
struct Args {
    /// TOML configuration; the built-in Indeed + LinkedIn search is used without it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the ranked listings as JSON
    #[arg(long, default_value = "latest_jobs.json")]
    output: PathBuf,

    /// Override run.max_results
    #[arg(long)]
    max_results: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::from_path(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => {
            info!("No --config given, using the built-in search");
            PipelineConfig::default()
        }
    };
    if let Some(max_results) = args.max_results {
        config.run.max_results = max_results;
    }

    let pipeline = JobPipeline::new(config).map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let (listings, report) = pipeline.run_with_report().await;

    info!(
        "Run {} took {}s",
        report.run_id,
        (report.finished_at - report.started_at).num_seconds()
    );
    for source in &report.sources {
        match &source.error {
            Some(e) => warn!("  {}: failed ({})", source.source, e),
            None => info!(
                "  {}: {} payloads, {} candidates, {} relevant",
                source.source, source.payloads, source.candidates, source.relevant
            ),
        }
    }

    let sinks: Vec<Box<dyn ListingSink>> = vec![
        Box::new(LogSummarySink),
        Box::new(JsonFileSink::new(args.output.clone())),
    ];
    for sink in &sinks {
        if let Err(e) = sink.deliver(&listings).await {
            error!("Sink {} failed: {}", sink.name(), e);
        }
    }

    info!("Job aggregator finished with {} listings", listings.len());
    Ok(())
}
