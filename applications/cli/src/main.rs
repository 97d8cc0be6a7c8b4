/// DDEX Courier - build, validate and deliver ERN release packages
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use courier_core::format_duration;
use courier_pipeline::{
    validate_document, CourierConfig, DeliveryTarget, Pipeline, PreparedBatch, RunReport,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "ddex_courier=info,courier_pipeline=info,courier_delivery=info,courier_assets=info,courier_ern=info,courier_ingest=info";

#[derive(Parser)]
#[command(name = "ddex-courier")]
#[command(version, about = "Build, validate and deliver DDEX ERN release packages", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./courier.toml when present)
    #[arg(short, long, global = true, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare every record of the spreadsheet and deliver the packages
    Run {
        /// Project name; batches go to <output_dir>/<project>
        #[arg(short, long)]
        project: String,
        /// Release spreadsheet (overrides paths.input_file)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Upload without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Validate a generated document against the configured schema
    Validate {
        /// Document path
        xml: PathBuf,
        /// Schema path or URL (overrides schema.location)
        #[arg(short, long)]
        schema: Option<String>,
    },
    /// Build and validate packages without delivering them
    Build {
        /// Release spreadsheet
        #[arg(short, long)]
        input: PathBuf,
        /// Project name
        #[arg(short, long, default_value = "")]
        project: String,
    },
    /// Show how a spreadsheet duration is written into documents
    Duration {
        /// Duration text, e.g. 3:45 or 0:03:45
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            project,
            input,
            yes,
        } => {
            run(cli.config.as_deref(), &project, input, yes).await?;
        }
        Commands::Validate { xml, schema } => {
            validate(cli.config.as_deref(), &xml, schema).await?;
        }
        Commands::Build { input, project } => {
            build(cli.config.as_deref(), input, &project).await?;
        }
        Commands::Duration { value } => {
            println!("{}", format_duration(&value));
        }
    }

    Ok(())
}

async fn run(
    config_path: Option<&Path>,
    project: &str,
    input: Option<PathBuf>,
    yes: bool,
) -> anyhow::Result<()> {
    let mut config = CourierConfig::load(config_path)?;
    if input.is_some() {
        config.paths.input_file = input;
    }

    let pipeline = Pipeline::new(config)?;
    tracing::info!(project, "Starting process");

    let report = pipeline
        .process_and_upload(project, |prepared| yes || confirm(prepared))
        .await;
    print_summary(&report);

    if !report.success {
        bail!(
            "run failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn validate(config_path: Option<&Path>, xml: &Path, schema: Option<String>) -> anyhow::Result<()> {
    let mut config = CourierConfig::load(config_path)?;
    if let Some(schema) = schema {
        config.schema.location = schema;
    }

    let report = validate_document(&config, xml).await?;
    if report.valid {
        println!("{}: valid", xml.display());
        return Ok(());
    }

    println!("{}: invalid", xml.display());
    for diagnostic in &report.diagnostics {
        println!("  {diagnostic}");
    }
    bail!("{} failed schema validation", xml.display())
}

async fn build(config_path: Option<&Path>, input: PathBuf, project: &str) -> anyhow::Result<()> {
    let mut config = CourierConfig::load(config_path)?;
    config.paths.input_file = Some(input);
    // nothing is delivered, so any target will do
    config.delivery.target = DeliveryTarget::Local;
    config.delivery.local_root = Some(config.paths.output_dir.clone());

    let pipeline = Pipeline::new(config)?;
    let prepared = pipeline
        .prepare(project)
        .await
        .context("Failed to prepare batch")?;

    for record in &prepared.records {
        let status = match (&record.document, record.document_valid()) {
            (Some(_), true) => "valid",
            (Some(_), false) => "INVALID",
            (None, _) => "not built",
        };
        println!("{:<10} {}", status, record.record.describe());
    }
    println!(
        "\n{} file(s) ready in {}",
        prepared.queue.len(),
        prepared.batch.batch_root().display()
    );
    println!("Status log: {}", prepared.status_log().path().display());
    Ok(())
}

/// List the queued files and ask on stdin
fn confirm(prepared: &PreparedBatch) -> bool {
    println!("Files ready for upload:");
    for queued in &prepared.queue {
        println!("  {}", queued.path.display());
    }
    if prepared.queue.is_empty() {
        println!("  (none)");
    }

    print!("Proceed with upload? (y/n): ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("Run {}", report.run_id);
    println!("  tracks processed: {}", report.processed_tracks.len());
    for track in &report.processed_tracks {
        let status = if track.document_valid { "valid" } else { "INVALID" };
        println!("    {} {} ({status})", track.upc, track.title);
    }
    if report.approved {
        println!(
            "  delivered: {}, skipped: {}, failed: {}",
            report.delivered_count(),
            report.skipped_count(),
            report.failed_count()
        );
    } else if report.success {
        println!("  upload cancelled");
    }
    if let Some(log) = &report.status_log {
        println!("  status log: {}", log.display());
    }
}
