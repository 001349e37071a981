//! AgriDoctor - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agridoctor::{
    bootstrap::Bootstrap,
    cli::{Args, Commands, Config, Verbosity},
    doctor::Doctor,
    errors::DetectionError,
    execution::{detect_with_deadline, enrich_with_deadline},
    persistence::{DetectionStore, JsonFileStore},
    pipeline::{BatchItem, BatchOutcome, ClassAdvisory, ImageInput, ItemError, SaveStatus},
    risk::RiskLevel,
    telemetry::{TelemetryCollector, TelemetryDisplay},
    types::EnrichedResult,
};

/// One line of classify output
#[derive(Serialize)]
struct Report {
    #[serde(flatten)]
    item: BatchItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    save: Option<SaveStatus>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("{}", e.red());
        std::process::exit(2);
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let verbosity = effective_verbosity(&args, &config);
    init_logging(verbosity, &config);

    match &args.command {
        Some(Commands::Classes) => list_classes(&args, &config)?,
        Some(Commands::Info { crop, disease }) => show_info(&args, &config, crop, disease)?,
        Some(Commands::History { user, limit }) => show_history(&args, &config, user, *limit)?,
        Some(Commands::Stats { user }) => show_stats(&args, &config, user.as_deref())?,
        Some(Commands::Doctor) => run_doctor(config),
        Some(Commands::Config { write }) => show_config(&args, &config, *write)?,
        None => classify(&args, &config, verbosity).await?,
    }

    Ok(())
}

/// Flags win; otherwise the configured default
fn effective_verbosity(args: &Args, config: &Config) -> Verbosity {
    if args.quiet || args.verbose > 0 {
        args.verbosity()
    } else {
        Verbosity::from_name(&config.telemetry.default_verbosity).unwrap_or(Verbosity::Normal)
    }
}

fn init_logging(verbosity: Verbosity, config: &Config) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| verbosity.log_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if !config.telemetry.color_output {
        colored::control::set_override(false);
    }
}

async fn classify(args: &Args, config: &Config, verbosity: Verbosity) -> Result<()> {
    let telemetry = TelemetryCollector::new();
    let pipeline = Bootstrap::from_config(config)
        .context("Failed to start the detection pipeline")?
        .with_telemetry(telemetry.clone());
    let pipeline = Arc::new(pipeline);

    if args.images.len() > pipeline.max_batch_size() {
        return Err(DetectionError::BatchTooLarge {
            count: args.images.len(),
            max: pipeline.max_batch_size(),
        }
        .into());
    }

    let store: Option<Arc<dyn DetectionStore>> = if args.save {
        let store = JsonFileStore::open(config.detections_dir())
            .context("Failed to open the detection store")?;
        Some(Arc::new(store))
    } else {
        None
    };

    let deadline = Duration::from_secs(config.inference.timeout_sec);
    let show_bar = verbosity.show_progress() && !args.json && args.images.len() > 1;
    let progress = show_bar.then(|| {
        let pb = ProgressBar::new(args.images.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.green/white}] {pos}/{len} | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    });

    let mut reports = Vec::with_capacity(args.images.len());
    for (position, path) in args.images.iter().enumerate() {
        let filename = path.display().to_string();
        if let Some(pb) = &progress {
            pb.set_message(filename.clone());
        }

        let (outcome, save) = match ImageInput::from_path(path) {
            Err(e) => {
                pipeline.record_rejection(&filename, &e);
                (Err(e), None)
            }
            Ok(input) => match &store {
                Some(store) => {
                    let context = args.detection_context(path);
                    match detect_with_deadline(pipeline.clone(), input, store.clone(), context, deadline)
                        .await
                    {
                        Ok(outcome) => (Ok(outcome.result), Some(outcome.save)),
                        Err(e) => (Err(e), None),
                    }
                }
                None => (enrich_with_deadline(pipeline.clone(), input, deadline).await, None),
            },
        };

        let outcome = match outcome {
            Ok(result) => BatchOutcome::Result(Box::new(result)),
            Err(e) => BatchOutcome::Error(ItemError::new(filename.clone(), &e)),
        };

        let report = Report {
            item: BatchItem {
                position,
                filename,
                outcome,
            },
            save,
        };

        if !args.json {
            match &progress {
                Some(pb) => pb.suspend(|| print_report(&report, verbosity)),
                None => print_report(&report, verbosity),
            }
        }
        reports.push(report);

        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        TelemetryDisplay::new(telemetry, verbosity).display_summary();
    }

    if reports.iter().any(|r| !r.item.is_ok()) {
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(report: &Report, verbosity: Verbosity) {
    let item = &report.item;
    match &item.outcome {
        BatchOutcome::Error(error) => {
            println!("{} {}: {}", "✗".red(), error.label, error.reason.red());
        }
        BatchOutcome::Result(result) => {
            let summary = result.summary();
            let summary = match result.risk_assessment.overall_risk {
                RiskLevel::High => summary.red(),
                RiskLevel::Medium => summary.yellow(),
                RiskLevel::Low => summary.green(),
            };
            println!("{} {}: {}", "✓".green(), item.filename, summary);
            print_result_details(result, verbosity);
        }
    }

    match &report.save {
        Some(SaveStatus::Saved { id }) => println!("  Saved as {}", id.as_str().dimmed()),
        Some(SaveStatus::Failed { reason }) => {
            println!("  {} {}", "Save failed:".yellow(), reason)
        }
        None => {}
    }
}

fn print_result_details(result: &EnrichedResult, verbosity: Verbosity) {
    let info = &result.disease_info;
    println!("  {}", info.description);

    print_list("Symptoms", &info.symptoms);
    print_list("Solutions", &info.solutions);
    if verbosity.show_events() {
        print_list("Prevention", &info.prevention);
        print_list("Risk factors", &result.risk_assessment.risk_factors);

        let mut ranked: Vec<_> = result.class_probabilities.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(a.1));
        println!("  Top classes:");
        for (label, probability) in ranked.iter().take(3) {
            println!("    {:<45} {:.2}%", label, *probability * 100.0);
        }
    }

    let supplement = &result.supplement_info;
    if supplement.is_degraded() {
        println!("  Supplement: {}", supplement.name.dimmed());
    } else {
        println!("  Supplement: {} ({})", supplement.name.bold(), supplement.buy_link);
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("  {}:", title);
    for item in items {
        println!("    - {}", item);
    }
}

fn list_classes(args: &Args, config: &Config) -> Result<()> {
    let labels = Bootstrap::load_labels(config).context("Failed to load class labels")?;

    if args.json {
        let names: Vec<&str> = labels.iter().map(|(_, label)| label.as_str()).collect();
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    for (index, label) in labels.iter() {
        println!("{:>3}  {}", index, label);
    }
    Ok(())
}

fn show_info(args: &Args, config: &Config, crop: &str, disease: &str) -> Result<()> {
    let pipeline = Bootstrap::base_pipeline(config).context("Failed to load metadata")?;
    let advisory: ClassAdvisory = pipeline.describe(crop, disease)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&advisory)?);
        return Ok(());
    }

    println!(
        "{} (class {})",
        advisory.predicted_class.as_str().bold(),
        advisory.class_index
    );
    let info = &advisory.disease_info;
    println!("  {}", info.description);
    print_list("Symptoms", &info.symptoms);
    print_list("Solutions", &info.solutions);
    print_list("Prevention", &info.prevention);
    print_list("Risk factors", &info.risk_factors);
    println!("  Supplement: {}", advisory.supplement_info.name);
    Ok(())
}

fn show_history(args: &Args, config: &Config, user: &str, limit: usize) -> Result<()> {
    let store = JsonFileStore::open(config.detections_dir())?;
    let history = store.history(user, limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("No detections for {}", user);
        return Ok(());
    }

    for entry in history {
        println!(
            "{}  {:<45} {:>6.1}%  {:?}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.predicted_disease,
            entry.confidence * 100.0,
            entry.severity
        );
    }
    Ok(())
}

fn show_stats(args: &Args, config: &Config, user: Option<&str>) -> Result<()> {
    let store = JsonFileStore::open(config.detections_dir())?;
    let stats = store.stats(user)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total detections: {}", stats.total_detections);
    println!("High severity:    {}", stats.high_cases);
    if let Some(avg) = stats.avg_confidence {
        println!("Avg confidence:   {:.1}%", avg * 100.0);
    }
    if let Some(users) = stats.total_users {
        println!("Users:            {}", users);
    }
    Ok(())
}

fn run_doctor(config: Config) {
    let checks = Doctor::new(config).run_diagnostics();
    Doctor::display_results(&checks);

    if !Doctor::overall_status(&checks) {
        std::process::exit(1);
    }
}

fn show_config(args: &Args, config: &Config, write: bool) -> Result<()> {
    if !write {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path().context("Cannot locate the home directory")?,
    };
    config.save(&path)?;
    println!("{} {}", "Configuration written to".green(), path.display());
    Ok(())
}
