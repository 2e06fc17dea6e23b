mod cli;
mod config;
mod core;
mod error;

use crate::cli::{Cli, Commands, Overrides};
use crate::config::Settings;
use crate::core::{
    FinalReport, OpenAiInsightAgent, Pipeline, PipelineOptions, RunSummary,
    YouTubeCommentsClient, extract_video_id, merge_results, storage,
};
use crate::error::Result;
use clap::Parser;
use std::io::{self, Write};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = Settings::from_env()?;
    apply_overrides(&mut settings, cli.overrides);

    match cli.command {
        Some(Commands::Fetch { video }) => {
            run_fetch(&settings, &video).await?;
        }
        Some(Commands::Analyze) => {
            run_analyze(&settings).await?;
        }
        Some(Commands::Run { video }) => {
            run_fetch(&settings, &video).await?;
            run_analyze(&settings).await?;
        }
        Some(Commands::Merge) => {
            run_merge(&settings).await?;
        }
        Some(Commands::Show) => {
            run_show(&settings).await?;
        }
        None => {
            let video = prompt_video_url()?;
            run_fetch(&settings, &video).await?;
            run_analyze(&settings).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "commentlens=debug,info" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn apply_overrides(settings: &mut Settings, overrides: Overrides) {
    if let Some(path) = overrides.comments {
        settings.comments_path = path;
    }
    if let Some(path) = overrides.raw_results {
        settings.raw_results_path = path;
    }
    if let Some(path) = overrides.report {
        settings.final_results_path = path;
    }
    if let Some(chunk_size) = overrides.chunk_size {
        settings.chunk_size = chunk_size;
    }
    if let Some(model) = overrides.model {
        settings.agent.model = model;
    }
    if let Some(max_iter) = overrides.max_iter {
        settings.agent.max_iterations = max_iter;
    }
    if let Some(max_rpm) = overrides.max_rpm {
        settings.agent.max_rpm = max_rpm;
    }
    if let Some(secs) = overrides.timeout {
        settings.timeout = Some(Duration::from_secs(secs));
    }
}

fn prompt_video_url() -> Result<String> {
    print!("Enter YouTube URL: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn run_fetch(settings: &Settings, video_input: &str) -> Result<()> {
    let video_id = extract_video_id(video_input)
        .ok_or_else(|| error::Error::custom("Invalid video URL or ID"))?;

    info!(video_id = %video_id, "Fetching comments");

    let client = YouTubeCommentsClient::new(settings.require_youtube_key()?);
    let comments = client.fetch_comments(&video_id).await?;
    storage::save_comments(&settings.comments_path, &comments).await?;

    println!(
        "Saved {} comments to {}",
        comments.len(),
        settings.comments_path.display()
    );
    Ok(())
}

async fn run_analyze(settings: &Settings) -> Result<()> {
    let agent = OpenAiInsightAgent::new(&settings.agent)?;
    let mut pipeline = Pipeline::new(agent, PipelineOptions::from(settings));

    let summary = pipeline.run().await?;
    print_summary(&summary);
    Ok(())
}

async fn run_merge(settings: &Settings) -> Result<()> {
    let entries = storage::read_results(&settings.raw_results_path).await?;
    let report = merge_results(&entries);
    storage::write_report(&settings.final_results_path, &report).await?;

    println!(
        "Merged {} stored results into {}",
        entries.len(),
        settings.final_results_path.display()
    );
    print_counts(&report);
    Ok(())
}

async fn run_show(settings: &Settings) -> Result<()> {
    let report = storage::load_report(&settings.final_results_path).await?;
    println!("Report: {}", settings.final_results_path.display());
    print_counts(&report);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let elapsed = summary.finished_at - summary.started_at;

    println!(
        "Analyzed {} comments in {} chunks ({} stored, {} failed) in {}s",
        summary.comments,
        summary.chunks,
        summary.stored,
        summary.failures.len(),
        elapsed.num_seconds()
    );
    for failure in &summary.failures {
        println!("  task {:<4} {}", failure.index + 1, failure.reason);
    }

    match &summary.report_path {
        Some(path) => println!("Report saved to: {}", path.display()),
        None => println!("Report could not be written; see the log above."),
    }
    print_counts(&summary.report);
}

fn print_counts(report: &FinalReport) {
    println!();
    for (theme, count) in report.counts() {
        println!("{:<16} {}", theme.name(), count);
    }
    println!("{:<16} {}", "Total", report.total_insights());
}
