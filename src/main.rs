// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sign_stream::config::AppConfig;
use sign_stream::data::SessionRecorder;
use sign_stream::model::load_model;
use sign_stream::runner::SessionRunner;
use sign_stream::session::{RecognitionSession, SessionConfig};
use sign_stream::tracking::read_recording;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Sign recognition over recorded hand and pose landmark streams
#[derive(Parser, Debug)]
#[command(name = "sign_stream", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON Lines landmark recording through the recognizer
    Replay {
        #[arg(short, long)]
        input: PathBuf,

        /// Model directory (defaults to the configured one)
        #[arg(short, long)]
        model_dir: Option<PathBuf>,

        /// Where session exports go
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip writing frames.csv and summary.json
        #[arg(long)]
        no_export: bool,
    },

    /// Load and validate a model directory
    CheckModel {
        #[arg(short, long)]
        model_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = AppConfig::load_or_default(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Replay {
            input,
            model_dir,
            output,
            no_export,
        } => {
            let model_dir = model_dir.unwrap_or_else(|| config.paths.model_dir.clone());
            let output = output.unwrap_or_else(|| config.paths.output_dir.clone());
            run_replay(&input, &model_dir, &output, !no_export, &config).await?;
        }
        Commands::CheckModel { model_dir } => {
            let model_dir = model_dir.unwrap_or_else(|| config.paths.model_dir.clone());
            run_check_model(&model_dir)?;
        }
    }

    Ok(())
}

async fn run_replay(input: &Path, model_dir: &Path, output: &Path, export: bool, config: &AppConfig) -> Result<()> {
    let frames = read_recording(input)?;
    let model = load_model(model_dir).with_context(|| format!("Failed to load model from {}", model_dir.display()))?;
    let model_name = model.model.name().to_string();

    let session = RecognitionSession::new(model, SessionConfig::from(config))?;
    let mut recorder = SessionRecorder::new(output, None, session.id(), &model_name);
    let mut handle = SessionRunner::new(session).spawn();

    info!(frames = frames.len(), input = %input.display(), "Replaying recording");

    for frame in frames {
        let timestamp = frame.timestamp();
        handle
            .send_frame(frame.into_landmarks(config.pipeline.mirrored), timestamp)
            .await?;

        while let Some(event) = handle.try_next_event() {
            report(&event);
            recorder.add_frame(event);
        }
        // Let the blocking pool make progress the way a live feed would
        tokio::task::yield_now().await;
    }

    let (remaining, stats) = handle.finish().await;
    for event in remaining {
        report(&event);
        recorder.add_frame(event);
    }
    info!(
        frames = stats.frames,
        commits = stats.commits,
        dropped_inferences = stats.dropped_inferences,
        "Replay finished"
    );

    println!("Transcript: {}", recorder.transcript().text());

    if export {
        let dir = recorder.export()?;
        println!("Session exported to {}", dir.display());
    }

    Ok(())
}

fn report(event: &sign_stream::FrameOutput) {
    if let Some(label) = &event.commit {
        println!("[{:>7} ms] commit {}", event.timestamp.as_millis(), label);
    }
}

fn run_check_model(model_dir: &Path) -> Result<()> {
    let model = load_model(model_dir)?;
    println!("Model: {} ({:?})", model.model.name(), model.model.layout());
    println!("Source: {}", model.source.display());
    println!("Labels ({}): {}", model.labels.len(), model.labels.labels().join(", "));
    Ok(())
}
