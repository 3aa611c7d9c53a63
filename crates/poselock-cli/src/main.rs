//! poselock - kiosk session CLI.
//!
//! Validates kiosk configuration and runs scripted end-to-end session
//! simulations against the simulated ports (synthetic camera, scene-
//! holding classifier, console display). Real camera and model adapters
//! are deployment concerns outside this repository.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use poselock_core::KioskConfig;
use poselock_engine::sim::{ConsoleDisplay, SimClassifier, SyntheticVideo};
use poselock_engine::{InputEvent, SessionRuntime, INPUT_CHANNEL_CAPACITY};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// poselock - pose-password kiosk lock screen
#[derive(Parser, Debug)]
#[command(name = "poselock")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to kiosk configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse and validate the configuration, then print a summary
    Check,

    /// Run a scripted session end-to-end: swipe up, spell the target
    /// password through capture cycles, submit, report
    Simulate {
        /// Tick period in milliseconds (1000 matches the real kiosk)
        #[arg(long, default_value_t = 200)]
        tick_ms: u64,

        /// Print the session summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&cli.log_level)
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check => check(&config),
        Commands::Simulate { tick_ms, json } => simulate(config, tick_ms, json).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<KioskConfig> {
    match path {
        Some(path) => KioskConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(KioskConfig::default()),
    }
}

fn check(config: &KioskConfig) -> Result<()> {
    // `from_file` already validated; re-validate so `check` also covers
    // the built-in defaults path.
    config.validate()?;

    println!("configuration OK");
    println!(
        "  target password: {} ({} letters)",
        "*".repeat(config.session.target_password.chars().count()),
        config.session.target_password.chars().count()
    );
    println!(
        "  capture: grace {}s, interval {}s, threshold {}, tie policy {:?}",
        config.capture.initial_grace_secs,
        config.capture.steady_interval_secs,
        config.capture.confidence_threshold,
        config.capture.tie_policy,
    );
    println!(
        "  video: {}x{}{}",
        config.video.width,
        config.video.height,
        if config.video.mirrored { ", mirrored" } else { "" },
    );
    println!("  classes:");
    for binding in &config.classes {
        println!("    {} -> '{}'", binding.label, binding.key);
    }
    Ok(())
}

async fn simulate(config: KioskConfig, tick_ms: u64, json: bool) -> Result<()> {
    let classifier = Arc::new(SimClassifier::new(
        config.classes.iter().map(|binding| binding.label.clone()),
    ));
    let video = SyntheticVideo::new(&config.video);
    let tick = Duration::from_millis(tick_ms);

    let runtime = SessionRuntime::new(
        config.clone(),
        Arc::clone(&classifier),
        video,
        ConsoleDisplay,
    )
    .with_tick_period(tick);

    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    let session = tokio::spawn(runtime.run(rx));

    // Swipe up to unlock.
    tx.send(InputEvent::GestureStart { y: 500.0 }).await?;
    tx.send(InputEvent::GestureEnd { y: 400.0 }).await?;

    // Hold one pose per capture interval, spelling the target password.
    let grace = u64::from(config.capture.initial_grace_secs);
    let steady = u64::from(config.capture.steady_interval_secs);
    let mut first = true;
    for key in config.session.target_password.chars() {
        let binding = config
            .classes
            .iter()
            .find(|binding| binding.key == key)
            .ok_or_else(|| anyhow!("no class binding for letter '{key}'"))?;
        info!(pose = %binding.label, "holding pose");
        classifier.set_pose(&binding.label);
        let interval = if first { grace } else { steady };
        first = false;
        // Two ticks of slack past the expiry so the capture lands while
        // this pose is still held.
        tokio::time::sleep(tick * u32::try_from(interval + 2)?).await;
    }
    classifier.set_idle();

    // Show the spelled password in the clear, then submit it.
    tx.send(InputEvent::TogglePasswordVisibility).await?;
    tx.send(InputEvent::SubmitPassword).await?;
    tx.send(InputEvent::Shutdown).await?;

    let summary = session.await.context("session task failed")??;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "session {} ended: authorized={} phase={:?} cycles={} samples={} uptime={}s",
            summary.session_id,
            summary.authorized,
            summary.final_phase,
            summary.cycles_completed,
            summary.samples_appended,
            summary.uptime_secs,
        );
    }

    if !summary.authorized {
        return Err(anyhow!("simulated session was not authorized"));
    }
    Ok(())
}
