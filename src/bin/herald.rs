//! Herald - terminal demo
//!
//! Shows a spinner and a progress bar on the terminal line while speaking
//! each announcement in turn.

use clap::Parser;
use herald::config::Settings;
use herald::drivers::{CommandSpeech, TerminalDisplay};
use herald::messaging::ProgressConfig;
use herald::{Announcement, AnnouncementOutcome, NotificationCenter};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Herald - announce text on the terminal and through speech
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(version, about, long_about = None)]
struct Args {
    /// Text to announce, in order
    #[arg(required = true)]
    announcements: Vec<String>,

    /// Settings file (defaults to $XDG_CONFIG_HOME/herald/settings.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Severity level 1-9, selects the earcon
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..=9))]
    severity: i32,

    /// Minimum time each announcement stays on the display
    #[arg(long, default_value_t = 1500)]
    duration_ms: u64,

    /// Start muted (display only)
    #[arg(long)]
    mute: bool,

    /// Do not speak, only show and play earcons
    #[arg(long)]
    no_speech: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn init_tracing(args: &Args) {
    let default_filter = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let settings = Settings::load_or_default(args.config.as_deref());
    settings.validate()?;

    let speech = CommandSpeech::detect();
    if !speech.can_speak() && !args.no_speech {
        tracing::warn!("No speech program found, announcements will only be shown");
    }

    let mute = Arc::new(AtomicBool::new(args.mute || settings.audio.muted));
    let center = NotificationCenter::new(
        Arc::new(TerminalDisplay::new()),
        Arc::new(speech),
        mute,
        &settings,
    );

    let composer = center.composer();
    let spinner = composer.create_spinner(None);
    let progress = composer.create_progress(ProgressConfig {
        min: 0.0,
        max: args.announcements.len() as f64,
        show_bar: true,
        show_value: false,
    });

    let duration = Duration::from_millis(args.duration_ms);
    for (done, text) in args.announcements.iter().enumerate() {
        let announcement = Announcement::new(text.clone())
            .severity(args.severity)
            .verbal(!args.no_speech)
            .duration(duration);
        let outcome = center.announce(announcement).await;
        if outcome == AnnouncementOutcome::Abandoned {
            break;
        }
        progress.set_value((done + 1) as f64);
    }

    spinner.hide();
    // Let the final state reach the terminal before tearing down.
    tokio::time::sleep(Duration::from_millis(300)).await;
    center.dispose();
    println!();
    Ok(())
}
