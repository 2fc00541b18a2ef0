use anyhow::Result;
use b2_media::b2::classify::file_name_from_path;
use b2_media::b2::{B2Connector, Gateway, LogProgress, ProgressSink, UploadProgress};
use b2_media::cli::Cli;
use b2_media::config::{Config, log_level};
use b2_media::dispatch;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Progress bar on stderr plus one log line per part
struct BarProgress {
    bar: ProgressBar,
    log: LogProgress,
}

impl BarProgress {
    fn new(file_name: &str, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .map(|s| s.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(file_name.to_string());

        Self {
            bar,
            log: LogProgress {
                file_name: file_name.to_string(),
            },
        }
    }
}

impl ProgressSink for BarProgress {
    fn on_progress(&self, progress: &UploadProgress) {
        self.bar.set_length(progress.total);
        self.bar.set_position(progress.loaded);
        self.log.on_progress(progress);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file early to get LOG_LEVEL
    dotenv::dotenv().ok();

    let directive = log_level();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&directive)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    info!("B2 Media Tool v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    let gateway = Gateway::new(config, B2Connector);

    let file_name = cli
        .path
        .as_ref()
        .map(|p| file_name_from_path(&p.to_string_lossy()).to_string())
        .unwrap_or_default();
    let progress = BarProgress::new(&file_name, cli.path.is_some());

    let report = dispatch::run(&gateway, &cli, &progress).await;
    progress.bar.finish_and_clear();

    println!("{}", report.render());

    if let Some(hint) = &report.hint {
        eprintln!("{}", style(hint).yellow());
    }

    std::process::exit(report.exit_code());
}
