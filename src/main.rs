use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rowmark::{Input, RestPolicy, RunOptions};
use rowmark_core::config::Config;

#[derive(Parser)]
#[command(name = "rowmark", about = "rowmark: index a text stream into marked rows")]
struct Cli {
    /// Read this file instead of stdin.
    #[arg(long, conflicts_with = "exec")]
    file: Option<PathBuf>,

    /// Keep reading data appended to --file.
    #[arg(long, requires = "file", conflicts_with = "exec")]
    follow: bool,

    /// Run a command and read its stdout, e.g. `--exec journalctl -f`.
    /// Must come last: every following argument belongs to the command.
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    exec: Option<Vec<String>>,

    /// Source id stamped into every row marker.
    #[arg(long, default_value_t = 0)]
    source: u32,

    /// Stream id used in notifications.
    #[arg(long, default_value = "main")]
    stream_id: String,

    /// Write marked-up output to this file.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Emit an unterminated last line as a final row instead of dropping it.
    #[arg(long)]
    flush_rest: bool,

    /// Print notifications to stdout as JSON lines.
    #[arg(long)]
    events: bool,

    /// Override the stream notification delay.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Override the number of postponed notifications before a forced send.
    #[arg(long)]
    max_postponed: Option<u32>,

    /// Load configuration from this file instead of ~/.config/rowmark/config.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write debug logs to /tmp/rowmark-debug.log (tail -f to inspect).
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn input(&mut self) -> Input {
        if let Some(mut command) = self.exec.take().filter(|c| !c.is_empty()) {
            let program = command.remove(0);
            return Input::Exec { program, args: command };
        }
        match self.file.take() {
            Some(path) => Input::File { path, follow: self.follow },
            None => Input::Stdin,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    if cli.debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/rowmark-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("rowmark debug log started, tail -f /tmp/rowmark-debug.log");
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|error| {
            tracing::warn!(%error, "falling back to default config");
            Config::defaults()
        }),
    };

    let mut settings = config.session_settings();
    if let Some(ms) = cli.delay_ms {
        settings.stream.delay = Duration::from_millis(ms);
    }
    if let Some(max) = cli.max_postponed {
        settings.stream.max_postponed = max;
    }
    if cli.flush_rest {
        settings.rest_policy = RestPolicy::Flush;
    }

    let options = RunOptions {
        input: cli.input(),
        stream_id: cli.stream_id.clone().into(),
        source: cli.source,
        output: cli.output.clone(),
        events: cli.events,
        settings,
    };

    let summary = rowmark::run(options).await?;
    tracing::debug!(?summary, "done");
    Ok(())
}
