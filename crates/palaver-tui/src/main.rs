//! palaver TUI entry point.

use std::path::PathBuf;

use clap::Parser;
use palaver_console::{Runtime, Session, Store, SystemClock};
use palaver_tui::{FileStore, TerminalDriver, loopback};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE: &str = "palaver.log";

/// palaver terminal chat console
#[derive(Parser, Debug)]
#[command(name = "palaver-tui")]
#[command(about = "Multi-conversation terminal chat console")]
#[command(version)]
struct Args {
    /// Account address to connect as
    #[arg(short, long, default_value = "me@localhost/palaver")]
    jid: String,

    /// Default nick in rooms, saved to the configuration
    #[arg(short, long)]
    nick: Option<String>,

    /// Configuration directory (defaults to the platform config directory)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Log filter when `RUST_LOG` is unset
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let dir = args
        .config_dir
        .or_else(FileStore::default_dir)
        .ok_or("no configuration directory, pass --config-dir")?;
    let mut store = FileStore::open(&dir)?;

    // The terminal belongs to the UI, so logs go to a file next to the config.
    // The guard flushes them on exit.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("palaver_console={0},palaver_tui={0}", args.log_level).into());
    let (writer, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, LOG_FILE));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    if let Some(nick) = &args.nick {
        store.config_set("nick", nick, None)?;
    }
    tracing::info!(jid = %args.jid, dir = %dir.display(), "starting");

    let session = Session::new(Box::new(store), Box::new(SystemClock));
    let driver = TerminalDriver::new(loopback::spawn(args.jid))?;

    Ok(Runtime::new(driver, session).run().await?)
}
