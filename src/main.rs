use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use node_data_printer::{Config, DomTree, InspectorOutcome, PageEvent, PageInspector};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "node-data-printer",
    version,
    about = "Logs element inventories, newly appeared elements and form history of a page"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect a static HTML file
    Scan {
        /// HTML file to parse
        file: PathBuf,

        /// Number of simulated clicks to run the change detector for
        #[arg(long, default_value_t = 1)]
        clicks: usize,
    },
    /// Attach to a live page in Chrome and log what happens on it
    Watch {
        /// URL to open
        url: String,

        /// Number of polls before exiting; 0 runs until Ctrl+C
        #[arg(long, default_value_t = 0)]
        polls: u64,

        /// Poll interval, overrides session.poll_interval_ms
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Run without a visible window, overrides browser.headless
        #[arg(long)]
        headless: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Scan { file, clicks } => scan(&config, &file, clicks),
        Commands::Watch {
            url,
            polls,
            interval_ms,
            headless,
        } => watch(config, &url, polls, interval_ms, headless).await,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn scan(config: &Config, file: &Path, clicks: usize) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let location = std::fs::canonicalize(file)
        .ok()
        .and_then(|path| url::Url::from_file_path(path).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| format!("file://{}", file.display()));

    let tree = DomTree::parse_html(&html, &location);
    let mut inspector = PageInspector::new(&config.inspector)?;
    inspector.handle_event(&tree, PageEvent::ready());

    let Some(target) = tree.body().or_else(|| tree.root()) else {
        bail!("{} contains no elements", file.display());
    };

    for _ in 0..clicks {
        if let InspectorOutcome::Scan(report) = inspector.handle_event(&tree, PageEvent::click(target, 0.0, 0.0)) {
            info!(
                cycle = report.cycle,
                scanned = report.scanned,
                skipped = report.skipped,
                new = report.new_elements.len(),
                "Detector cycle finished"
            );
        }
    }

    Ok(())
}

/// Command-line flags win over the config file, but only when given.
#[cfg_attr(not(feature = "chrome"), allow(dead_code))]
fn apply_watch_overrides(config: &mut Config, interval_ms: Option<u64>, headless: bool) {
    if headless {
        config.browser.headless = true;
    }
    if let Some(interval_ms) = interval_ms {
        config.session.poll_interval_ms = interval_ms;
    }
}

#[cfg(feature = "chrome")]
async fn watch(
    mut config: Config,
    url: &str,
    polls: u64,
    interval_ms: Option<u64>,
    headless: bool,
) -> anyhow::Result<()> {
    use node_data_printer::InspectorSession;
    use std::time::Duration;

    apply_watch_overrides(&mut config, interval_ms, headless);
    config.validate()?;

    let interval = Duration::from_millis(config.session.poll_interval_ms);
    let mut session = InspectorSession::with_config(config).await?;
    info!(session = %session.session_id(), "Press the dump key in the page to log form history");

    session.attach(url).await?;
    let outcome = session.run(interval, polls).await;
    session.close().await?;
    outcome?;
    Ok(())
}

#[cfg(not(feature = "chrome"))]
async fn watch(
    _config: Config,
    _url: &str,
    _polls: u64,
    _interval_ms: Option<u64>,
    _headless: bool,
) -> anyhow::Result<()> {
    bail!("watch needs the `chrome` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_from_config_survives_missing_flag() {
        let mut config = Config::default();
        config.browser.headless = true;
        config.session.poll_interval_ms = 750;

        apply_watch_overrides(&mut config, None, false);
        assert!(config.browser.headless);
        assert_eq!(config.session.poll_interval_ms, 750);
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.browser.headless = false;

        apply_watch_overrides(&mut config, Some(100), true);
        assert!(config.browser.headless);
        assert_eq!(config.session.poll_interval_ms, 100);
    }

    #[test]
    fn test_cli_parses_watch_flags() {
        let cli = Cli::parse_from(["node-data-printer", "watch", "https://a.test/", "--polls", "3"]);
        match cli.command {
            Commands::Watch { url, polls, interval_ms, headless } => {
                assert_eq!(url, "https://a.test/");
                assert_eq!(polls, 3);
                assert_eq!(interval_ms, None);
                assert!(!headless);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
