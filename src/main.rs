use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mc_scan_rs::config::ScanConfig;
use mc_scan_rs::controller::Controller;
use mc_scan_rs::query::{FilterCriteria, QueryPage, SortKey, DEFAULT_PAGE_SIZE};
use mc_scan_rs::scanner::DEFAULT_CONCURRENCY;
use mc_scan_rs::server;
use mc_scan_rs::session::SessionStatus;

/// mc-scan-rs — Bounded-concurrency Minecraft server status scanner with a tiny embedded web API.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mc-scan-rs",
    version,
    about = "Bounded-concurrency Minecraft server status scanner with a tiny embedded web API.",
    long_about = None
)]
struct Cli {
    /// Target list: URL or path to a JSON array of {"ip": ...} objects. Falls back to the bundled list.
    #[arg(long, env = "MC_SCAN_SOURCE")]
    source: Option<String>,

    /// Max concurrent status probes.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Base URL of the status service.
    #[arg(long = "api-base", env = "MC_SCAN_API_BASE", default_value = mc_scan_rs::probe::DEFAULT_API_BASE)]
    api_base: String,

    /// Per-request timeout in milliseconds (unbounded if omitted).
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Substring of the server address.
    #[arg(long)]
    search: Option<String>,

    /// Substring of the version label.
    #[arg(long = "version-filter")]
    version_filter: Option<String>,

    /// Substring of the message of the day.
    #[arg(long)]
    motd: Option<String>,

    #[arg(long = "min-players", default_value_t = 0)]
    min_players: u32,

    #[arg(long = "max-players", default_value_t = 0)]
    max_players: u32,

    /// Hide servers with no players online.
    #[arg(long = "hide-empty", default_value_t = false)]
    hide_empty: bool,

    /// players-desc, players-asc, ip-asc or ip-desc.
    #[arg(long, default_value_t = SortKey::PlayersDesc)]
    sort: SortKey,

    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long = "page-size", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Write the full result set as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Serve the JSON API (and static UI) instead of exiting after one scan.
    #[arg(long = "serve-ui", default_value_t = false)]
    serve_ui: bool,

    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Directory with static UI files.
    #[arg(long = "ui-dir", default_value = "ui")]
    ui_dir: PathBuf,
}

impl Cli {
    fn config(&self) -> ScanConfig {
        ScanConfig {
            source: self.source.clone(),
            concurrency: self.concurrency,
            api_base: self.api_base.clone(),
            timeout_ms: self.timeout_ms,
            page_size: self.page_size,
        }
    }

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            search: self.search.clone().unwrap_or_default(),
            version: self.version_filter.clone().unwrap_or_default(),
            motd: self.motd.clone().unwrap_or_default(),
            min_players: self.min_players,
            max_players: self.max_players,
            hide_empty: self.hide_empty,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mc_scan_rs=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    println!("mc-scan-rs configuration:");
    println!(
        "  source       : {}",
        cli.source.as_deref().unwrap_or("<bundled servers.json>")
    );
    println!("  concurrency  : {}", config.effective_concurrency());
    println!("  api_base     : {}", config.api_base);
    println!(
        "  timeout_ms   : {}",
        cli.timeout_ms
            .map(|t| t.to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    println!("  sort         : {}", cli.sort);
    println!("  serve_ui     : {}", cli.serve_ui);

    let controller = Controller::from_config(&config).await?;
    controller.set_filter(cli.criteria()).await;
    controller.set_sort(cli.sort).await;
    controller.set_page(cli.page).await;

    // Ctrl-C stops claiming new targets; in-flight probes still land.
    let stopper = controller.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop_scan().await;
        }
    });

    if cli.serve_ui {
        let status = controller.status().await;
        if status.total > 0 {
            controller.start_scan(true).await?;
        }
        println!("Serving API at http://{} (Ctrl+C to stop scanning)", cli.bind);
        server::spawn_server(&cli.bind, controller, &cli.ui_dir).await?;
        return Ok(());
    }

    controller.start_scan(true).await?;
    controller.wait().await;

    let status = controller.status().await;
    let page = controller.view().await;
    print_results_table(&status, &page);

    if let Some(path) = cli.output.as_deref() {
        let records = controller.snapshot().await;
        match write_results_json(path, &records) {
            Ok(()) => println!("Wrote JSON results to {}", path.display()),
            Err(e) => eprintln!("Failed to write JSON to {}: {e:#}", path.display()),
        }
    }

    Ok(())
}

fn print_results_table(status: &SessionStatus, page: &QueryPage) {
    println!(
        "\nSource: {}  Checked: {}/{} ({}%)  Online found: {}  State: {:?}",
        status.source,
        status.checked,
        status.total,
        status.progress_percent,
        status.online_found,
        status.state
    );
    println!(
        "Matches: {}  Page {} of {}",
        page.matches, page.page, page.page_count
    );

    let mut ip_w = "address".len();
    let mut ver_w = "version".len();
    for r in &page.items {
        ip_w = ip_w.max(r.display_identity().len());
        ver_w = ver_w.max(r.version_label().len().min(24));
    }
    let players_w = "players".len().max(9);
    let port_w = "port".len().max(5);

    println!(
        "{:<ip_w$}  {:>players_w$}  {:<ver_w$}  {:>port_w$}  motd",
        "address", "players", "version", "port"
    );
    println!(
        "{:-<ip_w$}  {:-<players_w$}  {:-<ver_w$}  {:-<port_w$}  ----",
        "", "", "", ""
    );
    for r in &page.items {
        let players = format!("{}/{}", r.players_online, r.players_max);
        let version: String = r.version_label().chars().take(24).collect();
        let motd: String = r.motd_label().replace('\n', " ").chars().take(60).collect();
        println!(
            "{:<ip_w$}  {:>players_w$}  {:<ver_w$}  {:>port_w$}  {}",
            r.display_identity(),
            players,
            version,
            r.port_label(),
            motd
        );
    }
}

fn write_results_json(path: &Path, records: &[mc_scan_rs::types::StatusRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, records)?;
    Ok(())
}
