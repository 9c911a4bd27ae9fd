mod auth;
mod browser;
mod config;
mod db;
mod discovery;
mod parser;
mod record;
mod scraper;
mod sink;
mod snapshot;
mod sources;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use config::{PaginationConfig, ScrollConfig, Settings};
use db::SqliteSink;
use record::{or_unknown, NOT_AVAILABLE};
use sources::Site;

#[derive(Parser)]
#[command(name = "hackathon_scraper", about = "Hackathon listing scraper for scroll and paginated sites")]
struct Cli {
    /// SQLite database path (default: $HACKATHONS_DB or data/hackathons.sqlite)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DiscoveryArgs {
    /// Show the browser window
    #[arg(long)]
    headed: bool,
    /// Consecutive no-growth scroll ticks before the list counts as exhausted
    #[arg(long, default_value_t = config::STALL_THRESHOLD)]
    stall_threshold: u32,
    /// Wait after each scroll tick / page advance, in milliseconds
    #[arg(long, default_value_t = config::SETTLE_INTERVAL.as_millis() as u64)]
    settle_ms: u64,
    /// Page cap when walking pages one by one
    #[arg(long, default_value_t = config::MAX_SEQUENTIAL_PAGES)]
    max_pages: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Scroll the Devpost listing to the end and save every hackathon
    Devpost(DiscoveryArgs),
    /// Page through the hack2skill listing and save every hackathon
    Hack2skill(DiscoveryArgs),
    /// Both sites in one browser session
    Run(DiscoveryArgs),
    /// Documents stored per collection
    Stats,
    /// Stored listings, newest first
    List {
        /// Only this collection (e.g. "hackathons/hack2skill/events")
        #[arg(short, long)]
        collection: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

impl DiscoveryArgs {
    fn settings(&self, db_path: PathBuf) -> Settings {
        let settle = Duration::from_millis(self.settle_ms);
        Settings {
            db_path,
            headed: self.headed,
            scroll: ScrollConfig {
                stall_threshold: self.stall_threshold,
                settle,
                ..ScrollConfig::default()
            },
            pagination: PaginationConfig {
                max_pages: self.max_pages,
                settle,
                ..PaginationConfig::default()
            },
            devpost_login: Settings::devpost_credentials(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let db_path = Settings::db_path(cli.db);

    let result = match cli.command {
        Commands::Devpost(args) => scrape(&[Site::Devpost], args.settings(db_path)).await,
        Commands::Hack2skill(args) => scrape(&[Site::Hack2skill], args.settings(db_path)).await,
        Commands::Run(args) => scrape(&Site::ALL, args.settings(db_path)).await,
        Commands::Stats => {
            let sink = SqliteSink::open(&db_path)?;
            let stats = db::get_stats(sink.connection())?;
            if stats.is_empty() {
                println!("No listings stored yet.");
                return Ok(());
            }
            println!("{:<32} | {:>6} | {:>6} | {:<25}", "Collection", "Docs", "Linked", "Last scraped");
            println!("{}", "-".repeat(78));
            for s in &stats {
                println!(
                    "{:<32} | {:>6} | {:>6} | {:<25}",
                    s.collection,
                    s.documents,
                    s.with_link,
                    s.last_scraped.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        Commands::List { collection, limit } => {
            let sink = SqliteSink::open(&db_path)?;
            let rows = db::fetch_overview(sink.connection(), collection.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No listings found.");
                return Ok(());
            }

            for r in &rows {
                println!("#{} {}", r.id, or_unknown(&r.title));
                println!("  Host:         {}", na(&r.host));
                println!("  Status:       {}", or_unknown(&r.status));
                println!("  Prize:        {}", or_unknown(&r.prize));
                println!("  Participants: {}", na(&r.participants));
                println!("  Dates:        {}", or_unknown(&r.dates));
                let tags = if r.tags.is_empty() {
                    "N/A".to_string()
                } else {
                    r.tags.join(", ")
                };
                println!("  Themes:       {}", tags);
                println!("  Link:         {}", r.link.as_deref().unwrap_or(NOT_AVAILABLE));
            }
            println!("\n{} listings", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn scrape(sites: &[Site], settings: Settings) -> anyhow::Result<()> {
    let mut sink = SqliteSink::open(&settings.db_path)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing current step and saving what was found");
            on_ctrl_c.cancel();
        }
    });

    let outcome = scraper::run_sites(sites, &mut sink, &settings, &cancel).await?;
    for s in &outcome.summaries {
        let mut notes = s.stop.to_string();
        if let Some(p) = s.pages {
            notes.push_str(&format!(", {} pages", p));
        }
        if s.report.failed() > 0 {
            notes.push_str(&format!(", {} failed writes", s.report.failed()));
        }
        println!(
            "{}: saved {}/{} hackathons to {} ({})",
            s.site.name(),
            s.report.saved,
            s.report.total,
            s.collection,
            notes
        );
    }
    match outcome.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn na(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("N/A")
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
