mod db;
mod fetch;
mod parser;
mod pipeline;
mod record;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use db::Store;
use pipeline::{PipelineConfig, Throttle};

/// Append-only log receiving ERROR events.
const ERROR_LOG: &str = "scraper.log";

#[derive(Parser)]
#[command(name = "pokedex_scraper", about = "Pokédex scraper for pokemondb.net")]
struct Cli {
    /// SQLite database holding the pokemon collection
    #[arg(long, global = true, default_value = db::DB_PATH)]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the listing and every detail page, upserting into the store
    Run {
        /// Only process the first N listing rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Skip the random pause between rows
        #[arg(long)]
        no_throttle: bool,
    },
    /// Show store statistics
    Stats,
    /// Stored Pokémon overview table
    Overview {
        /// Filter by type (e.g. "Fire")
        #[arg(short = 't', long = "type")]
        type_: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Print one stored document as JSON
    Show { id: u32 },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { limit, no_throttle } => {
            let mut store = Store::connect(&cli.db)?;
            let source = fetch::HttpSource::new()?;
            let config = PipelineConfig {
                limit,
                throttle: if no_throttle {
                    Throttle::none()
                } else {
                    Throttle::default()
                },
                ..Default::default()
            };
            pipeline::run(&source, &mut store, &config).await.map(|_| ())
        }
        Commands::Stats => {
            let store = Store::connect(&cli.db)?;
            println!("Documents: {}", store.count()?);
            let types = store.type_counts()?;
            if !types.is_empty() {
                println!("\n--- Types ---");
                for (t, n) in types {
                    println!("  {:<10} {:>4}", t, n);
                }
            }
            Ok(())
        }
        Commands::Overview { type_, limit } => {
            let store = Store::connect(&cli.db)?;
            let rows = store.overview(type_.as_deref(), Some(limit))?;
            if rows.is_empty() {
                println!("No Pokémon stored. Run 'run' first.");
                return Ok(());
            }

            println!(
                "{:>4} | {:<24} | {:<16} | {:>5} | {:>3} | {:>3} | {:>3} | {:>3} | {:>3} | {:>3}",
                "#", "Name", "Types", "Total", "HP", "Atk", "Def", "SpA", "SpD", "Spe"
            );
            println!("{}", "-".repeat(96));

            for p in &rows {
                println!(
                    "{:>4} | {:<24} | {:<16} | {:>5} | {:>3} | {:>3} | {:>3} | {:>3} | {:>3} | {:>3}",
                    p.id,
                    truncate(&p.name, 24),
                    truncate(&p.types.join("/"), 16),
                    p.total,
                    p.hp,
                    p.attack,
                    p.defense,
                    p.sp_attack,
                    p.sp_defense,
                    p.speed
                );
            }

            println!("\n{} Pokémon | detail: {}<details_path>", rows.len(), pipeline::ORIGIN);
            Ok(())
        }
        Commands::Show { id } => {
            let store = Store::connect(&cli.db)?;
            match store.get(id)? {
                Some(p) => println!("{}", serde_json::to_string_pretty(&p)?),
                None => println!("No Pokémon with id {}.", id),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn init_logging() -> Result<()> {
    let error_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(ERROR_LOG)
        .with_context(|| format!("Failed to open {}", ERROR_LOG))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(error_log))
                .with_ansi(false)
                .with_filter(LevelFilter::ERROR),
        )
        .init();
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_names() {
        assert_eq!(truncate("Pikachu", 24), "Pikachu");
        assert_eq!(truncate("Grass/Poison", 5), "Grass...");
    }

    #[test]
    fn durations_read_naturally() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(754)), "12m 34s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 2m 3s");
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from(["pokedex_scraper", "--db", "x.sqlite", "run", "-n", "5", "--no-throttle"])
            .unwrap();
        assert_eq!(cli.db, PathBuf::from("x.sqlite"));
        assert!(matches!(
            cli.command,
            Commands::Run { limit: Some(5), no_throttle: true }
        ));
    }

    #[test]
    fn cli_defaults_db_path() {
        let cli = Cli::try_parse_from(["pokedex_scraper", "overview", "--type", "Fire"]).unwrap();
        assert_eq!(cli.db, PathBuf::from(db::DB_PATH));
        assert!(matches!(
            cli.command,
            Commands::Overview { type_: Some(ref t), limit: 50 } if t == "Fire"
        ));
    }
}
