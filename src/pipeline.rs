use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tracing::{error, info, info_span, warn, Instrument};

use crate::db::{Sink, Upsert};
use crate::fetch::{fetch, PageSource, RetryPolicy};
use crate::parser::detail::parse_entry;
use crate::parser::listing::parse_listing;
use crate::record::{normalize, Pokemon, RawRow};

pub const LISTING_URL: &str = "https://pokemondb.net/pokedex/all";
pub const ORIGIN: &str = "https://pokemondb.net";

/// Random pause between rows, drawn uniformly from `min..=max`.
#[derive(Debug, Clone)]
pub struct Throttle {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(3),
        }
    }
}

impl Throttle {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    fn pick(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::rng().random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub listing_url: String,
    /// Prepended verbatim to each row's detail path.
    pub origin: String,
    pub retry: RetryPolicy,
    pub throttle: Throttle,
    pub limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            listing_url: LISTING_URL.to_string(),
            origin: ORIGIN.to_string(),
            retry: RetryPolicy::default(),
            throttle: Throttle::default(),
            limit: None,
        }
    }
}

/// Counters returned after a run.
#[derive(Debug, Default)]
pub struct Summary {
    /// Listing rows processed, whatever their outcome.
    pub attempted: usize,
    /// Rows written to the store (inserted or updated).
    pub scraped: usize,
    pub duplicates: usize,
    pub skipped: usize,
    /// Every record that normalized, saved or not.
    pub records: Vec<Pokemon>,
}

enum RowOutcome {
    FetchFailed,
    Invalid,
    Saved(Pokemon),
    Duplicate(Pokemon),
    SaveFailed(Pokemon),
}

/// Fetch the listing, then fetch, parse, normalize and persist each row in order.
///
/// Fails only when the listing itself can't be fetched or parsed; per-row
/// failures are logged and the row is skipped.
pub async fn run<S: PageSource, K: Sink>(
    source: &S,
    sink: &mut K,
    config: &PipelineConfig,
) -> Result<Summary> {
    info!("Fetching listing: {}", config.listing_url);
    let html = fetch(source, &config.listing_url, &config.retry)
        .await
        .context("Error fetching listing page")?;
    let mut rows = parse_listing(&html).context("Error parsing listing page")?;
    if let Some(n) = config.limit {
        rows.truncate(n);
    }
    info!("Listing has {} rows", rows.len());

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut summary = Summary::default();
    for raw in rows {
        summary.attempted += 1;
        let span = info_span!("row", id = %raw.id, name = %raw.name);
        let name = raw.name.clone();

        match process_row(source, sink, config, raw).instrument(span).await {
            RowOutcome::FetchFailed => {
                pb.suspend(|| println!("Failed to fetch entry page for {}", name));
                summary.skipped += 1;
            }
            RowOutcome::Invalid => summary.skipped += 1,
            RowOutcome::Saved(record) => {
                summary.scraped += 1;
                pb.suspend(|| println!("{}, scraped count: {}", record.name, summary.scraped));
                summary.records.push(record);
            }
            RowOutcome::Duplicate(record) => {
                summary.duplicates += 1;
                pb.suspend(|| {
                    println!("Duplicate entry for Pokémon ID {}. Skipping...", record.id)
                });
                summary.records.push(record);
            }
            RowOutcome::SaveFailed(record) => {
                summary.skipped += 1;
                summary.records.push(record);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Attempted {} rows ({} saved, {} duplicates, {} skipped)",
        summary.attempted, summary.scraped, summary.duplicates, summary.skipped
    );
    println!("--------------------------------------------Done----------------------------------");
    println!(
        "Attempted {} rows: {} normalized, {} saved.",
        summary.attempted,
        summary.records.len(),
        summary.scraped
    );

    Ok(summary)
}

async fn process_row<S: PageSource, K: Sink>(
    source: &S,
    sink: &mut K,
    config: &PipelineConfig,
    raw: RawRow,
) -> RowOutcome {
    let url = format!("{}{}", config.origin, raw.details_path);
    let html = match fetch(source, &url, &config.retry).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Skipping row: {}", e);
            return RowOutcome::FetchFailed;
        }
    };

    let entry = parse_entry(&html);
    let outcome = match normalize(raw, entry) {
        Err(e) => {
            error!("Skipping row: {}", e);
            RowOutcome::Invalid
        }
        Ok(record) => match sink.upsert(&record) {
            Ok(Upsert::Inserted | Upsert::Updated) => RowOutcome::Saved(record),
            Ok(Upsert::Duplicate) => RowOutcome::Duplicate(record),
            Err(e) => {
                error!("Failed to save id {}: {:#}", record.id, e);
                RowOutcome::SaveFailed(record)
            }
        },
    };

    tokio::time::sleep(config.throttle.pick()).await;
    outcome
}

// ── Tests ──
