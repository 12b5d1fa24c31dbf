use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use dn_core::{ArticleStore, DateWindow, Error, Result, ScrapeConfig};

use crate::http::{Fetcher, ReqwestFetcher};
use crate::manager::{RunSummary, ScraperManager, SourceReport};
use crate::scrapers::SourceKind;

#[derive(Args)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand)]
pub enum ScraperCommands {
    /// Scrape one source, or every active source when none is given
    Scrape {
        /// Source name or alias (e.g. "Figma Blog" or figma-blog)
        source: Option<String>,
        /// First day of the window (YYYY-MM-DD), defaults to 2025-01-01
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day of the window (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Repeat the run every interval, e.g. 1h, 30m or 1h15m30s
        #[arg(long)]
        interval: Option<Interval>,
    },
    /// List available sources
    List,
}

pub async fn handle_command(args: ScraperArgs, store: Arc<dyn ArticleStore>, config: ScrapeConfig) -> Result<()> {
    match args.command {
        ScraperCommands::Scrape {
            source,
            from,
            to,
            interval,
        } => {
            let fetcher = ReqwestFetcher::shared(&config)?;

            match interval {
                None => {
                    let manager = ScraperManager::new(with_window(config, from, to)?, fetcher, store);
                    run_once(&manager, source.as_deref()).await
                }
                Some(Interval(period)) => {
                    with_window(config.clone(), from, to)?;
                    tracing::info!("Running in periodic mode every {}s", period.as_secs());
                    let mut ticker = tokio::time::interval(period);
                    loop {
                        ticker.tick().await;
                        let today = Local::now().date_naive();
                        let tick = run_tick(&config, today, from, to, fetcher.clone(), store.clone(), source.as_deref());
                        if let Err(e) = tick.await {
                            tracing::error!(error = %e, %today, "scheduled scrape failed");
                        }
                    }
                }
            }
        }
        ScraperCommands::List => {
            println!("Available sources:");
            for kind in SourceKind::ALL {
                let metadata = kind.metadata();
                let excluded = if config.excluded_sources.contains(metadata.name) {
                    " (excluded)"
                } else {
                    ""
                };
                println!(
                    "  {} {} [{}] {}{}",
                    metadata.emoji,
                    metadata.name,
                    metadata.category,
                    kind.cli_name(),
                    excluded
                );
            }
            Ok(())
        }
    }
}

async fn run_once(manager: &ScraperManager, source: Option<&str>) -> Result<()> {
    match source {
        Some(name) => {
            let report = manager.extract_one(name).await;
            print_report(&report);
            match report.error {
                Some(e) => Err(Error::Scraping(e.to_string())),
                None => Ok(()),
            }
        }
        None => {
            let summary = manager.extract_all().await;
            print_summary(&summary);
            Ok(())
        }
    }
}

/// One periodic run on `today`. The window follows the calendar unless `--to` pins it.
async fn run_tick(
    base: &ScrapeConfig,
    today: NaiveDate,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ArticleStore>,
    source: Option<&str>,
) -> Result<()> {
    let config = with_window(base.clone().rolled_to(today), from, to)?;
    let manager = ScraperManager::new(config, fetcher, store);
    run_once(&manager, source).await
}

fn print_report(report: &SourceReport) {
    match &report.error {
        Some(e) => eprintln!("❌ {} - {}", report.source, e),
        None => println!("✅ {} - {} found, {} new", report.source, report.count, report.inserted),
    }
}

fn print_summary(summary: &RunSummary) {
    for report in summary.reports.values() {
        print_report(report);
    }
    println!("{}", summary.message());
}

fn with_window(config: ScrapeConfig, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<ScrapeConfig> {
    if from.is_none() && to.is_none() {
        return Ok(config);
    }
    let from = from.unwrap_or(config.window.from);
    let to = to.unwrap_or(config.window.to);
    Ok(config.with_window(DateWindow::new(from, to)?))
}

/// Run period such as `90`, `45s`, `30m`, `1h` or `1h15m30s`. A bare number is seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval(pub Duration);

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();

        for c in s.trim().chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
                continue;
            }
            let num: u64 = current_number
                .parse()
                .map_err(|_| format!("Expected a number before {:?}", c))?;
            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86_400,
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total_seconds = num
                .checked_mul(unit)
                .and_then(|secs| total_seconds.checked_add(secs))
                .ok_or_else(|| format!("Duration {:?} is too large", s))?;
            current_number.clear();
        }

        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(num)
                .ok_or_else(|| format!("Duration {:?} is too large", s))?;
        }
        if total_seconds == 0 {
            return Err("Duration must be greater than zero".to_string());
        }
        Ok(Interval(Duration::from_secs(total_seconds)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: &str) -> u64 {
        s.parse::<Interval>().unwrap().0.as_secs()
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(secs("90"), 90);
        assert_eq!(secs("45s"), 45);
        assert_eq!(secs("30m"), 1800);
        assert_eq!(secs(" 1h "), 3600);
        assert_eq!(secs("1h15m30s"), 4530);
        assert!("0".parse::<Interval>().is_err());
        assert!("1w".parse::<Interval>().is_err());
        assert!("soon".parse::<Interval>().is_err());
        assert!("h".parse::<Interval>().is_err());
    }

    #[test]
    fn test_parse_interval_overflow() {
        assert!("99999999999999999d".parse::<Interval>().is_err());
        assert!("18446744073709551615s1s".parse::<Interval>().is_err());
        assert!("99999999999999999999".parse::<Interval>().is_err());
        assert_eq!(secs("1000d"), 86_400_000);
    }

    #[tokio::test]
    async fn test_periodic_ticks_follow_the_calendar() {
        use crate::http::StaticFetcher;
        use crate::scrapers::feed::fixtures::rss;
        use dn_storage::MemoryStorage;

        let day = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
        let feed = rss(&[("Fresh tokens", "https://prototypr.io/post/fresh", "Sat, 01 Feb 2025 09:00:00 GMT")]);
        let fetcher = StaticFetcher::new()
            .with_page("https://rss.app/feeds/PPd56KV7LlxHucpv.xml", feed)
            .shared();
        let base = ScrapeConfig::for_today(day(1, 31)).without_delays();

        let pinned = MemoryStorage::new();
        let store: Arc<dyn ArticleStore> = Arc::new(pinned.clone());
        run_tick(&base, day(2, 1), None, Some(day(1, 31)), fetcher.clone(), store, Some("prototypr"))
            .await
            .unwrap();
        assert!(pinned.is_empty().await);

        let storage = MemoryStorage::new();
        let store: Arc<dyn ArticleStore> = Arc::new(storage.clone());
        run_tick(&base, day(1, 31), None, None, fetcher.clone(), store.clone(), Some("prototypr"))
            .await
            .unwrap();
        assert!(storage.is_empty().await);

        run_tick(&base, day(2, 1), None, None, fetcher, store, Some("prototypr"))
            .await
            .unwrap();
        assert_eq!(storage.len().await, 1);
    }

    #[test]
    fn test_with_window() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
        let config = ScrapeConfig::for_today(day(31));

        let narrowed = with_window(config.clone(), Some(day(10)), None).unwrap();
        assert_eq!(narrowed.window.from, day(10));
        assert_eq!(narrowed.window.to, day(31));

        assert!(with_window(config, Some(day(20)), Some(day(10))).is_err());
    }
}
