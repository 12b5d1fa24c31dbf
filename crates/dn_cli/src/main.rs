use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use dn_core::dates::epoch_start;
use dn_core::{ArticleQuery, ArticleStore, DateWindow, ExclusionList, ScrapeConfig};
use dn_inference::{create_summarizer, SummaryEnricher};
use dn_scrapers::cli::{handle_command, Interval, ScraperArgs, ScraperCommands};
use dn_scrapers::logging::init_logging;
use dn_scrapers::SourceKind;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Design and UX news aggregator", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, default_value = "sqlite")]
    storage: String,
    /// Database location, e.g. sqlite:articles.db
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long, default_value = "openai", help = "Summarizer to use. Available models: openai (default), dummy")]
    model: String,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Additional source names to exclude, on top of the defaults
    #[arg(long = "exclude")]
    exclude: Vec<String>,
    #[arg(long, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Scrape one source, or all active sources
    Scrape {
        /// Source name or alias (see `dn list`). If not specified, scrapes all sources.
        #[arg(required = false)]
        source: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Run in periodic mode with the specified interval (e.g. 1h, 30m, 1d, 1h15m30s)
        #[arg(long)]
        interval: Option<Interval>,
    },
    /// List registered sources
    List,
    /// Page through stored articles, newest first
    Browse {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
    },
    /// Generate summaries for articles that lack a useful one
    Summarize {
        #[arg(long)]
        limit: Option<usize>,
    },
}

async fn check_storage(storage: &Arc<dyn ArticleStore>, storage_type: &str) -> dn_core::Result<()> {
    let sources = storage.distinct_sources().await?;
    info!(
        "🏦 Storage backend initialized successfully (using {}, {} sources stored)",
        storage_type,
        sources.len()
    );
    Ok(())
}

async fn check_storage_with_retry(
    storage: &Arc<dyn ArticleStore>,
    storage_type: &str,
    max_retries: u32,
    timeout: Duration,
) -> dn_core::Result<()> {
    let mut retries = 0;
    let mut last_error = None;

    while retries < max_retries {
        match tokio::time::timeout(timeout, check_storage(storage, storage_type)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => last_error = Some(e),
            Err(elapsed) => {
                last_error = Some(dn_core::Error::Storage(format!("Storage health check timed out: {}", elapsed)))
            }
        }
        retries += 1;
        if retries < max_retries {
            info!("Storage health check failed, retrying {}/{}...", retries, max_retries);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| dn_core::Error::Storage("Storage health check failed after all retries".to_string())))
}

fn exclusions(extra: &[String]) -> ExclusionList {
    let defaults = ScrapeConfig::default().excluded_sources;
    ExclusionList::new(defaults.iter().map(str::to_string).chain(extra.iter().cloned()))
}

/// Browsing filters. The date-exempt source is listed regardless of the range.
fn browse_query(
    source: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
    excluded: &ExclusionList,
    page: usize,
    page_size: usize,
) -> dn_core::Result<ArticleQuery> {
    let source = source.map(|s| SourceKind::from_name(&s).map(|k| k.name().to_string()).unwrap_or(s));
    let exempt = source
        .as_deref()
        .and_then(SourceKind::from_name)
        .is_some_and(|k| k.metadata().skip_date_filter);
    let date_range = if exempt {
        None
    } else {
        Some(DateWindow::new(from.unwrap_or_else(epoch_start), to.unwrap_or(today))?)
    };
    Ok(ArticleQuery {
        source,
        date_range,
        exclude_sources: excluded.to_vec(),
        page: page.max(1),
        page_size: page_size.max(1),
    })
}

async fn browse(storage: &Arc<dyn ArticleStore>, query: ArticleQuery, excluded: &ExclusionList) -> dn_core::Result<()> {
    let sources: Vec<String> = storage
        .distinct_sources()
        .await?
        .into_iter()
        .filter(|s| !excluded.contains(s))
        .collect();
    println!("Sources: {}", sources.join(", "));

    let result = storage.query(&query).await?;
    if let (Some(min), Some(max)) = (result.min_date, result.max_date) {
        println!(
            "{} articles between {} and {}",
            result.total_count,
            min.format("%B %d, %Y"),
            max.format("%B %d, %Y")
        );
    }
    for article in &result.items {
        println!();
        println!("{} [{}] {}", article.published_date(), article.source, article.title);
        println!("    {}", article.url);
        let snippet = article.snippet(160);
        if !snippet.is_empty() {
            println!("    {}", snippet);
        }
    }
    let pages = result.total_count.div_ceil(query.page_size).max(1);
    println!();
    println!("Page {} of {}", query.page, pages);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let storage = dn_storage::create_storage(cli.storage.as_str(), cli.database_url.as_deref()).await?;
    info!("💾 Checking storage connection...");
    check_storage_with_retry(&storage, cli.storage.as_str(), 3, Duration::from_secs(10)).await?;

    let excluded = exclusions(&cli.exclude);
    let config = ScrapeConfig::default().with_exclusions(excluded.clone());

    match cli.command {
        Commands::Scrape {
            source,
            from,
            to,
            interval,
        } => {
            info!(
                "🦗 Scraping articles from {}",
                source.as_deref().filter(|s| !s.is_empty()).unwrap_or("all sources")
            );
            let args = ScraperArgs {
                command: ScraperCommands::Scrape {
                    source,
                    from,
                    to,
                    interval,
                },
            };
            handle_command(args, storage, config).await?;
        }
        Commands::List => {
            let args = ScraperArgs {
                command: ScraperCommands::List,
            };
            handle_command(args, storage, config).await?;
        }
        Commands::Browse {
            source,
            from,
            to,
            page,
            page_size,
        } => {
            let query = browse_query(source, from, to, config.today, &excluded, page, page_size)?;
            browse(&storage, query, &excluded).await?;
        }
        Commands::Summarize { limit } => {
            let summarizer = create_summarizer(&cli.model, cli.api_key)?;
            info!("🧠 Summarizer initialized successfully (using {})", summarizer.name());
            let report = SummaryEnricher::new(storage, summarizer)
                .with_exclusions(excluded.to_vec())
                .run(limit)
                .await?;
            println!(
                "Summarized {} of {} articles ({} failed)",
                report.updated, report.pending, report.failed
            );
        }
    }

    Ok(())
}
