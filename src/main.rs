//! Public-Opinion Stock Selection Bot
//!
//! Runs the sentiment pipeline over a list of stocks and persists the
//! accepted selections.

use clap::{Parser, Subcommand};
use opinion_bot::{
    config::{Config, SourceKind},
    error::Result,
    ingest::{FeedAdapter, SearchAdapter, SourceAdapter},
    llm::InferenceClient,
    store::{NullStore, SelectionStore, SqliteStore},
    strategy::Orchestrator,
    types::StockIdent,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "opinion-bot")]
#[command(about = "Public-opinion sentiment analysis for stock selection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a batch of stocks and persist the selections
    Run {
        /// Stocks as CODE or CODE:NAME
        #[arg(required = true)]
        stocks: Vec<String>,
        /// Skip persistence
        #[arg(long)]
        dry_run: bool,
    },
    /// Analyze a single stock and print the verdict
    Analyze {
        /// Stock as CODE or CODE:NAME
        stock: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { stocks, dry_run } => run_batch(config, stocks, dry_run).await,
        Commands::Analyze { stock } => analyze_one(config, stock).await,
    }
}

async fn run_batch(config: Config, stocks: Vec<String>, dry_run: bool) -> anyhow::Result<()> {
    let stocks: Vec<StockIdent> = stocks.iter().map(|s| parse_stock(s)).collect();
    let orchestrator = build_orchestrator(&config)?;

    let store: Box<dyn SelectionStore> = match (&config.database, dry_run) {
        (Some(db), false) => Box::new(SqliteStore::connect(&db.path).await?),
        _ => {
            if dry_run {
                tracing::warn!("dry run: selections will not be persisted");
            }
            Box::new(NullStore)
        }
    };

    let records = orchestrator.run_batch(&stocks, store.as_ref()).await;

    let accepted: Vec<_> = records.iter().filter(|r| r.meets_criteria).collect();
    println!("\nProcessed {} stocks, {} accepted\n", records.len(), accepted.len());
    for record in &accepted {
        println!(
            "  {} ({})  score {:.2}  {}",
            record.stock_code, record.stock_name, record.result.score, record.reason
        );
    }

    Ok(())
}

async fn analyze_one(config: Config, stock: String) -> anyhow::Result<()> {
    let stock = parse_stock(&stock);
    let orchestrator = build_orchestrator(&config)?;

    let record = orchestrator.analyze(&stock).await;

    println!("\nStock: {} ({})", record.stock_code, record.stock_name);
    println!("Decision: {}", if record.meets_criteria { "ACCEPT" } else { "REJECT" });
    println!("Reason: {}", record.reason);
    println!("Score: {:.2}", record.result.score);
    println!("Trend: {:?}", record.result.sentiment_trend);
    println!("Impact: {:?}", record.result.market_impact);
    println!("Confidence: {:.2}", record.result.confidence_level);
    println!("Recommendation: {:?}", record.result.recommendation);
    if !record.result.key_events.is_empty() {
        println!("Key events: {}", record.result.key_events.join(", "));
    }
    if !record.result.risk_factors.is_empty() {
        println!("Risk factors: {}", record.result.risk_factors.join(", "));
    }
    println!("Summary: {}", record.result.summary);

    Ok(())
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();
    for kind in &config.strategy.enabled_sources {
        match kind {
            SourceKind::Feed => {
                // Presence is checked by Config::validate.
                if let Some(feed) = &config.sources.feed {
                    adapters.push(Box::new(FeedAdapter::new(feed, config.strategy.search_depth)?));
                }
            }
            SourceKind::Search => {
                if let Some(search) = &config.sources.search {
                    adapters.push(Box::new(SearchAdapter::new(
                        search,
                        config.strategy.search_depth,
                    )?));
                }
            }
        }
    }

    let inference = InferenceClient::new(config.llm.clone())?;
    Ok(Orchestrator::new(
        config.strategy.clone(),
        inference,
        adapters,
    ))
}

/// Parse `CODE` or `CODE:NAME`; the code doubles as the name when no
/// name is given.
fn parse_stock(raw: &str) -> StockIdent {
    match raw.split_once(':') {
        Some((code, name)) => StockIdent::new(code.trim(), name.trim()),
        None => StockIdent::new(raw.trim(), raw.trim()),
    }
}
