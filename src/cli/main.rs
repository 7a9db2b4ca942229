use anyhow::Context;
use chat_history_search::config::Config;
use chat_history_search::search::{
    DateRange, ElasticsearchClient, HealthChecker, IndexManager, JsonFileSource, SearchQuery,
    SearchService, SyncService,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "chs-index")]
#[command(about = "Chat history search index administration", long_about = None)]
struct Cli {
    /// Configuration file; defaults and CHAT_SEARCH__* variables still apply
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show index existence and store health
    Status,

    /// Create missing indices
    Init,

    /// Delete and recreate all indices
    Recreate {
        /// Confirm that all indexed data may be deleted
        #[arg(long)]
        yes: bool,
    },

    /// Check store health, optionally waiting until it is reachable
    Health {
        /// Seconds to wait for a healthy store
        #[arg(short, long)]
        wait: Option<u64>,
    },

    /// Run a search against the conversation index
    Search {
        #[arg(value_name = "QUERY", default_value = "")]
        query: String,

        #[arg(short, long)]
        user_id: Option<Uuid>,

        #[arg(short = 'P', long)]
        provider: Option<String>,

        #[arg(short, long)]
        tag_id: Option<Uuid>,

        /// Earliest creation date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Latest creation date (YYYY-MM-DD), inclusive
        #[arg(long)]
        end_date: Option<NaiveDate>,

        #[arg(short, long, default_value = "1")]
        page: usize,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Bulk index conversations from a JSON file
    Sync {
        /// File holding a JSON array of conversation documents
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    let store = Arc::new(
        ElasticsearchClient::new(&config.elasticsearch).context("failed to create store client")?,
    );
    let indices = IndexManager::new(store.clone(), config.elasticsearch.index.clone());

    match cli.command {
        Commands::Status => {
            print_json(&indices.status().await?)?;
        }

        Commands::Init => {
            indices.initialize().await?;
            println!("Indices ready");
        }

        Commands::Recreate { yes } => {
            if !yes {
                eprintln!("Error: recreating deletes every indexed conversation; pass --yes to confirm");
                std::process::exit(1);
            }
            indices.recreate().await?;
            println!("Indices recreated");
        }

        Commands::Health { wait } => {
            let checker = HealthChecker::new(store.clone());
            if let Some(secs) = wait {
                checker.wait_for_healthy(Duration::from_secs(secs)).await?;
            }
            print_json(&checker.check().await)?;
        }

        Commands::Search {
            query,
            user_id,
            provider,
            tag_id,
            start_date,
            end_date,
            page,
            limit,
        } => {
            let service = SearchService::new(
                store.clone(),
                config.elasticsearch.index.conversations.clone(),
                config.search.clone(),
            );

            let mut search = SearchQuery::new(query)
                .with_date_range(DateRange::from_dates(start_date, end_date))
                .with_page(page)
                .with_limit(limit);
            search.filters.user_id = user_id;
            search.filters.tag_id = tag_id;
            search.filters.provider = provider;

            print_json(&service.search(&search).await?)?;
        }

        Commands::Sync { file } => {
            let sync = SyncService::new(
                Arc::new(JsonFileSource::new(file)),
                store.clone(),
                config.elasticsearch.index.conversations.clone(),
            );
            let report = sync.sync_all().await.context("sync failed")?;
            print_json(&report)?;
        }
    }

    Ok(())
}
