//! ModelFinder Entry Point
//!
//! Opens the catalog, makes sure the embedding index matches the snapshot,
//! then either serves the catalog tools over MCP on stdio (default) or runs a
//! single CLI command and prints the result.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use modelfinder_catalog::{FilterCriteria, ModelCatalog, RebuildOutcome};
use modelfinder_server::cli::{CatalogCommand, Cli, Command};
use modelfinder_server::fetch::{ReadmeFetcher, RetryPolicy};
use modelfinder_server::{CatalogTools, McpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "modelfinder=info,modelfinder_server=info,modelfinder_catalog=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for JSON-RPC, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command() {
        Command::FetchReadme { model_id, token } => {
            let fetcher = ReadmeFetcher::new(token.clone(), RetryPolicy::default());
            let model_id = model_id.clone();
            let readme = tokio::task::spawn_blocking(move || fetcher.fetch(&model_id)).await?;
            println!("{}", readme);
            Ok(())
        }
        Command::Catalog(command) => run_catalog_command(&cli, command).await,
    }
}

async fn run_catalog_command(cli: &Cli, command: &CatalogCommand) -> anyhow::Result<()> {
    let config = cli.catalog_config();
    tracing::info!("Snapshot: {}", config.snapshot_path.display());
    tracing::info!("Index: {}", config.index_dir.display());

    let force = matches!(command, CatalogCommand::Reindex { force: true });
    let catalog = tokio::task::spawn_blocking(move || -> anyhow::Result<ModelCatalog> {
        let catalog = ModelCatalog::open(config).context("Failed to open catalog")?;
        if force {
            catalog.invalidate()?;
        }
        match catalog.ensure_consistent().context("Failed to build index")? {
            RebuildOutcome::UpToDate => tracing::info!("Index is up to date"),
            RebuildOutcome::Rebuilt { deleted, inserted } => {
                tracing::info!("Index rebuilt: {} removed, {} embedded", deleted, inserted)
            }
        }
        Ok(catalog)
    })
    .await??;

    let catalog = Arc::new(catalog);
    let tools = CatalogTools::new(Arc::clone(&catalog));

    match command {
        CatalogCommand::Serve => {
            tracing::info!("Starting ModelFinder MCP server");
            let mut server = McpServer::new(tools.clone());
            server.run_stdio().await?;
        }
        CatalogCommand::Info { model_id } => println!("{}", tools.get_model_info(model_id)),
        CatalogCommand::Filter(args) => {
            let criteria: FilterCriteria = args.clone().into();
            println!("{}", tools.filter_models(&criteria));
        }
        CatalogCommand::Search { query, top_k } => {
            println!("{}", tools.semantic_model_search(query, *top_k))
        }
        CatalogCommand::Compare {
            model_id1,
            model_id2,
        } => println!("{}", tools.compare_models(model_id1, model_id2)),
        CatalogCommand::Reindex { .. } => {
            println!("Indexed {} models", catalog.store().len());
        }
        CatalogCommand::Stats => {
            println!("{}", serde_json::to_string_pretty(&catalog.stats()?)?)
        }
    }
    drop(tools);

    match Arc::try_unwrap(catalog) {
        Ok(catalog) => catalog.close()?,
        Err(_) => tracing::warn!("Catalog still in use at shutdown"),
    }
    Ok(())
}
