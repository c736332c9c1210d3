//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use modelfinder_catalog::{
    CatalogConfig, EmbeddingConfig, EmbeddingModelName, FilterCriteria, DEFAULT_TOP_K,
};

#[derive(Debug, Parser)]
#[command(name = "modelfinder")]
#[command(about = "Model catalog search with an MCP server for AI agents")]
#[command(version)]
pub struct Cli {
    /// Directory holding model_metadata.json and the index
    #[arg(long, short, env = "MODELFINDER_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Snapshot file (overrides <data-dir>/model_metadata.json)
    #[arg(long, env = "MODELFINDER_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Index directory (overrides <data-dir>/index)
    #[arg(long, env = "MODELFINDER_INDEX_DIR")]
    pub index_dir: Option<PathBuf>,

    /// Embedding model
    #[arg(long, env = "MODELFINDER_MODEL", default_value_t = EmbeddingModelName::default())]
    pub model: EmbeddingModelName,

    /// Where embedding model weights are cached
    #[arg(long, env = "MODELFINDER_MODELS_PATH")]
    pub model_cache: Option<PathBuf>,

    /// Use the weight-free hashing embedder with this dimension
    #[arg(long, env = "MODELFINDER_OFFLINE_DIM")]
    pub offline: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Download a model card from the hub
    FetchReadme {
        model_id: String,
        #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    #[command(flatten)]
    Catalog(CatalogCommand),
}

/// Commands that open the catalog and check the index first
#[derive(Debug, Subcommand, PartialEq)]
pub enum CatalogCommand {
    /// Serve the catalog tools over MCP on stdio (default)
    Serve,
    /// Show details for one model
    Info { model_id: String },
    /// Filter models by attributes
    Filter(FilterArgs),
    /// Semantic search over the catalog
    Search {
        query: String,
        #[arg(long, short = 'k', default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Show two models one after the other
    Compare { model_id1: String, model_id2: String },
    /// Bring the index in line with the snapshot
    Reindex {
        /// Rebuild even if the fingerprint matches
        #[arg(long)]
        force: bool,
    },
    /// Print index statistics as JSON
    Stats,
}

#[derive(Debug, Clone, Args, PartialEq, Default)]
pub struct FilterArgs {
    #[arg(long, default_value = "")]
    pub tag: String,
    #[arg(long, default_value_t = 0)]
    pub min_likes: u64,
    #[arg(long, default_value = "")]
    pub task: String,
    #[arg(long, default_value_t = 0.0)]
    pub min_score: f64,
    #[arg(long, default_value = "")]
    pub license: String,
    #[arg(long, default_value = "")]
    pub provider: String,
    #[arg(long)]
    pub merged_only: bool,
}

impl From<FilterArgs> for FilterCriteria {
    fn from(args: FilterArgs) -> Self {
        Self {
            tag: args.tag,
            min_likes: args.min_likes,
            task: args.task,
            min_score: args.min_score,
            license: args.license,
            provider: args.provider,
            merged_only: args.merged_only,
        }
    }
}

static DEFAULT_COMMAND: Command = Command::Catalog(CatalogCommand::Serve);

impl Cli {
    /// Catalog configuration from the data directory and overrides
    pub fn catalog_config(&self) -> CatalogConfig {
        let embedding = match self.offline {
            Some(dimension) => EmbeddingConfig::Offline { dimension },
            None => EmbeddingConfig::Pretrained {
                model: self.model,
                cache_dir: self.model_cache.clone(),
            },
        };

        let mut config = CatalogConfig::from_data_dir(&self.data_dir).with_embedding(embedding);
        if let Some(snapshot) = &self.snapshot {
            config.snapshot_path = snapshot.clone();
        }
        if let Some(index_dir) = &self.index_dir {
            config.index_dir = index_dir.clone();
        }
        config
    }

    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&DEFAULT_COMMAND)
    }
}
