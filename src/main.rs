use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use munchies::collaborative::NewInteraction;
use munchies::config::Config;
use munchies::enrichment::CompletionProvider;
use munchies::enrichment::gemini::GeminiProvider;
use munchies::enrichment::ollama::OllamaProvider;
use munchies::enrichment::openai::OpenAIProvider;
use munchies::logging;
use munchies::preferences::{self, Preferences};
use munchies::ranker::{format_recommendations, HybridRanker, RecommendationRequest};
use munchies::server::MunchiesService;
use munchies::store::FileStore;
use rmcp::ServiceExt;

#[derive(Parser)]
#[command(name = "munchies", version, about = "Mood-aware restaurant recommendation server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP tools over stdio (default)
    Serve,
    /// Print recommendations for one set of preferences as JSON
    Recommend {
        #[arg(long, default_value = preferences::DEFAULT_MOOD)]
        mood: String,
        #[arg(long, default_value = preferences::DEFAULT_OCCASION)]
        occasion: String,
        #[arg(long, default_value = preferences::DEFAULT_CUISINE)]
        cuisine: String,
        #[arg(long, default_value = preferences::DEFAULT_DIETARY)]
        dietary: String,
        #[arg(long, default_value = preferences::DEFAULT_TIME)]
        time: String,
        #[arg(long)]
        location: Option<String>,
        /// Free-text notes, e.g. "quiet and affordable"
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, env = "MUNCHIES_USER_ID")]
        user_id: Option<String>,
        /// Free-text query blended into the ranking
        #[arg(long)]
        query: Option<String>,
        /// Skip AI enrichment even when a query is given
        #[arg(long)]
        no_ai_fetch: bool,
    },
    /// Search restaurants with a natural language query
    Search {
        query: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, env = "MUNCHIES_USER_ID")]
        user_id: Option<String>,
    },
    /// Record a user interaction
    Track {
        #[arg(long, env = "MUNCHIES_USER_ID")]
        user_id: String,
        #[arg(long)]
        restaurant_id: i64,
        /// 0-5, clamped
        #[arg(long)]
        rating: Option<f64>,
        #[arg(long)]
        clicked: bool,
        #[arg(long)]
        viewed: bool,
    },
    /// Show catalog, interaction and provider statistics
    Stats,
}

/// Create the enrichment provider based on configuration.
///
/// Returns `None` (enrichment off) when disabled, misconfigured or unknown.
fn create_enrichment_provider(config: &Config) -> Option<Arc<dyn CompletionProvider>> {
    let settings = &config.enrichment;
    if !settings.enabled {
        tracing::info!("Enrichment disabled via config (enrichment.enabled=false)");
        return None;
    }

    let provider: Result<Arc<dyn CompletionProvider>, _> = match settings.active_provider() {
        "openai" => OpenAIProvider::new(
            settings.openai_api_key.clone().unwrap_or_default(),
            settings.openai_base_url.clone(),
            settings.openai_model.clone(),
        )
        .map(|p| Arc::new(p) as Arc<dyn CompletionProvider>),
        "gemini" => GeminiProvider::new(
            settings.gemini_api_key.clone().unwrap_or_default(),
            settings.gemini_base_url.clone(),
            settings.gemini_model.clone(),
        )
        .map(|p| Arc::new(p) as Arc<dyn CompletionProvider>),
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            settings.ollama_base_url.clone(),
            settings.ollama_model.clone(),
        )) as Arc<dyn CompletionProvider>),
        other => {
            tracing::warn!(provider = %other, "Unknown enrichment provider, enrichment disabled");
            return None;
        }
    };

    match provider {
        Ok(p) => {
            tracing::info!(provider = p.provider_name(), model = p.model_name(), "Enrichment provider ready");
            Some(p)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to initialize enrichment provider, enrichment disabled");
            None
        }
    }
}

async fn build_engine(config: &Config) -> Result<HybridRanker> {
    let store = Arc::new(FileStore::from_config(config));
    let provider = create_enrichment_provider(config);
    let engine = HybridRanker::load(
        store,
        provider,
        Duration::from_secs(config.enrichment.timeout_secs),
        config.enrichment.max_results,
    )
    .await?;
    Ok(engine)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args
    let cli = Cli::parse();

    // 2. Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Config error (using defaults): {}", e);
        Config::default()
    });

    // 3. Initialize logging FIRST (before any other output)
    // stdout is reserved for JSON-RPC and command output
    logging::init_logging(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                data_dir = %config.data_dir,
                "munchies server starting"
            );

            // A missing catalog keeps the server up; every tool then reports 503
            let engine = match build_engine(&config).await {
                Ok(engine) => Some(Arc::new(engine)),
                Err(e) => {
                    tracing::error!(error = %e, catalog = %config.catalog_path().display(), "Failed to initialize recommendation engine");
                    None
                }
            };

            let service = MunchiesService::new(engine);
            let (stdin, stdout) = rmcp::transport::io::stdio();
            let server = service.serve((stdin, stdout)).await?;

            tracing::info!("munchies server running, awaiting tool calls via stdio");
            server.waiting().await?;
            tracing::info!("munchies server stopped");
        }

        Commands::Recommend {
            mood,
            occasion,
            cuisine,
            dietary,
            time,
            location,
            notes,
            user_id,
            query,
            no_ai_fetch,
        } => {
            let engine = build_engine(&config).await?;
            let request = RecommendationRequest {
                preferences: Preferences {
                    mood: mood.clone(),
                    occasion: occasion.clone(),
                    cuisine,
                    dietary_preference: dietary,
                    time,
                    location,
                    additional_notes: notes,
                },
                user_id,
                search_query: query,
                use_ai_fetch: !no_ai_fetch,
            };
            let rec = engine.recommend(&request).await;
            let items = format_recommendations(&rec.ranked, &mood, &occasion);
            println!("{}", serde_json::to_string_pretty(&items)?);
        }

        Commands::Search { query, location, user_id } => {
            let engine = build_engine(&config).await?;
            let rec = engine.search(&query, location, user_id).await?;
            let (mood, occasion) = rec
                .extracted
                .as_ref()
                .map(|e| (e.mood.clone().unwrap_or_default(), e.occasion.clone().unwrap_or_default()))
                .unwrap_or_default();
            let items = format_recommendations(&rec.ranked, &mood, &occasion);
            println!("{}", serde_json::to_string_pretty(&items)?);
            if rec.fetched_new > 0 {
                eprintln!("Fetched {} new restaurants.", rec.fetched_new);
            }
        }

        Commands::Track {
            user_id,
            restaurant_id,
            rating,
            clicked,
            viewed,
        } => {
            let engine = build_engine(&config).await?;
            let interaction = engine
                .track_interaction(NewInteraction {
                    user_id,
                    restaurant_id,
                    rating,
                    clicked,
                    viewed,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&interaction)?);
        }

        Commands::Stats => {
            let engine = build_engine(&config).await?;
            println!("{}", serde_json::to_string_pretty(&engine.status().await)?);
        }
    }

    Ok(())
}
