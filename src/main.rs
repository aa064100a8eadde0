use anyhow::{Context, Result};
use dictionary_mediator::{
    config::Config,
    db::PgDictionaryStore,
    editor::DictionaryEditor,
    pipeline::TranslationPipeline,
    scheduler,
    server::{self, AppState},
    store::DictionaryStore,
    terms::TermCache,
    translation::OpenAiTranslator,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dictionary_mediator=info".parse()?),
        )
        .init();

    info!("Starting dictionary mediator");

    let config = Config::from_env()?;

    let store: Arc<dyn DictionaryStore> =
        Arc::new(PgDictionaryStore::connect(&config.database_url).await?);
    info!("✓ Connected to dictionary store");

    let cache = Arc::new(TermCache::new(Arc::clone(&store), config.cache_ttl));
    info!("Term cache TTL: {:?}", config.cache_ttl);

    let translator = Arc::new(OpenAiTranslator::new(&config));
    let pipeline = Arc::new(TranslationPipeline::new(Arc::clone(&cache), translator));
    let editor = DictionaryEditor::new(store, Arc::clone(&cache));

    let _sweeper = scheduler::start_cache_sweeper(Arc::clone(&cache), &config.cache_sweep_cron).await?;

    if config.api_key.is_none() {
        warn!("API_KEY not set, HTTP endpoints are unauthenticated");
    }

    let app = server::router(AppState {
        pipeline,
        editor,
        api_key: config.api_key.as_deref().map(Arc::from),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
