use anyhow::Context as _;
use config::load_user_config;
use gemini::{GeminiCompleter, GeminiEmbedder, GeminiKeyManager};
use generation::QuestionService;
use rag::RagService;
use server::AppState;
use std::sync::Arc;

mod config;
mod error;
mod gemini;
mod generation;
mod rag;
mod server;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cfg = Arc::new(load_user_config().context("Failed to load configuration")?);

    let log_level: log::Level = cfg.log_level.clone().into();
    simple_logger::init_with_level(log_level)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    let key_manager = Arc::new(GeminiKeyManager::new(cfg.gemini.api_keys.clone()));
    log::info!(
        "Loaded {} Gemini API key(s); completion model {}, embedding model {}",
        cfg.gemini.api_keys.len(),
        cfg.llm.model,
        cfg.embedding.model
    );

    let embedder = Arc::new(GeminiEmbedder::new(cfg.clone(), key_manager.clone()));
    let completer = Arc::new(GeminiCompleter::new(cfg.clone(), key_manager));

    log::info!("Opening vector index in: {}", cfg.storage.index_dir);
    let rag = RagService::new(&cfg, embedder).context("Failed to initialize RAG service")?;
    match rag.document_stats() {
        Some(stats) => log::info!(
            "Restored previous document session ({} chunks)",
            stats.total_chunks
        ),
        None => log::info!("No previous document session to restore"),
    }

    let questions = QuestionService::new(rag, completer, &cfg.generation);
    let state = Arc::new(AppState::new(cfg.clone(), questions));

    server::serve(state).await
}
