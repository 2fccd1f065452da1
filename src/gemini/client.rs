use crate::{
    config::Config,
    gemini::key_manager::{GeminiKeyManager, key_suffix},
    generation::Completer,
    rag::Embedder,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rig::{
    client::{CompletionClient, EmbeddingsClient},
    completion::Prompt,
    embeddings::builder::EmbeddingsBuilder,
    providers::gemini::Client as GeminiClient,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Runs `call` with keys from the pool until it succeeds or the attempt budget is spent.
/// A rate-limited key is disabled and the next key is tried immediately.
async fn with_key_rotation<T, F, Fut>(
    config: &Config,
    key_manager: &GeminiKeyManager,
    what: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.gemini.max_attempts;
    let retry_delay = Duration::from_secs(config.gemini.retry_delay_secs);

    for attempt in 1..=max_attempts {
        let api_key = key_manager.get_key()?;

        match call(api_key.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) if is_rate_limited(&e) => {
                log::warn!(
                    "{}: key ending in ...{} is rate-limited (attempt {}/{}). Error: {}",
                    what,
                    key_suffix(&api_key),
                    attempt,
                    max_attempts,
                    e
                );
                key_manager.disable_key(&api_key);
            }
            Err(e) => {
                log::error!(
                    "{} failed with key ending in ...{} (attempt {}/{}): {}",
                    what,
                    key_suffix(&api_key),
                    attempt,
                    max_attempts,
                    e
                );
                if attempt < max_attempts {
                    sleep(retry_delay).await;
                }
            }
        }
    }

    Err(anyhow!("{} failed after {} attempts.", what, max_attempts))
}

fn is_rate_limited(e: &anyhow::Error) -> bool {
    let error_string = e.to_string().to_lowercase();
    error_string.contains("429") || error_string.contains("resource has been exhausted")
}

/// Embeds chunks and queries with the Gemini embedding API.
pub struct GeminiEmbedder {
    config: Arc<Config>,
    key_manager: Arc<GeminiKeyManager>,
}

impl GeminiEmbedder {
    pub fn new(config: Arc<Config>, key_manager: Arc<GeminiKeyManager>) -> Self {
        Self {
            config,
            key_manager,
        }
    }
}

async fn embed_with_key(api_key: &str, config: &Config, texts: &[String]) -> Result<Vec<Vec<f64>>> {
    let gemini_client = GeminiClient::new(api_key);
    let model =
        gemini_client.embedding_model_with_ndims(&config.embedding.model, config.embedding.ndims);
    let embeddings = EmbeddingsBuilder::new(model)
        .documents(texts.to_vec())?
        .build()
        .await?;

    // The builder does not promise input order; key results by their document.
    let by_text: HashMap<String, Vec<f64>> = embeddings
        .into_iter()
        .map(|(text, embedding)| (text, embedding.first().vec))
        .collect();

    texts
        .iter()
        .map(|text| {
            by_text
                .get(text)
                .cloned()
                .ok_or_else(|| anyhow!("No embedding generated"))
        })
        .collect()
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let config = self.config.as_ref();
        with_key_rotation(config, &self.key_manager, "Embedding", |api_key| async move {
            embed_with_key(&api_key, config, texts).await
        })
        .await
    }
}

/// Sends prompts to a Gemini chat model and returns the raw reply text.
pub struct GeminiCompleter {
    config: Arc<Config>,
    key_manager: Arc<GeminiKeyManager>,
}

impl GeminiCompleter {
    pub fn new(config: Arc<Config>, key_manager: Arc<GeminiKeyManager>) -> Self {
        Self {
            config,
            key_manager,
        }
    }
}

async fn complete_with_key(api_key: &str, config: &Config, prompt: &str) -> Result<String> {
    let gemini_client = GeminiClient::new(api_key);
    let agent = gemini_client
        .agent(&config.llm.model)
        .temperature(config.llm.temperature)
        .build();
    let reply = agent.prompt(prompt.to_string()).await?;
    Ok(reply)
}

#[async_trait]
impl Completer for GeminiCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let config = self.config.as_ref();
        log::info!("Sending request to {}...", config.llm.model);
        let reply = with_key_rotation(
            config,
            &self.key_manager,
            "Completion",
            |api_key| async move { complete_with_key(&api_key, config, prompt).await },
        )
        .await?;
        log::info!("Response received from {} ({} chars)", config.llm.model, reply.len());
        Ok(reply)
    }
}
