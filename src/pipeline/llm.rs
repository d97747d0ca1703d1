//! Generation backend: the seam between narration logic and the LLM.
//!
//! [`NarrationBackend`] is the only thing the narration generator needs: give
//! it a prompt (and optionally a slide image), get text back or a
//! [`BackendError`]. The production implementation, [`LlmBackend`], drives an
//! `edgequake_llm` provider; tests plug in scripted backends.
//!
//! One request per call. There is no retry here: a failed request is
//! recovered one level up by substituting a placeholder narration.

use crate::config::ConversionConfig;
use crate::error::{BackendError, NarratorError};
use crate::prompts::SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Model used when the Gemini key is the only configuration present.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// What one generation request carries.
#[derive(Debug, Clone)]
pub struct PromptParts {
    /// Slide image, base64 PNG. `None` for text-only requests.
    pub image: Option<ImageData>,
    /// The instruction text (includes the slide text for text requests).
    pub text: String,
}

impl PromptParts {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            image: None,
            text: text.into(),
        }
    }

    pub fn with_image(text: impl Into<String>, image: ImageData) -> Self {
        Self {
            image: Some(image),
            text: text.into(),
        }
    }
}

/// A text/vision generation service.
///
/// Implementations must be cheap to share (`Arc`) and safe to call from the
/// orchestrator task. The returned text is raw; callers clean it.
pub trait NarrationBackend: Send + Sync {
    fn generate<'a>(&'a self, parts: PromptParts) -> BoxFuture<'a, Result<String, BackendError>>;
}

/// [`NarrationBackend`] backed by an `edgequake_llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
                ..Default::default()
            },
        }
    }

    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &ConversionConfig) -> Self {
        Self::new(provider, config.temperature, config.max_tokens)
    }
}

/// Message layout: the system prompt, then one user turn holding the
/// instruction and, for vision requests, the slide image.
fn build_messages(parts: PromptParts) -> Vec<ChatMessage> {
    let user = match parts.image {
        Some(image) => ChatMessage::user_with_images(parts.text, vec![image]),
        None => ChatMessage::user(parts.text),
    };
    vec![ChatMessage::system(SYSTEM_PROMPT), user]
}

impl NarrationBackend for LlmBackend {
    fn generate<'a>(&'a self, parts: PromptParts) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(async move {
            let start = Instant::now();
            let vision = parts.image.is_some();
            let messages = build_messages(parts);

            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| BackendError::Request(e.to_string()))?;

            debug!(
                "Narration request ({}): {} input tokens, {} output tokens, {:?}",
                if vision { "image" } else { "text" },
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );

            if response.content.trim().is_empty() {
                return Err(BackendError::EmptyResponse);
            }
            Ok(response.content)
        })
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Default model for a named provider when none was given.
fn default_model_for(provider_name: &str) -> &'static str {
    match provider_name.to_ascii_lowercase().as_str() {
        "gemini" | "google" | "vertexai" => DEFAULT_GEMINI_MODEL,
        "anthropic" => "claude-3-5-haiku-latest",
        "ollama" => "llava",
        _ => "gpt-4.1-mini",
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, NarratorError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        NarratorError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the generation backend, from most-specific to least-specific.
///
/// 1. **Explicit backend** (`config.backend`), used as-is.
/// 2. **Pre-built provider** (`config.provider`), wrapped in [`LlmBackend`].
/// 3. **Named provider** (`config.provider_name`) with `config.model` or the
///    provider's default model.
/// 4. **Environment pair** `SLIDE_NARRATOR_PROVIDER` + `SLIDE_NARRATOR_MODEL`.
/// 5. **Gemini key** (`GEMINI_API_KEY`) with `config.model` or
///    [`DEFAULT_GEMINI_MODEL`].
/// 6. **Full auto-detection** via `ProviderFactory::from_env`.
///
/// Runs before any unit is processed; failure is an input error.
pub fn resolve_backend(config: &ConversionConfig) -> Result<Arc<dyn NarrationBackend>, NarratorError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmBackend::from_config(provider, config)))
}

fn resolve_provider(config: &ConversionConfig) -> Result<Arc<dyn LLMProvider>, NarratorError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| default_model_for(name).to_string());
        info!("Using provider '{}' with model '{}'", name, model);
        return create_provider(name, &model);
    }

    if let (Some(prov), Some(model)) = (
        non_empty_env("SLIDE_NARRATOR_PROVIDER"),
        non_empty_env("SLIDE_NARRATOR_MODEL"),
    ) {
        info!("Using provider '{}' with model '{}' from environment", prov, model);
        return create_provider(&prov, &model);
    }

    if non_empty_env("GEMINI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        info!("GEMINI_API_KEY found, using gemini with model '{}'", model);
        return create_provider("gemini", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| NarratorError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl NarrationBackend for Echo {
        fn generate<'a>(&'a self, parts: PromptParts) -> BoxFuture<'a, Result<String, BackendError>> {
            Box::pin(async move { Ok(parts.text) })
        }
    }

    #[test]
    fn explicit_backend_wins() {
        let backend: Arc<dyn NarrationBackend> = Arc::new(Echo);
        let config = ConversionConfig::builder()
            .backend(Arc::clone(&backend))
            .provider_name("no-such-provider")
            .build()
            .unwrap();
        let resolved = resolve_backend(&config).unwrap();
        assert!(Arc::ptr_eq(&resolved, &backend));
    }

    #[test]
    fn backend_is_object_safe() {
        let backend: Arc<dyn NarrationBackend> = Arc::new(Echo);
        let out = tokio_test::block_on(backend.generate(PromptParts::text("hello"))).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn text_requests_have_no_image() {
        let messages = build_messages(PromptParts::text("describe"));
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn default_models() {
        assert_eq!(default_model_for("Gemini"), DEFAULT_GEMINI_MODEL);
        assert_eq!(default_model_for("openai"), "gpt-4.1-mini");
    }
}
