use std::future::Future;
use std::pin::Pin;

use crate::error::ModelError;

mod gemini;

pub use gemini::Gemini;

pub type ModelFuture = Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send>>;

/// Single-shot text generation against a hosted model.
pub trait ModelClient: Clone + Send + Sync + 'static {
    fn generate(&self, prompt: String, max_tokens: u32) -> ModelFuture;
}

/// Resolves the Gemini key: explicit override, runtime env, then the value baked in at build time.
pub fn resolve_key(override_key: Option<&str>) -> Option<String> {
    if let Some(key) = override_key {
        if !key.trim().is_empty() {
            return Some(key.trim().to_string());
        }
    }
    get_env("GEMINI_API_KEY")
        .or_else(|| get_env("GOOGLE_API_KEY"))
        .or_else(|| non_empty(option_env!("GEMINI_API_KEY")))
}

pub(crate) fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
