use anyhow::{Result, anyhow};
use tracing::debug;

use crate::explanation::{self, Explanation};
use crate::modes::{DialectMode, Direction};
use crate::prompts;
use crate::providers::ModelClient;
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct Translator<M: ModelClient> {
    model: M,
    translation_max_tokens: u32,
    explanation_max_tokens: u32,
}

impl<M: ModelClient> Translator<M> {
    pub fn new(model: M, settings: &Settings) -> Self {
        Self {
            model,
            translation_max_tokens: settings.translation_max_tokens,
            explanation_max_tokens: settings.explanation_max_tokens,
        }
    }

    pub async fn translate(
        &self,
        mode: DialectMode,
        direction: Direction,
        text: &str,
    ) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("input is empty"));
        }
        let prompt = prompts::render_translation_prompt(mode, direction, text)?;
        debug!("translating {} chars with {} ({})", text.chars().count(), mode, direction.as_str());
        let output = self
            .model
            .generate(prompt, self.translation_max_tokens)
            .await?;
        Ok(output)
    }

    /// Asks for the cultural breakdown of a finished translation.
    pub async fn explain(
        &self,
        mode: DialectMode,
        direction: Direction,
        input: &str,
        output: &str,
    ) -> Result<Explanation> {
        let prompt = prompts::render_explanation_prompt(mode, direction, input, output)?;
        let raw = self
            .model
            .generate(prompt, self.explanation_max_tokens)
            .await?;
        debug!("explanation reply: {:?}", raw);
        Ok(explanation::parse(&raw))
    }
}
