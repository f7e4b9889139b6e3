use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::modes::{DialectMode, Direction};

const EN_PAISA: &str = include_str!("templates/en_paisa.tera");
const EN_BORICUA: &str = include_str!("templates/en_boricua.tera");
const PAISA_BORICUA: &str = include_str!("templates/paisa_boricua.tera");
const EXPLANATION: &str = include_str!("templates/explanation.tera");

fn translation_template(mode: DialectMode) -> &'static str {
    match mode {
        DialectMode::EnglishPaisa => EN_PAISA,
        DialectMode::EnglishBoricua => EN_BORICUA,
        DialectMode::PaisaBoricua => PAISA_BORICUA,
    }
}

/// Builds the instruction for translating `text` under `mode` and `direction`.
pub fn render_translation_prompt(
    mode: DialectMode,
    direction: Direction,
    text: &str,
) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("direction", direction.as_str());
    context.insert("text", text);
    Tera::one_off(translation_template(mode), &context, false).with_context(|| {
        format!(
            "failed to render translation prompt for {} ({})",
            mode,
            direction.as_str()
        )
    })
}

/// Builds the instruction asking for the CONTEXT/WORD1/WORD2 breakdown.
pub fn render_explanation_prompt(
    mode: DialectMode,
    direction: Direction,
    input: &str,
    output: &str,
) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("source", mode.source(direction).name());
    context.insert("target", mode.target(direction).name());
    context.insert("input", input);
    context.insert("output", output);
    Tera::one_off(EXPLANATION, &context, false)
        .with_context(|| "failed to render explanation prompt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_and_direction_renders() {
        for mode in DialectMode::ALL {
            for direction in [Direction::Forward, Direction::Reverse] {
                let prompt =
                    render_translation_prompt(mode, direction, "see you tomorrow").expect("prompt");
                assert!(prompt.trim_end().ends_with("see you tomorrow"));
                assert!(prompt.contains("Reply with the translation only"));
                assert!(!prompt.contains("{%"));
            }
        }
    }

    #[test]
    fn direction_selects_template_branch() {
        let forward =
            render_translation_prompt(DialectMode::EnglishPaisa, Direction::Forward, "hi")
                .expect("prompt");
        let reverse =
            render_translation_prompt(DialectMode::EnglishPaisa, Direction::Reverse, "hi")
                .expect("prompt");
        assert!(forward.contains("translating English into Paisa Spanish"));
        assert!(reverse.contains("translating Paisa Spanish into natural, casual English"));
        assert!(!reverse.contains("translating English into Paisa Spanish"));
    }

    #[test]
    fn user_text_is_not_interpreted_as_template() {
        let prompt = render_translation_prompt(
            DialectMode::EnglishBoricua,
            Direction::Forward,
            "{{ direction }} {% if x %}",
        )
        .expect("prompt");
        assert!(prompt.contains("{{ direction }} {% if x %}"));
    }

    #[test]
    fn explanation_prompt_interpolates_both_texts_and_example() {
        let prompt = render_explanation_prompt(
            DialectMode::EnglishBoricua,
            Direction::Reverse,
            "¡Wepa, mano!",
            "Woohoo, bro!",
        )
        .expect("prompt");
        assert!(prompt.contains("Original (Boricua Spanish): ¡Wepa, mano!"));
        assert!(prompt.contains("Translation (English): Woohoo, bro!"));
        assert!(prompt.contains("CONTEXT:"));
        assert!(prompt.contains("WORD1:"));
        assert!(prompt.contains("WORD2:"));
        assert!(prompt.contains("Example:"));
    }
}
