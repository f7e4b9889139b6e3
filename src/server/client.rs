use anyhow::{Context, Result};
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::modes::{DialectMode, Direction};
use crate::settings::Settings;

const CLIENT_TEMPLATE: &str = include_str!("templates/client.html.tera");

#[derive(Serialize)]
struct ModeOption {
    value: &'static str,
    forward: String,
    reverse: String,
}

/// Renders the single-page browser client served at `/`.
pub(crate) fn render_client_html(settings: &Settings) -> Result<String> {
    let modes = DialectMode::ALL
        .iter()
        .map(|mode| ModeOption {
            value: mode.as_str(),
            forward: mode.label(Direction::Forward),
            reverse: mode.label(Direction::Reverse),
        })
        .collect::<Vec<_>>();
    let mut context = TeraContext::new();
    context.insert("modes_json", &serde_json::to_string(&modes)?);
    context.insert(
        "default_mode_json",
        &serde_json::to_string(settings.default_mode.as_str())?,
    );
    context.insert("toast_ms", &(settings.toast_seconds * 1000));
    context.insert("explanation_delay_ms", &settings.explanation_delay_ms);
    context.insert("restore_delay_ms", &settings.restore_delay_ms);
    Tera::one_off(CLIENT_TEMPLATE, &context, false)
        .with_context(|| "failed to render client template")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_every_mode_and_the_default() {
        let settings = Settings {
            default_mode: DialectMode::PaisaBoricua,
            ..Settings::default()
        };
        let html = render_client_html(&settings).expect("html");
        for mode in DialectMode::ALL {
            assert!(html.contains(mode.as_str()));
        }
        assert!(html.contains("const DEFAULT_MODE = \"paisa-boricua\";"));
        assert!(html.contains("Boricua Spanish → Paisa Spanish"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn restoring_releases_a_pending_translation() {
        let html = render_client_html(&Settings::default()).expect("html");
        let supersede = html.find("function supersede()").expect("supersede");
        let end = html[supersede..].find("\n}\n").expect("end") + supersede;
        let body = &html[supersede..end];
        assert!(body.contains("state.seq++;"));
        assert!(body.contains("state.translating = false;"));
        assert!(body.contains("el(\"translate\").disabled = false;"));

        let restore = html.find("function restore(record)").expect("restore");
        assert!(html[restore..].contains("supersede();"));
    }
}
