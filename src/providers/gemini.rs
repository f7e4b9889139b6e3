use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{ModelClient, ModelFuture};
use crate::error::{ModelError, upstream_message};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub(crate) const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct Gemini {
    key: Option<String>,
    model: String,
    temperature: f32,
    base_url: String,
    client: reqwest::Client,
}

impl Gemini {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|value| !value.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            base_url: BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl ModelClient for Gemini {
    fn generate(&self, prompt: String, max_tokens: u32) -> ModelFuture {
        let this = self.clone();
        Box::pin(async move {
            let Some(key) = this.key.as_deref() else {
                return Err(ModelError::Configuration);
            };
            let url = format!("{}/{}:generateContent", this.base_url, this.model);
            let body = request_body(&prompt, this.temperature, max_tokens);

            debug!("Gemini request: model={} max_tokens={}", this.model, max_tokens);
            let response = this
                .client
                .post(&url)
                .query(&[("key", key)])
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(ModelError::Upstream {
                    status: status.as_u16(),
                    message: upstream_message(&text),
                });
            }
            extract_text(&text)
        })
    }
}

fn request_body(prompt: &str, temperature: f32, max_tokens: u32) -> Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [{"text": prompt}]
            }
        ],
        "generationConfig": {
            "temperature": temperature,
            "maxOutputTokens": max_tokens
        }
    })
}

fn extract_text(body: &str) -> Result<String, ModelError> {
    let payload: GeminiResponse = serde_json::from_str(body)?;
    let text = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(text.to_string())
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::{Json, Query};
    use axum::http::StatusCode;
    use axum::routing::post;
    use std::collections::HashMap;

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}/v1beta/models", addr)
    }

    #[test]
    fn extracts_first_candidate_text() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/gemini_text_response.json"
        ));
        let text = extract_text(payload).expect("text");
        assert_eq!(text, "¡Qué más pues, parce! ¿Vamos por un tinto?");
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        let err = extract_text(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse));
        let err = extract_text(r#"{"candidates": [{"content": {"parts": [{}]}}]}"#).unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse));
        let err = extract_text(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse));
    }

    #[test]
    fn request_body_carries_generation_config() {
        let body = request_body("hola", 0.5, 128);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hola");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 128);
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        // Unroutable base URL: reaching the network would surface a transport error instead.
        let client = Gemini::new(None).with_base_url("http://127.0.0.1:9/v1beta/models");
        let err = client.generate("hi".to_string(), 10).await.unwrap_err();
        assert!(matches!(err, ModelError::Configuration));
    }

    #[tokio::test]
    async fn sends_key_in_query_and_reads_candidate() {
        let router = Router::new().route(
            "/v1beta/models/:model",
            post(
                |Query(query): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                    assert_eq!(query.get("key").map(String::as_str), Some("test-key"));
                    assert_eq!(body["generationConfig"]["maxOutputTokens"], 64);
                    Json(json!({
                        "candidates": [
                            {"content": {"parts": [{"text": "  ¡Wepa!  "}]}},
                            {"content": {"parts": [{"text": "ignored"}]}}
                        ]
                    }))
                },
            ),
        );
        let base = spawn_mock(router).await;
        let client = Gemini::new(Some("test-key".to_string())).with_base_url(base);
        let text = client.generate("hi".to_string(), 64).await.expect("text");
        assert_eq!(text, "¡Wepa!");
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let router = Router::new().route(
            "/v1beta/models/:model",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}})),
                )
            }),
        );
        let base = spawn_mock(router).await;
        let client = Gemini::new(Some("bad".to_string())).with_base_url(base);
        let err = client.generate("hi".to_string(), 64).await.unwrap_err();
        match err {
            ModelError::Upstream { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("API key not valid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
