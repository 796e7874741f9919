use std::time::Duration;

use async_trait::async_trait;
use netsentinel_core::error::InferenceError;
use netsentinel_core::inference::InferenceBackend;
use serde::{Deserialize, Serialize};

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().count() > BODY_PREVIEW_LIMIT {
        out.push_str("...");
    }
    out
}

/// Ollama HTTP backend (`/api/generate`, `/api/tags`).
#[derive(Clone)]
pub struct OllamaBackend {
    http: reqwest::Client,
    probe: reqwest::Client,
    timeout_ms: u64,
    model_filters: Vec<String>,
    // Pre-built endpoints
    url_generate: String,
    url_tags: String,
}

impl OllamaBackend {
    pub fn new(
        base_url: &str,
        timeout_ms: u64,
        availability_timeout_ms: u64,
        model_filters: Vec<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        let probe = reqwest::Client::builder()
            .timeout(Duration::from_millis(availability_timeout_ms))
            .build()?;
        let normalized = base_url.trim_end_matches('/');
        Ok(Self {
            http,
            probe,
            timeout_ms,
            model_filters: model_filters
                .into_iter()
                .map(|f| f.to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
            url_generate: format!("{normalized}/api/generate"),
            url_tags: format!("{normalized}/api/tags"),
        })
    }

    fn map_reqwest(&self, err: reqwest::Error, url: &str) -> InferenceError {
        if err.is_timeout() {
            InferenceError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else if err.is_decode() {
            InferenceError::Rejected(format!("url={url}: {err}"))
        } else {
            InferenceError::Unavailable(format!("url={url}: {err}"))
        }
    }

    fn matches_filter(&self, name: &str) -> bool {
        if self.model_filters.is_empty() {
            return true;
        }
        let name = name.to_lowercase();
        self.model_filters.iter().any(|f| name.contains(f.as_str()))
    }
}

/// 5xx means the endpoint is struggling; anything else non-2xx is a refusal.
fn status_error(status: reqwest::StatusCode, url: &str, body: &str) -> InferenceError {
    let message = format!("status={} url={url}: {}", status.as_u16(), preview_body(body));
    if status.is_server_error() {
        InferenceError::Unavailable(message)
    } else {
        InferenceError::Rejected(message)
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let url = &self.url_generate;
        tracing::debug!(
            target: "netsentinel.ollama",
            stage = "generate.in",
            url = %url,
            model,
            prompt_len = prompt.len()
        );

        let resp = self
            .http
            .post(url)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|err| self.map_reqwest(err, url))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|err| self.map_reqwest(err, url))?;
        if !status.is_success() {
            return Err(status_error(status, url, &body));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|err| {
            InferenceError::Rejected(format!(
                "failed to decode response body: {err} | body={}",
                preview_body(&body)
            ))
        })?;
        if parsed.response.trim().is_empty() {
            return Err(InferenceError::Rejected(format!(
                "model '{model}' returned empty text"
            )));
        }

        tracing::debug!(
            target: "netsentinel.ollama",
            stage = "generate.out",
            status = %status,
            response_len = parsed.response.len()
        );
        Ok(parsed.response)
    }

    async fn is_available(&self) -> bool {
        match self.probe.get(&self.url_tags).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                tracing::debug!(target: "netsentinel.ollama", error = %err, "availability probe failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let url = &self.url_tags;
        let resp = self
            .probe
            .get(url)
            .send()
            .await
            .map_err(|err| self.map_reqwest(err, url))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|err| self.map_reqwest(err, url))?;
        if !status.is_success() {
            return Err(status_error(status, url, &body));
        }

        let tags: TagsResponse = serde_json::from_str(&body).map_err(|err| {
            InferenceError::Rejected(format!("failed to decode model list: {err}"))
        })?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| m.name)
            .filter(|name| self.matches_filter(name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn backend(url: &str) -> OllamaBackend {
        OllamaBackend::new(
            url,
            2_000,
            500,
            vec!["qwen".to_string(), "Llama".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_preview_body_truncates() {
        assert_eq!(preview_body("  "), "<empty body>");
        let body = "a".repeat(BODY_PREVIEW_LIMIT + 10);
        assert!(preview_body(&body).ends_with("..."));
    }

    #[tokio::test]
    async fn test_generate_returns_response_text() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "qwen2.5:7b",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"qwen2.5:7b","response":"No obvious anomalies.","done":true}"#)
            .create_async()
            .await;

        let text = backend(&server.url())
            .generate("qwen2.5:7b", "check this")
            .await
            .unwrap();
        assert_eq!(text, "No obvious anomalies.");
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/generate")
            .with_status(503)
            .with_body("model loading")
            .create_async()
            .await;

        let err = backend(&server.url())
            .generate("qwen2.5:7b", "p")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Unavailable(ref m) if m.contains("status=503")));
    }

    #[tokio::test]
    async fn test_client_error_and_empty_text_are_rejected() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::PartialJson(serde_json::json!({"model": "nope"})))
            .with_status(404)
            .with_body(r#"{"error":"model 'nope' not found"}"#)
            .create_async()
            .await;
        let _empty = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::PartialJson(serde_json::json!({"model": "qwen2.5:7b"})))
            .with_status(200)
            .with_body(r#"{"response":"  "}"#)
            .create_async()
            .await;

        let b = backend(&server.url());
        assert!(matches!(
            b.generate("nope", "p").await,
            Err(InferenceError::Rejected(_))
        ));
        assert!(matches!(
            b.generate("qwen2.5:7b", "p").await,
            Err(InferenceError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Nothing listens on port 9 (discard) in test environments.
        let b = backend("http://127.0.0.1:9");
        assert!(!b.is_available().await);
        assert!(matches!(
            b.generate("qwen2.5:7b", "p").await,
            Err(InferenceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_list_models_applies_family_filter() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(
                r#"{"models":[{"name":"qwen2.5:14b"},{"name":"nomic-embed-text"},{"name":"llama3.1:8b"}]}"#,
            )
            .expect_at_least(1)
            .create_async()
            .await;

        let b = backend(&server.url());
        assert!(b.is_available().await);
        assert_eq!(
            b.list_models().await.unwrap(),
            vec!["qwen2.5:14b".to_string(), "llama3.1:8b".to_string()]
        );
    }
}
