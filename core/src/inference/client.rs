use std::sync::Arc;
use std::time::Duration;

use crate::error::InferenceError;

use super::split::split_payload;
use super::InferenceBackend;

/// Wraps an [`InferenceBackend`] with a per-call deadline and payload splitting.
/// Never retries.
#[derive(Clone)]
pub struct InferenceClient {
    backend: Arc<dyn InferenceBackend>,
    timeout: Duration,
    max_payload_bytes: usize,
}

impl InferenceClient {
    /// `timeout` applies to each backend call, so a split payload may take several.
    pub fn new(backend: Arc<dyn InferenceBackend>, timeout: Duration, max_payload_bytes: usize) -> Self {
        Self {
            backend,
            timeout,
            max_payload_bytes,
        }
    }

    /// Generate text for `payload`. Oversized payloads are sent chunk by chunk and
    /// the outputs joined in order; the first failing chunk fails the call.
    pub async fn generate(&self, model: &str, payload: &str) -> Result<String, InferenceError> {
        let chunks = split_payload(payload, self.max_payload_bytes);
        if chunks.len() > 1 {
            tracing::debug!(
                chunks = chunks.len(),
                bytes = payload.len(),
                limit = self.max_payload_bytes,
                "payload split on device boundaries"
            );
        }

        let mut outputs = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            outputs.push(self.generate_one(model, chunk).await?);
        }
        Ok(outputs.join("\n\n"))
    }

    async fn generate_one(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        match tokio::time::timeout(self.timeout, self.backend.generate(model, prompt)).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
