//! Local model inference: the backend seam plus the deadline-enforcing client.

mod client;
mod split;

use async_trait::async_trait;

use crate::error::InferenceError;

pub use client::InferenceClient;
pub use split::split_payload;

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn name(&self) -> &str;

    /// One complete (non-streaming) generation.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError>;

    async fn is_available(&self) -> bool;

    /// Installed models usable for analysis.
    async fn list_models(&self) -> Result<Vec<String>, InferenceError>;
}
