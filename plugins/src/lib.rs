//! Concrete collaborators for `netsentinel-core`: the SSH session transport, the Ollama
//! inference backend, the filesystem archive and the named retry strategies, plus the
//! factory that builds them from an [`AppConfig`](netsentinel_core::AppConfig).

pub mod archive;
pub mod executor;
pub mod factory;
pub mod ollama;
pub mod ssh;
