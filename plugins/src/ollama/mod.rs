pub mod client;

pub use client::OllamaBackend;
