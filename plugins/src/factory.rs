use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use netsentinel_core::archive::ArchiveStore;
use netsentinel_core::config::{get_data_dir, AppConfig, InferenceConfig, RetryConfig, SshConfig};
use netsentinel_core::executor::{NoRetry, RetryStrategy};
use netsentinel_core::inference::InferenceBackend;
use netsentinel_core::session::SessionTransport;
use netsentinel_core::RunConfig;

use crate::archive::FsArchiveStore;
use crate::executor::BackoffRetry;
use crate::ollama::OllamaBackend;
use crate::ssh::SshTransport;

/// Retry strategy named by `cfg.strategy`. Zero retries always yields [`NoRetry`].
pub fn build_retry(cfg: &RetryConfig) -> Arc<dyn RetryStrategy> {
    if cfg.max_retries == 0 {
        return Arc::new(NoRetry);
    }
    match cfg.strategy.as_str() {
        "linear" => Arc::new(BackoffRetry::linear(cfg)),
        "none" => Arc::new(NoRetry),
        "exponential-backoff" => Arc::new(BackoffRetry::exponential(cfg)),
        other => {
            tracing::warn!(strategy = other, "unknown retry strategy, using exponential-backoff");
            Arc::new(BackoffRetry::exponential(cfg))
        }
    }
}

/// SSH transport; fails when the prompt or pager pattern does not compile or the
/// encoding label is unknown.
pub fn build_transport(cfg: &SshConfig) -> Result<Arc<dyn SessionTransport>> {
    Ok(Arc::new(SshTransport::from_config(cfg)?))
}

/// Ollama backend for `cfg.base_url` with the generation and availability timeouts.
pub fn build_backend(cfg: &InferenceConfig) -> Result<Arc<dyn InferenceBackend>> {
    Ok(Arc::new(OllamaBackend::new(
        &cfg.base_url,
        cfg.timeout_ms,
        cfg.availability_timeout_ms,
        cfg.model_filters.clone(),
    )?))
}

/// Configured archive directory, or `~/.netsentinel/runs`.
pub fn archive_dir(cfg: &AppConfig) -> Result<PathBuf> {
    match cfg.archive.directory.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Ok(get_data_dir()?.join("runs")),
    }
}

/// Filesystem archive rooted at [`archive_dir`].
pub fn build_archive(cfg: &AppConfig) -> Result<Arc<dyn ArchiveStore>> {
    Ok(Arc::new(FsArchiveStore::new(archive_dir(cfg)?)))
}

/// [`RunConfig::from_app_config`] with the configured retry strategies plugged in.
pub fn build_run_config(cfg: &AppConfig) -> RunConfig {
    let mut run = RunConfig::from_app_config(cfg);
    run.collector.retry = build_retry(&cfg.collector.retry);
    run.analysis.retry = build_retry(&cfg.analysis.retry);
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry(strategy: &str, max_retries: u32) -> RetryConfig {
        RetryConfig {
            strategy: strategy.to_string(),
            max_retries,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_build_retry_by_name() {
        assert_eq!(build_retry(&retry("linear", 2)).name(), "linear");
        assert_eq!(
            build_retry(&retry("exponential-backoff", 2)).name(),
            "exponential-backoff"
        );
        assert_eq!(build_retry(&retry("linear", 0)).max_retries(), 0);
        assert_eq!(build_retry(&retry("none", 3)).max_retries(), 0);
        assert_eq!(
            build_retry(&retry("fibonacci", 1)).name(),
            "exponential-backoff"
        );
    }

    #[test]
    fn test_build_run_config_uses_named_strategies() {
        let mut app = AppConfig::default();
        app.collector.retry = retry("linear", 3);
        let run = build_run_config(&app);
        assert_eq!(run.collector.retry.name(), "linear");
        assert_eq!(run.collector.retry.max_retries(), 3);
        assert_eq!(run.analysis.retry.name(), "exponential-backoff");
    }

    #[test]
    fn test_archive_dir_prefers_configured_path() {
        let mut app = AppConfig::default();
        app.archive.directory = Some("/var/lib/netsentinel/runs".to_string());
        assert_eq!(
            archive_dir(&app).unwrap(),
            PathBuf::from("/var/lib/netsentinel/runs")
        );
    }
}
