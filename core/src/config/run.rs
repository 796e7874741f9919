use std::sync::Arc;
use std::time::Duration;

use crate::executor::{FixedRetry, NoRetry, RetryStrategy};
use crate::inventory::CommandSet;

use super::types::{AppConfig, ReportConfig, RetryConfig};

/// Everything one run needs, resolved from [`AppConfig`] plus per-run overrides.
///
/// Built once at run start and never mutated afterwards.
#[derive(Clone)]
pub struct RunConfig {
    /// Empty only when the caller intends to resolve it before starting the run.
    pub model: String,
    pub commands: CommandSet,
    pub collector: CollectorOptions,
    pub analysis: AnalysisOptions,
    pub report: ReportOptions,
    pub deadline: Option<Duration>,
}

#[derive(Clone)]
pub struct CollectorOptions {
    pub concurrency: usize,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub retry: Arc<dyn RetryStrategy>,
}

#[derive(Clone)]
pub struct AnalysisOptions {
    pub concurrency: usize,
    pub inference_timeout: Duration,
    pub max_payload_bytes: usize,
    pub prompt_template: String,
    pub retry: Arc<dyn RetryStrategy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub include_raw_captures: bool,
    pub raw_preview_chars: usize,
}

impl From<&ReportConfig> for ReportOptions {
    fn from(cfg: &ReportConfig) -> Self {
        Self {
            include_raw_captures: cfg.include_raw_captures,
            raw_preview_chars: cfg.raw_preview_chars,
        }
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        (&ReportConfig::default()).into()
    }
}

/// Fixed-delay fallback used until a named strategy is plugged in.
fn fixed_retry(cfg: &RetryConfig) -> Arc<dyn RetryStrategy> {
    if cfg.max_retries == 0 {
        Arc::new(NoRetry)
    } else {
        Arc::new(FixedRetry {
            retries: cfg.max_retries,
            delay: Duration::from_millis(cfg.base_delay_ms),
        })
    }
}

impl RunConfig {
    /// Run settings from the loaded config, with fixed-delay retries.
    ///
    /// The CLI swaps in the configured retry strategies afterwards.
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            model: cfg.inference.model.clone(),
            commands: CommandSet::new(cfg.collector.commands.iter().cloned()),
            collector: CollectorOptions {
                concurrency: cfg.collector.concurrency.max(1),
                connect_timeout: Duration::from_millis(cfg.collector.connect_timeout_ms),
                command_timeout: Duration::from_millis(cfg.collector.command_timeout_ms),
                retry: fixed_retry(&cfg.collector.retry),
            },
            analysis: AnalysisOptions {
                concurrency: cfg.analysis.concurrency.max(1),
                inference_timeout: Duration::from_millis(cfg.inference.timeout_ms),
                max_payload_bytes: cfg.inference.max_payload_bytes,
                prompt_template: cfg.analysis.prompt_template.clone(),
                retry: fixed_retry(&cfg.analysis.retry),
            },
            report: (&cfg.report).into(),
            deadline: cfg.run.deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_commands(mut self, commands: CommandSet) -> Self {
        self.commands = commands;
        self
    }

    /// Overall run deadline. When it passes the run is cancelled and archived as partial.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("model", &self.model)
            .field("commands", &self.commands.len())
            .field("collect_concurrency", &self.collector.concurrency)
            .field("collect_retry", &self.collector.retry.name())
            .field("analyze_concurrency", &self.analysis.concurrency)
            .field("analyze_retry", &self.analysis.retry.name())
            .field("deadline", &self.deadline)
            .finish()
    }
}
