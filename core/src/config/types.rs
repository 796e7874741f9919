use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub run: RunSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "netsentinel_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_strategy")]
    pub strategy: String,
    /// Retries after the first attempt. Zero disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_retry_strategy() -> String {
    "exponential-backoff".to_string()
}

fn default_max_retries() -> u32 {
    1
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_retry_strategy(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_collect_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default = "default_commands")]
    pub commands: Vec<String>,
}

fn default_collect_concurrency() -> usize {
    5
}

fn default_connect_timeout_ms() -> u64 {
    15_000
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

pub fn default_commands() -> Vec<String> {
    [
        "display version",
        "display device",
        "display cpu-usage",
        "display memory-usage",
        "display interface brief",
        "display transceiver diagnosis interface",
        "display fan",
        "display power",
        "display temperature all",
        "display health",
        "display alarm active",
        "display logbuffer",
        "display trapbuffer",
        "display current-configuration | include sysname",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_collect_concurrency(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            retry: RetryConfig::default(),
            commands: default_commands(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Empty means "first available model matching `model_filters`".
    #[serde(default)]
    pub model: String,

    #[serde(default = "default_inference_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_availability_timeout_ms")]
    pub availability_timeout_ms: u64,

    /// Payloads above this size are split on device boundaries.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    #[serde(default = "default_model_filters")]
    pub model_filters: Vec<String>,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_inference_timeout_ms() -> u64 {
    300_000
}

fn default_availability_timeout_ms() -> u64 {
    2_000
}

fn default_max_payload_bytes() -> usize {
    64 * 1024
}

fn default_model_filters() -> Vec<String> {
    ["deepseek", "qwen", "mistral", "llama"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: String::new(),
            timeout_ms: default_inference_timeout_ms(),
            availability_timeout_ms: default_availability_timeout_ms(),
            max_payload_bytes: default_max_payload_bytes(),
            model_filters: default_model_filters(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analyze_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub retry: RetryConfig,

    /// `{device}` and `{capture}` are substituted per device.
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
}

fn default_analyze_concurrency() -> usize {
    2
}

pub fn default_prompt_template() -> String {
    "You are a senior network engineer. Review the inspection output of device {device} below.\n\
     1. Summarise the overall health of the device in one sentence.\n\
     2. List every anomaly or risk found (write \"No obvious anomalies\" if there are none), \
     each with a likely cause and a recommended action.\n\
     3. Finish with optimisation advice (firmware, configuration, hardware).\n\
     Answer in Markdown.\n\n\
     Inspection output:\n{capture}\n"
        .to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            concurrency: default_analyze_concurrency(),
            retry: RetryConfig::default(),
            prompt_template: default_prompt_template(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchiveConfig {
    /// Defaults to `~/.netsentinel/runs`.
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub include_raw_captures: bool,

    #[serde(default = "default_raw_preview_chars")]
    pub raw_preview_chars: usize,
}

fn default_raw_preview_chars() -> usize {
    3_000
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_raw_captures: false,
            raw_preview_chars: default_raw_preview_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_ssh_bin")]
    pub ssh_bin: String,

    #[serde(default = "default_sshpass_bin")]
    pub sshpass_bin: String,

    /// Value for `-o StrictHostKeyChecking=`.
    #[serde(default = "default_host_key_checking")]
    pub strict_host_key_checking: String,

    /// Regex matched against the tail of the output to detect the CLI prompt.
    #[serde(default = "default_prompt_pattern")]
    pub prompt_pattern: String,

    #[serde(default = "default_pager_pattern")]
    pub pager_pattern: String,

    /// Sent once after login, output discarded.
    #[serde(default = "default_setup_commands")]
    pub setup_commands: Vec<String>,

    #[serde(default = "default_exit_command")]
    pub exit_command: String,

    /// Output encoding label understood by encoding_rs ("utf-8", "gbk", ...).
    #[serde(default = "default_encoding")]
    pub encoding: String,

    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ssh_bin() -> String {
    "ssh".to_string()
}

fn default_sshpass_bin() -> String {
    "sshpass".to_string()
}

fn default_host_key_checking() -> String {
    "accept-new".to_string()
}

fn default_prompt_pattern() -> String {
    r"(?:<[^<>\r\n]+>|\[[^\[\]\r\n]+\]|[\w.\-@()/:]+[#>])\s*$".to_string()
}

fn default_pager_pattern() -> String {
    r"-{2,}\s*More\s*-{2,}\s*$".to_string()
}

fn default_setup_commands() -> Vec<String> {
    vec!["screen-length 0 temporary".to_string()]
}

fn default_exit_command() -> String {
    "quit".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            ssh_bin: default_ssh_bin(),
            sshpass_bin: default_sshpass_bin(),
            strict_host_key_checking: default_host_key_checking(),
            prompt_pattern: default_prompt_pattern(),
            pager_pattern: default_pager_pattern(),
            setup_commands: default_setup_commands(),
            exit_command: default_exit_command(),
            encoding: default_encoding(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunSettings {
    /// Overall run deadline; reaching it cancels cooperatively.
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}
