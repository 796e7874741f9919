use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default data directory: ~/.netsentinel
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".netsentinel"))
}

/// Load from `explicit` if given, otherwise from the default locations.
///
/// The home directory is only needed for the default locations and the default
/// archive directory; an explicit file loads without it.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    load_with(explicit, get_data_dir)
}

fn load_with(
    explicit: Option<&Path>,
    data_dir: impl Fn() -> anyhow::Result<PathBuf>,
) -> anyhow::Result<AppConfig> {
    let mut cfg = match explicit {
        Some(path) => load_from_path(path)?,
        None => {
            // Priority 1: ~/.netsentinel/config.toml
            let user_config = data_dir()?.join("config.toml");
            // Priority 2: ./netsentinel.toml
            let local_config = Path::new("netsentinel.toml");

            if user_config.exists() {
                load_from_path(&user_config)?
            } else if local_config.exists() {
                load_from_path(local_config)?
            } else {
                AppConfig::default()
            }
        }
    };

    if cfg
        .archive
        .directory
        .as_deref()
        .map(str::trim)
        .map_or(true, str::is_empty)
    {
        // Left unset without a home directory; resolving the archive then reports it.
        if let Ok(dir) = data_dir() {
            cfg.archive.directory = Some(dir.join("runs").to_string_lossy().to_string());
        }
    }

    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parse one config file; the error names the file.
pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    Ok(cfg)
}

// Environment variable overrides (highest priority)
fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Some(v) = non_empty_env("NETSENTINEL_OLLAMA_URL") {
        cfg.inference.base_url = v;
    }
    if let Some(v) = non_empty_env("NETSENTINEL_MODEL") {
        cfg.inference.model = v;
    }
    if let Some(v) = non_empty_env("NETSENTINEL_ARCHIVE_DIR") {
        cfg.archive.directory = Some(v);
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Per-command timeout < per-call inference timeout < run deadline.
///
/// Only warns; call once logging is up.
pub fn warn_on_timeout_hierarchy(cfg: &AppConfig) {
    if cfg.collector.command_timeout_ms >= cfg.inference.timeout_ms {
        tracing::warn!(
            command_timeout_ms = cfg.collector.command_timeout_ms,
            inference_timeout_ms = cfg.inference.timeout_ms,
            "command timeout is not below the inference timeout"
        );
    }
    if let Some(deadline) = cfg.run.deadline_secs {
        if deadline.saturating_mul(1000) <= cfg.inference.timeout_ms {
            tracing::warn!(
                deadline_secs = deadline,
                inference_timeout_ms = cfg.inference.timeout_ms,
                "run deadline is not above the inference timeout"
            );
        }
    }
}
