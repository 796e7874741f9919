use netsentinel_core::config::AppConfig;
use netsentinel_core::inference::InferenceBackend;
use netsentinel_plugins::factory;

use crate::error::CliError;

/// `requested` if set, otherwise the first model the endpoint offers that matches the filters.
pub async fn resolve_model(
    backend: &dyn InferenceBackend,
    requested: &str,
) -> Result<String, CliError> {
    let requested = requested.trim();
    if !requested.is_empty() {
        return Ok(requested.to_string());
    }

    let models = backend
        .list_models()
        .await
        .map_err(|e| CliError::InferenceUnavailable(e.to_string()))?;
    let model = models.into_iter().next().ok_or_else(|| {
        CliError::Config(
            "no model configured and no available model matches inference.model_filters"
                .to_string(),
        )
    })?;
    tracing::info!(model = %model, "model auto-selected");
    Ok(model)
}

pub async fn handle_models(cfg: &AppConfig) -> Result<i32, CliError> {
    let backend =
        factory::build_backend(&cfg.inference).map_err(|e| CliError::Config(e.to_string()))?;
    if !backend.is_available().await {
        return Err(CliError::InferenceUnavailable(cfg.inference.base_url.clone()));
    }
    let models = backend
        .list_models()
        .await
        .map_err(|e| CliError::InferenceUnavailable(e.to_string()))?;

    println!("{} endpoint {} is available", backend.name(), cfg.inference.base_url);
    if models.is_empty() {
        println!(
            "no models match filters [{}]",
            cfg.inference.model_filters.join(", ")
        );
    }
    for model in &models {
        let marker = if *model == cfg.inference.model { "*" } else { " " };
        println!("{marker} {model}");
    }
    Ok(0)
}
