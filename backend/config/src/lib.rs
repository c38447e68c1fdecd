//! Turnstile runtime configuration.
//!
//! Provides:
//! - Typed config schema (orchestrator, session, tools, loop guard, context, logging)
//! - YAML/TOML/JSON loading by file extension, atomic YAML writes
//! - `TURNSTILE_*` environment overrides
//! - Default value application
//! - Range validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, apply_env_overrides_with, InvalidEnvOverrideError};
pub use io::{config_dir, config_file_path, load_config, parse_config, write_config, ConfigFormat};
pub use schema::{
    ContextConfig, LoggingConfig, LoopGuardConfig, OrchestratorConfig, SessionConfig, ToolsConfig,
    TurnstileConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load a config file, apply environment overrides and defaults, validate.
///
/// This is the main entry point for loading a config at runtime. Warnings are
/// logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<TurnstileConfig> {
    let config = load_config(path).await?;
    let config = apply_env_overrides(config).context("Failed to apply env overrides")?;
    finish(config)
}

/// Like [`load_and_prepare`], reading overrides from `env` instead of the
/// process environment.
pub async fn load_and_prepare_with(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<TurnstileConfig> {
    let config = load_config(path).await?;
    let config = apply_env_overrides_with(config, env).context("Failed to apply env overrides")?;
    finish(config)
}

/// Load `config.yaml` from the default config directory.
pub async fn load_default() -> Result<TurnstileConfig> {
    load_and_prepare(&config_file_path(&config_dir())).await
}

fn finish(config: TurnstileConfig) -> Result<TurnstileConfig> {
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let messages: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid config: {}", messages.join("; "));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_with_overrides_is_prepared() {
        let path = std::env::temp_dir().join("turnstile-lib-missing/config.yaml");
        let env: HashMap<String, String> =
            [("TURNSTILE_MAX_TURNS".to_string(), "8".to_string())].into_iter().collect();
        let cfg = load_and_prepare_with(&path, &env).await.unwrap();
        let orch = cfg.orchestrator.unwrap();
        assert_eq!(orch.max_turns, Some(8));
        assert_eq!(orch.absolute_turn_ceiling, Some(100));
        assert_eq!(cfg.tools.unwrap().timeout_secs, Some(30));
    }

    #[tokio::test]
    async fn invalid_override_fails_the_load() {
        let path = std::env::temp_dir().join("turnstile-lib-missing/config.yaml");
        let env: HashMap<String, String> =
            [("TURNSTILE_LOOP_WINDOW".to_string(), "0".to_string())].into_iter().collect();
        let err = load_and_prepare_with(&path, &env).await.unwrap_err();
        assert!(err.to_string().contains("loopGuard.window"));
    }
}
