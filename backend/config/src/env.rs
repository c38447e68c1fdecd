//! Environment overrides for config values.
//!
//! Each recognised `TURNSTILE_*` variable replaces the matching field,
//! taking precedence over the config file. Unset or empty variables are
//! ignored; values that fail to parse are an error.

use anyhow::Result;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::schema::{
    ContextConfig, LoggingConfig, LoopGuardConfig, OrchestratorConfig, SessionConfig,
    ToolsConfig, TurnstileConfig,
};

pub const ENV_MAX_TURNS: &str = "TURNSTILE_MAX_TURNS";
pub const ENV_MAX_SESSION_TURNS: &str = "TURNSTILE_MAX_SESSION_TURNS";
pub const ENV_TOOL_TIMEOUT_SECS: &str = "TURNSTILE_TOOL_TIMEOUT_SECS";
pub const ENV_LOOP_WINDOW: &str = "TURNSTILE_LOOP_WINDOW";
pub const ENV_AUTO_EXECUTE: &str = "TURNSTILE_AUTO_EXECUTE";
pub const ENV_LOG_LEVEL: &str = "TURNSTILE_LOG_LEVEL";
pub const ENV_COMPRESSION_THRESHOLD: &str = "TURNSTILE_COMPRESSION_THRESHOLD";

/// Error returned when an override variable holds an unparsable value.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value \"{value}\" for env var {var_name}: expected {expected}")]
pub struct InvalidEnvOverrideError {
    pub var_name: String,
    pub value: String,
    pub expected: &'static str,
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: TurnstileConfig) -> Result<TurnstileConfig> {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_env_overrides_with(
    mut config: TurnstileConfig,
    env: &HashMap<String, String>,
) -> Result<TurnstileConfig> {
    if let Some(v) = parsed::<u32>(env, ENV_MAX_TURNS, "a non-negative integer")? {
        config
            .orchestrator
            .get_or_insert_with(OrchestratorConfig::default)
            .max_turns = Some(v);
    }
    if let Some(v) = parsed_bool(env, ENV_AUTO_EXECUTE)? {
        config
            .orchestrator
            .get_or_insert_with(OrchestratorConfig::default)
            .auto_execute = Some(v);
    }
    if let Some(v) = parsed::<u32>(env, ENV_MAX_SESSION_TURNS, "a non-negative integer")? {
        config
            .session
            .get_or_insert_with(SessionConfig::default)
            .max_session_turns = Some(v);
    }
    if let Some(v) = parsed::<u64>(env, ENV_TOOL_TIMEOUT_SECS, "a number of seconds")? {
        config.tools.get_or_insert_with(ToolsConfig::default).timeout_secs = Some(v);
    }
    if let Some(v) = parsed::<usize>(env, ENV_LOOP_WINDOW, "a non-negative integer")? {
        config
            .loop_guard
            .get_or_insert_with(LoopGuardConfig::default)
            .window = Some(v);
    }
    if let Some(v) = parsed::<f64>(env, ENV_COMPRESSION_THRESHOLD, "a number")? {
        config
            .context
            .get_or_insert_with(ContextConfig::default)
            .compression_threshold = Some(v);
    }
    if let Some(v) = lookup(env, ENV_LOG_LEVEL) {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(v.to_string());
    }
    Ok(config)
}

fn lookup<'a>(env: &'a HashMap<String, String>, var_name: &str) -> Option<&'a str> {
    env.get(var_name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(
    env: &HashMap<String, String>,
    var_name: &str,
    expected: &'static str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(env, var_name) else {
        return Ok(None);
    };
    let value = raw.parse::<T>().map_err(|_| InvalidEnvOverrideError {
        var_name: var_name.to_string(),
        value: raw.to_string(),
        expected,
    })?;
    debug!(var = var_name, "Config override from environment");
    Ok(Some(value))
}

fn parsed_bool(env: &HashMap<String, String>, var_name: &str) -> Result<Option<bool>> {
    let Some(raw) = lookup(env, var_name) else {
        return Ok(None);
    };
    let value = match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            return Err(InvalidEnvOverrideError {
                var_name: var_name.to_string(),
                value: raw.to_string(),
                expected: "a boolean",
            }
            .into())
        }
    };
    debug!(var = var_name, "Config override from environment");
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn overrides_take_precedence() {
        let mut cfg = TurnstileConfig::default();
        cfg.orchestrator = Some(OrchestratorConfig {
            max_turns: Some(50),
            ..Default::default()
        });
        let cfg = apply_env_overrides_with(
            cfg,
            &env(&[
                (ENV_MAX_TURNS, "12"),
                (ENV_LOOP_WINDOW, "5"),
                (ENV_AUTO_EXECUTE, "yes"),
                (ENV_LOG_LEVEL, "debug"),
                (ENV_COMPRESSION_THRESHOLD, "0.8"),
            ]),
        )
        .unwrap();
        let orch = cfg.orchestrator.unwrap();
        assert_eq!(orch.max_turns, Some(12));
        assert_eq!(orch.auto_execute, Some(true));
        assert_eq!(cfg.loop_guard.unwrap().window, Some(5));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("debug"));
        assert_eq!(cfg.context.unwrap().compression_threshold, Some(0.8));
    }

    #[test]
    fn empty_vars_are_ignored() {
        let cfg = apply_env_overrides_with(
            TurnstileConfig::default(),
            &env(&[(ENV_MAX_TURNS, "  "), (ENV_TOOL_TIMEOUT_SECS, "")]),
        )
        .unwrap();
        assert!(cfg.orchestrator.is_none());
        assert!(cfg.tools.is_none());
    }

    #[test]
    fn unparsable_value_is_an_error() {
        let result = apply_env_overrides_with(
            TurnstileConfig::default(),
            &env(&[(ENV_TOOL_TIMEOUT_SECS, "thirty")]),
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains(ENV_TOOL_TIMEOUT_SECS));
        assert!(err.contains("thirty"));
    }

    #[test]
    fn bad_boolean_is_an_error() {
        let result = apply_env_overrides_with(
            TurnstileConfig::default(),
            &env(&[(ENV_AUTO_EXECUTE, "maybe")]),
        );
        assert!(result.is_err());
    }
}
