//! Config validation: range checks with user-friendly messages.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::schema::TurnstileConfig;

/// A plain level, or an `EnvFilter`-style directive list such as
/// `turnstile_agent=debug,info`.
static LOG_DIRECTIVES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)([a-z0-9_:]+=)?(trace|debug|info|warn|error|off)(,([a-z0-9_:]+=)?(trace|debug|info|warn|error|off))*$")
        .unwrap()
});

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &TurnstileConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_orchestrator(config, &mut report);
    validate_tools(config, &mut report);
    validate_loop_guard(config, &mut report);
    validate_context(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_orchestrator(config: &TurnstileConfig, report: &mut ValidationReport) {
    let Some(orch) = &config.orchestrator else { return };
    if let (Some(max), Some(ceiling)) = (orch.max_turns, orch.absolute_turn_ceiling) {
        if max > ceiling {
            report.warn(
                "orchestrator.maxTurns",
                format!("maxTurns {max} exceeds absoluteTurnCeiling {ceiling}; it will be capped"),
            );
        }
    }
    if orch.max_turns == Some(0) {
        report.warn("orchestrator.maxTurns", "maxTurns is 0; every run stops immediately");
    }
}

fn validate_tools(config: &TurnstileConfig, report: &mut ValidationReport) {
    let Some(tools) = &config.tools else { return };
    if tools.timeout_secs == Some(0) {
        report.error("tools.timeoutSecs", "timeoutSecs must be >= 1");
    }
}

fn validate_loop_guard(config: &TurnstileConfig, report: &mut ValidationReport) {
    let Some(guard) = &config.loop_guard else { return };
    if guard.window == Some(0) {
        report.error("loopGuard.window", "window must be >= 1");
    }
}

fn validate_context(config: &TurnstileConfig, report: &mut ValidationReport) {
    let Some(context) = &config.context else { return };
    if let Some(threshold) = context.compression_threshold {
        if !(threshold > 0.0 && threshold <= 1.0) {
            report.error(
                "context.compressionThreshold",
                format!("compressionThreshold {threshold} must be in (0, 1]"),
            );
        }
    }
    if let Some(fraction) = context.preserve_fraction {
        if !(0.0..=1.0).contains(&fraction) {
            report.error(
                "context.preserveFraction",
                format!("preserveFraction {fraction} must be in [0, 1]"),
            );
        }
    }
    if context.token_limit == Some(0) {
        report.error("context.tokenLimit", "tokenLimit must be > 0");
    }
}

fn validate_logging(config: &TurnstileConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !LOG_DIRECTIVES.is_match(level.trim()) {
            report.warn(
                "logging.level",
                format!("Unrecognised log level '{level}'; falling back to 'info'"),
            );
        }
    }
}
