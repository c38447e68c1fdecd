//! Config defaults: fills every unset field of a parsed config.

use crate::schema::{
    ContextConfig, LoggingConfig, LoopGuardConfig, OrchestratorConfig, SessionConfig,
    ToolsConfig, TurnstileConfig,
};

pub const DEFAULT_MAX_TURNS: u32 = 100;
pub const DEFAULT_ABSOLUTE_TURN_CEILING: u32 = 100;
pub const DEFAULT_CONTINUE_PROMPT: &str = "Please continue.";
pub const DEFAULT_MAX_SESSION_TURNS: u32 = 50;
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOOP_WINDOW: usize = 3;
pub const DEFAULT_CONTEXT_TOKEN_LIMIT: usize = 30_720;
pub const DEFAULT_COMPRESSION_THRESHOLD: f64 = 0.5;
pub const DEFAULT_PRESERVE_FRACTION: f64 = 0.4;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: TurnstileConfig) -> TurnstileConfig {
    let config = apply_orchestrator_defaults(config);
    let config = apply_session_defaults(config);
    let config = apply_tool_defaults(config);
    let config = apply_loop_guard_defaults(config);
    let config = apply_context_defaults(config);
    apply_logging_defaults(config)
}

fn apply_orchestrator_defaults(mut config: TurnstileConfig) -> TurnstileConfig {
    let orch = config
        .orchestrator
        .get_or_insert_with(OrchestratorConfig::default);
    orch.max_turns.get_or_insert(DEFAULT_MAX_TURNS);
    orch.absolute_turn_ceiling
        .get_or_insert(DEFAULT_ABSOLUTE_TURN_CEILING);
    orch.auto_execute.get_or_insert(false);
    if orch.continue_prompt.as_deref().map(str::trim).unwrap_or("").is_empty() {
        orch.continue_prompt = Some(DEFAULT_CONTINUE_PROMPT.to_string());
    }
    config
}

fn apply_session_defaults(mut config: TurnstileConfig) -> TurnstileConfig {
    let session = config.session.get_or_insert_with(SessionConfig::default);
    session.max_session_turns.get_or_insert(DEFAULT_MAX_SESSION_TURNS);
    config
}

fn apply_tool_defaults(mut config: TurnstileConfig) -> TurnstileConfig {
    let tools = config.tools.get_or_insert_with(ToolsConfig::default);
    tools.timeout_secs.get_or_insert(DEFAULT_TOOL_TIMEOUT_SECS);
    config
}

fn apply_loop_guard_defaults(mut config: TurnstileConfig) -> TurnstileConfig {
    let guard = config.loop_guard.get_or_insert_with(LoopGuardConfig::default);
    guard.window.get_or_insert(DEFAULT_LOOP_WINDOW);
    config
}

fn apply_context_defaults(mut config: TurnstileConfig) -> TurnstileConfig {
    let context = config.context.get_or_insert_with(ContextConfig::default);
    context.token_limit.get_or_insert(DEFAULT_CONTEXT_TOKEN_LIMIT);
    context
        .compression_threshold
        .get_or_insert(DEFAULT_COMPRESSION_THRESHOLD);
    context
        .preserve_fraction
        .get_or_insert(DEFAULT_PRESERVE_FRACTION);
    config
}

fn apply_logging_defaults(mut config: TurnstileConfig) -> TurnstileConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(TurnstileConfig::default());
        let orch = cfg.orchestrator.unwrap();
        assert_eq!(orch.max_turns, Some(DEFAULT_MAX_TURNS));
        assert_eq!(orch.absolute_turn_ceiling, Some(100));
        assert_eq!(orch.auto_execute, Some(false));
        assert_eq!(orch.continue_prompt.as_deref(), Some("Please continue."));
        assert_eq!(cfg.session.unwrap().max_session_turns, Some(50));
        assert_eq!(cfg.tools.unwrap().timeout_secs, Some(30));
        assert_eq!(cfg.loop_guard.unwrap().window, Some(3));
        let context = cfg.context.unwrap();
        assert_eq!(context.token_limit, Some(30_720));
        assert_eq!(context.compression_threshold, Some(0.5));
        assert_eq!(context.preserve_fraction, Some(0.4));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = TurnstileConfig::default();
        cfg.orchestrator = Some(OrchestratorConfig {
            max_turns: Some(7),
            ..Default::default()
        });
        cfg.loop_guard = Some(LoopGuardConfig { window: Some(5) });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.orchestrator.unwrap().max_turns, Some(7));
        assert_eq!(cfg.loop_guard.unwrap().window, Some(5));
    }

    #[test]
    fn blank_continue_prompt_is_replaced() {
        let mut cfg = TurnstileConfig::default();
        cfg.orchestrator = Some(OrchestratorConfig {
            continue_prompt: Some("   ".to_string()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(
            cfg.orchestrator.unwrap().continue_prompt.as_deref(),
            Some(DEFAULT_CONTINUE_PROMPT)
        );
    }
}
