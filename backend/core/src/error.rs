use thiserror::Error;

/// Top-level error type for the Turnstile runtime.
#[derive(Debug, Error)]
pub enum TurnstileError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("model service error ({model}): {message}")]
    Model { model: String, message: String },

    #[error("next-speaker judgment failed: {0}")]
    Judgment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_tool() {
        let err = TurnstileError::InvalidArguments {
            tool: "sql".into(),
            message: "expected an object".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid arguments for tool 'sql': expected an object"
        );
    }

    #[test]
    fn model_errors_name_the_model() {
        let err = TurnstileError::Model {
            model: "primary".into(),
            message: "quota exceeded".into(),
        };
        assert_eq!(err.to_string(), "model service error (primary): quota exceeded");
    }
}
