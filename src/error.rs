use thiserror::Error;

use crate::gateway::GatewayError;
use crate::instance::InstanceState;

#[derive(Debug, Error)]
pub enum StartStopError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("No tag filters supplied. Refusing to act on every managed instance.")]
    NoFilters,

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error(
        "Instances did not reach {target} after {attempts} attempts. Converged: {converged:?}, pending: {pending:?}"
    )]
    NotConverged {
        target: InstanceState,
        attempts: u32,
        converged: Vec<String>,
        pending: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl StartStopError {
    /// True for errors raised before any gateway call was made.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StartStopError::Config(_)
                | StartStopError::NoFilters
                | StartStopError::UnsupportedAction(_)
                | StartStopError::InvalidLogLevel(_)
                | StartStopError::Io(_)
                | StartStopError::Json(_)
                | StartStopError::Toml(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_converged_lists_both_partitions() {
        let err = StartStopError::NotConverged {
            target: InstanceState::Running,
            attempts: 7,
            converged: vec!["i-1".into()],
            pending: vec!["i-2".into()],
        };
        assert_eq!(
            err.to_string(),
            r#"Instances did not reach running after 7 attempts. Converged: ["i-1"], pending: ["i-2"]"#
        );
        assert!(!err.is_configuration());
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(StartStopError::NoFilters.is_configuration());
        assert!(StartStopError::UnsupportedAction("reboot".into()).is_configuration());
        let gateway = StartStopError::Gateway(GatewayError::ApiError {
            status: 500,
            message: "boom".into(),
        });
        assert!(!gateway.is_configuration());
    }
}
