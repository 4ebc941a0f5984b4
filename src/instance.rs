use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StartStopError;

/// A compute instance as returned by the control plane: an id plus its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Instance {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, tags: HashMap<String, String>) -> Self {
        Self {
            id: id.into(),
            tags,
        }
    }

    /// Looks up a tag value. An empty key never matches.
    pub fn tag(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        self.tags.get(key).map(String::as_str)
    }
}

/// Lifecycle state reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceState::Pending => write!(f, "pending"),
            InstanceState::Running => write!(f, "running"),
            InstanceState::ShuttingDown => write!(f, "shutting-down"),
            InstanceState::Terminated => write!(f, "terminated"),
            InstanceState::Stopping => write!(f, "stopping"),
            InstanceState::Stopped => write!(f, "stopped"),
            InstanceState::Unknown => write!(f, "unknown"),
        }
    }
}

/// The transition requested for every batch of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Start,
    Stop,
}

impl Action {
    /// State every instance must reach before the next batch may begin.
    pub fn target_state(self) -> InstanceState {
        match self {
            Action::Start => InstanceState::Running,
            Action::Stop => InstanceState::Stopped,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => write!(f, "start"),
            Action::Stop => write!(f, "stop"),
        }
    }
}

impl FromStr for Action {
    type Err = StartStopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Action::Start),
            "stop" => Ok(Action::Stop),
            other => Err(StartStopError::UnsupportedAction(other.to_string())),
        }
    }
}

/// Transition parameters applied uniformly to every bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRequest {
    pub action: Action,
    pub dry_run: bool,
}

#[cfg(test)]
pub(crate) fn tagged(id: &str, tags: &[(&str, &str)]) -> Instance {
    Instance::new(
        id,
        tags.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_lookup_ignores_empty_key() {
        let inst = tagged("i-1", &[("", "weird"), ("tier", "db")]);
        assert_eq!(inst.tag("tier"), Some("db"));
        assert_eq!(inst.tag(""), None);
        assert_eq!(inst.tag("missing"), None);
    }

    #[test]
    fn action_parses_known_values() {
        assert_eq!("start".parse::<Action>().unwrap(), Action::Start);
        assert_eq!("stop".parse::<Action>().unwrap(), Action::Stop);
    }

    #[test]
    fn action_rejects_unknown_value() {
        let err = "reboot".parse::<Action>().unwrap_err();
        assert!(matches!(err, StartStopError::UnsupportedAction(a) if a == "reboot"));
    }

    #[test]
    fn action_target_states() {
        assert_eq!(Action::Start.target_state(), InstanceState::Running);
        assert_eq!(Action::Stop.target_state(), InstanceState::Stopped);
    }

    #[test]
    fn instance_state_deserializes_kebab_case_and_unknown() {
        let states: Vec<InstanceState> =
            serde_json::from_str(r#"["running","shutting-down","stopped","rebooting"]"#).unwrap();
        assert_eq!(
            states,
            vec![
                InstanceState::Running,
                InstanceState::ShuttingDown,
                InstanceState::Stopped,
                InstanceState::Unknown,
            ]
        );
    }

    #[test]
    fn instance_deserializes_without_tags() {
        let inst: Instance = serde_json::from_str(r#"{"id":"i-9"}"#).unwrap();
        assert_eq!(inst.id, "i-9");
        assert!(inst.tags.is_empty());
    }
}
