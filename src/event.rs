//! The start/stop event that drives one invocation.
//!
//! Field names on the wire are the flat lowercase keys used by existing
//! schedulers (`tagfilters`, `groupbytag`, ...). Events are read from JSON, or
//! TOML when the file ends in `.toml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StartStopError;
use crate::gateway::Filter;
use crate::instance::Action;

/// One caller-supplied tag filter: tag `name` must have one of `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub name: String,
    #[serde(default)]
    pub value: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartStopEvent {
    #[serde(rename = "tagfilters", default)]
    pub tag_filters: Vec<TagFilter>,
    #[serde(rename = "groupbytag", default)]
    pub group_by_tag: String,
    #[serde(rename = "orderbytag", default)]
    pub order_by_tag: String,
    #[serde(rename = "orderby", default)]
    pub order_by: Vec<String>,
    #[serde(default)]
    pub action: String,
    #[serde(rename = "dryrun", default)]
    pub dry_run: bool,
    #[serde(rename = "loglevel", default)]
    pub log_level: String,
}

impl StartStopEvent {
    pub fn load(path: &Path) -> Result<Self, StartStopError> {
        let contents = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }

    /// Checks everything that must hold before the gateway is contacted and
    /// returns the parsed action.
    pub fn validate(&self) -> Result<Action, StartStopError> {
        if self.tag_filters.is_empty() {
            return Err(StartStopError::NoFilters);
        }
        self.action.parse()
    }

    /// Gateway filters: every caller filter plus presence of `management_tag`.
    pub fn filters(&self, management_tag: &str) -> Vec<Filter> {
        self.tag_filters
            .iter()
            .map(|f| Filter::tag(&f.name, f.value.clone()))
            .chain(std::iter::once(Filter::tag_present(management_tag)))
            .collect()
    }
}
