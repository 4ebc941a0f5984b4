//! Partitions described instances into groups keyed by one tag.

use std::collections::HashSet;
use std::fmt;

use crate::instance::Instance;

pub const MISSING_GROUP_TAG: &str = "<missing_grp_tag>";

/// Key of a group. The sentinel is a separate variant so that no tag value can
/// land in it by accident.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Tagged(String),
    MissingTag,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Tagged(value) => write!(f, "{value}"),
            GroupKey::MissingTag => write!(f, "{MISSING_GROUP_TAG}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: GroupKey,
    pub members: Vec<Instance>,
}

/// Groups in first-seen order, with the sentinel group (if any) last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups {
    groups: Vec<Group>,
}

impl Groups {
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    #[cfg(test)]
    pub fn get(&self, key: &GroupKey) -> Option<&Group> {
        self.groups.iter().find(|g| &g.key == key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of grouped instances.
    pub fn instance_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }
}

impl<'a> IntoIterator for &'a Groups {
    type Item = &'a Group;
    type IntoIter = std::slice::Iter<'a, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Partition `instances` by the value of `group_tag`.
///
/// Instances without the tag (or every instance, when `group_tag` is empty) are
/// collected into the [`GroupKey::MissingTag`] group. A repeated instance id is
/// dropped; the first record wins.
pub fn group_by_tag(instances: impl IntoIterator<Item = Instance>, group_tag: &str) -> Groups {
    let mut groups: Vec<Group> = Vec::new();
    let mut missing: Vec<Instance> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for instance in instances {
        if !seen.insert(instance.id.clone()) {
            tracing::debug!(instance_id = %instance.id, "duplicate instance record skipped");
            continue;
        }
        tracing::debug!(instance_id = %instance.id, tags = ?instance.tags, "grouping instance");
        match instance.tag(group_tag) {
            Some(value) => {
                let key = GroupKey::Tagged(value.to_string());
                match groups.iter_mut().find(|g| g.key == key) {
                    Some(group) => group.members.push(instance),
                    None => groups.push(Group {
                        key,
                        members: vec![instance],
                    }),
                }
            }
            None => {
                tracing::debug!(
                    group_tag,
                    instance_id = %instance.id,
                    "group tag missing on instance"
                );
                missing.push(instance);
            }
        }
    }

    if !missing.is_empty() {
        groups.push(Group {
            key: GroupKey::MissingTag,
            members: missing,
        });
    }

    Groups { groups }
}
