//! Orders the members of one group into buckets by a precedence list of tag values.

use std::collections::HashSet;
use std::fmt;

use crate::instance::Instance;

pub const NO_ORDER: &str = "<no-order>";

/// Key of an ordered bucket. [`BucketKey::NoOrder`] is always the last bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketKey {
    Value(String),
    NoOrder,
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Value(value) => write!(f, "{value}"),
            BucketKey::NoOrder => write!(f, "{NO_ORDER}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub key: BucketKey,
    pub members: Vec<Instance>,
}

impl Bucket {
    pub fn instance_ids(&self) -> Vec<String> {
        self.members.iter().map(|i| i.id.clone()).collect()
    }
}

/// Buckets in precedence order, with `<no-order>` last when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedBuckets {
    buckets: Vec<Bucket>,
}

impl OrderedBuckets {
    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    #[cfg(test)]
    pub fn get(&self, key: &BucketKey) -> Option<&Bucket> {
        self.buckets.iter().find(|b| &b.key == key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl<'a> IntoIterator for &'a OrderedBuckets {
    type Item = &'a Bucket;
    type IntoIter = std::slice::Iter<'a, Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}

/// Assign `instances` to buckets following `precedence`.
///
/// An instance is claimed by the first precedence value equal to its `order_tag`
/// value. Instances lacking the tag are set aside the first time they are seen;
/// instances whose value matches nothing are collected after the pass. Both end up
/// in the `<no-order>` bucket, unmatched values first. Each instance id is claimed
/// at most once.
pub fn by_order(instances: &[Instance], order_tag: &str, precedence: &[String]) -> OrderedBuckets {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut missing_tag: Vec<Instance> = Vec::new();
    let mut taken: HashSet<&str> = HashSet::new();

    for wanted in precedence.iter().filter(|v| v.as_str() != NO_ORDER) {
        for instance in instances {
            if taken.contains(instance.id.as_str()) {
                continue;
            }
            match instance.tag(order_tag) {
                Some(value) if value == wanted => {
                    taken.insert(&instance.id);
                    let key = BucketKey::Value(wanted.clone());
                    match buckets.iter_mut().find(|b| b.key == key) {
                        Some(bucket) => bucket.members.push(instance.clone()),
                        None => buckets.push(Bucket {
                            key,
                            members: vec![instance.clone()],
                        }),
                    }
                }
                Some(_) => {}
                None => {
                    taken.insert(&instance.id);
                    missing_tag.push(instance.clone());
                }
            }
        }
    }

    let mut no_order: Vec<Instance> = Vec::new();
    for instance in instances {
        if !taken.insert(&instance.id) {
            continue;
        }
        // Only reachable for a missing tag when the precedence list was empty.
        if instance.tag(order_tag).is_none() {
            missing_tag.push(instance.clone());
        } else {
            no_order.push(instance.clone());
        }
    }
    no_order.extend(missing_tag);

    if !no_order.is_empty() {
        buckets.push(Bucket {
            key: BucketKey::NoOrder,
            members: no_order,
        });
    }

    OrderedBuckets { buckets }
}
