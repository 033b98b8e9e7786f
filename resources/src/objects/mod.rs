use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod config_object;
pub mod metrics;
pub mod object_reference;
pub mod pod;
pub mod replica_set;
pub mod scaling;

pub use config_object::ConfigObject;
pub use object_reference::ObjectReference;
pub use pod::Pod;
pub use replica_set::ReplicaSet;

/// Common behavior shared by every namespaced resource kind.
pub trait Object {
    fn kind(&self) -> &'static str;
    fn name(&self) -> &String;
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub uid: Option<Uuid>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub owner_references: Vec<ObjectReference>,
}

/// A set of key/value pairs attached to an object, and the selector language
/// used to match against them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Labels(pub HashMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Returns true if every key/value pair in `self` is also present in `other`.
    /// `self` plays the role of a selector, `other` the role of an object's labels.
    pub fn matches(&self, other: &Labels) -> bool {
        self.0
            .iter()
            .all(|(k, v)| other.0.get(k).map(|ov| ov == v).unwrap_or(false))
    }
}

impl From<HashMap<String, String>> for Labels {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<(&String, &String)> = self.0.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        let joined = pairs
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{joined}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_subset_of_labels() {
        let mut selector = HashMap::new();
        selector.insert("app".to_string(), "web".to_string());
        let selector = Labels(selector);

        let mut labels = HashMap::new();
        labels.insert("app".to_string(), "web".to_string());
        labels.insert("tier".to_string(), "frontend".to_string());
        let labels = Labels(labels);

        assert!(selector.matches(&labels));
    }

    #[test]
    fn selector_does_not_match_missing_key() {
        let mut selector = HashMap::new();
        selector.insert("app".to_string(), "web".to_string());
        let selector = Labels(selector);

        let labels = Labels(HashMap::new());
        assert!(!selector.matches(&labels));
    }
}
