use serde::{Deserialize, Serialize};

/// A reference to another object, possibly in a different API group.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// Kind of the referent, e.g. "ReplicaSet" or "Deployment".
    pub kind: String,
    /// Name of the referent.
    pub name: String,
    /// API version of the referent, e.g. "apps/v1".
    #[serde(default)]
    pub api_version: String,
}

impl ObjectReference {
    /// Splits `apiVersion` into its `(group, version)` parts the way
    /// `schema.ParseGroupVersion` does: a bare version has an empty group,
    /// `group/version` splits on the first slash. Fails if there's more than
    /// one slash.
    pub fn group_version(&self) -> Result<(String, String), String> {
        match self.api_version.split('/').collect::<Vec<_>>()[..] {
            [version] => Ok((String::new(), version.to_string())),
            [group, version] => Ok((group.to_string(), version.to_string())),
            _ => Err(format!("invalid API version {:?}", self.api_version)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_version_splits_on_slash() {
        let reference = ObjectReference {
            kind: "ReplicaSet".to_string(),
            name: "web".to_string(),
            api_version: "apps/v1".to_string(),
        };
        assert_eq!(
            reference.group_version(),
            Ok(("apps".to_string(), "v1".to_string()))
        );
    }

    #[test]
    fn group_version_defaults_to_empty_group() {
        let reference = ObjectReference {
            kind: "ReplicaSet".to_string(),
            name: "web".to_string(),
            api_version: "v1".to_string(),
        };
        assert_eq!(
            reference.group_version(),
            Ok((String::new(), "v1".to_string()))
        );
    }

    #[test]
    fn group_version_rejects_multiple_slashes() {
        let reference = ObjectReference {
            kind: "ReplicaSet".to_string(),
            name: "web".to_string(),
            api_version: "a/b/c".to_string(),
        };
        assert!(reference.group_version().is_err());
    }
}
