//! Codename identifiers
//!
//! Every definition object is addressed by a unique, human-chosen codename
//! (its natural key). The newtypes keep the different namespaces apart.

use serde::{Deserialize, Serialize};

macro_rules! codename {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

codename!(
    /// Codename of a workflow
    WorkflowId
);
codename!(
    /// Codename of a state (unique across all workflows)
    StateId
);
codename!(
    /// Codename of a transition (unique across all workflows)
    TransitionId
);
codename!(
    /// Codename of a permission owned by the host's permission subsystem
    PermissionId
);
codename!(
    /// Identifier of a role owned by the host's permission subsystem
    RoleId
);
codename!(
    /// Identifier of an acting principal (usually a user)
    ActorId
);
codename!(
    /// Type tag of a host entity, e.g. `"document"`
    EntityType
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_conversions() {
        let id = WorkflowId::new("review");
        assert_eq!(id.as_str(), "review");
        assert_eq!(format!("{}", id), "review");
        assert_eq!(StateId::from("draft"), StateId::new(String::from("draft")));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&TransitionId::new("publish")).unwrap();
        assert_eq!(json, "\"publish\"");

        let back: TransitionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TransitionId::new("publish"));
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut ids = vec![RoleId::new("owner"), RoleId::new("editor"), RoleId::new("reader")];
        ids.sort();
        assert_eq!(ids[0], RoleId::new("editor"));
        assert_eq!(ids[2], RoleId::new("reader"));
    }
}
