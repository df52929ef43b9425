//! Protection policy for a route tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a protected route tree demands of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// Admin panel: the user's profile must carry `is_admin = true`.
    AdminOnly,
    /// Client portal: any live session is enough; profiles are not consulted.
    SignedIn,
}

impl GatePolicy {
    /// True when the policy needs the profile/admin-flag lookup.
    pub fn requires_admin(&self) -> bool {
        matches!(self, GatePolicy::AdminOnly)
    }

    /// Name of the route tree the policy guards, used in logs and responses.
    pub fn tree(&self) -> &'static str {
        match self {
            GatePolicy::AdminOnly => "admin",
            GatePolicy::SignedIn => "portal",
        }
    }
}

impl fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatePolicy::AdminOnly => write!(f, "admin_only"),
            GatePolicy::SignedIn => write!(f, "signed_in"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_policy_requires_admin() {
        assert!(GatePolicy::AdminOnly.requires_admin());
        assert!(!GatePolicy::SignedIn.requires_admin());
    }

    #[test]
    fn policy_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&GatePolicy::AdminOnly).unwrap(),
            "\"admin_only\""
        );
        assert_eq!(GatePolicy::SignedIn.to_string(), "signed_in");
        assert_eq!(GatePolicy::SignedIn.tree(), "portal");
    }
}
