//! Outcome of an authorization pass.
//!
//! The check is **fail-closed**: a remote error is a denial, never a grant.

use serde::{Deserialize, Serialize};

/// Result of checking one session against one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The protected tree may be rendered.
    Granted,
    /// Access is denied with a specific reason.
    Denied(DenialReason),
}

impl AccessDecision {
    /// Returns true if access is granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }

    /// Converts the decision to a Result, with a denial becoming the error.
    pub fn into_result(self) -> Result<(), DenialReason> {
        match self {
            AccessDecision::Granted => Ok(()),
            AccessDecision::Denied(reason) => Err(reason),
        }
    }
}

/// Why a signed-in user was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The profile exists and its admin flag is false.
    NotAdmin,
    /// No profile row could be read for the user, even after provisioning.
    ProfileMissing,
    /// The profile store could not be reached or answered with an error.
    LookupFailed,
}

impl DenialReason {
    /// User-facing message for the access-denied view.
    pub fn user_message(&self) -> &'static str {
        match self {
            DenialReason::NotAdmin => {
                "You don't have admin privileges for this account. Contact the system administrator if you should have access."
            }
            DenialReason::ProfileMissing => {
                "Your account profile could not be found. Contact the system administrator."
            }
            DenialReason::LookupFailed => {
                "We couldn't verify your access right now. Reload the page to try again."
            }
        }
    }
}
