//! Flow tickets.
//!
//! Every flow that can change the gate (mount, reload, sign-in, sign-out, a
//! pushed session change) takes a ticket. An async result may only be
//! applied while its ticket is still the latest one and the gate is still
//! mounted; anything else is stale and dropped.

use crate::domain::foundation::UserId;

/// Proof that a flow was started; compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

#[derive(Debug, Default)]
pub(crate) struct Epoch {
    latest: u64,
    mounted: bool,
    /// User the in-flight or settled flow is about.
    subject: Option<UserId>,
}

impl Epoch {
    /// Starts a new flow, invalidating every older ticket.
    pub fn issue(&mut self, subject: Option<UserId>) -> Ticket {
        self.latest += 1;
        self.subject = subject;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.mounted && self.latest == ticket.0
    }

    pub fn subject(&self) -> Option<&UserId> {
        self.subject.as_ref()
    }

    pub fn set_subject(&mut self, subject: Option<UserId>) {
        self.subject = subject;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Returns false if already mounted.
    pub fn mount(&mut self) -> bool {
        if self.mounted {
            return false;
        }
        self.mounted = true;
        true
    }

    /// Marks the gate unmounted and invalidates every outstanding ticket.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.latest += 1;
        self.subject = None;
    }
}
