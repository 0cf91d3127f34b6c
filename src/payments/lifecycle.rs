//! Payment lifecycle state machine
//!
//! `New -> TokenRequested -> TokenIssued -> Redirected`. Verify, check and refund
//! are follow-up calls that can each run any number of times once a token exists
//! or the bank has redirected back; they do not move the main state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    New,
    TokenRequested,
    TokenIssued,
    Redirected,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::New => "new",
            LifecycleState::TokenRequested => "token_requested",
            LifecycleState::TokenIssued => "token_issued",
            LifecycleState::Redirected => "redirected",
        };
        f.write_str(name)
    }
}

/// Follow-up calls made after the user returns from the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FollowUp {
    Verified,
    Checked,
    Refunded,
}

/// What the session should do when asked for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    /// Issue a GetToken request
    Request,
    /// A token is already held; hand it back
    ReuseCached,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    completed: BTreeSet<FollowUp>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::New,
            completed: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn has_completed(&self, follow_up: FollowUp) -> bool {
        self.completed.contains(&follow_up)
    }

    pub fn completed(&self) -> impl Iterator<Item = FollowUp> + '_ {
        self.completed.iter().copied()
    }

    /// Moves to `TokenRequested` from `New`; reports a cache hit otherwise.
    pub fn begin_token_request(&mut self) -> TokenAction {
        match self.state {
            LifecycleState::New | LifecycleState::TokenRequested => {
                self.state = LifecycleState::TokenRequested;
                TokenAction::Request
            }
            LifecycleState::TokenIssued | LifecycleState::Redirected => TokenAction::ReuseCached,
        }
    }

    pub fn token_issued(&mut self) {
        if self.state == LifecycleState::TokenRequested {
            self.state = LifecycleState::TokenIssued;
        }
    }

    /// A request that did not yield a token leaves nothing to reuse.
    pub fn token_request_failed(&mut self) {
        if self.state == LifecycleState::TokenRequested {
            self.state = LifecycleState::New;
        }
    }

    pub fn redirected(&mut self) {
        if self.state == LifecycleState::TokenIssued {
            self.state = LifecycleState::Redirected;
        }
    }

    pub fn record(&mut self, follow_up: FollowUp) {
        self.completed.insert(follow_up);
    }
}
