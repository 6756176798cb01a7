use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Progress of a single launch attempt.
///
/// Variants are declared in lifecycle order; the derived `Ord` is the
/// order transitions must follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    NotStarted,
    InstanceStarting,
    PreCreateHookFired,
    ContextReady,
    Resolved,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 5] = [
        Self::NotStarted,
        Self::InstanceStarting,
        Self::PreCreateHookFired,
        Self::ContextReady,
        Self::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InstanceStarting => "instance_starting",
            Self::PreCreateHookFired => "pre_create_hook_fired",
            Self::ContextReady => "context_ready",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == s)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition rules for [`LifecycleState`].
///
/// A launch may skip a stage (a host that never reports creation still
/// reaches `ContextReady`) but never moves backward or stays put.
pub struct LifecycleStateMachine;

impl LifecycleStateMachine {
    pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> Result<()> {
        if to > from {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition { from, to })
        }
    }

    pub fn can_transition(from: LifecycleState, to: LifecycleState) -> bool {
        Self::validate_transition(from, to).is_ok()
    }

    pub fn next_state(current: LifecycleState) -> Option<LifecycleState> {
        match current {
            LifecycleState::NotStarted => Some(LifecycleState::InstanceStarting),
            LifecycleState::InstanceStarting => Some(LifecycleState::PreCreateHookFired),
            LifecycleState::PreCreateHookFired => Some(LifecycleState::ContextReady),
            LifecycleState::ContextReady => Some(LifecycleState::Resolved),
            LifecycleState::Resolved => None,
        }
    }
}
