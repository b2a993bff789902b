//! Provisioning pipeline states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Steps of one provisioning run, in order
///
/// Each state is a precondition for the next. A failed run is reported with
/// the state it was trying to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    Created,
    PlanBound,
    Subscribed,
    KeyAwaited,
    Verified,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::PlanBound => "plan-bound",
            Self::Subscribed => "subscribed",
            Self::KeyAwaited => "key-awaited",
            Self::Verified => "verified",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered() {
        let states = [
            PipelineState::Created,
            PipelineState::PlanBound,
            PipelineState::Subscribed,
            PipelineState::KeyAwaited,
            PipelineState::Verified,
            PipelineState::Done,
        ];
        assert!(states.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(states[3].to_string(), "key-awaited");
    }
}
