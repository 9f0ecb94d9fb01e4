use serde::{Deserialize, Serialize};

/// Processing status of a submitted feed, as reported by MWS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    Submitted,
    InProgress,
    Done,
    Cancelled,
    Unconfirmed,
    InSafetyNet,
    AwaitingAsynchronousReply,
}

impl ProcessingStatus {
    /// Raw MWS status tag
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Submitted => "_SUBMITTED_",
            Self::InProgress => "_IN_PROGRESS_",
            Self::Done => "_DONE_",
            Self::Cancelled => "_CANCELLED_",
            Self::Unconfirmed => "_UNCONFIRMED_",
            Self::InSafetyNet => "_IN_SAFETY_NET_",
            Self::AwaitingAsynchronousReply => "_AWAITING_ASYNCHRONOUS_REPLY_",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "_SUBMITTED_" => Some(Self::Submitted),
            "_IN_PROGRESS_" => Some(Self::InProgress),
            "_DONE_" => Some(Self::Done),
            "_CANCELLED_" => Some(Self::Cancelled),
            "_UNCONFIRMED_" => Some(Self::Unconfirmed),
            "_IN_SAFETY_NET_" => Some(Self::InSafetyNet),
            "_AWAITING_ASYNCHRONOUS_REPLY_" => Some(Self::AwaitingAsynchronousReply),
            _ => None,
        }
    }

    /// A terminal submission is never polled again. The transient MWS
    /// states (unconfirmed, safety net, awaiting async reply) stay
    /// pollable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_states_are_not_terminal() {
        assert!(ProcessingStatus::Done.is_terminal());
        assert!(ProcessingStatus::Cancelled.is_terminal());
        assert!(!ProcessingStatus::Submitted.is_terminal());
        assert!(!ProcessingStatus::Unconfirmed.is_terminal());
        assert!(!ProcessingStatus::InSafetyNet.is_terminal());
        assert!(!ProcessingStatus::AwaitingAsynchronousReply.is_terminal());
    }

    #[test]
    fn tag_round_trip() {
        for status in [
            ProcessingStatus::Submitted,
            ProcessingStatus::InProgress,
            ProcessingStatus::Done,
            ProcessingStatus::Cancelled,
            ProcessingStatus::Unconfirmed,
            ProcessingStatus::InSafetyNet,
            ProcessingStatus::AwaitingAsynchronousReply,
        ] {
            assert_eq!(ProcessingStatus::from_tag(status.as_tag()), Some(status));
        }
        assert_eq!(ProcessingStatus::from_tag("_BOGUS_"), None);
    }
}
