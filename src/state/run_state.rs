/// Run state definitions for tracking a crawl from start to finish
use std::fmt;

/// Represents the lifecycle status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    // ===== Active States =====
    /// Run has been created but no target has started
    Pending,

    /// Targets are being crawled
    Running,

    // ===== Terminal States =====
    /// Every target was processed (individual failures are counted, not fatal)
    Completed,

    /// The wall-clock limit expired or the run was cancelled
    TimedOut,

    /// No target could be reached at all
    Failed,
}

impl RunStatus {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Failed)
    }

    /// Returns true if the run may move from this state to `next`
    ///
    /// Allowed transitions:
    /// - Pending -> Running | TimedOut | Failed
    /// - Running -> Completed | TimedOut | Failed
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::TimedOut | Self::Failed),
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "timed_out" => Some(Self::TimedOut),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Running totals for one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    /// Valid items extracted (after keyword filtering)
    pub discovered: u64,
    /// Items persisted for the first time
    pub stored: u64,
    /// Items whose fingerprint was already known
    pub duplicates: u64,
    /// Failed targets, failed pages and failed stores
    pub errors: u64,
    /// Items missing a required field
    pub dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::TimedOut.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }

    #[test]
    fn test_transitions() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Completed));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Completed));
        assert!(RunStatus::Running.can_transition_to(RunStatus::TimedOut));
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Pending));
        assert!(!RunStatus::Completed.can_transition_to(RunStatus::TimedOut));
        assert!(!RunStatus::TimedOut.can_transition_to(RunStatus::Completed));
    }

    #[test]
    fn test_db_string_roundtrip() {
        for status in [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::TimedOut,
            RunStatus::Failed,
        ] {
            assert_eq!(RunStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(RunStatus::from_db_string("bogus"), None);
    }
}
