/// Run phase definitions for tracking pipeline progress
///
/// A run always ends in `Done`; failures degrade the data a run gathers, they never move
/// the state machine into a failed state.
use std::fmt;

/// Represents the current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Session not yet used
    Init,

    /// Loading the given page
    Fetching(u32),

    /// Resolving the page count from page 1
    Counting,

    /// Extracting cards from the given page
    Extracting(u32),

    /// Terminal phase, reached unconditionally
    Done,
}

impl RunPhase {
    /// Returns true if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Checks whether the orchestrator may move from this phase to `next`
    ///
    /// Any non-terminal phase may jump straight to `Done` (a lost session ends the walk).
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        match (*self, next) {
            (Self::Done, _) => false,
            (_, Self::Done) => true,
            (Self::Init, Self::Fetching(1)) => true,
            (Self::Fetching(1), Self::Counting) => true,
            (Self::Counting, Self::Extracting(1)) => true,
            (Self::Fetching(page), Self::Extracting(next)) => page > 1 && page == next,
            (Self::Extracting(page), Self::Fetching(next)) => next == page + 1,
            _ => false,
        }
    }

    /// Moves to `next`, logging the transition
    pub fn advance(&mut self, next: RunPhase) {
        debug_assert!(
            self.can_transition_to(next),
            "invalid run phase transition: {} -> {}",
            self,
            next
        );
        tracing::debug!("Run phase: {} -> {}", self, next);
        *self = next;
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Fetching(page) => write!(f, "fetching({})", page),
            Self::Counting => write!(f, "counting"),
            Self::Extracting(page) => write!(f, "extracting({})", page),
            Self::Done => write!(f, "done"),
        }
    }
}
