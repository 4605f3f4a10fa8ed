/// Lifecycle of one session run.
///
/// Transitions are strictly forward. Any failure after `ModeApplied` still
/// reaches `Restored` through the teardown path; `Aborted` is only reachable
/// while nothing has been mutated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Idle,
    ModeApplied,
    BackgroundStarted,
    LauncherStarted,
    LauncherFocused,
    AwaitingTermination,
    TearingDown,
    Restored,
    Aborted,
}

impl SessionState {
    /// Whether `next` is a legal successor of `self`. Intermediate states
    /// may be skipped (a disabled launcher jumps straight from
    /// `BackgroundStarted` to `AwaitingTermination`), but going backwards
    /// or leaving a terminal state is never legal.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            SessionState::Aborted => self == SessionState::Idle,
            _ => next > self,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Restored | SessionState::Aborted)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::ModeApplied => "mode-applied",
            SessionState::BackgroundStarted => "background-started",
            SessionState::LauncherStarted => "launcher-started",
            SessionState::LauncherFocused => "launcher-focused",
            SessionState::AwaitingTermination => "awaiting-termination",
            SessionState::TearingDown => "tearing-down",
            SessionState::Restored => "restored",
            SessionState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(SessionState::Idle.can_advance_to(SessionState::ModeApplied));
        assert!(SessionState::ModeApplied.can_advance_to(SessionState::BackgroundStarted));
        // Disabled launcher skips the launch and focus states.
        assert!(SessionState::BackgroundStarted.can_advance_to(SessionState::AwaitingTermination));
        assert!(SessionState::AwaitingTermination.can_advance_to(SessionState::TearingDown));
        assert!(SessionState::TearingDown.can_advance_to(SessionState::Restored));
    }

    #[test]
    fn test_no_backwards_transitions() {
        assert!(!SessionState::TearingDown.can_advance_to(SessionState::ModeApplied));
        assert!(!SessionState::LauncherFocused.can_advance_to(SessionState::LauncherStarted));
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Restored.is_terminal());
        assert!(SessionState::Aborted.is_terminal());
        assert!(!SessionState::Restored.can_advance_to(SessionState::Idle));
        // Aborted is only reachable before anything was mutated.
        assert!(SessionState::Idle.can_advance_to(SessionState::Aborted));
        assert!(!SessionState::ModeApplied.can_advance_to(SessionState::Aborted));
    }
}
