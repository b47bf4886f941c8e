/// The playback lifecycle state machine of spec.md §4.4.
///
/// State equality is by variant; for `Error`, two values are equal iff
/// their diagnostic strings match (spec.md §3), which is why this derives
/// `PartialEq` rather than comparing only discriminants.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Connecting,
    Playing,
    Paused,
    Stopped,
    Error(String),
}

/// What promoted the session into `Playing` — SPEC_FULL.md §2/§5's
/// resolution of spec.md §9's open question. The state machine itself stays
/// permissive (either trigger promotes to `Playing`); this is surfaced
/// alongside the state change so a strict consumer can still tell the two
/// apart without the core forking into two state machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayingSince {
    /// The transport reported `NetStream.Play.Start` (or `Connect`).
    PlayStartStatus,
    /// The first media tag arrived before any such status was observed.
    FirstMediaTag,
}

impl SessionState {
    pub fn is_playing(&self) -> bool {
        matches!(self, SessionState::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, SessionState::Paused)
    }

    /// `play()` is valid only from `idle` / `stopped` / `error` (spec.md §4.4).
    pub fn can_play(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Stopped | SessionState::Error(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_states_equal_by_diagnostic() {
        assert_eq!(
            SessionState::Error("a".into()),
            SessionState::Error("a".into())
        );
        assert_ne!(
            SessionState::Error("a".into()),
            SessionState::Error("b".into())
        );
    }

    #[test]
    fn can_play_gates_correctly() {
        assert!(SessionState::Idle.can_play());
        assert!(SessionState::Stopped.can_play());
        assert!(SessionState::Error("x".into()).can_play());
        assert!(!SessionState::Connecting.can_play());
        assert!(!SessionState::Playing.can_play());
        assert!(!SessionState::Paused.can_play());
    }
}
