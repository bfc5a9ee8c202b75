//! Per-request pipeline state machine.

use crate::error::{ErrorKind, Stage};

/// Where one invocation is.
///
/// Success advances one step along
/// `Received -> Stored -> FrameExtracted -> Classified -> Assembled -> Done`.
/// Any failure from a non-terminal state goes straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Stored,
    FrameExtracted,
    Classified,
    Assembled,
    Done,
    Failed { stage: Stage, kind: ErrorKind },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }

    /// Successor on success. Terminal states have none.
    pub fn next(&self) -> Option<PipelineState> {
        match self {
            PipelineState::Received => Some(PipelineState::Stored),
            PipelineState::Stored => Some(PipelineState::FrameExtracted),
            PipelineState::FrameExtracted => Some(PipelineState::Classified),
            PipelineState::Classified => Some(PipelineState::Assembled),
            PipelineState::Assembled => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed { .. } => None,
        }
    }

    /// Stage that runs while in this state.
    pub fn pending_stage(&self) -> Option<Stage> {
        match self {
            PipelineState::Received => Some(Stage::Store),
            PipelineState::Stored => Some(Stage::Extract),
            PipelineState::FrameExtracted => Some(Stage::Classify),
            PipelineState::Classified => Some(Stage::Assemble),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Received => "received",
            PipelineState::Stored => "stored",
            PipelineState::FrameExtracted => "frame_extracted",
            PipelineState::Classified => "classified",
            PipelineState::Assembled => "assembled",
            PipelineState::Done => "done",
            PipelineState::Failed { .. } => "failed",
        }
    }
}

/// Tracks one invocation's state and rejects illegal transitions.
#[derive(Debug)]
pub struct StateTracker {
    state: PipelineState,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self {
            state: PipelineState::Received,
        }
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Advance one step. Returns the new state, or `None` if already terminal.
    pub fn advance(&mut self) -> Option<PipelineState> {
        let next = self.state.next()?;
        self.state = next;
        Some(next)
    }

    /// Move to `Failed`. A terminal state is left untouched.
    pub fn fail(&mut self, stage: Stage, kind: ErrorKind) -> PipelineState {
        if !self.state.is_terminal() {
            self.state = PipelineState::Failed { stage, kind };
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_sequence() {
        let mut tracker = StateTracker::new();
        let mut seen = vec![tracker.state()];
        while let Some(next) = tracker.advance() {
            seen.push(next);
        }

        assert_eq!(
            seen,
            vec![
                PipelineState::Received,
                PipelineState::Stored,
                PipelineState::FrameExtracted,
                PipelineState::Classified,
                PipelineState::Assembled,
                PipelineState::Done,
            ]
        );
        assert!(tracker.state().is_terminal());
    }

    #[test]
    fn test_fail_from_any_non_terminal_state() {
        let mut tracker = StateTracker::new();
        tracker.advance();
        assert_eq!(tracker.state().pending_stage(), Some(Stage::Extract));

        let state = tracker.fail(Stage::Extract, ErrorKind::CorruptInput);
        assert_eq!(
            state,
            PipelineState::Failed {
                stage: Stage::Extract,
                kind: ErrorKind::CorruptInput
            }
        );
        assert_eq!(tracker.advance(), None);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut tracker = StateTracker::new();
        while tracker.advance().is_some() {}

        assert_eq!(tracker.fail(Stage::Pipeline, ErrorKind::PipelineTimeout), PipelineState::Done);
    }
}
