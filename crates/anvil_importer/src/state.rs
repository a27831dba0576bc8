//! Per-unit build state machine.

use std::fmt;

/// The states a source unit passes through on its way to being loaded.
///
/// ```text
/// Unparsed → DirectivesResolved → CacheHit  → Loaded
///                               ↘ CacheMiss → Compiling → Loaded
/// ```
/// Any non-terminal state may fail. `Loaded` and `Failed` are terminal;
/// a unit never re-enters `Compiling` without a fresh cache-key
/// mismatch, which starts a new pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// The source has been read but its directives not yet evaluated.
    Unparsed,
    /// Directives evaluated and merged into a resolved configuration.
    DirectivesResolved,
    /// A valid cached artifact was found; no compilation needed.
    CacheHit,
    /// No valid cached artifact; compilation is required.
    CacheMiss,
    /// The compiler is running for this unit.
    Compiling,
    /// The artifact's entry point is live in the host process. Terminal.
    Loaded,
    /// The unit's build or load failed. Terminal.
    Failed,
}

impl UnitState {
    /// Returns `true` for the terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Loaded | UnitState::Failed)
    }

    /// Whether the machine permits moving from `self` to `next`.
    pub fn can_transition(self, next: UnitState) -> bool {
        use UnitState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Failed) => true,
            (Unparsed, DirectivesResolved) => true,
            (DirectivesResolved, CacheHit) | (DirectivesResolved, CacheMiss) => true,
            (CacheMiss, Compiling) => true,
            (CacheHit, Loaded) | (Compiling, Loaded) => true,
            _ => false,
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitState::Unparsed => "unparsed",
            UnitState::DirectivesResolved => "directives-resolved",
            UnitState::CacheHit => "cache-hit",
            UnitState::CacheMiss => "cache-miss",
            UnitState::Compiling => "compiling",
            UnitState::Loaded => "loaded",
            UnitState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks one unit's progress through the state machine.
#[derive(Debug)]
pub struct UnitProgress {
    state: UnitState,
}

impl UnitProgress {
    /// Starts a fresh pipeline run in `Unparsed`.
    pub fn new() -> Self {
        Self {
            state: UnitState::Unparsed,
        }
    }

    /// The current state.
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Moves to `next`. Illegal transitions are a pipeline bug.
    pub fn advance(&mut self, next: UnitState) {
        debug_assert!(
            self.state.can_transition(next),
            "illegal unit state transition {} -> {next}",
            self.state
        );
        self.state = next;
    }

    /// Marks the unit failed, legal from any non-terminal state.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = UnitState::Failed;
        }
    }
}

impl Default for UnitProgress {
    fn default() -> Self {
        Self::new()
    }
}
