//! Phase transition rules.

use super::types::RunPhase;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: RunPhase, to: RunPhase },
    #[error("cannot transition from terminal state {state:?}")]
    FromTerminalState { state: RunPhase },
}

pub struct StateTransition;

impl StateTransition {
    pub fn validate(from: RunPhase, to: RunPhase) -> Result<(), TransitionError> {
        if Self::is_terminal(from) {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = match (from, to) {
            (RunPhase::Idle, RunPhase::Collecting) => true,
            (RunPhase::Collecting, RunPhase::Analyzing) => true,
            (RunPhase::Analyzing, RunPhase::Archiving) => true,
            (RunPhase::Archiving, RunPhase::Completed) => true,

            // Run-level fatal conditions can strike in any live phase.
            (_, RunPhase::Failed) => true,

            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    pub fn is_terminal(phase: RunPhase) -> bool {
        matches!(phase, RunPhase::Completed | RunPhase::Failed)
    }

    pub fn phase_description(phase: RunPhase) -> &'static str {
        match phase {
            RunPhase::Idle => "Idle",
            RunPhase::Collecting => "Collecting device output",
            RunPhase::Analyzing => "Analysing captures",
            RunPhase::Archiving => "Archiving run",
            RunPhase::Completed => "Completed",
            RunPhase::Failed => "Failed",
        }
    }
}
