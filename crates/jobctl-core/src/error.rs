use jobctl_model::ControllerState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// Operation not valid in the current phase. Nothing changed and nothing was sent.
    #[error("controller busy: cannot {op} while {state}")]
    Busy {
        op: &'static str,
        state: ControllerState,
    },

    #[error("invalid controller config: {0}")]
    InvalidConfig(String),
}

impl ControllerError {
    pub(crate) fn busy(op: &'static str, state: ControllerState) -> Self {
        ControllerError::Busy { op, state }
    }
}
