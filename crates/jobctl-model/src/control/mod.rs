mod state;
pub use state::ControllerState;

mod decision;
pub use decision::{ConflictDecision, ParseDecisionError};

mod snapshot;
pub use snapshot::ControllerSnapshot;
