pub mod config;
pub use config::{ControllerConfig, PollBackoff};
pub mod error;
pub use error::ControllerError;
pub mod polling;
pub use polling::{PollOutcome, PollSink, PollingLoop};
pub mod conflict;
pub use conflict::{Conflict, ConflictResolver};
pub mod controller;
pub use controller::{ControllerBuilder, JobController};
mod state;
mod subscriber;
pub use subscriber::Subscribe;

#[cfg(test)]
mod testing;
