mod domain;
pub use domain::*;

mod control;
pub use control::*;

mod event;
pub use event::*;
