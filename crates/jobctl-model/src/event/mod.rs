mod kind;
pub use kind::JobEventKind;

mod job_event;
pub use job_event::JobEvent;
