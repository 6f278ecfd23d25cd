mod event;
mod machine;
mod state;

pub use event::{EventSink, RecordingSink};
pub use machine::{IncidentError, IncidentMachine, Transition};
pub use state::{Signal, Step};
