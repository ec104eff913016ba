pub mod actions;
pub mod pacing;
pub mod runner;
pub mod selectors;
pub mod sequencer;
pub mod stages;
pub mod text;

pub use pacing::Pacer;
pub use runner::{JobQueue, JobRegistry, JobRunner, JobStatus, RetryPolicy, RunReport};
pub use sequencer::{BookingOutcome, BookingSequencer, Stage};
