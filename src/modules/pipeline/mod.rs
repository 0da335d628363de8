pub mod encoder;
pub mod error;
pub mod job;
pub mod manifest;
pub mod orchestrator;
pub mod probe;
pub mod process;
pub mod profile;
pub mod quarantine;
pub mod verify;

pub use error::PipelineError;
pub use orchestrator::{Pipeline, PipelineOutcome};
