//! Evolution module - the TDVP time-stepping loop and its step records.

mod driver;
mod record;

pub use driver::TimeEvolution;
pub use record::{StepRecord, Recorder, NullRecorder, MemoryRecorder, YamlRecorder, read_records};
