//! Per-step records and the sinks they are handed to.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TdvpResult;
use crate::operator::LocalStats;

/// Snapshot of the simulation after an accepted step.
///
/// The initial state is recorded as step 0 with `dt = 0` and no solver
/// diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub t: f64,
    pub dt: f64,
    pub energy: LocalStats,
    pub observables: BTreeMap<String, LocalStats>,
    /// TDVP error of the solve at the start of the step
    pub tdvp_error: Option<f64>,
    /// Linear residual of the solve at the start of the step
    pub residual: Option<f64>,
    /// Rejected attempts before the step was accepted
    pub rejections: usize,
    /// Acceptance rate of the measurement batch
    pub acceptance: f64,
    pub params: Vec<f64>,
}

/// Append-only sink for step records.
pub trait Recorder {
    fn record(&mut self, record: &StepRecord) -> TdvpResult<()>;

    fn flush(&mut self) -> TdvpResult<()> {
        Ok(())
    }
}

/// Discards every record.
#[derive(Clone, Debug, Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn record(&mut self, _record: &StepRecord) -> TdvpResult<()> {
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecorder {
    pub records: Vec<StepRecord>,
}

impl Recorder for MemoryRecorder {
    fn record(&mut self, record: &StepRecord) -> TdvpResult<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Writes one YAML document per record.
pub struct YamlRecorder {
    writer: BufWriter<File>,
}

impl YamlRecorder {
    pub fn create<P: AsRef<Path>>(path: P) -> TdvpResult<Self> {
        let file = File::create(path)?;
        Ok(Self { writer: BufWriter::new(file) })
    }
}

impl Recorder for YamlRecorder {
    fn record(&mut self, record: &StepRecord) -> TdvpResult<()> {
        writeln!(self.writer, "---")?;
        serde_yaml::to_writer(&mut self.writer, record)?;
        Ok(())
    }

    fn flush(&mut self) -> TdvpResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read back a stream written by [`YamlRecorder`].
pub fn read_records<P: AsRef<Path>>(path: P) -> TdvpResult<Vec<StepRecord>> {
    let text = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&text) {
        records.push(StepRecord::deserialize(document)?);
    }
    Ok(records)
}
