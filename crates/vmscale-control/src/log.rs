//! Decision log — append-only CSV, one row per tick.
//!
//! ```text
//! time,slot,vm_id,pred_cpu,vm_count            (per-unit schema)
//! 3.00,3,1,84.2500,2
//!
//! time,slot,avg_cpu_percent,vm_count           (aggregate schema)
//! 3.00,3,100.0000,2
//! ```
//!
//! A missing signal is written as `-1.0000`. Rows are flushed as soon as
//! they are written.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{Terminator, WriterBuilder};

use vmscale_core::{DecisionRecord, LogSchema};

use crate::error::{ControlError, ControlResult};

/// Value written when no signal was available.
pub const NO_SIGNAL: f64 = -1.0;

pub struct DecisionLog {
    writer: csv::Writer<Box<dyn Write + Send>>,
    schema: LogSchema,
    rows: u64,
}

impl DecisionLog {
    /// Start a log on `sink`, writing the header immediately.
    pub fn new(sink: Box<dyn Write + Send>, schema: LogSchema) -> ControlResult<Self> {
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(sink);
        writer.write_record(schema.header())?;
        writer.flush()?;
        Ok(Self {
            writer,
            schema,
            rows: 0,
        })
    }

    /// Create (or truncate) a log file.
    pub fn create(path: &Path, schema: LogSchema) -> ControlResult<Self> {
        let file = File::create(path).map_err(|source| ControlError::CreateLog {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(Box::new(file), schema)
    }

    pub fn schema(&self) -> LogSchema {
        self.schema
    }

    /// Rows written so far, excluding the header.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn append(&mut self, record: &DecisionRecord) -> ControlResult<()> {
        let time = format!("{:.2}", record.time);
        let slot = record.slot.to_string();
        let value = format!("{:.4}", record.signal_value.unwrap_or(NO_SIGNAL));
        let count = record.fleet_size.to_string();

        match self.schema {
            LogSchema::PerUnit => {
                let subject = record.subject.to_string();
                self.writer.write_record([time, slot, subject, value, count])?;
            }
            LogSchema::Aggregate => {
                self.writer.write_record([time, slot, value, count])?;
            }
        }
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> ControlResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
