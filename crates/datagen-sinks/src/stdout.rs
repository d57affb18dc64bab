//! Standard output sink: one JSON object per line.

use crate::error::SinkError;
use crate::{Sink, SinkMode};
use datagen_generator::{Model, Row};
use std::io::{self, Write};

#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn init(&self, _model: &Model, _mode: SinkMode) -> Result<(), SinkError> {
        Ok(())
    }

    fn send_batch(&self, rows: &[Row]) -> Result<(), SinkError> {
        // One lock per batch keeps the lines of a batch together.
        let mut out = io::stdout().lock();
        for row in rows {
            serde_json::to_writer(&mut out, &row.to_json())?;
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }

    fn terminate(&self) -> Result<(), SinkError> {
        io::stdout().flush()?;
        Ok(())
    }
}
