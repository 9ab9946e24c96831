// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Output sinks for bound rows

use crate::error::{TransformError, TransformResult};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use webstats_core::{OutputTable, ParameterizedRow};

/// Receives bound rows; batching and commit boundaries are up to the sink
pub trait OutputSink {
    fn write(&mut self, row: &ParameterizedRow) -> TransformResult<()>;

    fn flush(&mut self) -> TransformResult<()>;
}

/// Keeps every row, grouped by table
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: BTreeMap<OutputTable, Vec<ParameterizedRow>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_for(&self, table: OutputTable) -> &[ParameterizedRow] {
        self.rows.get(&table).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn total_rows(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn into_rows(self) -> BTreeMap<OutputTable, Vec<ParameterizedRow>> {
        self.rows
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, row: &ParameterizedRow) -> TransformResult<()> {
        self.rows.entry(row.table).or_default().push(row.clone());
        Ok(())
    }

    fn flush(&mut self) -> TransformResult<()> {
        Ok(())
    }
}

/// One JSON object per row, flushed every `batch_size` rows
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
    batch_size: usize,
    pending: usize,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_batch_size(writer, 1000)
    }

    pub fn with_batch_size(writer: W, batch_size: usize) -> Self {
        Self {
            writer: BufWriter::new(writer),
            batch_size: batch_size.max(1),
            pending: 0,
            written: 0,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(mut self) -> TransformResult<W> {
        self.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| TransformError::SinkError(e.error().to_string()))
    }
}

impl<W: Write> OutputSink for JsonLinesSink<W> {
    fn write(&mut self, row: &ParameterizedRow) -> TransformResult<()> {
        serde_json::to_writer(&mut self.writer, row)?;
        self.writer.write_all(b"\n")?;
        self.pending += 1;
        self.written += 1;
        if self.pending >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> TransformResult<()> {
        self.writer.flush()?;
        self.pending = 0;
        Ok(())
    }
}
