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

//! In-process job driver
//!
//! One [`Pipeline`] runs one stats job over a batch of raw events:
//! scan filter → map (optionally on several worker threads, one mapper each)
//! → map-side combine → key-ordered shuffle → fold → bind → sink.
//!
//! Bad records are filtered and counted by the mappers. Anything that means
//! the stages disagree (unsupported KPI, value shape mismatch, undecodable
//! shuffle bytes, a bind without a layout) aborts the run.

use crate::aggregator::Aggregator;
use crate::error::{TransformError, TransformResult};
use crate::mapper::{JobKind, MapperCounters, MapperDeps, StatsMapper};
use crate::shuffle::ShuffleBuffer;
use crate::sink::OutputSink;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};
use webstats_core::{
    validate_kpi_tables, AggregatedValue, DimensionConverter, OutputBinder, OutputTable,
    PartialValue, RawEvent, StatsKey,
};

/// Outcome of one job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job: JobKind,
    /// Records offered to the job, before the event-kind scan filter
    pub scanned_records: u64,
    pub counters: MapperCounters,
    /// Values left after map-side combining
    pub shuffled_values: u64,
    pub keys: u64,
    pub rows_by_table: BTreeMap<OutputTable, u64>,
    /// Members recorded in the registry after their info rows were written
    pub registered_members: u64,
}

impl JobReport {
    pub fn total_rows(&self) -> u64 {
        self.rows_by_table.values().sum()
    }
}

pub struct Pipeline {
    job: JobKind,
    deps: MapperDeps,
    aggregator: Aggregator,
    map_workers: usize,
}

impl Pipeline {
    /// Fails if the KPI rule tables disagree, before any record is read
    pub fn new(job: JobKind, deps: MapperDeps) -> TransformResult<Self> {
        validate_kpi_tables()?;
        let aggregator = Aggregator::new(deps.ctx.offset);
        Ok(Self {
            job,
            deps,
            aggregator,
            map_workers: 1,
        })
    }

    pub fn with_map_workers(mut self, map_workers: usize) -> Self {
        self.map_workers = map_workers.max(1);
        self
    }

    pub fn job(&self) -> JobKind {
        self.job
    }

    pub fn run<C, S>(
        &self,
        records: &[RawEvent],
        converter: &C,
        sink: &mut S,
    ) -> TransformResult<JobReport>
    where
        C: DimensionConverter + ?Sized,
        S: OutputSink + ?Sized,
    {
        let accepted: Vec<&RawEvent> = records
            .iter()
            .filter(|event| self.job.accepts(event))
            .collect();
        debug!(
            job = %self.job,
            scanned = records.len(),
            accepted = accepted.len(),
            "scan filter applied"
        );

        let (shuffle, counters) = self.map_stage(&accepted)?;
        let shuffled_values = shuffle.value_count() as u64;
        let keys = shuffle.key_count() as u64;

        let binder = OutputBinder::new(converter, self.deps.ctx.run_date.clone());
        let mut rows_by_table = BTreeMap::new();
        let mut seen_members = BTreeSet::new();
        for group in shuffle.into_groups() {
            let (key, values) = group?;
            let aggregated = self.aggregator.fold(&key, values)?;
            for row in binder.bind(&key, &aggregated)? {
                sink.write(&row)?;
                *rows_by_table.entry(row.table).or_insert(0u64) += 1;
            }
            if let AggregatedValue::Markers(ids) = aggregated.value {
                seen_members.extend(ids);
            }
        }
        sink.flush()?;

        // Only after the sink has the rows, so a failed write leaves them new
        for member_id in &seen_members {
            self.deps.members.record_member(member_id)?;
        }

        let report = JobReport {
            job: self.job,
            scanned_records: records.len() as u64,
            counters,
            shuffled_values,
            keys,
            rows_by_table,
            registered_members: seen_members.len() as u64,
        };
        info!(
            job = %self.job,
            input = report.counters.input_records,
            filtered = report.counters.filtered_records,
            output = report.counters.output_records,
            keys = report.keys,
            rows = report.total_rows(),
            "job finished"
        );
        Ok(report)
    }

    fn map_stage(&self, events: &[&RawEvent]) -> TransformResult<(ShuffleBuffer, MapperCounters)> {
        let prototype = self.job.build_mapper(&self.deps);
        let workers = self.map_workers.min(events.len()).max(1);
        if workers == 1 {
            return self.map_chunk(prototype, events);
        }

        let chunk_size = events.len().div_ceil(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = events
                .chunks(chunk_size)
                .map(|chunk| {
                    let mapper = prototype.fresh();
                    scope.spawn(move || self.map_chunk(mapper, chunk))
                })
                .collect();

            let mut shuffle = ShuffleBuffer::new();
            let mut counters = MapperCounters::default();
            for handle in handles {
                let (partial, partial_counters) = handle.join().map_err(|_| {
                    TransformError::WorkerError(format!("{} map worker panicked", self.job))
                })??;
                shuffle.merge(partial);
                counters.merge(&partial_counters);
            }
            Ok((shuffle, counters))
        })
    }

    /// Map one slice of events, combine per key, encode into a shuffle buffer
    fn map_chunk(
        &self,
        mut mapper: Box<dyn StatsMapper>,
        events: &[&RawEvent],
    ) -> TransformResult<(ShuffleBuffer, MapperCounters)> {
        let mut local: BTreeMap<StatsKey, Vec<PartialValue>> = BTreeMap::new();
        for event in events {
            for fact in mapper.map(event) {
                local.entry(fact.key).or_default().push(fact.value);
            }
        }

        let mut shuffle = ShuffleBuffer::new();
        for (key, values) in local {
            for value in self.aggregator.combine(&key, values)? {
                shuffle.push(key.clone(), &value)?;
            }
        }
        Ok((shuffle, mapper.counters()))
    }
}
