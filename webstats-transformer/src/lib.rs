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

//! Webstats Transformer
//!
//! Fact emitters, aggregation and the in-process job driver that turn raw
//! event-log records into bound rows for the stats tables.

pub mod aggregator;
pub mod collaborators;
pub mod config;
pub mod converter;
pub mod error;
pub mod inbound_resolver;
pub mod mapper;
pub mod pipeline;
pub mod shuffle;
pub mod sink;

pub use aggregator::Aggregator;
pub use collaborators::{ConfiguredInboundTable, InMemoryMemberRegistry};
pub use config::JobConfig;
pub use converter::{
    CachedDimensionConverter, ConverterCacheStats, DimensionAssignment, InMemoryDimensionConverter,
};
pub use error::{TransformError, TransformResult};
pub use inbound_resolver::{InboundResolution, InboundResolver};
pub use mapper::{Fact, JobKind, MapperCounters, MapperDeps, StatsMapper};
pub use pipeline::{JobReport, Pipeline};
pub use shuffle::ShuffleBuffer;
pub use sink::{JsonLinesSink, MemorySink, OutputSink};
