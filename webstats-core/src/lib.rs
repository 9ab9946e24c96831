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

//! Webstats Core
//!
//! Dimension values, composite stats keys, KPI rule tables, partial and
//! aggregated values, and the output binder of the web-analytics transformer.

pub mod binder;
pub mod context;
pub mod dimension;
pub mod error;
pub mod event;
pub mod key;
pub mod kpi;
pub mod lookup;
pub mod value;

pub use binder::{OutputBinder, ParameterizedRow, SqlParam};
pub use context::JobContext;
pub use dimension::{
    BrowserDimension, DateDimension, DateGranularity, DimensionKind, DimensionValue,
    InboundPattern, InboundSource, PlatformDimension, Scope, ALL_INBOUND_ID, DEFAULT_VALUE,
    OTHER_INBOUND_ID, VALUE_OF_ALL,
};
pub use error::{StatsError, StatsResult};
pub use event::{EventKind, RawEvent};
pub use key::{CommonDimensions, CommonDimensionsBuilder, KeyPlan, Specialization, StatsKey};
pub use kpi::{validate_kpi_tables, AccumulationRule, CombinationRule, KpiKind, OutputTable};
pub use lookup::{DimensionConverter, InboundSourceTable, MemberRegistry};
pub use value::{Aggregated, AggregatedValue, HourlyCounts, PartialValue, TOTAL_SLOT};
