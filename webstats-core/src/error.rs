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

//! Error types for the dimension and aggregation core

use crate::kpi::KpiKind;
use thiserror::Error;

/// Result type for core operations
pub type StatsResult<T> = Result<T, StatsError>;

/// Errors raised by the dimension/aggregation core.
///
/// None of these describe bad input records; those are filtered and counted
/// by the mappers. Every variant here means the pipeline itself is out of
/// sync and the pass must stop.
#[derive(Debug, Error)]
pub enum StatsError {
    /// A common dimension group was used before all of its fields were set
    #[error("Incomplete dimension group: missing {0}")]
    IncompleteKey(&'static str),

    /// A KPI name that no rule table knows about
    #[error("Unsupported KPI: {0}")]
    UnsupportedKpi(String),

    /// A partial value whose shape does not fit the KPI's accumulation rule
    #[error("KPI {kpi} expects {expected} values, got {found}")]
    ValueMismatch {
        kpi: KpiKind,
        expected: &'static str,
        found: &'static str,
    },

    /// The binder has no row layout for this key/value combination
    #[error("Unsupported output for KPI {kpi}: {reason}")]
    UnsupportedOutput { kpi: KpiKind, reason: String },

    /// The combination, accumulation and output tables disagree
    #[error("Inconsistent rule tables for KPI {kpi}: {reason}")]
    InconsistentTables { kpi: KpiKind, reason: String },

    /// Partial value bytes could not be decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// The dimension-id lookup collaborator failed
    #[error("Dimension lookup failed for {dimension}: {reason}")]
    Lookup { dimension: String, reason: String },

    /// A millisecond timestamp outside the representable calendar range
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}
