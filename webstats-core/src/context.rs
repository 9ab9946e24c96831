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

//! Job context shared by every stage of one pass

use chrono::{FixedOffset, Offset, Utc};

/// Values injected by the surrounding job rather than read from records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    /// Run date (`YYYY-MM-DD`) appended to every bound row
    pub run_date: String,
    /// Local offset for day boundaries and hour slots
    pub offset: FixedOffset,
}

impl JobContext {
    pub fn new(run_date: impl Into<String>, offset: FixedOffset) -> Self {
        Self {
            run_date: run_date.into(),
            offset,
        }
    }

    pub fn utc(run_date: impl Into<String>) -> Self {
        Self::new(run_date, Utc.fix())
    }
}
