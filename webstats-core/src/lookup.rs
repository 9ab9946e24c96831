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

//! Collaborator seams
//!
//! The core calls these synchronously and never caches their answers itself.

use crate::dimension::{DimensionValue, InboundPattern};
use crate::error::StatsResult;

/// Resolves a dimension value to its surrogate id
pub trait DimensionConverter: Send + Sync {
    /// Same value, same id, for the lifetime of the converter
    fn resolve(&self, value: &DimensionValue) -> StatsResult<i32>;
}

/// Supplies the ordered inbound pattern list, loaded once per job
pub trait InboundSourceTable: Send + Sync {
    fn inbound_patterns(&self) -> StatsResult<Vec<InboundPattern>>;
}

/// Side table of members seen on earlier days
pub trait MemberRegistry: Send + Sync {
    fn is_new_member(&self, member_id: &str) -> StatsResult<bool>;

    /// Upsert the "seen" marker once the member's info row is written
    fn record_member(&self, member_id: &str) -> StatsResult<()>;
}

impl<T: DimensionConverter + ?Sized> DimensionConverter for &T {
    fn resolve(&self, value: &DimensionValue) -> StatsResult<i32> {
        (**self).resolve(value)
    }
}

impl<T: DimensionConverter + ?Sized> DimensionConverter for std::sync::Arc<T> {
    fn resolve(&self, value: &DimensionValue) -> StatsResult<i32> {
        (**self).resolve(value)
    }
}
