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

//! Key-ordered shuffle buffer
//!
//! Facts cross from the map workers to the reduce stage in their encoded
//! byte form, grouped by key. Iteration follows key order, so the reduce
//! stage visits buckets deterministically.

use std::collections::BTreeMap;
use webstats_core::{PartialValue, StatsKey, StatsResult};

#[derive(Debug, Default)]
pub struct ShuffleBuffer {
    groups: BTreeMap<StatsKey, Vec<Vec<u8>>>,
    values: usize,
}

impl ShuffleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: StatsKey, value: &PartialValue) -> StatsResult<()> {
        let bytes = value.encode()?;
        self.groups.entry(key).or_default().push(bytes);
        self.values += 1;
        Ok(())
    }

    /// Append another buffer's groups; value order within a key is not kept
    pub fn merge(&mut self, other: ShuffleBuffer) {
        self.values += other.values;
        for (key, mut values) in other.groups {
            self.groups.entry(key).or_default().append(&mut values);
        }
    }

    pub fn key_count(&self) -> usize {
        self.groups.len()
    }

    pub fn value_count(&self) -> usize {
        self.values
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Decoded groups in key order. A value that fails to decode aborts the
    /// whole group.
    pub fn into_groups(self) -> impl Iterator<Item = StatsResult<(StatsKey, Vec<PartialValue>)>> {
        self.groups.into_iter().map(|(key, encoded)| {
            let values = encoded
                .iter()
                .map(|bytes| PartialValue::decode(bytes))
                .collect::<StatsResult<Vec<_>>>()?;
            Ok((key, values))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;
    use webstats_core::{CommonDimensions, DateDimension, KpiKind, PlatformDimension};

    fn key(platform: PlatformDimension) -> StatsKey {
        let date = DateDimension::day(1_500_000_000_000, chrono::Utc.fix()).unwrap();
        StatsKey::common(CommonDimensions::new(date, platform, KpiKind::ActiveUser))
    }

    #[test]
    fn test_groups_by_key_in_key_order() {
        let mut left = ShuffleBuffer::new();
        left.push(key(PlatformDimension::new("java")), &PartialValue::time_marker("u1", 1))
            .unwrap();
        left.push(key(PlatformDimension::all()), &PartialValue::time_marker("u1", 1))
            .unwrap();

        let mut right = ShuffleBuffer::new();
        right
            .push(key(PlatformDimension::new("java")), &PartialValue::time_marker("u2", 2))
            .unwrap();

        left.merge(right);
        assert_eq!(left.key_count(), 2);
        assert_eq!(left.value_count(), 3);

        let groups: Vec<_> = left.into_groups().map(Result::unwrap).collect();
        assert!(groups[0].0.common.platform.is_all());
        assert_eq!(groups[1].1.len(), 2);
        assert_eq!(groups[1].1[1], PartialValue::time_marker("u2", 2));
    }
}
