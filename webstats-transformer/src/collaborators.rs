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

//! In-process implementations of the inbound table and member registry

use parking_lot::RwLock;
use std::collections::HashSet;
use webstats_core::{InboundPattern, InboundSourceTable, MemberRegistry, StatsResult};

/// Inbound patterns taken from `[[inbound]]` config entries, in file order
#[derive(Debug, Clone, Default)]
pub struct ConfiguredInboundTable {
    patterns: Vec<InboundPattern>,
}

impl ConfiguredInboundTable {
    pub fn new(patterns: Vec<InboundPattern>) -> Self {
        Self { patterns }
    }
}

impl InboundSourceTable for ConfiguredInboundTable {
    fn inbound_patterns(&self) -> StatsResult<Vec<InboundPattern>> {
        Ok(self.patterns.clone())
    }
}

/// Members seen on earlier days
#[derive(Debug, Default)]
pub struct InMemoryMemberRegistry {
    known: RwLock<HashSet<String>>,
}

impl InMemoryMemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_known<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: RwLock::new(ids.into_iter().map(Into::into).collect()),
        }
    }

    /// Record a member so later passes treat it as returning
    pub fn remember(&self, member_id: impl Into<String>) -> bool {
        self.known.write().insert(member_id.into())
    }

    pub fn len(&self) -> usize {
        self.known.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.read().is_empty()
    }
}

impl MemberRegistry for InMemoryMemberRegistry {
    fn is_new_member(&self, member_id: &str) -> StatsResult<bool> {
        Ok(!self.known.read().contains(member_id))
    }

    fn record_member(&self, member_id: &str) -> StatsResult<()> {
        self.remember(member_id);
        Ok(())
    }
}
