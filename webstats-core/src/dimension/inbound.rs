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

//! Inbound (referrer source) dimension
//!
//! Ids 1 and 2 are reserved: 1 is the "all sources" generalization and 2 is
//! "other", an external host that matched no configured pattern.

use serde::{Deserialize, Serialize};

pub const ALL_INBOUND_ID: i32 = 1;
pub const OTHER_INBOUND_ID: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundSource {
    All,
    Other,
    Matched(i32),
}

impl InboundSource {
    pub fn from_id(id: i32) -> Self {
        match id {
            ALL_INBOUND_ID => InboundSource::All,
            OTHER_INBOUND_ID => InboundSource::Other,
            id => InboundSource::Matched(id),
        }
    }

    /// Stored id; inbound ids are configured, not looked up
    pub fn id(&self) -> i32 {
        match self {
            InboundSource::All => ALL_INBOUND_ID,
            InboundSource::Other => OTHER_INBOUND_ID,
            InboundSource::Matched(id) => *id,
        }
    }

    pub fn canonical(&self) -> String {
        match self {
            InboundSource::All => super::VALUE_OF_ALL.to_string(),
            InboundSource::Other => "other".to_string(),
            InboundSource::Matched(id) => id.to_string(),
        }
    }

    /// Source combinations for one resolved referrer: `[all, specific]`
    pub fn build_combinations(resolved: InboundSource) -> Vec<InboundSource> {
        if resolved == InboundSource::All {
            return vec![InboundSource::All];
        }
        vec![InboundSource::All, resolved]
    }
}

/// One configured referrer pattern.
///
/// `pattern` is compared against the referrer host: first for equality, then
/// as a prefix, then as a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundPattern {
    pub pattern: String,
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
}

impl InboundPattern {
    pub fn new(pattern: impl Into<String>, id: i32) -> Self {
        Self {
            pattern: pattern.into(),
            id,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
