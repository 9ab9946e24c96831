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

//! Partial and aggregated values
//!
//! A [`PartialValue`] is what one raw record contributes to one key. It has a
//! compact byte form used when facts cross the shuffle:
//!
//! ```text
//! TimeMarker: [0x01][opt-str id][i64 time]
//! TextPair:   [0x02][opt-str uuid][opt-str session_id]
//! CounterMap: [0x03][u32 n]([i32 slot][i64 count]){n}
//!
//! opt-str:    [0x00]                      absent
//!             [0x01][u32 len][len bytes]  present (len may be 0)
//! ```
//!
//! All integers are little endian.

use crate::error::{StatsError, StatsResult};
use crate::kpi::KpiKind;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

const TAG_TIME_MARKER: u8 = 0x01;
const TAG_TEXT_PAIR: u8 = 0x02;
const TAG_COUNTER_MAP: u8 = 0x03;

/// Counter slot holding a pre-summed total
pub const TOTAL_SLOT: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialValue {
    /// An entity id seen at a server time (millis)
    TimeMarker { id: Option<String>, time: i64 },
    /// A visitor and the session it belongs to
    TextPair {
        uuid: Option<String>,
        session_id: Option<String>,
    },
    /// Slot → count, used for map-side pre-aggregation
    CounterMap(BTreeMap<i32, i64>),
}

impl PartialValue {
    pub fn time_marker(id: impl Into<String>, time: i64) -> Self {
        PartialValue::TimeMarker {
            id: Some(id.into()),
            time,
        }
    }

    pub fn text_pair(uuid: impl Into<String>, session_id: impl Into<String>) -> Self {
        PartialValue::TextPair {
            uuid: Some(uuid.into()),
            session_id: Some(session_id.into()),
        }
    }

    pub fn total(count: i64) -> Self {
        PartialValue::CounterMap(BTreeMap::from([(TOTAL_SLOT, count)]))
    }

    /// Short shape name used in mismatch errors
    pub fn shape(&self) -> &'static str {
        match self {
            PartialValue::TimeMarker { .. } => "time_marker",
            PartialValue::TextPair { .. } => "text_pair",
            PartialValue::CounterMap(_) => "counter_map",
        }
    }

    pub fn encode(&self) -> StatsResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(32);
        match self {
            PartialValue::TimeMarker { id, time } => {
                buf.write_u8(TAG_TIME_MARKER).map_err(codec)?;
                write_opt_str(&mut buf, id.as_deref())?;
                buf.write_i64::<LittleEndian>(*time).map_err(codec)?;
            }
            PartialValue::TextPair { uuid, session_id } => {
                buf.write_u8(TAG_TEXT_PAIR).map_err(codec)?;
                write_opt_str(&mut buf, uuid.as_deref())?;
                write_opt_str(&mut buf, session_id.as_deref())?;
            }
            PartialValue::CounterMap(counters) => {
                buf.write_u8(TAG_COUNTER_MAP).map_err(codec)?;
                let len = u32::try_from(counters.len())
                    .map_err(|_| StatsError::Codec("counter map too large".to_string()))?;
                buf.write_u32::<LittleEndian>(len).map_err(codec)?;
                for (slot, count) in counters {
                    buf.write_i32::<LittleEndian>(*slot).map_err(codec)?;
                    buf.write_i64::<LittleEndian>(*count).map_err(codec)?;
                }
            }
        }
        Ok(buf)
    }

    /// Decode one value. The input must contain exactly one encoded value.
    pub fn decode(bytes: &[u8]) -> StatsResult<Self> {
        let mut reader = bytes;
        let tag = reader.read_u8().map_err(codec)?;
        let value = match tag {
            TAG_TIME_MARKER => {
                let id = read_opt_str(&mut reader)?;
                let time = reader.read_i64::<LittleEndian>().map_err(codec)?;
                PartialValue::TimeMarker { id, time }
            }
            TAG_TEXT_PAIR => PartialValue::TextPair {
                uuid: read_opt_str(&mut reader)?,
                session_id: read_opt_str(&mut reader)?,
            },
            TAG_COUNTER_MAP => {
                let len = reader.read_u32::<LittleEndian>().map_err(codec)?;
                let mut counters = BTreeMap::new();
                for _ in 0..len {
                    let slot = reader.read_i32::<LittleEndian>().map_err(codec)?;
                    let count = reader.read_i64::<LittleEndian>().map_err(codec)?;
                    counters.insert(slot, count);
                }
                PartialValue::CounterMap(counters)
            }
            other => {
                return Err(StatsError::Codec(format!("unknown value tag 0x{other:02x}")));
            }
        };

        if !reader.is_empty() {
            return Err(StatsError::Codec(format!(
                "{} trailing bytes after {}",
                reader.len(),
                value.shape()
            )));
        }
        Ok(value)
    }
}

fn codec(err: std::io::Error) -> StatsError {
    StatsError::Codec(err.to_string())
}

fn write_opt_str(buf: &mut Vec<u8>, value: Option<&str>) -> StatsResult<()> {
    match value {
        None => buf.write_u8(0).map_err(codec),
        Some(text) => {
            let len = u32::try_from(text.len())
                .map_err(|_| StatsError::Codec("string too long".to_string()))?;
            buf.write_u8(1).map_err(codec)?;
            buf.write_u32::<LittleEndian>(len).map_err(codec)?;
            buf.extend_from_slice(text.as_bytes());
            Ok(())
        }
    }
}

fn read_opt_str(reader: &mut &[u8]) -> StatsResult<Option<String>> {
    match reader.read_u8().map_err(codec)? {
        0 => Ok(None),
        1 => {
            let len = reader.read_u32::<LittleEndian>().map_err(codec)? as usize;
            if reader.len() < len {
                return Err(StatsError::Codec(format!(
                    "string of {len} bytes truncated to {}",
                    reader.len()
                )));
            }
            let mut raw = vec![0u8; len];
            reader.read_exact(&mut raw).map_err(codec)?;
            String::from_utf8(raw)
                .map(Some)
                .map_err(|err| StatsError::Codec(err.to_string()))
        }
        flag => Err(StatsError::Codec(format!("invalid presence flag {flag}"))),
    }
}

/// Per-hour distinct counts plus totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyCounts {
    /// Distinct entities per local hour of day
    pub hours: [u64; 24],
    /// Number of folded values
    pub total: u64,
    /// Distinct entities over the whole period
    pub distinct_total: u64,
}

impl Default for HourlyCounts {
    fn default() -> Self {
        Self {
            hours: [0; 24],
            total: 0,
            distinct_total: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatedValue {
    Count(u64),
    Hourly(HourlyCounts),
    UsersAndSessions { active_users: u64, sessions: u64 },
    BounceSessions(u64),
    /// Distinct ids carried through unfolded
    Markers(BTreeSet<String>),
}

impl AggregatedValue {
    pub fn shape(&self) -> &'static str {
        match self {
            AggregatedValue::Count(_) => "count",
            AggregatedValue::Hourly(_) => "hourly",
            AggregatedValue::UsersAndSessions { .. } => "users_and_sessions",
            AggregatedValue::BounceSessions(_) => "bounce_sessions",
            AggregatedValue::Markers(_) => "markers",
        }
    }
}

/// Fold result tagged with the KPI whose rule produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregated {
    pub kpi: KpiKind,
    pub value: AggregatedValue,
}

impl Aggregated {
    pub fn new(kpi: KpiKind, value: AggregatedValue) -> Self {
        Self { kpi, value }
    }
}
