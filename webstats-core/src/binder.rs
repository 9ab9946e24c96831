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

//! Output binder
//!
//! Turns one aggregated bucket into parameter rows for the relational sink.
//! Each destination table has a fixed parameter order; the upsert statements
//! on the sink side repeat the measure columns after the run date for their
//! `ON DUPLICATE KEY UPDATE` clause, so the layouts below do too.
//!
//! | table | parameters |
//! |-------|------------|
//! | `stats_user` | platform, date, n, run_date, n |
//! | `stats_device_browser` | platform, date, browser, n, run_date, n |
//! | `stats_hourly` | platform, date, kpi, h0..h23, run_date, h0..h23 |
//! | `stats_inbound` | platform, date, inbound, users, sessions, run_date, users, sessions |
//! | `stats_inbound` (bounce) | platform, date, inbound, n, run_date, n |
//! | `member_info` | member_id, run_date, run_date, run_date (one row per member) |

use crate::dimension::DimensionValue;
use crate::error::{StatsError, StatsResult};
use crate::key::{Specialization, StatsKey};
use crate::kpi::{KpiKind, OutputTable};
use crate::lookup::DimensionConverter;
use crate::value::{Aggregated, AggregatedValue};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One bound statement parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    Id(i32),
    Count(i64),
    Text(String),
}

/// Parameters for one row of one output table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterizedRow {
    pub table: OutputTable,
    /// Selects the measure column within the table
    pub kpi: KpiKind,
    pub params: Vec<SqlParam>,
}

pub struct OutputBinder<'a, C: DimensionConverter + ?Sized> {
    converter: &'a C,
    run_date: String,
}

impl<'a, C: DimensionConverter + ?Sized> OutputBinder<'a, C> {
    pub fn new(converter: &'a C, run_date: impl Into<String>) -> Self {
        Self {
            converter,
            run_date: run_date.into(),
        }
    }

    /// Bind one bucket. Anything without a layout is fatal.
    pub fn bind(
        &self,
        key: &StatsKey,
        aggregated: &Aggregated,
    ) -> StatsResult<Vec<ParameterizedRow>> {
        let kpi = key.kpi();
        if aggregated.kpi != kpi {
            return Err(StatsError::UnsupportedOutput {
                kpi,
                reason: format!("value was folded for {}", aggregated.kpi),
            });
        }

        let table = kpi.output_table();
        let rows = match (table, &aggregated.value) {
            (OutputTable::StatsUser, AggregatedValue::Count(n)) => {
                let n = count(*n);
                let mut params = self.common_ids(key)?;
                params.extend([n.clone(), self.run_date(), n]);
                vec![params]
            }
            (OutputTable::StatsDeviceBrowser, AggregatedValue::Count(n)) => {
                let Specialization::Browser(browser) = &key.specialization else {
                    return Err(unsupported(kpi, "browser table needs a browser key"));
                };
                let n = count(*n);
                let mut params = self.common_ids(key)?;
                params.push(self.id(browser.clone())?);
                params.extend([n.clone(), self.run_date(), n]);
                vec![params]
            }
            (OutputTable::StatsHourly, AggregatedValue::Hourly(hourly)) => {
                let hours: Vec<SqlParam> = hourly.hours.iter().map(|h| count(*h)).collect();
                let mut params = self.common_ids(key)?;
                params.push(self.id(kpi)?);
                params.extend(hours.iter().cloned());
                params.push(self.run_date());
                params.extend(hours);
                vec![params]
            }
            (
                OutputTable::StatsInbound,
                AggregatedValue::UsersAndSessions {
                    active_users,
                    sessions,
                },
            ) => {
                let (users, sessions) = (count(*active_users), count(*sessions));
                let mut params = self.common_ids(key)?;
                params.push(self.inbound_id(key)?);
                params.extend([
                    users.clone(),
                    sessions.clone(),
                    self.run_date(),
                    users,
                    sessions,
                ]);
                vec![params]
            }
            (OutputTable::StatsInbound, AggregatedValue::BounceSessions(n)) => {
                let n = count(*n);
                let mut params = self.common_ids(key)?;
                params.push(self.inbound_id(key)?);
                params.extend([n.clone(), self.run_date(), n]);
                vec![params]
            }
            (OutputTable::MemberInfo, AggregatedValue::Markers(ids)) => ids
                .iter()
                .map(|id| {
                    vec![
                        SqlParam::Text(id.clone()),
                        self.run_date(),
                        self.run_date(),
                        self.run_date(),
                    ]
                })
                .collect(),
            (table, value) => {
                return Err(unsupported(
                    kpi,
                    &format!("no {} layout for {} values", table, value.shape()),
                ));
            }
        };

        trace!(key = %key, rows = rows.len(), "bound");
        Ok(rows
            .into_iter()
            .map(|params| ParameterizedRow { table, kpi, params })
            .collect())
    }

    fn common_ids(&self, key: &StatsKey) -> StatsResult<Vec<SqlParam>> {
        Ok(vec![
            self.id(key.common.platform.clone())?,
            self.id(key.common.date.clone())?,
        ])
    }

    fn id(&self, value: impl Into<DimensionValue>) -> StatsResult<SqlParam> {
        self.converter.resolve(&value.into()).map(SqlParam::Id)
    }

    /// Inbound ids are configured, so they are bound as-is
    fn inbound_id(&self, key: &StatsKey) -> StatsResult<SqlParam> {
        key.inbound_source()
            .map(|source| SqlParam::Id(source.id()))
            .ok_or_else(|| unsupported(key.kpi(), "inbound table needs an inbound key"))
    }

    fn run_date(&self) -> SqlParam {
        SqlParam::Text(self.run_date.clone())
    }
}

fn count(n: u64) -> SqlParam {
    SqlParam::Count(i64::try_from(n).unwrap_or(i64::MAX))
}

fn unsupported(kpi: KpiKind, reason: &str) -> StatsError {
    StatsError::UnsupportedOutput {
        kpi,
        reason: reason.to_string(),
    }
}
