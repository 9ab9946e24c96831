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

//! Fact emitters (map stage)
//!
//! One mapper per stats job. A mapper validates the fields its job needs,
//! builds the dimension combinations of the record and emits one [`Fact`]
//! per resulting key. Records missing a required field are filtered and
//! counted, never errors.
//!
//! Mappers keep only their counters between calls, so one instance can be
//! reused for any number of records on one worker.

mod active_user;
mod inbound;
mod new_install;
mod new_member;
mod pageview;
mod sessions;

pub use active_user::ActiveUserMapper;
pub use inbound::InboundMapper;
pub use new_install::NewInstallUserMapper;
pub use new_member::NewMemberMapper;
pub use pageview::PageviewMapper;
pub use sessions::SessionsMapper;

use crate::error::{TransformError, TransformResult};
use crate::inbound_resolver::InboundResolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use webstats_core::{
    BrowserDimension, DateDimension, EventKind, JobContext, KeyPlan, KpiKind, MemberRegistry,
    PartialValue, PlatformDimension, RawEvent, StatsKey,
};

/// One (key, partial value) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub key: StatsKey,
    pub value: PartialValue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperCounters {
    pub input_records: u64,
    pub filtered_records: u64,
    pub output_records: u64,
}

impl MapperCounters {
    pub fn merge(&mut self, other: &MapperCounters) {
        self.input_records += other.input_records;
        self.filtered_records += other.filtered_records;
        self.output_records += other.output_records;
    }
}

pub trait StatsMapper: Send {
    fn job(&self) -> JobKind;

    /// KPIs this mapper emits, in emission order
    fn kpis(&self) -> &'static [KpiKind];

    fn map(&mut self, event: &RawEvent) -> Vec<Fact>;

    fn counters(&self) -> MapperCounters;

    /// A new mapper for the same job with zeroed counters
    fn fresh(&self) -> Box<dyn StatsMapper>;
}

/// The stats jobs, one mapper each
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    NewInstallUser,
    ActiveUser,
    NewMember,
    Sessions,
    Pageview,
    Inbound,
    InboundBounce,
}

impl JobKind {
    pub const ALL: [JobKind; 7] = [
        JobKind::NewInstallUser,
        JobKind::ActiveUser,
        JobKind::NewMember,
        JobKind::Sessions,
        JobKind::Pageview,
        JobKind::Inbound,
        JobKind::InboundBounce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::NewInstallUser => "new_install_user",
            JobKind::ActiveUser => "active_user",
            JobKind::NewMember => "new_member",
            JobKind::Sessions => "sessions",
            JobKind::Pageview => "pageview",
            JobKind::Inbound => "inbound",
            JobKind::InboundBounce => "inbound_bounce",
        }
    }

    pub fn parse(name: &str) -> TransformResult<Self> {
        let name = name.trim();
        JobKind::ALL
            .iter()
            .copied()
            .find(|job| job.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| TransformError::ConfigError(format!("unknown job: {name}")))
    }

    pub fn kpis(&self) -> &'static [KpiKind] {
        match self {
            JobKind::NewInstallUser => &[KpiKind::NewInstallUser, KpiKind::BrowserNewInstallUser],
            JobKind::ActiveUser => &[
                KpiKind::ActiveUser,
                KpiKind::BrowserActiveUser,
                KpiKind::HourlyActiveUser,
            ],
            JobKind::NewMember => &[
                KpiKind::NewMember,
                KpiKind::BrowserNewMember,
                KpiKind::InsertMemberInfo,
            ],
            JobKind::Sessions => &[
                KpiKind::Sessions,
                KpiKind::BrowserSessions,
                KpiKind::HourlySessions,
            ],
            JobKind::Pageview => &[KpiKind::WebsitePageview],
            JobKind::Inbound => &[KpiKind::Inbound],
            JobKind::InboundBounce => &[KpiKind::InboundBounce],
        }
    }

    /// Scan-level filter applied before the mapper sees a record
    pub fn accepts(&self, event: &RawEvent) -> bool {
        match self {
            JobKind::NewInstallUser => event.event_kind() == Some(EventKind::Launch),
            JobKind::Pageview | JobKind::Inbound | JobKind::InboundBounce => {
                event.event_kind() == Some(EventKind::PageView)
            }
            JobKind::ActiveUser | JobKind::NewMember | JobKind::Sessions => true,
        }
    }

    pub fn build_mapper(&self, deps: &MapperDeps) -> Box<dyn StatsMapper> {
        let ctx = deps.ctx.clone();
        match self {
            JobKind::NewInstallUser => Box::new(NewInstallUserMapper::new(ctx)),
            JobKind::ActiveUser => Box::new(ActiveUserMapper::new(ctx)),
            JobKind::NewMember => Box::new(NewMemberMapper::new(ctx, Arc::clone(&deps.members))),
            JobKind::Sessions => Box::new(SessionsMapper::new(ctx)),
            JobKind::Pageview => Box::new(PageviewMapper::new(ctx)),
            JobKind::Inbound | JobKind::InboundBounce => {
                Box::new(InboundMapper::new(*self, ctx, Arc::clone(&deps.inbound)))
            }
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared collaborators handed to every mapper of a pass
#[derive(Clone)]
pub struct MapperDeps {
    pub ctx: JobContext,
    pub inbound: Arc<InboundResolver>,
    pub members: Arc<dyn MemberRegistry>,
}

/// Counting and key-plan helpers shared by the mappers
#[derive(Debug, Clone)]
pub(crate) struct MapperBase {
    job: JobKind,
    ctx: JobContext,
    counters: MapperCounters,
}

impl MapperBase {
    pub(crate) fn new(job: JobKind, ctx: JobContext) -> Self {
        Self {
            job,
            ctx,
            counters: MapperCounters::default(),
        }
    }

    pub(crate) fn job(&self) -> JobKind {
        self.job
    }

    pub(crate) fn ctx(&self) -> &JobContext {
        &self.ctx
    }

    pub(crate) fn counters(&self) -> MapperCounters {
        self.counters
    }

    pub(crate) fn input(&mut self) {
        self.counters.input_records += 1;
    }

    pub(crate) fn filter(&mut self, reason: &str) -> Vec<Fact> {
        self.counters.filtered_records += 1;
        debug!(job = %self.job, reason, "filtered record");
        Vec::new()
    }

    /// Day and platform combinations for a record; `None` if the server time
    /// falls outside the calendar
    pub(crate) fn plan(&self, time: i64, platform: Option<&str>) -> Option<KeyPlan> {
        let date = DateDimension::day(time, self.ctx.offset).ok()?;
        Some(KeyPlan::new(date, PlatformDimension::build_combinations(platform)))
    }

    /// [`plan`](Self::plan) plus the browser fan-out when the record names a
    /// browser
    pub(crate) fn plan_with_browser(
        &self,
        event: &RawEvent,
        time: i64,
        platform: &str,
    ) -> Option<KeyPlan> {
        let plan = self.plan(time, Some(platform))?;
        Some(match event.browser_name() {
            Some(name) => plan.with_browsers(BrowserDimension::build_combinations(
                Some(name),
                event.browser_version(),
            )),
            None => plan,
        })
    }

    /// Body shared by the jobs that count one entity per record: the entity
    /// id, server time and platform are required, and the fact value is a
    /// time marker for the entity.
    pub(crate) fn map_entity(
        &mut self,
        event: &RawEvent,
        kpis: &[KpiKind],
        entity: Option<&str>,
        missing: &str,
    ) -> Vec<Fact> {
        self.input();

        let (Some(entity), Some(time), Some(platform)) =
            (entity, event.server_time(), event.platform())
        else {
            return self.filter(missing);
        };
        let Some(plan) = self.plan_with_browser(event, time, platform) else {
            return self.filter("server time out of range");
        };
        self.emit(&plan, kpis, PartialValue::time_marker(entity, time))
    }

    pub(crate) fn emit(
        &mut self,
        plan: &KeyPlan,
        kpis: &[KpiKind],
        value: PartialValue,
    ) -> Vec<Fact> {
        let facts: Vec<Fact> = plan
            .expand(kpis)
            .into_iter()
            .map(|key| Fact {
                key,
                value: value.clone(),
            })
            .collect();
        self.counters.output_records += facts.len() as u64;
        facts
    }
}
