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

//! New members: first sighting of a valid member id

use super::{Fact, JobKind, MapperBase, MapperCounters, StatsMapper};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;
use webstats_core::{JobContext, KpiKind, MemberRegistry, PartialValue, RawEvent};

static MEMBER_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-zA-Z]{1,32}$").unwrap_or_else(|e| panic!("invalid member id pattern: {e}"))
});

pub fn is_valid_member_id(member_id: &str) -> bool {
    MEMBER_ID.is_match(member_id)
}

pub struct NewMemberMapper {
    base: MapperBase,
    members: Arc<dyn MemberRegistry>,
}

impl NewMemberMapper {
    pub fn new(ctx: JobContext, members: Arc<dyn MemberRegistry>) -> Self {
        Self {
            base: MapperBase::new(JobKind::NewMember, ctx),
            members,
        }
    }
}

impl StatsMapper for NewMemberMapper {
    fn job(&self) -> JobKind {
        self.base.job()
    }

    fn kpis(&self) -> &'static [KpiKind] {
        JobKind::NewMember.kpis()
    }

    fn map(&mut self, event: &RawEvent) -> Vec<Fact> {
        self.base.input();

        let (Some(member_id), Some(time), Some(platform)) =
            (event.member_id(), event.server_time(), event.platform())
        else {
            return self.base.filter("member id, platform and numeric server time are required");
        };
        if !is_valid_member_id(member_id) {
            return self.base.filter("malformed member id");
        }
        match self.members.is_new_member(member_id) {
            Ok(true) => {}
            Ok(false) => return self.base.filter("returning member"),
            Err(err) => {
                warn!(member_id, error = %err, "member lookup failed");
                return self.base.filter("member lookup failed");
            }
        }

        let Some(plan) = self.base.plan_with_browser(event, time, platform) else {
            return self.base.filter("server time out of range");
        };

        let kpis = self.kpis();
        self.base
            .emit(&plan, kpis, PartialValue::time_marker(member_id, time))
    }

    fn counters(&self) -> MapperCounters {
        self.base.counters()
    }

    fn fresh(&self) -> Box<dyn StatsMapper> {
        Box::new(Self::new(self.base.ctx().clone(), Arc::clone(&self.members)))
    }
}
