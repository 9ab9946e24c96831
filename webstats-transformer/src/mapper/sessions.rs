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

//! Sessions: any event with a session id; the session id is the entity

use super::{Fact, JobKind, MapperBase, MapperCounters, StatsMapper};
use webstats_core::{JobContext, KpiKind, RawEvent};

pub struct SessionsMapper {
    base: MapperBase,
}

impl SessionsMapper {
    pub fn new(ctx: JobContext) -> Self {
        Self {
            base: MapperBase::new(JobKind::Sessions, ctx),
        }
    }
}

impl StatsMapper for SessionsMapper {
    fn job(&self) -> JobKind {
        self.base.job()
    }

    fn kpis(&self) -> &'static [KpiKind] {
        JobKind::Sessions.kpis()
    }

    fn map(&mut self, event: &RawEvent) -> Vec<Fact> {
        let kpis = self.kpis();
        self.base.map_entity(
            event,
            kpis,
            event.session_id(),
            "session id, platform and numeric server time are required",
        )
    }

    fn counters(&self) -> MapperCounters {
        self.base.counters()
    }

    fn fresh(&self) -> Box<dyn StatsMapper> {
        Box::new(Self::new(self.base.ctx().clone()))
    }
}
