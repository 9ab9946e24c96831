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

//! Active users: any event with a uuid

use super::{Fact, JobKind, MapperBase, MapperCounters, StatsMapper};
use webstats_core::{JobContext, KpiKind, RawEvent};

pub struct ActiveUserMapper {
    base: MapperBase,
}

impl ActiveUserMapper {
    pub fn new(ctx: JobContext) -> Self {
        Self {
            base: MapperBase::new(JobKind::ActiveUser, ctx),
        }
    }
}

impl StatsMapper for ActiveUserMapper {
    fn job(&self) -> JobKind {
        self.base.job()
    }

    fn kpis(&self) -> &'static [KpiKind] {
        JobKind::ActiveUser.kpis()
    }

    fn map(&mut self, event: &RawEvent) -> Vec<Fact> {
        let kpis = self.kpis();
        self.base.map_entity(
            event,
            kpis,
            event.uuid(),
            "uuid, platform and numeric server time are required",
        )
    }

    fn counters(&self) -> MapperCounters {
        self.base.counters()
    }

    fn fresh(&self) -> Box<dyn StatsMapper> {
        Box::new(Self::new(self.base.ctx().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_common_browser_and_hourly() {
        let mut mapper = ActiveUserMapper::new(ctx());
        let facts = mapper.map(&event(
            "e_pv",
            &[
                ("u_ud", "u1"),
                ("s_time", "1500000000000"),
                ("pl", "js"),
                ("b_n", "firefox"),
            ],
        ));

        let count = |kpi: KpiKind| facts.iter().filter(|f| f.key.kpi() == kpi).count();
        assert_eq!(count(KpiKind::ActiveUser), 2);
        assert_eq!(count(KpiKind::BrowserActiveUser), 4);
        assert_eq!(count(KpiKind::HourlyActiveUser), 2);
    }

    #[test]
    fn test_missing_platform_filtered() {
        let mut mapper = ActiveUserMapper::new(ctx());
        assert!(mapper
            .map(&event("e_pv", &[("u_ud", "u1"), ("s_time", "1500000000000")]))
            .is_empty());
        assert_eq!(mapper.counters().filtered_records, 1);
    }
}
