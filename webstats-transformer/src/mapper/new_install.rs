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

//! New install users: launch events, keyed by platform and browser

use super::{Fact, JobKind, MapperBase, MapperCounters, StatsMapper};
use webstats_core::{JobContext, KpiKind, RawEvent};

pub struct NewInstallUserMapper {
    base: MapperBase,
}

impl NewInstallUserMapper {
    pub fn new(ctx: JobContext) -> Self {
        Self {
            base: MapperBase::new(JobKind::NewInstallUser, ctx),
        }
    }
}

impl StatsMapper for NewInstallUserMapper {
    fn job(&self) -> JobKind {
        self.base.job()
    }

    fn kpis(&self) -> &'static [KpiKind] {
        JobKind::NewInstallUser.kpis()
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
    use webstats_core::{PartialValue, PlatformDimension, Specialization};

    #[test]
    fn test_common_facts_for_each_platform() {
        let mut mapper = NewInstallUserMapper::new(ctx());
        let facts = mapper.map(&event(
            "e_l",
            &[("u_ud", "u1"), ("s_time", "1500000000000"), ("pl", "java")],
        ));

        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].key.common.platform, PlatformDimension::new("java"));
        assert_eq!(facts[1].key.common.platform, PlatformDimension::all());
        for fact in &facts {
            assert_eq!(fact.key.kpi(), KpiKind::NewInstallUser);
            assert_eq!(fact.key.specialization, Specialization::None);
            assert_eq!(fact.value, PartialValue::time_marker("u1", TS));
        }
        assert_eq!(mapper.counters().output_records, 2);
    }

    #[test]
    fn test_browser_facts_added() {
        let mut mapper = NewInstallUserMapper::new(ctx());
        let facts = mapper.map(&event(
            "e_l",
            &[
                ("u_ud", "u1"),
                ("s_time", "1500000000000"),
                ("pl", "java"),
                ("b_n", "chrome"),
                ("b_v", "50"),
            ],
        ));

        let browser: Vec<_> = facts
            .iter()
            .filter(|fact| fact.key.kpi() == KpiKind::BrowserNewInstallUser)
            .collect();
        assert_eq!(facts.len(), 8);
        assert_eq!(browser.len(), 6);
    }

    #[test]
    fn test_blank_uuid_filtered() {
        let mut mapper = NewInstallUserMapper::new(ctx());
        let facts = mapper.map(&event(
            "e_l",
            &[("u_ud", " "), ("s_time", "1500000000000"), ("pl", "java")],
        ));
        assert!(facts.is_empty());
        let counters = mapper.counters();
        assert_eq!(counters.input_records, 1);
        assert_eq!(counters.filtered_records, 1);
        assert_eq!(counters.output_records, 0);
    }

    #[test]
    fn test_non_numeric_time_filtered() {
        let mut mapper = NewInstallUserMapper::new(ctx());
        mapper.map(&event("e_l", &[("u_ud", "u1"), ("s_time", "yesterday"), ("pl", "java")]));
        assert_eq!(mapper.counters().filtered_records, 1);

        let fresh = mapper.fresh();
        assert_eq!(fresh.counters(), MapperCounters::default());
    }
}
