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

//! Website pageviews: raw count per platform and browser
//!
//! Unlike the user jobs, every pageview is counted under a browser key; a
//! record without a browser name counts under the "unknown" browser.

use super::{Fact, JobKind, MapperBase, MapperCounters, StatsMapper};
use webstats_core::{BrowserDimension, JobContext, KpiKind, PartialValue, RawEvent};

pub struct PageviewMapper {
    base: MapperBase,
}

impl PageviewMapper {
    pub fn new(ctx: JobContext) -> Self {
        Self {
            base: MapperBase::new(JobKind::Pageview, ctx),
        }
    }
}

impl StatsMapper for PageviewMapper {
    fn job(&self) -> JobKind {
        self.base.job()
    }

    fn kpis(&self) -> &'static [KpiKind] {
        JobKind::Pageview.kpis()
    }

    fn map(&mut self, event: &RawEvent) -> Vec<Fact> {
        self.base.input();

        let (Some(_url), Some(time), Some(platform)) =
            (event.current_url(), event.server_time(), event.platform())
        else {
            return self.base.filter("current url, platform and numeric server time are required");
        };
        let Some(plan) = self.base.plan(time, Some(platform)) else {
            return self.base.filter("server time out of range");
        };
        let plan = plan.with_browsers(BrowserDimension::build_combinations(
            event.browser_name(),
            event.browser_version(),
        ));

        let value = PartialValue::TimeMarker {
            id: event.uuid().map(str::to_string),
            time,
        };
        let kpis = self.kpis();
        self.base.emit(&plan, kpis, value)
    }

    fn counters(&self) -> MapperCounters {
        self.base.counters()
    }

    fn fresh(&self) -> Box<dyn StatsMapper> {
        Box::new(Self::new(self.base.ctx().clone()))
    }
}
