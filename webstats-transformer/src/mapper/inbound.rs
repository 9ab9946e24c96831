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

//! Inbound traffic and inbound bounces
//!
//! Both jobs read the same fields and differ only in the KPI they emit, so
//! one mapper serves both.

use super::{Fact, JobKind, MapperBase, MapperCounters, StatsMapper};
use crate::inbound_resolver::{InboundResolution, InboundResolver};
use std::sync::Arc;
use tracing::{debug, warn};
use webstats_core::{InboundSource, JobContext, KpiKind, PartialValue, RawEvent};

pub struct InboundMapper {
    base: MapperBase,
    resolver: Arc<InboundResolver>,
}

impl InboundMapper {
    /// `job` must be [`JobKind::Inbound`] or [`JobKind::InboundBounce`]
    pub fn new(job: JobKind, ctx: JobContext, resolver: Arc<InboundResolver>) -> Self {
        Self {
            base: MapperBase::new(job, ctx),
            resolver,
        }
    }
}

impl StatsMapper for InboundMapper {
    fn job(&self) -> JobKind {
        self.base.job()
    }

    fn kpis(&self) -> &'static [KpiKind] {
        self.base.job().kpis()
    }

    fn map(&mut self, event: &RawEvent) -> Vec<Fact> {
        self.base.input();

        let (Some(platform), Some(uuid), Some(session_id), Some(referrer), Some(time)) = (
            event.platform(),
            event.uuid(),
            event.session_id(),
            event.referrer_url(),
            event.server_time(),
        ) else {
            return self.base.filter(
                "platform, uuid, session id, referrer and numeric server time are required",
            );
        };

        let source = match self.resolver.resolve_url(referrer) {
            InboundResolution::Source(source) => source,
            InboundResolution::SameSite => {
                debug!(referrer, "referrer is the site itself");
                return self.base.filter("not an inbound referrer");
            }
            InboundResolution::Invalid(reason) => {
                warn!(referrer, reason = %reason, "could not resolve referrer");
                return self.base.filter("invalid referrer");
            }
        };

        let Some(plan) = self.base.plan(time, Some(platform)) else {
            return self.base.filter("server time out of range");
        };
        let plan = plan.with_inbounds(InboundSource::build_combinations(source));

        let kpis = self.kpis();
        self.base
            .emit(&plan, kpis, PartialValue::text_pair(uuid, session_id))
    }

    fn counters(&self) -> MapperCounters {
        self.base.counters()
    }

    fn fresh(&self) -> Box<dyn StatsMapper> {
        Box::new(Self::new(
            self.base.job(),
            self.base.ctx().clone(),
            Arc::clone(&self.resolver),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use webstats_core::InboundPattern;

    fn mapper(job: JobKind) -> InboundMapper {
        let resolver = InboundResolver::new(
            vec![InboundPattern::new("www.baidu.com", 3)],
            vec!["www.example.com".to_string()],
        );
        InboundMapper::new(job, ctx(), Arc::new(resolver))
    }

    fn referred(referrer: &str) -> RawEvent {
        event(
            "e_pv",
            &[
                ("pl", "website"),
                ("u_ud", "u1"),
                ("u_sd", "s1"),
                ("p_ref", referrer),
                ("s_time", "1500000000000"),
            ],
        )
    }

    #[test]
    fn test_matched_source_all_first() {
        let mut mapper = mapper(JobKind::Inbound);
        let facts = mapper.map(&referred("http://www.baidu.com/s?wd=x"));
        let sources: Vec<_> = facts.iter().filter_map(|f| f.key.inbound_source()).collect();
        assert_eq!(
            sources,
            vec![
                InboundSource::All,
                InboundSource::Matched(3),
                InboundSource::All,
                InboundSource::Matched(3)
            ]
        );
        assert!(facts.iter().all(|f| f.key.kpi() == KpiKind::Inbound));
        assert_eq!(facts[0].value, PartialValue::text_pair("u1", "s1"));
    }

    #[test]
    fn test_other_and_same_site() {
        let mut mapper = mapper(JobKind::InboundBounce);
        let facts = mapper.map(&referred("http://www.bing.com/"));
        assert_eq!(facts[1].key.inbound_source(), Some(InboundSource::Other));
        assert_eq!(facts[1].key.kpi(), KpiKind::InboundBounce);

        assert!(mapper.map(&referred("http://www.example.com/list")).is_empty());
        assert!(mapper.map(&referred("::garbage::")).is_empty());
        let counters = mapper.counters();
        assert_eq!(counters.input_records, 3);
        assert_eq!(counters.filtered_records, 2);
        assert_eq!(counters.output_records, 4);
    }
}
