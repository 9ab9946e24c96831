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

//! Combine and reduce stages
//!
//! `combine` runs on the map side over the values one worker produced for a
//! key; `fold` runs once per key over every value the shuffle delivered.
//! Neither relies on the order of values within a key.

use chrono::FixedOffset;
use std::collections::{BTreeSet, HashMap, HashSet};
use webstats_core::dimension::date::hour_of;
use webstats_core::{
    AccumulationRule, Aggregated, AggregatedValue, HourlyCounts, KpiKind, PartialValue,
    StatsError, StatsKey, StatsResult, TOTAL_SLOT,
};

#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    offset: FixedOffset,
}

impl Aggregator {
    /// `offset` places timestamps into local hour slots
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Map-side pre-aggregation. Raw counts collapse into one total; every
    /// set-based rule needs the individual values and passes them through.
    pub fn combine(
        &self,
        key: &StatsKey,
        values: Vec<PartialValue>,
    ) -> StatsResult<Vec<PartialValue>> {
        let kpi = key.kpi();
        match kpi.accumulation_rule() {
            AccumulationRule::RawCount => {
                let total = raw_total(kpi, &values)?;
                Ok(vec![PartialValue::total(total)])
            }
            _ => Ok(values),
        }
    }

    pub fn fold<I>(&self, key: &StatsKey, values: I) -> StatsResult<Aggregated>
    where
        I: IntoIterator<Item = PartialValue>,
    {
        let kpi = key.kpi();
        let value = match kpi.accumulation_rule() {
            AccumulationRule::DistinctEntities => {
                let ids = marker_ids(kpi, values)?;
                AggregatedValue::Count(ids.len() as u64)
            }
            AccumulationRule::RawCount => {
                let values: Vec<PartialValue> = values.into_iter().collect();
                AggregatedValue::Count(raw_total(kpi, &values)?.max(0) as u64)
            }
            AccumulationRule::HourlyDistinct => AggregatedValue::Hourly(self.hourly(kpi, values)?),
            AccumulationRule::UsersAndSessions => {
                let mut users = HashSet::new();
                let mut sessions = HashSet::new();
                for (uuid, session_id) in text_pairs(kpi, values)? {
                    users.insert(uuid.clone());
                    sessions.insert((uuid, session_id));
                }
                AggregatedValue::UsersAndSessions {
                    active_users: users.len() as u64,
                    sessions: sessions.len() as u64,
                }
            }
            AccumulationRule::BounceSessions => {
                let mut views: HashMap<(String, String), u64> = HashMap::new();
                for pair in text_pairs(kpi, values)? {
                    *views.entry(pair).or_default() += 1;
                }
                AggregatedValue::BounceSessions(views.values().filter(|&&n| n == 1).count() as u64)
            }
            AccumulationRule::PassThrough => AggregatedValue::Markers(marker_ids(kpi, values)?),
        };
        Ok(Aggregated::new(kpi, value))
    }

    fn hourly<I>(&self, kpi: KpiKind, values: I) -> StatsResult<HourlyCounts>
    where
        I: IntoIterator<Item = PartialValue>,
    {
        let mut per_hour: Vec<HashSet<String>> = vec![HashSet::new(); 24];
        let mut distinct = HashSet::new();
        let mut counts = HourlyCounts::default();

        for value in values {
            let (id, time) = match value {
                PartialValue::TimeMarker { id: Some(id), time } => (id, time),
                PartialValue::TimeMarker { id: None, .. } => continue,
                other => return Err(mismatch(kpi, &other, "time_marker")),
            };
            let hour = hour_of(time, self.offset)?;
            counts.total += 1;
            distinct.insert(id.clone());
            per_hour[hour].insert(id);
        }

        for (slot, ids) in counts.hours.iter_mut().zip(&per_hour) {
            *slot = ids.len() as u64;
        }
        counts.distinct_total = distinct.len() as u64;
        Ok(counts)
    }
}

fn mismatch(kpi: KpiKind, value: &PartialValue, expected: &'static str) -> StatsError {
    StatsError::ValueMismatch {
        kpi,
        expected,
        found: value.shape(),
    }
}

/// Distinct present ids of time markers
fn marker_ids<I>(kpi: KpiKind, values: I) -> StatsResult<BTreeSet<String>>
where
    I: IntoIterator<Item = PartialValue>,
{
    let mut ids = BTreeSet::new();
    for value in values {
        match value {
            PartialValue::TimeMarker { id: Some(id), .. } => {
                ids.insert(id);
            }
            PartialValue::TimeMarker { id: None, .. } => {}
            other => return Err(mismatch(kpi, &other, "time_marker")),
        }
    }
    Ok(ids)
}

/// (uuid, session) pairs with both parts present
fn text_pairs<I>(kpi: KpiKind, values: I) -> StatsResult<Vec<(String, String)>>
where
    I: IntoIterator<Item = PartialValue>,
{
    let mut pairs = Vec::new();
    for value in values {
        match value {
            PartialValue::TextPair {
                uuid: Some(uuid),
                session_id: Some(session_id),
            } => pairs.push((uuid, session_id)),
            PartialValue::TextPair { .. } => {}
            other => return Err(mismatch(kpi, &other, "text_pair")),
        }
    }
    Ok(pairs)
}

/// Every time marker counts once; counter maps contribute their total slot
fn raw_total(kpi: KpiKind, values: &[PartialValue]) -> StatsResult<i64> {
    let mut total: i64 = 0;
    for value in values {
        match value {
            PartialValue::TimeMarker { .. } => total = total.saturating_add(1),
            PartialValue::CounterMap(counters) => {
                total = total.saturating_add(counters.get(&TOTAL_SLOT).copied().unwrap_or(0));
            }
            other => return Err(mismatch(kpi, other, "time_marker or counter_map")),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;
    use webstats_core::{
        BrowserDimension, CommonDimensions, DateDimension, InboundSource, PlatformDimension,
    };

    const TS: i64 = 1_500_000_000_000;
    const HOUR: i64 = 3_600_000;

    fn aggregator() -> Aggregator {
        Aggregator::new(chrono::Utc.fix())
    }

    fn common(kpi: KpiKind) -> CommonDimensions {
        let date = DateDimension::day(TS, chrono::Utc.fix()).unwrap();
        CommonDimensions::new(date, PlatformDimension::new("java"), kpi)
    }

    fn key(kpi: KpiKind) -> StatsKey {
        match kpi.accumulation_rule() {
            AccumulationRule::UsersAndSessions | AccumulationRule::BounceSessions => {
                StatsKey::inbound(common(kpi), InboundSource::All)
            }
            _ if kpi == KpiKind::WebsitePageview => {
                StatsKey::browser(common(kpi), BrowserDimension::all())
            }
            _ => StatsKey::common(common(kpi)),
        }
    }

    fn markers(ids: &[&str]) -> Vec<PartialValue> {
        ids.iter().map(|id| PartialValue::time_marker(*id, TS)).collect()
    }

    #[test]
    fn test_distinct_versus_raw_count() {
        let values = markers(&["u1", "u1", "u2"]);
        let distinct = aggregator().fold(&key(KpiKind::ActiveUser), values.clone()).unwrap();
        assert_eq!(distinct.value, AggregatedValue::Count(2));

        let raw = aggregator().fold(&key(KpiKind::WebsitePageview), values).unwrap();
        assert_eq!(raw.value, AggregatedValue::Count(3));
        assert_eq!(raw.kpi, KpiKind::WebsitePageview);
    }

    #[test]
    fn test_singleton_fold_counts_once() {
        for kpi in [KpiKind::NewInstallUser, KpiKind::WebsitePageview] {
            let folded = aggregator().fold(&key(kpi), markers(&["u1"])).unwrap();
            assert_eq!(folded.value, AggregatedValue::Count(1), "{kpi}");
        }

        let hourly = aggregator()
            .fold(&key(KpiKind::HourlyActiveUser), markers(&["u1"]))
            .unwrap();
        let AggregatedValue::Hourly(counts) = hourly.value else {
            panic!("expected hourly counts");
        };
        assert_eq!(counts.hours.iter().sum::<u64>(), 1);
        assert_eq!(counts.total, 1);
        assert_eq!(counts.distinct_total, 1);
    }

    #[test]
    fn test_combined_raw_count_folds_to_same_total() {
        let key = key(KpiKind::WebsitePageview);
        let aggregator = aggregator();
        let mut shuffled = aggregator.combine(&key, markers(&["u1", "u2"])).unwrap();
        assert_eq!(shuffled, vec![PartialValue::total(2)]);
        shuffled.extend(markers(&["u1"]));

        let folded = aggregator.fold(&key, shuffled).unwrap();
        assert_eq!(folded.value, AggregatedValue::Count(3));
    }

    #[test]
    fn test_combine_is_identity_for_sets() {
        let values = markers(&["u1", "u1"]);
        let combined = aggregator().combine(&key(KpiKind::ActiveUser), values.clone()).unwrap();
        assert_eq!(combined, values);
    }

    #[test]
    fn test_hourly_buckets_are_distinct_per_hour() {
        let values = vec![
            PartialValue::time_marker("u1", TS),
            PartialValue::time_marker("u1", TS + 60_000),
            PartialValue::time_marker("u2", TS),
            PartialValue::time_marker("u1", TS + 2 * HOUR),
        ];
        let folded = aggregator().fold(&key(KpiKind::HourlySessions), values).unwrap();
        let AggregatedValue::Hourly(counts) = folded.value else {
            panic!("expected hourly counts");
        };
        assert_eq!(counts.hours[2], 2);
        assert_eq!(counts.hours[4], 1);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.distinct_total, 2);
    }

    #[test]
    fn test_users_and_sessions() {
        let values = vec![
            PartialValue::text_pair("u1", "s1"),
            PartialValue::text_pair("u1", "s1"),
            PartialValue::text_pair("u1", "s2"),
            PartialValue::text_pair("u2", "s3"),
        ];
        let folded = aggregator().fold(&key(KpiKind::Inbound), values).unwrap();
        assert_eq!(
            folded.value,
            AggregatedValue::UsersAndSessions {
                active_users: 2,
                sessions: 3
            }
        );
    }

    // Bounce classification happens here, per bucket: a session bounces when
    // it contributed exactly one pageview to this key.
    #[test]
    fn test_bounce_sessions_are_single_view() {
        let values = vec![
            PartialValue::text_pair("u1", "s1"),
            PartialValue::text_pair("u1", "s1"),
            PartialValue::text_pair("u1", "s2"),
            PartialValue::text_pair("u2", "s3"),
        ];
        let folded = aggregator().fold(&key(KpiKind::InboundBounce), values).unwrap();
        assert_eq!(folded.value, AggregatedValue::BounceSessions(2));
    }

    #[test]
    fn test_pass_through_keeps_ids() {
        let folded = aggregator()
            .fold(&key(KpiKind::InsertMemberInfo), markers(&["m2", "m1", "m2"]))
            .unwrap();
        let AggregatedValue::Markers(ids) = folded.value else {
            panic!("expected markers");
        };
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["m1", "m2"]);
    }

    #[test]
    fn test_wrong_shape_is_fatal() {
        let err = aggregator()
            .fold(&key(KpiKind::ActiveUser), vec![PartialValue::text_pair("u1", "s1")])
            .unwrap_err();
        assert!(matches!(
            err,
            StatsError::ValueMismatch {
                kpi: KpiKind::ActiveUser,
                expected: "time_marker",
                found: "text_pair"
            }
        ));
    }

    #[test]
    fn test_absent_ids_are_ignored() {
        let values = vec![
            PartialValue::TimeMarker { id: None, time: TS },
            PartialValue::time_marker("u1", TS),
        ];
        let folded = aggregator().fold(&key(KpiKind::ActiveUser), values).unwrap();
        assert_eq!(folded.value, AggregatedValue::Count(1));
    }
}
