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

//! KPI kinds and the rule tables keyed by them
//!
//! Every KPI maps to exactly one entry in each of three tables:
//! - [`CombinationRule`]: which composite keys a fact fans out into
//! - [`AccumulationRule`]: how values sharing a key are folded
//! - [`OutputTable`]: which physical table the bound row lands in
//!
//! The matches below are exhaustive, so adding a KPI without filling in a
//! table fails to compile. [`validate_kpi_tables`] additionally checks that
//! the three tables agree with each other.

use crate::error::{StatsError, StatsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business metric tag carried in every composite key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiKind {
    NewInstallUser,
    BrowserNewInstallUser,
    ActiveUser,
    BrowserActiveUser,
    HourlyActiveUser,
    NewMember,
    BrowserNewMember,
    InsertMemberInfo,
    Sessions,
    BrowserSessions,
    HourlySessions,
    WebsitePageview,
    Inbound,
    InboundBounce,
}

impl KpiKind {
    /// All KPI kinds, in declaration order
    pub const ALL: [KpiKind; 14] = [
        KpiKind::NewInstallUser,
        KpiKind::BrowserNewInstallUser,
        KpiKind::ActiveUser,
        KpiKind::BrowserActiveUser,
        KpiKind::HourlyActiveUser,
        KpiKind::NewMember,
        KpiKind::BrowserNewMember,
        KpiKind::InsertMemberInfo,
        KpiKind::Sessions,
        KpiKind::BrowserSessions,
        KpiKind::HourlySessions,
        KpiKind::WebsitePageview,
        KpiKind::Inbound,
        KpiKind::InboundBounce,
    ];

    /// Canonical name, also used as the KPI dimension's lookup string
    pub fn as_str(&self) -> &'static str {
        match self {
            KpiKind::NewInstallUser => "new_install_user",
            KpiKind::BrowserNewInstallUser => "browser_new_install_user",
            KpiKind::ActiveUser => "active_user",
            KpiKind::BrowserActiveUser => "browser_active_user",
            KpiKind::HourlyActiveUser => "hourly_active_user",
            KpiKind::NewMember => "new_member",
            KpiKind::BrowserNewMember => "browser_new_member",
            KpiKind::InsertMemberInfo => "insert_member_info",
            KpiKind::Sessions => "sessions",
            KpiKind::BrowserSessions => "browser_sessions",
            KpiKind::HourlySessions => "hourly_sessions",
            KpiKind::WebsitePageview => "website_pageview",
            KpiKind::Inbound => "inbound",
            KpiKind::InboundBounce => "inbound_bounce",
        }
    }

    /// Parse a canonical KPI name.
    ///
    /// Unknown names are fatal: they mean key building and the rule tables
    /// no longer agree.
    pub fn parse(name: &str) -> StatsResult<Self> {
        let name = name.trim();
        KpiKind::ALL
            .iter()
            .copied()
            .find(|kpi| kpi.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| StatsError::UnsupportedKpi(name.to_string()))
    }

    /// Key fan-out rule for this KPI
    pub fn combination_rule(&self) -> CombinationRule {
        match self {
            KpiKind::NewInstallUser
            | KpiKind::ActiveUser
            | KpiKind::HourlyActiveUser
            | KpiKind::NewMember
            | KpiKind::Sessions
            | KpiKind::HourlySessions => CombinationRule::CommonOnly,
            KpiKind::InsertMemberInfo => CombinationRule::AllPlatformsOnly,
            KpiKind::BrowserNewInstallUser
            | KpiKind::BrowserActiveUser
            | KpiKind::BrowserNewMember
            | KpiKind::BrowserSessions
            | KpiKind::WebsitePageview => CombinationRule::WithBrowser,
            KpiKind::Inbound | KpiKind::InboundBounce => CombinationRule::WithInbound,
        }
    }

    /// Fold rule applied to all values sharing a key of this KPI
    pub fn accumulation_rule(&self) -> AccumulationRule {
        match self {
            KpiKind::NewInstallUser
            | KpiKind::BrowserNewInstallUser
            | KpiKind::ActiveUser
            | KpiKind::BrowserActiveUser
            | KpiKind::NewMember
            | KpiKind::BrowserNewMember
            | KpiKind::Sessions
            | KpiKind::BrowserSessions => AccumulationRule::DistinctEntities,
            KpiKind::WebsitePageview => AccumulationRule::RawCount,
            KpiKind::HourlyActiveUser | KpiKind::HourlySessions => AccumulationRule::HourlyDistinct,
            KpiKind::Inbound => AccumulationRule::UsersAndSessions,
            KpiKind::InboundBounce => AccumulationRule::BounceSessions,
            KpiKind::InsertMemberInfo => AccumulationRule::PassThrough,
        }
    }

    /// Destination table for rows bound from this KPI
    pub fn output_table(&self) -> OutputTable {
        match self {
            KpiKind::NewInstallUser
            | KpiKind::ActiveUser
            | KpiKind::NewMember
            | KpiKind::Sessions => OutputTable::StatsUser,
            KpiKind::BrowserNewInstallUser
            | KpiKind::BrowserActiveUser
            | KpiKind::BrowserNewMember
            | KpiKind::BrowserSessions
            | KpiKind::WebsitePageview => OutputTable::StatsDeviceBrowser,
            KpiKind::HourlyActiveUser | KpiKind::HourlySessions => OutputTable::StatsHourly,
            KpiKind::Inbound | KpiKind::InboundBounce => OutputTable::StatsInbound,
            KpiKind::InsertMemberInfo => OutputTable::MemberInfo,
        }
    }
}

impl fmt::Display for KpiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KpiKind {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KpiKind::parse(s)
    }
}

/// How one raw fact fans out into composite keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombinationRule {
    /// Common dimensions only, one key per platform combination
    CommonOnly,
    /// Common dimensions only, and only under the "all" platform
    AllPlatformsOnly,
    /// Common dimensions crossed with every browser combination
    WithBrowser,
    /// Common dimensions crossed with the inbound-source combinations
    WithInbound,
}

/// How the values of one key are folded into an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccumulationRule {
    /// Number of distinct entity ids
    DistinctEntities,
    /// Number of values, duplicates included
    RawCount,
    /// Distinct entity ids per hour of day, plus totals
    HourlyDistinct,
    /// Distinct uuids and distinct (uuid, session) pairs
    UsersAndSessions,
    /// Sessions that contributed exactly one value
    BounceSessions,
    /// No folding; every distinct id is carried through as a marker
    PassThrough,
}

impl AccumulationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccumulationRule::DistinctEntities => "distinct_entities",
            AccumulationRule::RawCount => "raw_count",
            AccumulationRule::HourlyDistinct => "hourly_distinct",
            AccumulationRule::UsersAndSessions => "users_and_sessions",
            AccumulationRule::BounceSessions => "bounce_sessions",
            AccumulationRule::PassThrough => "pass_through",
        }
    }
}

/// Physical output tables of the relational sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTable {
    StatsUser,
    StatsDeviceBrowser,
    StatsHourly,
    StatsInbound,
    MemberInfo,
}

impl OutputTable {
    pub fn name(&self) -> &'static str {
        match self {
            OutputTable::StatsUser => "stats_user",
            OutputTable::StatsDeviceBrowser => "stats_device_browser",
            OutputTable::StatsHourly => "stats_hourly",
            OutputTable::StatsInbound => "stats_inbound",
            OutputTable::MemberInfo => "member_info",
        }
    }
}

impl fmt::Display for OutputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check that the three per-KPI tables agree with each other.
///
/// Run once at pipeline construction so a mismatch aborts before any record
/// is read.
pub fn validate_kpi_tables() -> StatsResult<()> {
    for kpi in KpiKind::ALL {
        let combination = kpi.combination_rule();
        let accumulation = kpi.accumulation_rule();
        let table = kpi.output_table();

        let inconsistent = |reason: &str| StatsError::InconsistentTables {
            kpi,
            reason: reason.to_string(),
        };

        let browser_keyed = combination == CombinationRule::WithBrowser;
        if browser_keyed != (table == OutputTable::StatsDeviceBrowser) {
            return Err(inconsistent("browser keys and the browser table must go together"));
        }

        let inbound_keyed = combination == CombinationRule::WithInbound;
        if inbound_keyed != (table == OutputTable::StatsInbound) {
            return Err(inconsistent("inbound keys and the inbound table must go together"));
        }

        let session_rule = matches!(
            accumulation,
            AccumulationRule::UsersAndSessions | AccumulationRule::BounceSessions
        );
        if session_rule && !inbound_keyed {
            return Err(inconsistent("session rules need (uuid, session) values"));
        }

        let hourly_rule = accumulation == AccumulationRule::HourlyDistinct;
        if hourly_rule != (table == OutputTable::StatsHourly) {
            return Err(inconsistent("hourly rule and hourly table must go together"));
        }

        let pass_through = accumulation == AccumulationRule::PassThrough;
        if pass_through != (table == OutputTable::MemberInfo)
            || pass_through != (combination == CombinationRule::AllPlatformsOnly)
        {
            return Err(inconsistent("member markers are keyed once, under the all platform"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_tables_are_consistent() {
        validate_kpi_tables().unwrap();
    }

    #[test]
    fn test_parse_round_trips_every_kind() {
        for kpi in KpiKind::ALL {
            assert_eq!(KpiKind::parse(kpi.as_str()).unwrap(), kpi);
        }
        assert_eq!(
            "BROWSER_SESSIONS".parse::<KpiKind>().unwrap(),
            KpiKind::BrowserSessions
        );
    }

    #[test]
    fn test_unknown_kpi_is_fatal() {
        let err = KpiKind::parse("location").unwrap_err();
        assert!(matches!(err, StatsError::UnsupportedKpi(ref name) if name == "location"));
    }

    #[test]
    fn test_browser_kpis_target_browser_table() {
        for kpi in KpiKind::ALL {
            if kpi.combination_rule() == CombinationRule::WithBrowser {
                assert_eq!(kpi.output_table(), OutputTable::StatsDeviceBrowser);
            }
        }
    }
}
