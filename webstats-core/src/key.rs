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

//! Composite stats keys
//!
//! A [`StatsKey`] is the common dimension group (date, platform, KPI) plus at
//! most one specializing dimension. Equality, hashing and ordering are
//! derived, so two keys land in the same bucket exactly when every component
//! compares equal. Field order fixes the sort order: date, platform, KPI, then
//! the specialization.

use crate::dimension::{BrowserDimension, DateDimension, InboundSource, PlatformDimension};
use crate::error::{StatsError, StatsResult};
use crate::kpi::{CombinationRule, KpiKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date, platform and KPI shared by every key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommonDimensions {
    pub date: DateDimension,
    pub platform: PlatformDimension,
    pub kpi: KpiKind,
}

impl CommonDimensions {
    pub fn new(date: DateDimension, platform: PlatformDimension, kpi: KpiKind) -> Self {
        Self {
            date,
            platform,
            kpi,
        }
    }

    pub fn builder() -> CommonDimensionsBuilder {
        CommonDimensionsBuilder::default()
    }
}

/// Step-wise construction of [`CommonDimensions`]; `build` refuses partial
/// groups.
#[derive(Debug, Clone, Default)]
pub struct CommonDimensionsBuilder {
    date: Option<DateDimension>,
    platform: Option<PlatformDimension>,
    kpi: Option<KpiKind>,
}

impl CommonDimensionsBuilder {
    pub fn date(mut self, date: DateDimension) -> Self {
        self.date = Some(date);
        self
    }

    pub fn platform(mut self, platform: PlatformDimension) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn kpi(mut self, kpi: KpiKind) -> Self {
        self.kpi = Some(kpi);
        self
    }

    pub fn build(self) -> StatsResult<CommonDimensions> {
        Ok(CommonDimensions {
            date: self.date.ok_or(StatsError::IncompleteKey("date"))?,
            platform: self.platform.ok_or(StatsError::IncompleteKey("platform"))?,
            kpi: self.kpi.ok_or(StatsError::IncompleteKey("kpi"))?,
        })
    }
}

/// Optional dimension refining the common group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    None,
    Browser(BrowserDimension),
    Inbound(InboundSource),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatsKey {
    pub common: CommonDimensions,
    pub specialization: Specialization,
}

impl StatsKey {
    pub fn common(common: CommonDimensions) -> Self {
        Self {
            common,
            specialization: Specialization::None,
        }
    }

    pub fn browser(common: CommonDimensions, browser: BrowserDimension) -> Self {
        Self {
            common,
            specialization: Specialization::Browser(browser),
        }
    }

    pub fn inbound(common: CommonDimensions, source: InboundSource) -> Self {
        Self {
            common,
            specialization: Specialization::Inbound(source),
        }
    }

    pub fn kpi(&self) -> KpiKind {
        self.common.kpi
    }

    pub fn browser_dimension(&self) -> Option<&BrowserDimension> {
        match &self.specialization {
            Specialization::Browser(browser) => Some(browser),
            _ => None,
        }
    }

    pub fn inbound_source(&self) -> Option<InboundSource> {
        match self.specialization {
            Specialization::Inbound(source) => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for StatsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.common.date,
            self.common.platform.canonical(),
            self.common.kpi
        )?;
        match &self.specialization {
            Specialization::None => Ok(()),
            Specialization::Browser(browser) => write!(f, "|{}", browser.canonical()),
            Specialization::Inbound(source) => write!(f, "|inbound:{}", source.canonical()),
        }
    }
}

/// Dimension combinations of one record, ready to be crossed with a KPI list
#[derive(Debug, Clone)]
pub struct KeyPlan {
    pub date: DateDimension,
    pub platforms: Vec<PlatformDimension>,
    pub browsers: Vec<BrowserDimension>,
    pub inbounds: Vec<InboundSource>,
}

impl KeyPlan {
    pub fn new(date: DateDimension, platforms: Vec<PlatformDimension>) -> Self {
        Self {
            date,
            platforms,
            browsers: Vec::new(),
            inbounds: Vec::new(),
        }
    }

    pub fn with_browsers(mut self, browsers: Vec<BrowserDimension>) -> Self {
        self.browsers = browsers;
        self
    }

    pub fn with_inbounds(mut self, inbounds: Vec<InboundSource>) -> Self {
        self.inbounds = inbounds;
        self
    }

    /// Cross the plan with `kpis`, applying each KPI's combination rule.
    ///
    /// Order is deterministic: per platform, per KPI, then the KPI's own
    /// specialization order. KPIs needing browsers or inbound sources yield
    /// nothing when the plan carries none.
    pub fn expand(&self, kpis: &[KpiKind]) -> Vec<StatsKey> {
        let mut keys = Vec::new();
        for platform in &self.platforms {
            for &kpi in kpis {
                let common = CommonDimensions::new(self.date.clone(), platform.clone(), kpi);
                match kpi.combination_rule() {
                    CombinationRule::CommonOnly => keys.push(StatsKey::common(common)),
                    CombinationRule::AllPlatformsOnly => {
                        if platform.is_all() {
                            keys.push(StatsKey::common(common));
                        }
                    }
                    CombinationRule::WithBrowser => keys.extend(
                        self.browsers
                            .iter()
                            .map(|browser| StatsKey::browser(common.clone(), browser.clone())),
                    ),
                    CombinationRule::WithInbound => keys.extend(
                        self.inbounds
                            .iter()
                            .map(|source| StatsKey::inbound(common.clone(), *source)),
                    ),
                }
            }
        }
        keys
    }
}
