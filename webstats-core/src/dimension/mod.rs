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

//! Dimension value types
//!
//! Each dimension is an immutable value object with value equality, a total
//! order and a canonical string form. The "all" generalization is an explicit
//! [`Scope::All`] variant rather than a magic string, so a raw platform or
//! browser literally named "all" never collides with it.

pub mod browser;
pub mod date;
pub mod inbound;
pub mod platform;

pub use browser::BrowserDimension;
pub use date::{DateDimension, DateGranularity};
pub use inbound::{InboundPattern, InboundSource, ALL_INBOUND_ID, OTHER_INBOUND_ID};
pub use platform::PlatformDimension;

use crate::kpi::KpiKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display string of the "all" generalization
pub const VALUE_OF_ALL: &str = "all";

/// Sentinel used when a raw field is blank or unparseable
pub const DEFAULT_VALUE: &str = "unknown";

/// A dimension value that is either one concrete value or the "all"
/// generalization over every value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope<T> {
    All,
    Specific(T),
}

impl<T> Scope<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Scope::All)
    }

    pub fn specific(&self) -> Option<&T> {
        match self {
            Scope::All => None,
            Scope::Specific(value) => Some(value),
        }
    }
}

impl Scope<String> {
    /// Lookup form of one component. Specific values escape `\` and `:`, and
    /// one spelled like the sentinel gets a leading `\`. Only [`Scope::All`]
    /// renders as a bare `all`, and a bare `:` only ever joins components.
    pub fn canonical(&self) -> String {
        match self {
            Scope::All => VALUE_OF_ALL.to_string(),
            Scope::Specific(value) => {
                let escaped = value.replace('\\', "\\\\").replace(':', "\\:");
                if escaped == VALUE_OF_ALL {
                    format!("\\{escaped}")
                } else {
                    escaped
                }
            }
        }
    }
}

impl<T: fmt::Display> fmt::Display for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str(VALUE_OF_ALL),
            Scope::Specific(value) => value.fmt(f),
        }
    }
}

/// Discriminator of [`DimensionValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Date,
    Platform,
    Browser,
    Kpi,
    Inbound,
}

impl DimensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionKind::Date => "date",
            DimensionKind::Platform => "platform",
            DimensionKind::Browser => "browser",
            DimensionKind::Kpi => "kpi",
            DimensionKind::Inbound => "inbound",
        }
    }
}

/// Any single dimension value, as handed to the id lookup collaborator
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DimensionValue {
    Date(DateDimension),
    Platform(PlatformDimension),
    Browser(BrowserDimension),
    Kpi { kpi: KpiKind },
    Inbound { source: InboundSource },
}

impl DimensionValue {
    pub fn kind(&self) -> DimensionKind {
        match self {
            DimensionValue::Date(_) => DimensionKind::Date,
            DimensionValue::Platform(_) => DimensionKind::Platform,
            DimensionValue::Browser(_) => DimensionKind::Browser,
            DimensionValue::Kpi { .. } => DimensionKind::Kpi,
            DimensionValue::Inbound { .. } => DimensionKind::Inbound,
        }
    }

    /// Canonical lookup string; two values of one kind share it only when
    /// they are equal
    pub fn canonical(&self) -> String {
        match self {
            DimensionValue::Date(date) => date.canonical(),
            DimensionValue::Platform(platform) => platform.canonical(),
            DimensionValue::Browser(browser) => browser.canonical(),
            DimensionValue::Kpi { kpi } => kpi.as_str().to_string(),
            DimensionValue::Inbound { source } => source.canonical(),
        }
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.canonical())
    }
}

impl From<DateDimension> for DimensionValue {
    fn from(value: DateDimension) -> Self {
        DimensionValue::Date(value)
    }
}

impl From<PlatformDimension> for DimensionValue {
    fn from(value: PlatformDimension) -> Self {
        DimensionValue::Platform(value)
    }
}

impl From<BrowserDimension> for DimensionValue {
    fn from(value: BrowserDimension) -> Self {
        DimensionValue::Browser(value)
    }
}

impl From<KpiKind> for DimensionValue {
    fn from(kpi: KpiKind) -> Self {
        DimensionValue::Kpi { kpi }
    }
}

impl From<InboundSource> for DimensionValue {
    fn from(source: InboundSource) -> Self {
        DimensionValue::Inbound { source }
    }
}

/// Trimmed view of an optional raw field, `None` when blank
pub fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_all_sorts_before_specific_values() {
        let mut scopes = vec![
            Scope::Specific("java".to_string()),
            Scope::All,
            Scope::Specific("js".to_string()),
        ];
        scopes.sort();
        assert_eq!(scopes[0], Scope::All);
        assert_eq!(scopes[1], Scope::Specific("java".to_string()));
    }

    #[test]
    fn test_all_does_not_collide_with_literal() {
        let literal = PlatformDimension::new("all");
        assert_ne!(literal, PlatformDimension::all());
        assert_ne!(
            DimensionValue::from(literal),
            DimensionValue::from(PlatformDimension::all())
        );
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(DimensionValue::from(KpiKind::ActiveUser).canonical(), "active_user");
        assert_eq!(
            DimensionValue::from(BrowserDimension::new("chrome", Some("50"))).to_string(),
            "browser:chrome:50"
        );
    }

    #[test]
    fn test_canonical_is_injective() {
        let pairs = [
            (
                DimensionValue::from(PlatformDimension::new("all")),
                DimensionValue::from(PlatformDimension::all()),
            ),
            (
                DimensionValue::from(BrowserDimension::new("a:b", Some("c"))),
                DimensionValue::from(BrowserDimension::new("a", Some("b:c"))),
            ),
            (
                DimensionValue::from(BrowserDimension::new("all", Some("all"))),
                DimensionValue::from(BrowserDimension::all()),
            ),
            (
                DimensionValue::from(BrowserDimension::new("chrome", Some("all"))),
                DimensionValue::from(BrowserDimension::all_versions("chrome")),
            ),
            (
                DimensionValue::from(PlatformDimension::new("\\all")),
                DimensionValue::from(PlatformDimension::new("all")),
            ),
            (
                DimensionValue::from(BrowserDimension::new("a\\", Some(":b"))),
                DimensionValue::from(BrowserDimension::new("a\\:", Some("b"))),
            ),
        ];
        for (left, right) in pairs {
            assert_ne!(left, right);
            assert_ne!(left.canonical(), right.canonical(), "{left:?} vs {right:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_browser_canonical_is_injective(
            a in ("[al:\\\\]{0,4}", proptest::option::of("[al:\\\\]{0,4}")),
            b in ("[al:\\\\]{0,4}", proptest::option::of("[al:\\\\]{0,4}")),
        ) {
            let left = BrowserDimension::new(&a.0, a.1.as_deref());
            let right = BrowserDimension::new(&b.0, b.1.as_deref());
            prop_assert_eq!(left == right, left.canonical() == right.canonical());
        }
    }

    #[test]
    fn test_specific_components_are_escaped() {
        assert_eq!(PlatformDimension::new("all").canonical(), "\\all");
        assert_eq!(PlatformDimension::all().canonical(), "all");
        assert_eq!(BrowserDimension::new("a:b", Some("c")).canonical(), "a\\:b:c");
        assert_eq!(BrowserDimension::new("chrome", Some("50")).canonical(), "chrome:50");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  java ")), Some("java"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
