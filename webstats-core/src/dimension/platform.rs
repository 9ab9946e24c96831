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

//! Platform dimension (`java`, `js`, ... plus "all")

use super::{non_blank, Scope, DEFAULT_VALUE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlatformDimension {
    name: Scope<String>,
}

impl PlatformDimension {
    /// A specific platform; blank names become the "unknown" sentinel
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = non_blank(Some(name.as_ref())).unwrap_or(DEFAULT_VALUE);
        Self {
            name: Scope::Specific(name.to_string()),
        }
    }

    /// The generalization over every platform
    pub fn all() -> Self {
        Self { name: Scope::All }
    }

    pub fn name(&self) -> &Scope<String> {
        &self.name
    }

    pub fn is_all(&self) -> bool {
        self.name.is_all()
    }

    pub fn canonical(&self) -> String {
        self.name.canonical()
    }

    /// Platform fan-out for one raw field: `[specific, all]`.
    ///
    /// Never fails; a blank field yields the "unknown" platform.
    pub fn build_combinations(raw: Option<&str>) -> Vec<PlatformDimension> {
        let specific = PlatformDimension::new(raw.unwrap_or_default());
        vec![specific, PlatformDimension::all()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_specific_then_all() {
        let platforms = PlatformDimension::build_combinations(Some("java"));
        assert_eq!(
            platforms,
            vec![PlatformDimension::new("java"), PlatformDimension::all()]
        );
        assert_eq!(platforms[0].canonical(), "java");
        assert_eq!(platforms[1].canonical(), "all");
    }

    #[test]
    fn test_blank_maps_to_unknown() {
        let platforms = PlatformDimension::build_combinations(Some("  "));
        assert_eq!(platforms[0].name(), &Scope::Specific("unknown".to_string()));

        let platforms = PlatformDimension::build_combinations(None);
        assert_eq!(platforms[0].canonical(), "unknown");
        assert!(platforms[1].is_all());
    }

    proptest! {
        #[test]
        fn prop_exactly_specific_and_all(raw in "[a-zA-Z0-9_]{1,12}") {
            let platforms = PlatformDimension::build_combinations(Some(&raw));
            prop_assert_eq!(platforms.len(), 2);
            prop_assert_eq!(&platforms[0], &PlatformDimension::new(&raw));
            prop_assert!(platforms[1].is_all());
            prop_assert_ne!(&platforms[0], &platforms[1]);
        }
    }
}
