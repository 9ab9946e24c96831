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

//! Browser dimension: name and version, each possibly generalized to "all"

use super::{non_blank, Scope, DEFAULT_VALUE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BrowserDimension {
    name: Scope<String>,
    version: Scope<String>,
}

impl BrowserDimension {
    /// A specific browser. A blank name becomes "unknown"; a blank or missing
    /// version means every version of that browser.
    pub fn new(name: impl AsRef<str>, version: Option<&str>) -> Self {
        let name = non_blank(Some(name.as_ref())).unwrap_or(DEFAULT_VALUE);
        let version = match non_blank(version) {
            Some(version) => Scope::Specific(version.to_string()),
            None => Scope::All,
        };
        Self {
            name: Scope::Specific(name.to_string()),
            version,
        }
    }

    /// Every version of the named browser
    pub fn all_versions(name: impl AsRef<str>) -> Self {
        Self::new(name, None)
    }

    /// Every browser, every version
    pub fn all() -> Self {
        Self {
            name: Scope::All,
            version: Scope::All,
        }
    }

    pub fn name(&self) -> &Scope<String> {
        &self.name
    }

    pub fn version(&self) -> &Scope<String> {
        &self.version
    }

    pub fn canonical(&self) -> String {
        format!("{}:{}", self.name.canonical(), self.version.canonical())
    }

    /// Browser fan-out for one raw name/version pair.
    ///
    /// - `(name, version)` → `[(name, version), (name, all), (all, all)]`
    /// - `(name, blank)` → `[(name, all), (all, all)]`
    /// - blank name → `[(unknown, all), (all, all)]`, the version is ignored
    pub fn build_combinations(name: Option<&str>, version: Option<&str>) -> Vec<BrowserDimension> {
        let Some(name) = non_blank(name) else {
            return vec![
                BrowserDimension::all_versions(DEFAULT_VALUE),
                BrowserDimension::all(),
            ];
        };

        let mut combinations = Vec::with_capacity(3);
        if let Some(version) = non_blank(version) {
            combinations.push(BrowserDimension::new(name, Some(version)));
        }
        combinations.push(BrowserDimension::all_versions(name));
        combinations.push(BrowserDimension::all());
        combinations
    }
}
