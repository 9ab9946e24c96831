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

//! Referrer URL → inbound source resolution
//!
//! Patterns are matched against the referrer host in three passes over the
//! configured order: exact equality, then prefix, then a regular expression
//! anchored at both ends. The first hit of the earliest pass wins. A valid
//! external host that matches nothing is "other"; a host belonging to the
//! tracked site itself is not inbound traffic.

use regex::Regex;
use tracing::{debug, warn};
use url::Url;
use webstats_core::{InboundPattern, InboundSource, InboundSourceTable, StatsResult};

/// Outcome of resolving one referrer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundResolution {
    Source(InboundSource),
    /// Referrer host is the tracked site
    SameSite,
    /// Referrer could not be parsed; the reason is logged by the caller
    Invalid(String),
}

#[derive(Debug)]
struct CompiledPattern {
    pattern: InboundPattern,
    /// Trimmed, lowercased pattern for the exact and prefix passes
    literal: String,
    regex: Option<Regex>,
}

/// Host regex for one configured pattern: anchored, case-insensitive
pub fn host_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i)^(?:{})$", pattern.trim()))
}

#[derive(Debug)]
pub struct InboundResolver {
    patterns: Vec<CompiledPattern>,
    site_hosts: Vec<String>,
}

impl InboundResolver {
    pub fn new(patterns: Vec<InboundPattern>, site_hosts: Vec<String>) -> Self {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let regex = match host_regex(&pattern.pattern) {
                    Ok(regex) => Some(regex),
                    Err(err) => {
                        warn!(
                            pattern = %pattern.pattern,
                            error = %err,
                            "inbound pattern is not a valid regex, using exact/prefix matching only"
                        );
                        None
                    }
                };
                let literal = pattern.pattern.trim().to_ascii_lowercase();
                CompiledPattern {
                    pattern,
                    literal,
                    regex,
                }
            })
            .collect();

        let site_hosts = site_hosts
            .into_iter()
            .map(|host| host.trim().to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect();

        Self {
            patterns,
            site_hosts,
        }
    }

    /// Load the pattern list once from the collaborator
    pub fn from_table(
        table: &dyn InboundSourceTable,
        site_hosts: Vec<String>,
    ) -> StatsResult<Self> {
        let patterns = table.inbound_patterns()?;
        debug!(patterns = patterns.len(), "loaded inbound patterns");
        Ok(Self::new(patterns, site_hosts))
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn resolve_url(&self, referrer: &str) -> InboundResolution {
        let url = match Url::parse(referrer.trim()) {
            Ok(url) => url,
            Err(err) => return InboundResolution::Invalid(err.to_string()),
        };
        match url.host_str() {
            Some(host) => self.resolve_host(host),
            None => InboundResolution::Invalid(format!("no host in {referrer}")),
        }
    }

    pub fn resolve_host(&self, host: &str) -> InboundResolution {
        let host = host.trim().to_ascii_lowercase();
        if host.is_empty() {
            return InboundResolution::Invalid("empty host".to_string());
        }
        if self.site_hosts.iter().any(|site| *site == host) {
            return InboundResolution::SameSite;
        }

        let matched = self
            .patterns
            .iter()
            .find(|p| host == p.literal)
            .or_else(|| {
                self.patterns
                    .iter()
                    .find(|p| !p.literal.is_empty() && host.starts_with(&p.literal))
            })
            .or_else(|| {
                self.patterns
                    .iter()
                    .find(|p| p.regex.as_ref().is_some_and(|regex| regex.is_match(&host)))
            });

        let source = match matched {
            Some(p) => InboundSource::from_id(p.pattern.id),
            None => InboundSource::Other,
        };
        InboundResolution::Source(source)
    }
}
