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

//! Job configuration
//!
//! ```toml
//! [job]
//! run_date = "2017-07-15"
//! utc_offset_minutes = 480
//! map_workers = 4
//! jobs = ["new_install_user", "active_user"]
//!
//! [site]
//! hosts = ["www.example.com"]
//!
//! [[inbound]]
//! pattern = "www.baidu.com"
//! id = 3
//! name = "baidu"
//!
//! [members]
//! known = ["m1", "m2"]
//! ```

use crate::collaborators::{ConfiguredInboundTable, InMemoryMemberRegistry};
use crate::error::{TransformError, TransformResult};
use crate::inbound_resolver::{host_regex, InboundResolver};
use crate::mapper::{JobKind, MapperDeps};
use chrono::{FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use webstats_core::{InboundPattern, JobContext, ALL_INBOUND_ID, OTHER_INBOUND_ID};

/// Webstats transformer configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobConfig {
    #[serde(default)]
    pub job: JobSection,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub inbound: Vec<InboundPattern>,
    #[serde(default)]
    pub members: MembersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobSection {
    /// Date stamped on every output row (`YYYY-MM-DD`), defaults to yesterday
    #[serde(default = "default_run_date")]
    pub run_date: String,

    /// Local offset for day boundaries and hour slots
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Parallel map workers
    #[serde(default = "default_map_workers")]
    pub map_workers: usize,

    /// Jobs to run (empty = all)
    #[serde(default)]
    pub jobs: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Hosts of the tracked site; referrers from these are not inbound
    #[serde(default)]
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MembersConfig {
    /// Member ids registered before this run
    #[serde(default)]
    pub known: Vec<String>,
}

fn default_run_date() -> String {
    let today = Utc::now().date_naive();
    today.pred_opt().unwrap_or(today).format("%Y-%m-%d").to_string()
}

fn default_map_workers() -> usize {
    1
}

impl Default for JobSection {
    fn default() -> Self {
        Self {
            run_date: default_run_date(),
            utc_offset_minutes: 0,
            map_workers: default_map_workers(),
            jobs: vec![],
        }
    }
}

impl JobConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TransformResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - WEBSTATS_RUN_DATE: run date stamped on rows (default: yesterday)
    /// - WEBSTATS_UTC_OFFSET_MINUTES: local offset in minutes (default: 0)
    /// - WEBSTATS_MAP_WORKERS: parallel map workers (default: 1)
    /// - WEBSTATS_SITE_HOSTS: comma-separated site hosts
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(run_date) = std::env::var("WEBSTATS_RUN_DATE") {
            config.job.run_date = run_date;
        }

        if let Ok(offset) = std::env::var("WEBSTATS_UTC_OFFSET_MINUTES") {
            if let Ok(val) = offset.parse() {
                config.job.utc_offset_minutes = val;
            }
        }

        if let Ok(workers) = std::env::var("WEBSTATS_MAP_WORKERS") {
            if let Ok(val) = workers.parse() {
                config.job.map_workers = val;
            }
        }

        if let Ok(hosts) = std::env::var("WEBSTATS_SITE_HOSTS") {
            config.site.hosts = hosts
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(String::from)
                .collect();
        }

        config
    }

    /// Load configuration with priority: file > env > defaults
    pub fn load(config_file: Option<PathBuf>) -> TransformResult<Self> {
        let config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        Ok(Self::merge_with_env(config))
    }

    /// Fill in settings the file left at their defaults from the environment
    fn merge_with_env(mut config: Self) -> Self {
        let env_config = Self::from_env();
        let defaults = JobSection::default();

        if std::env::var("WEBSTATS_RUN_DATE").is_ok() && config.job.run_date == defaults.run_date {
            config.job.run_date = env_config.job.run_date;
        }
        if std::env::var("WEBSTATS_UTC_OFFSET_MINUTES").is_ok()
            && config.job.utc_offset_minutes == defaults.utc_offset_minutes
        {
            config.job.utc_offset_minutes = env_config.job.utc_offset_minutes;
        }
        if std::env::var("WEBSTATS_MAP_WORKERS").is_ok()
            && config.job.map_workers == defaults.map_workers
        {
            config.job.map_workers = env_config.job.map_workers;
        }
        if std::env::var("WEBSTATS_SITE_HOSTS").is_ok() && config.site.hosts.is_empty() {
            config.site.hosts = env_config.site.hosts;
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> TransformResult<()> {
        NaiveDate::parse_from_str(&self.job.run_date, "%Y-%m-%d").map_err(|e| {
            TransformError::ConfigError(format!("run_date {:?}: {e}", self.job.run_date))
        })?;

        self.offset()?;

        if self.job.map_workers == 0 {
            return Err(TransformError::ConfigError(
                "map_workers must be at least 1".to_string(),
            ));
        }

        self.job_kinds()?;

        for pattern in &self.inbound {
            if pattern.pattern.trim().is_empty() {
                return Err(TransformError::ConfigError(format!(
                    "inbound id {} has an empty pattern",
                    pattern.id
                )));
            }
            if let Err(err) = host_regex(&pattern.pattern) {
                return Err(TransformError::ConfigError(format!(
                    "inbound pattern {:?} (id {}) is not a valid regex: {err}",
                    pattern.pattern, pattern.id
                )));
            }
            if pattern.id == ALL_INBOUND_ID || pattern.id == OTHER_INBOUND_ID || pattern.id <= 0 {
                return Err(TransformError::ConfigError(format!(
                    "inbound id {} for {:?} is reserved or invalid",
                    pattern.id, pattern.pattern
                )));
            }
        }

        Ok(())
    }

    pub fn offset(&self) -> TransformResult<FixedOffset> {
        self.job
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                TransformError::ConfigError(format!(
                    "utc_offset_minutes {} out of range",
                    self.job.utc_offset_minutes
                ))
            })
    }

    pub fn job_context(&self) -> TransformResult<JobContext> {
        Ok(JobContext::new(self.job.run_date.clone(), self.offset()?))
    }

    /// Enabled jobs in canonical order; all of them when none are listed
    pub fn job_kinds(&self) -> TransformResult<Vec<JobKind>> {
        if self.job.jobs.is_empty() {
            return Ok(JobKind::ALL.to_vec());
        }
        let mut kinds = self
            .job
            .jobs
            .iter()
            .map(|name| JobKind::parse(name))
            .collect::<TransformResult<Vec<_>>>()?;
        kinds.sort();
        kinds.dedup();
        Ok(kinds)
    }

    pub fn inbound_table(&self) -> ConfiguredInboundTable {
        ConfiguredInboundTable::new(self.inbound.clone())
    }

    pub fn member_registry(&self) -> InMemoryMemberRegistry {
        InMemoryMemberRegistry::with_known(self.members.known.iter().cloned())
    }

    /// Collaborators shared by every job of one run
    pub fn mapper_deps(&self) -> TransformResult<MapperDeps> {
        let resolver = InboundResolver::from_table(&self.inbound_table(), self.site.hosts.clone())?;
        Ok(MapperDeps {
            ctx: self.job_context()?,
            inbound: Arc::new(resolver),
            members: Arc::new(self.member_registry()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use webstats_core::InboundSourceTable;

    #[test]
    fn test_default_config() {
        let config = JobConfig::default();
        assert_eq!(config.job.map_workers, 1);
        assert_eq!(config.job_kinds().unwrap().len(), 7);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[job]
run_date = "2017-07-15"
utc_offset_minutes = 480
map_workers = 2
jobs = ["inbound", "active_user", "inbound"]

[site]
hosts = ["www.example.com"]

[[inbound]]
pattern = "www.baidu.com"
id = 3
name = "baidu"

[[inbound]]
pattern = "www.google.com"
id = 4
"#
        )
        .unwrap();

        let config = JobConfig::from_file(file.path()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.job.run_date, "2017-07-15");
        assert_eq!(config.offset().unwrap().local_minus_utc(), 8 * 3600);
        assert_eq!(
            config.job_kinds().unwrap(),
            vec![JobKind::ActiveUser, JobKind::Inbound]
        );

        let patterns = config.inbound_table().inbound_patterns().unwrap();
        assert_eq!(patterns[0].name.as_deref(), Some("baidu"));
        assert_eq!(patterns[1].id, 4);
        assert!(config.members.known.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = JobConfig::default();
        config.job.run_date = "15/07/2017".to_string();
        assert!(matches!(config.validate(), Err(TransformError::ConfigError(_))));

        let mut config = JobConfig::default();
        config.job.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());

        let mut config = JobConfig::default();
        config.job.map_workers = 0;
        assert!(config.validate().is_err());

        let mut config = JobConfig::default();
        config.job.jobs = vec!["location".to_string()];
        assert!(config.validate().is_err());

        let mut config = JobConfig::default();
        config.inbound.push(InboundPattern::new("www.baidu.com", ALL_INBOUND_ID));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_invalid_inbound_regex() {
        let mut config = JobConfig::default();
        config.inbound.push(InboundPattern::new("www.baidu.com", 3));
        config.inbound.push(InboundPattern::new(".*\\.sogou\\.com", 4));
        config.validate().unwrap();

        config.inbound.push(InboundPattern::new("[broken", 5));
        match config.validate() {
            Err(TransformError::ConfigError(message)) => assert!(message.contains("[broken")),
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[job\nrun_date = ").unwrap();
        assert!(matches!(
            JobConfig::from_file(file.path()),
            Err(TransformError::ConfigError(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = JobConfig::load(Some(dir.path().join("absent.toml"))).unwrap();
        assert!(config.inbound.is_empty());
    }
}
