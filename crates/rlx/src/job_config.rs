//! 📋 Rollup job configuration: the validated, immutable description of a rollup job.
//!
//! 🎬 COLD OPEN. INT. ON-CALL CHANNEL, 2:14 AM
//!
//! "Why is the rollup index empty?" Someone had typed `page_size = 0`. The engine
//! had accepted it. The job had been politely doing nothing, on a cron, for a week.
//!
//! Never again. This module is the bouncer. You hand it a `RollupJobSpec` with
//! named fields, it hands you back either a `RollupJobConfig` that is correct by
//! construction, or a `ValidationError` listing every single thing you got wrong.
//! Nothing invalid reaches the engine. Not from code, not from a file, not from
//! the wire (deserialization goes through the exact same door). 🦆
//!
//! 🧠 Knowledge graph:
//! - `RollupJobSpec`: plain named fields, `Default`, serde-friendly. The draft.
//! - `RollupJobConfig`: private fields, getters only. The signed contract.
//! - `group_config` / `metric_config`: the bucket and math recipes it carries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub mod group_config;
pub mod metric_config;

pub use group_config::{
    DateHistogramGroupConfig, DateHistogramInterval, GroupConfig, HistogramGroupConfig,
    TermsGroupConfig,
};
pub use metric_config::{MetricConfig, MetricFunction};

/// 📝 The draft of a rollup job. Every field named, nothing positional.
///
/// Fill it in with struct-literal syntax (`..Default::default()` for the rest),
/// then hand it to [`RollupJobConfig::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupJobSpec {
    /// 🆔 Unique job id.
    pub id: String,
    /// 🔍 Source index (or alias, or glob) to read raw documents from.
    pub index_pattern: String,
    /// 📦 Destination index for the rolled-up documents.
    pub rollup_index: String,
    /// ⏰ When the job wakes up. Quartz-flavored, seconds first: `"*/30 * * * * ?"`.
    pub cron: String,
    /// 📄 Composite-aggregation page size per search. Signed so a negative value
    /// from a config file becomes a validation problem, not a parse error.
    pub page_size: i64,
    /// 🪣 How to bucket. Required; `None` is only here so "forgot it" is reportable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<GroupConfig>,
    /// 🧮 What to compute per bucket, in order.
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
    /// ⏳ Per-search timeout. `None` means the engine waits as long as it likes.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::time_value::option"
    )]
    pub timeout: Option<Duration>,
}

impl RollupJobSpec {
    /// 🏗️ The four strings and a page size every job needs. Groups and metrics come next.
    pub fn new(
        id: impl Into<String>,
        index_pattern: impl Into<String>,
        rollup_index: impl Into<String>,
        cron: impl Into<String>,
        page_size: i64,
    ) -> Self {
        Self {
            id: id.into(),
            index_pattern: index_pattern.into(),
            rollup_index: rollup_index.into(),
            cron: cron.into(),
            page_size,
            ..Default::default()
        }
    }

    pub fn with_groups(mut self, groups: GroupConfig) -> Self {
        self.groups = Some(groups);
        self
    }

    /// 🧮 Appends, so call it once per field.
    pub fn with_metric(mut self, metric: MetricConfig) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// ✅ Shorthand for [`RollupJobConfig::build`].
    pub fn build(self) -> Result<RollupJobConfig, ValidationError> {
        RollupJobConfig::build(self)
    }
}

/// ✅ A rollup job configuration that passed validation. Immutable from here on.
///
/// Serializes to (and deserializes from) the engine's job JSON. Deserializing
/// re-runs validation, so a bad file or a weird engine response fails loudly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RollupJobSpec", into = "RollupJobSpec")]
pub struct RollupJobConfig {
    id: String,
    index_pattern: String,
    rollup_index: String,
    cron: String,
    page_size: u32,
    groups: GroupConfig,
    metrics: Vec<MetricConfig>,
    timeout: Option<Duration>,
}

impl RollupJobConfig {
    /// 🚪 The only way in. Pure: no I/O, no engine, just judgment.
    ///
    /// Every problem is collected before we answer, so one round trip fixes everything.
    pub fn build(spec: RollupJobSpec) -> Result<RollupJobConfig, ValidationError> {
        let mut problems: Vec<String> = Vec::new();

        for (name, value) in [
            ("id", &spec.id),
            ("index_pattern", &spec.index_pattern),
            ("rollup_index", &spec.rollup_index),
            ("cron", &spec.cron),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{} must not be blank", name));
            }
        }

        if spec.index_pattern.trim() == "*" {
            problems.push(
                "index_pattern must not match every index, it would include the rollup index itself"
                    .to_string(),
            );
        }
        if !spec.rollup_index.trim().is_empty() && spec.rollup_index == spec.index_pattern {
            problems.push("rollup_index must differ from index_pattern".to_string());
        }

        // -- 📄 zero is not a page size. neither is -3. neither is 2^40.
        let page_size = match u32::try_from(spec.page_size) {
            Ok(size) if size > 0 => size,
            _ => {
                problems.push(format!(
                    "page_size must be greater than 0 and at most {}, got {}",
                    u32::MAX,
                    spec.page_size
                ));
                0
            }
        };

        match spec.groups {
            Some(ref groups) => groups.collect_problems(&mut problems),
            None => problems.push("groups with a date_histogram are required".to_string()),
        }

        let metrics: Vec<MetricConfig> = spec
            .metrics
            .iter()
            .filter_map(|metric| metric.normalized(&mut problems))
            .collect();

        let groups = match spec.groups {
            Some(groups) if problems.is_empty() => groups,
            // -- 💀 a missing `groups` always left a problem behind above
            _ => return Err(ValidationError::from_problems(problems)),
        };

        Ok(RollupJobConfig {
            id: spec.id,
            index_pattern: spec.index_pattern,
            rollup_index: spec.rollup_index,
            cron: spec.cron,
            page_size,
            groups,
            metrics,
            timeout: spec.timeout,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index_pattern(&self) -> &str {
        &self.index_pattern
    }

    pub fn rollup_index(&self) -> &str {
        &self.rollup_index
    }

    pub fn cron(&self) -> &str {
        &self.cron
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn groups(&self) -> &GroupConfig {
        &self.groups
    }

    pub fn metrics(&self) -> &[MetricConfig] {
        &self.metrics
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// 📝 Back to a draft, e.g. to tweak and build a sibling job.
    pub fn to_spec(&self) -> RollupJobSpec {
        self.clone().into()
    }
}

impl TryFrom<RollupJobSpec> for RollupJobConfig {
    type Error = ValidationError;

    fn try_from(spec: RollupJobSpec) -> Result<Self, Self::Error> {
        RollupJobConfig::build(spec)
    }
}

impl From<RollupJobConfig> for RollupJobSpec {
    fn from(config: RollupJobConfig) -> Self {
        RollupJobSpec {
            id: config.id,
            index_pattern: config.index_pattern,
            rollup_index: config.rollup_index,
            cron: config.cron,
            page_size: i64::from(config.page_size),
            groups: Some(config.groups),
            metrics: config.metrics,
            timeout: config.timeout,
        }
    }
}
