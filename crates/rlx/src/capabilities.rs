//! 🗺️ Capabilities: "which jobs rolled up this index, and what can I ask of them?"
//!
//! 🎬 *[a dashboard wants avg(voltage) per hour over `docs`. is that even possible?]*
//!
//! Nothing is stored here. Every answer is derived, fresh, from the job configs
//! the engine holds right now: group by `index_pattern`, keep job iteration order,
//! and list per field the aggregations a rollup search could use. 🦆
//!
//! 🧠 Knowledge graph:
//! - `build_rollup_caps`: the pure algorithm, configs in, map out.
//! - `CapabilityAggregator`: fetches configs from the engine and calls it.
//! - `RollableIndexCaps::merged_field_caps`: all jobs of one pattern, flattened.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::backends::{EngineBackend, RollupEngine};
use crate::error::RollupError;
use crate::job_config::RollupJobConfig;
use crate::selector::Selector;
use crate::time_value;

/// 🧮 One aggregation a rollup search may run on a field, plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggCapability {
    pub agg: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

impl AggCapability {
    pub fn new(agg: impl Into<String>) -> Self {
        Self {
            agg: agg.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// 🖨️ `{agg=date_histogram, delay=7d, interval=1h, time_zone=UTC}`, agg first, params sorted.
impl fmt::Display for AggCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{agg={}", self.agg)?;
        for (key, value) in &self.params {
            match value {
                Value::String(text) => write!(f, ", {}={}", key, text)?,
                other => write!(f, ", {}={}", key, other)?,
            }
        }
        f.write_str("}")
    }
}

/// 📋 Every aggregation available on one field, in the order the job declared them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RollupFieldCaps {
    pub aggs: Vec<AggCapability>,
}

/// 🏷️ What a single job contributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupJobCaps {
    pub job_id: String,
    pub rollup_index: String,
    pub index_pattern: String,
    pub fields: BTreeMap<String, RollupFieldCaps>,
}

impl RollupJobCaps {
    /// 🔨 Groups first (date histogram, histogram, terms), then metrics.
    pub fn from_config(config: &RollupJobConfig) -> Self {
        let mut fields: BTreeMap<String, RollupFieldCaps> = BTreeMap::new();
        let mut add = |field: &str, capability: AggCapability| {
            fields
                .entry(field.to_string())
                .or_default()
                .aggs
                .push(capability);
        };

        let groups = config.groups();
        let date_histogram = &groups.date_histogram;
        let mut date_cap = AggCapability::new("date_histogram")
            .with_param("interval", date_histogram.interval.as_str())
            .with_param("time_zone", date_histogram.time_zone.as_str());
        if let Some(delay) = date_histogram.delay {
            date_cap = date_cap.with_param("delay", time_value::format(delay));
        }
        add(&date_histogram.field, date_cap);

        if let Some(ref histogram) = groups.histogram {
            for field in &histogram.fields {
                add(
                    field,
                    AggCapability::new("histogram").with_param("interval", histogram.interval),
                );
            }
        }

        if let Some(ref terms) = groups.terms {
            for field in &terms.fields {
                add(field, AggCapability::new("terms"));
            }
        }

        for metric in config.metrics() {
            for function in metric.functions() {
                add(&metric.field, AggCapability::new(function.as_str()));
            }
        }

        Self {
            job_id: config.id().to_string(),
            rollup_index: config.rollup_index().to_string(),
            index_pattern: config.index_pattern().to_string(),
            fields,
        }
    }
}

/// 📦 All jobs that roll up one index pattern, in job iteration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollableIndexCaps {
    #[serde(skip)]
    pub index_name: String,
    pub rollup_jobs: Vec<RollupJobCaps>,
}

impl RollableIndexCaps {
    /// 🧷 Every job's field caps concatenated, job by job. Duplicates are kept.
    pub fn merged_field_caps(&self) -> BTreeMap<String, RollupFieldCaps> {
        let mut merged: BTreeMap<String, RollupFieldCaps> = BTreeMap::new();
        for job in &self.rollup_jobs {
            for (field, caps) in &job.fields {
                merged
                    .entry(field.clone())
                    .or_default()
                    .aggs
                    .extend(caps.aggs.iter().cloned());
            }
        }
        merged
    }
}

/// 🗺️ Group the matching configs by index pattern and derive their caps.
///
/// `selector` is matched against `index_pattern` exactly; `All` keeps everything.
pub fn build_rollup_caps<'a, I>(configs: I, selector: &Selector) -> BTreeMap<String, RollableIndexCaps>
where
    I: IntoIterator<Item = &'a RollupJobConfig>,
{
    let mut caps: BTreeMap<String, RollableIndexCaps> = BTreeMap::new();
    for config in configs
        .into_iter()
        .filter(|config| selector.matches(config.index_pattern()))
    {
        caps.entry(config.index_pattern().to_string())
            .or_insert_with(|| RollableIndexCaps {
                index_name: config.index_pattern().to_string(),
                rollup_jobs: Vec::new(),
            })
            .rollup_jobs
            .push(RollupJobCaps::from_config(config));
    }
    caps
}

/// 🔭 Reads job configs from the engine and turns them into capabilities, on demand.
#[derive(Debug, Clone)]
pub struct CapabilityAggregator {
    engine: Arc<EngineBackend>,
}

impl CapabilityAggregator {
    pub fn new(engine: Arc<EngineBackend>) -> Self {
        Self { engine }
    }

    pub async fn get_capabilities(
        &self,
        selector: &Selector,
    ) -> Result<BTreeMap<String, RollableIndexCaps>, RollupError> {
        let jobs = self.engine.get_jobs(&Selector::All).await?;
        let caps = build_rollup_caps(jobs.iter().map(|job| &job.config), selector);
        debug!(
            "🗺️ {} job(s) known, {} index pattern(s) match [{}]",
            jobs.len(),
            caps.len(),
            selector
        );
        Ok(caps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryEngine;
    use crate::job_config::tests::{the_docs_job, the_docs_job_spec};
    use crate::job_config::{MetricConfig, RollupJobConfig};
    use serde_json::json;

    fn the_aggs_of<'a>(caps: &'a BTreeMap<String, RollupFieldCaps>, field: &str) -> Vec<&'a str> {
        caps[field].aggs.iter().map(|cap| cap.agg.as_str()).collect()
    }

    #[test]
    fn the_one_where_the_docs_job_explains_itself() {
        let the_caps = RollupJobCaps::from_config(&the_docs_job("job_1"));
        assert_eq!(the_caps.job_id, "job_1");
        assert_eq!(the_caps.rollup_index, "rollup");
        assert_eq!(the_caps.index_pattern, "docs");
        assert_eq!(the_caps.fields.len(), 8);

        let the_timestamp = &the_caps.fields["timestamp"].aggs;
        assert_eq!(the_timestamp.len(), 1);
        assert_eq!(
            the_timestamp[0].to_string(),
            "{agg=date_histogram, delay=7d, interval=1h, time_zone=UTC}"
        );
        assert_eq!(the_aggs_of(&the_caps.fields, "temperature"), vec!["min", "max", "sum"]);
        assert_eq!(the_aggs_of(&the_caps.fields, "voltage"), vec!["avg", "value_count"]);
        assert_eq!(the_caps.fields["load"].aggs[0].to_string(), "{agg=histogram, interval=5}");
        assert_eq!(the_caps.fields["hostname"].aggs[0].to_string(), "{agg=terms}");
    }

    #[test]
    fn the_one_where_a_field_wears_two_hats() {
        let the_spec = the_docs_job_spec("job_1").with_metric(MetricConfig::new("load", ["max"]));
        let the_caps = RollupJobCaps::from_config(&RollupJobConfig::build(the_spec).unwrap());
        assert_eq!(the_aggs_of(&the_caps.fields, "load"), vec!["histogram", "max"]);
    }

    #[test]
    fn the_one_where_jobs_are_grouped_by_pattern_and_the_selector_picks() {
        let mut the_logs_spec = the_docs_job_spec("job_logs");
        the_logs_spec.index_pattern = "logs".to_string();
        let the_configs = vec![
            the_docs_job("job_1"),
            RollupJobConfig::build(the_logs_spec).unwrap(),
            the_docs_job("job_2"),
        ];

        let everything = build_rollup_caps(&the_configs, &Selector::All);
        assert_eq!(everything.keys().collect::<Vec<_>>(), vec!["docs", "logs"]);
        let the_docs_jobs: Vec<&str> = everything["docs"]
            .rollup_jobs
            .iter()
            .map(|job| job.job_id.as_str())
            .collect();
        assert_eq!(the_docs_jobs, vec!["job_1", "job_2"]);

        let just_logs = build_rollup_caps(&the_configs, &Selector::from("logs"));
        assert_eq!(just_logs.len(), 1);
        assert_eq!(just_logs["logs"].index_name, "logs");
        assert!(build_rollup_caps(&the_configs, &Selector::from("nope")).is_empty());
    }

    #[test]
    fn the_one_where_merging_keeps_every_duplicate() {
        let the_configs = vec![the_docs_job("job_1"), the_docs_job("job_2")];
        let the_caps = build_rollup_caps(&the_configs, &Selector::from("docs"));
        let the_merged = the_caps["docs"].merged_field_caps();
        assert_eq!(
            the_aggs_of(&the_merged, "temperature"),
            vec!["min", "max", "sum", "min", "max", "sum"]
        );
        assert_eq!(the_merged["timestamp"].aggs.len(), 2);
    }

    #[test]
    fn the_one_where_caps_serialize_like_the_engine_would() {
        let the_caps = build_rollup_caps(&vec![the_docs_job("job_1")], &Selector::All);
        let the_json = serde_json::to_value(&the_caps).unwrap();
        assert_eq!(the_json["docs"]["rollup_jobs"][0]["job_id"], "job_1");
        assert_eq!(
            the_json["docs"]["rollup_jobs"][0]["fields"]["timestamp"],
            json!([{ "agg": "date_histogram", "interval": "1h", "delay": "7d", "time_zone": "UTC" }])
        );
        assert!(the_json["docs"].get("index_name").is_none());
    }

    #[tokio::test]
    async fn the_one_where_caps_are_rebuilt_from_whatever_the_engine_has_now() {
        let the_engine = InMemoryEngine::new();
        let the_aggregator =
            CapabilityAggregator::new(Arc::new(EngineBackend::InMemory(the_engine.clone())));
        assert!(the_aggregator.get_capabilities(&Selector::All).await.unwrap().is_empty());

        the_engine.put_job(&the_docs_job("job_1")).await.unwrap();
        let the_caps = the_aggregator.get_capabilities(&Selector::from("docs")).await.unwrap();
        assert_eq!(the_caps["docs"].rollup_jobs.len(), 1);

        the_engine.delete_job("job_1").await.unwrap();
        assert!(the_aggregator.get_capabilities(&Selector::from("docs")).await.unwrap().is_empty());
    }
}
