//! 🧮 Metric configs: which math happens to which field once the buckets exist.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 🔢 The aggregation functions a rollup can precompute. No more, no less.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFunction {
    Min,
    Max,
    Sum,
    Avg,
    ValueCount,
}

impl MetricFunction {
    pub const ALL: [MetricFunction; 5] = [
        MetricFunction::Min,
        MetricFunction::Max,
        MetricFunction::Sum,
        MetricFunction::Avg,
        MetricFunction::ValueCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::ValueCount => "value_count",
        }
    }
}

impl fmt::Display for MetricFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricFunction {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        MetricFunction::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == raw)
            .ok_or_else(|| {
                format!(
                    "unsupported metric [{}], expected one of min, max, sum, avg, value_count",
                    raw
                )
            })
    }
}

/// 📐 One source field plus the aggregation functions to precompute for it.
///
/// Function names stay strings on the way in so an unknown name becomes a
/// readable validation problem instead of a cryptic serde error. Once a job
/// config is built they are guaranteed known and duplicate-free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub field: String,
    pub metrics: Vec<String>,
}

impl MetricConfig {
    pub fn new<I, S>(field: impl Into<String>, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            metrics: metrics.into_iter().map(Into::into).collect(),
        }
    }

    /// 🧮 The parsed functions, in declared order. Unknown names are skipped,
    /// which can only happen on a config that never went through validation.
    pub fn functions(&self) -> impl Iterator<Item = MetricFunction> + '_ {
        self.metrics.iter().filter_map(|m| m.parse().ok())
    }

    /// 🧹 Check the entry and return a copy with duplicate functions collapsed
    /// (first occurrence wins), or `None` if the entry is unusable.
    pub(crate) fn normalized(&self, problems: &mut Vec<String>) -> Option<MetricConfig> {
        let mut usable = true;
        if self.field.trim().is_empty() {
            problems.push("metric field must not be blank".to_string());
            usable = false;
        }
        if self.metrics.is_empty() {
            problems.push(format!(
                "metric [{}] must list at least one aggregation function",
                self.field
            ));
            usable = false;
        }

        let mut seen: Vec<MetricFunction> = Vec::with_capacity(self.metrics.len());
        for raw in &self.metrics {
            match raw.parse::<MetricFunction>() {
                Ok(function) if !seen.contains(&function) => seen.push(function),
                Ok(_) => {} // -- 👯 duplicate, quietly collapsed
                Err(problem) => {
                    problems.push(format!("metric [{}]: {}", self.field, problem));
                    usable = false;
                }
            }
        }

        usable.then(|| MetricConfig {
            field: self.field.clone(),
            metrics: seen.iter().map(|f| f.as_str().to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_duplicates_collapse_and_order_survives() {
        let mut problems = Vec::new();
        let the_metric = MetricConfig::new("temperature", ["max", "min", "max", "sum"])
            .normalized(&mut problems)
            .expect("💀 a perfectly good metric was rejected");

        assert!(problems.is_empty());
        assert_eq!(the_metric.metrics, vec!["max", "min", "sum"]);
        assert_eq!(
            the_metric.functions().collect::<Vec<_>>(),
            vec![MetricFunction::Max, MetricFunction::Min, MetricFunction::Sum]
        );
    }

    #[test]
    fn the_one_where_median_is_not_invited() {
        let mut problems = Vec::new();
        let the_metric = MetricConfig::new("voltage", ["avg", "median"]).normalized(&mut problems);

        assert!(the_metric.is_none());
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("median"), "the culprit should be named: {}", problems[0]);
    }

    #[test]
    fn the_one_where_an_empty_function_list_is_not_a_metric() {
        let mut problems = Vec::new();
        let the_metric =
            MetricConfig::new("voltage", Vec::<String>::new()).normalized(&mut problems);
        assert!(the_metric.is_none());
        assert_eq!(
            problems,
            vec!["metric [voltage] must list at least one aggregation function"]
        );
    }

    #[test]
    fn the_one_where_value_count_round_trips_its_name() {
        assert_eq!("value_count".parse::<MetricFunction>(), Ok(MetricFunction::ValueCount));
        assert_eq!(MetricFunction::ValueCount.to_string(), "value_count");
        assert!("VALUE_COUNT".parse::<MetricFunction>().is_err());
    }
}
