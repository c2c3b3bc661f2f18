//! 🪣 Group configs: how raw documents get sorted into buckets before anyone does math on them.
//!
//! Three flavors, like a very nerdy ice cream shop:
//! - `DateHistogramGroupConfig`: time buckets. Mandatory. Every rollup has a clock.
//! - `HistogramGroupConfig`: numeric buckets of a fixed width. Optional.
//! - `TermsGroupConfig`: one bucket per distinct value. Optional.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 📅 A date-histogram interval: calendar-aware ("1M" respects month lengths)
/// or fixed ("90m" is always 90 minutes, daylight saving be damned).
///
/// Jobs created on older clusters come back with a plain `interval` key that
/// predates the split. Those decode as `Legacy` and are written back the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateHistogramInterval {
    #[serde(rename = "calendar_interval")]
    Calendar(String),
    #[serde(rename = "fixed_interval")]
    Fixed(String),
    #[serde(rename = "interval")]
    Legacy(String),
}

impl DateHistogramInterval {
    pub fn calendar(interval: impl Into<String>) -> Self {
        Self::Calendar(interval.into())
    }

    pub fn fixed(interval: impl Into<String>) -> Self {
        Self::Fixed(interval.into())
    }

    /// 🕐 The one you'll reach for 90% of the time.
    pub fn hour() -> Self {
        Self::calendar("1h")
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Calendar(interval) | Self::Fixed(interval) | Self::Legacy(interval) => interval,
        }
    }
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

/// 📅 Buckets documents by a timestamp field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateHistogramGroupConfig {
    /// 🕰️ The timestamp field in the source documents.
    pub field: String,
    #[serde(flatten)]
    pub interval: DateHistogramInterval,
    /// ⏳ How long to wait before rolling up a bucket, so late documents can still land.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::time_value::option"
    )]
    pub delay: Option<Duration>,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl DateHistogramGroupConfig {
    pub fn new(field: impl Into<String>, interval: DateHistogramInterval) -> Self {
        Self {
            field: field.into(),
            interval,
            delay: None,
            time_zone: default_time_zone(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub(crate) fn collect_problems(&self, problems: &mut Vec<String>) {
        if self.field.trim().is_empty() {
            problems.push("date_histogram field must not be blank".to_string());
        }
        if self.interval.as_str().trim().is_empty() {
            problems.push("date_histogram interval must not be blank".to_string());
        }
        if self.time_zone.trim().is_empty() {
            problems.push("date_histogram time_zone must not be blank".to_string());
        }
    }
}

/// 📏 Buckets numeric fields into fixed-width ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramGroupConfig {
    pub interval: u64,
    pub fields: Vec<String>,
}

impl HistogramGroupConfig {
    pub fn new<I, S>(interval: u64, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interval,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn collect_problems(&self, problems: &mut Vec<String>) {
        if self.interval == 0 {
            problems.push("histogram interval must be greater than 0".to_string());
        }
        collect_field_list_problems("histogram", &self.fields, problems);
    }
}

/// 🏷️ Buckets documents by the distinct values of keyword-ish fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsGroupConfig {
    pub fields: Vec<String>,
}

impl TermsGroupConfig {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn collect_problems(&self, problems: &mut Vec<String>) {
        collect_field_list_problems("terms", &self.fields, problems);
    }
}

fn collect_field_list_problems(kind: &str, fields: &[String], problems: &mut Vec<String>) {
    if fields.is_empty() {
        problems.push(format!("{} group must list at least one field", kind));
    }
    if fields.iter().any(|f| f.trim().is_empty()) {
        problems.push(format!("{} group contains a blank field name", kind));
    }
}

/// 🧺 The full grouping recipe: one date histogram, plus optional histogram and terms.
///
/// The date histogram is not optional. The type says so, which means the
/// borrow checker now enforces a product requirement. Delegation at its finest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub date_histogram: DateHistogramGroupConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<HistogramGroupConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<TermsGroupConfig>,
}

impl GroupConfig {
    pub fn new(date_histogram: DateHistogramGroupConfig) -> Self {
        Self {
            date_histogram,
            histogram: None,
            terms: None,
        }
    }

    pub fn with_histogram(mut self, histogram: HistogramGroupConfig) -> Self {
        self.histogram = Some(histogram);
        self
    }

    pub fn with_terms(mut self, terms: TermsGroupConfig) -> Self {
        self.terms = Some(terms);
        self
    }

    pub(crate) fn collect_problems(&self, problems: &mut Vec<String>) {
        self.date_histogram.collect_problems(problems);
        if let Some(ref histogram) = self.histogram {
            histogram.collect_problems(problems);
        }
        if let Some(ref terms) = self.terms {
            terms.collect_problems(problems);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_the_groups_wear_their_wire_format_proudly() {
        let the_groups = GroupConfig::new(
            DateHistogramGroupConfig::new("timestamp", DateHistogramInterval::hour())
                .with_delay(Duration::from_secs(7 * 24 * 3600)),
        )
        .with_histogram(HistogramGroupConfig::new(5, ["load", "net_in", "net_out"]))
        .with_terms(TermsGroupConfig::new(["hostname", "datacenter"]));

        let the_json = serde_json::to_value(&the_groups).unwrap();
        assert_eq!(
            the_json,
            json!({
                "date_histogram": {
                    "field": "timestamp",
                    "calendar_interval": "1h",
                    "delay": "7d",
                    "time_zone": "UTC"
                },
                "histogram": { "interval": 5, "fields": ["load", "net_in", "net_out"] },
                "terms": { "fields": ["hostname", "datacenter"] }
            })
        );
    }

    #[test]
    fn the_one_where_a_fixed_interval_comes_back_from_the_engine() {
        let the_wire = json!({
            "date_histogram": { "field": "@timestamp", "fixed_interval": "90m" }
        });
        let the_groups: GroupConfig = serde_json::from_value(the_wire).unwrap();
        assert_eq!(the_groups.date_histogram.interval, DateHistogramInterval::fixed("90m"));
        assert_eq!(the_groups.date_histogram.time_zone, "UTC", "time zone defaults to UTC");
        assert_eq!(the_groups.date_histogram.delay, None);
        assert!(the_groups.histogram.is_none());
        assert!(the_groups.terms.is_none());
    }

    #[test]
    fn the_one_where_an_old_job_still_says_interval() {
        let the_wire = json!({
            "date_histogram": { "field": "timestamp", "interval": "1h", "delay": "7d", "time_zone": "UTC" }
        });
        let the_groups: GroupConfig = serde_json::from_value(the_wire.clone()).unwrap();
        assert_eq!(
            the_groups.date_histogram.interval,
            DateHistogramInterval::Legacy("1h".into())
        );
        assert_eq!(the_groups.date_histogram.interval.as_str(), "1h");
        assert_eq!(the_groups.date_histogram.delay, Some(Duration::from_secs(7 * 24 * 3600)));
        // -- it leaves the way it came in, no silent upgrade to calendar_interval
        assert_eq!(serde_json::to_value(&the_groups).unwrap(), the_wire);
    }

    #[test]
    fn the_one_where_empty_buckets_get_reported() {
        let the_groups = GroupConfig::new(DateHistogramGroupConfig::new(
            " ",
            DateHistogramInterval::calendar(""),
        ))
        .with_histogram(HistogramGroupConfig::new(0, Vec::<String>::new()))
        .with_terms(TermsGroupConfig::new(["hostname", ""]));

        let mut problems = Vec::new();
        the_groups.collect_problems(&mut problems);
        assert_eq!(
            problems,
            vec![
                "date_histogram field must not be blank",
                "date_histogram interval must not be blank",
                "histogram interval must be greater than 0",
                "histogram group must list at least one field",
                "terms group contains a blank field name",
            ]
        );
    }
}
