//! 🚦 Job status and stats: where a rollup job is in life, and what it has achieved.
//!
//! The state machine, drawn by someone who should have been asleep:
//!
//! ```text
//!            start                begin page
//!  STOPPED ────────▶ STARTED ───────────────▶ INDEXING
//!     ▲                 │  ▲                      │
//!     │      stop (idle)│  └──── page done ───────┤
//!     ├─────────────────┘                         │ stop (mid-page)
//!     │                                           ▼
//!     └──────────────── page done ─────────── STOPPING
//!
//!  any ──── abort ────▶ ABORTING
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::job_config::RollupJobConfig;

/// 🚦 The one state a job is in at any moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Stopped,
    Started,
    Indexing,
    Stopping,
    Aborting,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Indexing => "indexing",
            Self::Stopping => "stopping",
            Self::Aborting => "aborting",
        }
    }

    /// 🏃 True for every state in which the engine may still be doing work.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 📍 The status block the engine reports alongside a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_state: JobState,
    /// 🧭 The composite-agg key the indexer will resume after. Opaque to us.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_position: Option<BTreeMap<String, serde_json::Value>>,
    /// 🆔 Whether rollup docs use the collision-free id scheme. Every job this client
    /// creates does, and a status that leaves it out is read the same way.
    #[serde(default = "default_upgraded_doc_id")]
    pub upgraded_doc_id: bool,
}

fn default_upgraded_doc_id() -> bool {
    true
}

impl JobStatus {
    pub fn new(job_state: JobState) -> Self {
        Self {
            job_state,
            current_position: None,
            upgraded_doc_id: true,
        }
    }
}

/// 📊 Counters for a job. They only ever go up, until the job is recreated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStats {
    pub pages_processed: u64,
    pub documents_processed: u64,
    pub rollups_indexed: u64,
    pub trigger_count: u64,
    pub index_time_in_ms: u64,
    pub index_total: u64,
    pub index_failures: u64,
    pub search_time_in_ms: u64,
    pub search_total: u64,
    pub search_failures: u64,
    pub processing_time_in_ms: u64,
    pub processing_total: u64,
}

/// 📦 Config, status and stats of one job, as the engine hands it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupJob {
    pub config: RollupJobConfig,
    pub status: JobStatus,
    #[serde(default)]
    pub stats: JobStats,
}

impl RollupJob {
    pub fn state(&self) -> JobState {
        self.status.job_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_the_engine_speaks_lowercase() {
        let the_status: JobStatus = serde_json::from_value(json!({
            "job_state": "stopping",
            "current_position": { "timestamp.date_histogram": 1516734000000u64 },
            "upgraded_doc_id": true
        }))
        .unwrap();
        assert_eq!(the_status.job_state, JobState::Stopping);
        assert!(the_status.job_state.is_active());
        assert!(the_status.current_position.is_some());
        assert_eq!(serde_json::to_value(JobState::Aborting).unwrap(), json!("aborting"));
    }

    #[test]
    fn the_one_where_a_quiet_status_means_the_same_as_a_new_one() {
        let the_status: JobStatus = serde_json::from_value(json!({ "job_state": "started" })).unwrap();
        assert_eq!(the_status, JobStatus::new(JobState::Started));

        let the_old_timer: JobStatus =
            serde_json::from_value(json!({ "job_state": "stopped", "upgraded_doc_id": false })).unwrap();
        assert!(!the_old_timer.upgraded_doc_id);
    }

    #[test]
    fn the_one_where_missing_stats_are_just_zeroes() {
        let the_stats: JobStats =
            serde_json::from_value(json!({ "pages_processed": 3, "trigger_count": 7 })).unwrap();
        assert_eq!(the_stats.pages_processed, 3);
        assert_eq!(the_stats.trigger_count, 7);
        assert_eq!(the_stats.documents_processed, 0);
        assert!(!JobState::Stopped.is_active());
    }
}
