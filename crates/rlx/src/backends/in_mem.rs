//! # Previously, on rlx...
//!
//! 🎬 The cluster was down for maintenance. The tests still had to run. Someone
//! needed an engine that lives entirely in RAM, plays the full rollup job state
//! machine, and forgets everything the moment you blink.
//!
//! That someone was this module.
//!
//! `InMemoryEngine` keeps jobs behind an `Arc<Mutex<...>>` so clones share one
//! world, and exposes a few hooks (`begin_indexing`, `complete_page`,
//! `finish_indexing`, `abort`) that stand in for the engine's own cron-driven
//! indexer. Tests use them to put a job mid-page and watch `stop` squirm.
//!
//! 🦆
//!
//! ⚠️ This is NOT a rollup engine. It rolls up nothing. It just keeps score.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::backends::RollupEngine;
use crate::error::RollupError;
use crate::job_config::RollupJobConfig;
use crate::job_status::{JobState, JobStats, JobStatus, RollupJob};
use crate::selector::Selector;

#[derive(Debug, Clone)]
struct JobEntry {
    config: RollupJobConfig,
    status: JobStatus,
    stats: JobStats,
}

impl JobEntry {
    fn snapshot(&self) -> RollupJob {
        RollupJob {
            config: self.config.clone(),
            status: self.status.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// 📦 A rollup engine that lives and dies with the process.
///
/// Cloning is cheap and every clone sees the same jobs. Job iteration order is
/// creation order, which is what the capability aggregator's ordering promises lean on.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEngine {
    // 🔒 Vec, not HashMap: creation order is part of the contract
    jobs: Arc<Mutex<Vec<JobEntry>>>,
    latency: Option<Duration>,
}

fn find_mut<'a>(jobs: &'a mut [JobEntry], id: &str) -> Result<&'a mut JobEntry, RollupError> {
    jobs.iter_mut()
        .find(|entry| entry.config.id() == id)
        .ok_or_else(|| RollupError::JobNotFound(id.to_string()))
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 🐌 Make every engine call sleep first. For testing what happens while a
    /// caller is still waiting (cancellation, timeouts, impatience in general).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn lag(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// ⏰ The cron fired. A started job begins a page run (`Started -> Indexing`).
    ///
    /// Every trigger is counted while the job is active; only an idle started job
    /// actually begins indexing. Returns whether a page run began.
    pub async fn begin_indexing(&self, id: &str) -> Result<bool, RollupError> {
        let mut jobs = self.jobs.lock().await;
        let entry = find_mut(&mut jobs, id)?;
        match entry.status.job_state {
            JobState::Started => {
                entry.stats.trigger_count += 1;
                entry.status.job_state = JobState::Indexing;
                debug!("⏰ job [{}] triggered, indexer is now busy", id);
                Ok(true)
            }
            JobState::Indexing | JobState::Stopping => {
                // -- 🔁 still chewing on the last page, the trigger is noted and ignored
                entry.stats.trigger_count += 1;
                Ok(false)
            }
            JobState::Stopped | JobState::Aborting => Ok(false),
        }
    }

    /// 📄 One page of the composite aggregation got searched and its buckets indexed.
    ///
    /// Only counts while the indexer is busy. Returns whether the page was recorded.
    pub async fn complete_page(
        &self,
        id: &str,
        documents: u64,
        rollups: u64,
    ) -> Result<bool, RollupError> {
        let mut jobs = self.jobs.lock().await;
        let entry = find_mut(&mut jobs, id)?;
        if !matches!(entry.status.job_state, JobState::Indexing | JobState::Stopping) {
            return Ok(false);
        }
        let stats = &mut entry.stats;
        stats.pages_processed += 1;
        stats.documents_processed += documents;
        stats.rollups_indexed += rollups;
        stats.search_total += 1;
        stats.processing_total += 1;
        if rollups > 0 {
            stats.index_total += 1;
        }
        Ok(true)
    }

    /// 🏁 The indexer finished its run. `Indexing -> Started`, `Stopping -> Stopped`.
    pub async fn finish_indexing(&self, id: &str) -> Result<JobState, RollupError> {
        let mut jobs = self.jobs.lock().await;
        let entry = find_mut(&mut jobs, id)?;
        entry.status.job_state = match entry.status.job_state {
            JobState::Indexing => JobState::Started,
            JobState::Stopping => JobState::Stopped,
            unchanged => unchanged,
        };
        debug!("🏁 job [{}] indexer run finished, now {}", id, entry.status.job_state);
        Ok(entry.status.job_state)
    }

    /// 💥 The engine gave up on the job's task. Any state goes to `Aborting`.
    pub async fn abort(&self, id: &str) -> Result<(), RollupError> {
        let mut jobs = self.jobs.lock().await;
        let entry = find_mut(&mut jobs, id)?;
        entry.status.job_state = JobState::Aborting;
        debug!("💥 job [{}] is aborting", id);
        Ok(())
    }
}

#[async_trait]
impl RollupEngine for InMemoryEngine {
    async fn put_job(&self, config: &RollupJobConfig) -> Result<(), RollupError> {
        self.lag().await;
        let mut jobs = self.jobs.lock().await;
        if jobs.iter().any(|entry| entry.config.id() == config.id()) {
            return Err(RollupError::JobAlreadyExists(config.id().to_string()));
        }
        jobs.push(JobEntry {
            config: config.clone(),
            status: JobStatus::new(JobState::Stopped),
            stats: JobStats::default(),
        });
        debug!("📥 job [{}] registered, {} job(s) known", config.id(), jobs.len());
        Ok(())
    }

    async fn get_jobs(&self, selector: &Selector) -> Result<Vec<RollupJob>, RollupError> {
        self.lag().await;
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .iter()
            .filter(|entry| selector.matches(entry.config.id()))
            .map(JobEntry::snapshot)
            .collect())
    }

    async fn start_job(&self, id: &str) -> Result<(), RollupError> {
        self.lag().await;
        let mut jobs = self.jobs.lock().await;
        let entry = find_mut(&mut jobs, id)?;
        match entry.status.job_state {
            JobState::Stopped => {
                entry.status.job_state = JobState::Started;
                debug!("🏃 job [{}] started", id);
                Ok(())
            }
            _ => Err(RollupError::AlreadyStarted(id.to_string())),
        }
    }

    async fn stop_job(&self, id: &str) -> Result<(), RollupError> {
        self.lag().await;
        let mut jobs = self.jobs.lock().await;
        let entry = find_mut(&mut jobs, id)?;
        entry.status.job_state = match entry.status.job_state {
            // -- idle indexer, nothing in flight, stop on the spot
            JobState::Started => JobState::Stopped,
            // -- mid-page: the indexer finishes the page before it lets go
            JobState::Indexing => JobState::Stopping,
            unchanged => unchanged,
        };
        debug!("🛑 job [{}] asked to stop, now {}", id, entry.status.job_state);
        Ok(())
    }

    async fn delete_job(&self, id: &str) -> Result<(), RollupError> {
        self.lag().await;
        let mut jobs = self.jobs.lock().await;
        let position = jobs
            .iter()
            .position(|entry| entry.config.id() == id)
            .ok_or_else(|| RollupError::JobNotFound(id.to_string()))?;
        if jobs[position].status.job_state != JobState::Stopped {
            return Err(RollupError::JobStillRunning(id.to_string()));
        }
        jobs.remove(position);
        debug!("🗑️ job [{}] deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_config::tests::the_docs_job;

    #[tokio::test]
    async fn the_one_where_the_whole_life_of_a_job_happens_in_ram() {
        let the_engine = InMemoryEngine::new();
        the_engine.put_job(&the_docs_job("job_1")).await.unwrap();

        let the_jobs = the_engine.get_jobs(&Selector::from("job_1")).await.unwrap();
        assert_eq!(the_jobs.len(), 1);
        assert_eq!(the_jobs[0].state(), JobState::Stopped);
        assert_eq!(the_jobs[0].stats, JobStats::default());

        the_engine.start_job("job_1").await.unwrap();
        assert_eq!(
            the_engine.start_job("job_1").await,
            Err(RollupError::AlreadyStarted("job_1".into()))
        );

        the_engine.stop_job("job_1").await.unwrap();
        the_engine.delete_job("job_1").await.unwrap();
        assert!(the_engine.get_jobs(&Selector::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn the_one_where_a_busy_indexer_finishes_its_page_before_stopping() {
        let the_engine = InMemoryEngine::new();
        the_engine.put_job(&the_docs_job("job_1")).await.unwrap();
        the_engine.start_job("job_1").await.unwrap();
        assert!(the_engine.begin_indexing("job_1").await.unwrap());
        assert!(the_engine.complete_page("job_1", 50, 2).await.unwrap());

        the_engine.stop_job("job_1").await.unwrap();
        let the_job = &the_engine.get_jobs(&Selector::from("job_1")).await.unwrap()[0];
        assert_eq!(the_job.state(), JobState::Stopping);
        assert_eq!(
            the_engine.delete_job("job_1").await,
            Err(RollupError::JobStillRunning("job_1".into())),
            "stopping is not stopped"
        );

        // -- 🏁 the last page lands, and only now does the job let go
        assert!(the_engine.complete_page("job_1", 10, 1).await.unwrap());
        assert_eq!(the_engine.finish_indexing("job_1").await.unwrap(), JobState::Stopped);

        let the_job = &the_engine.get_jobs(&Selector::from("job_1")).await.unwrap()[0];
        assert_eq!(the_job.stats.pages_processed, 2);
        assert_eq!(the_job.stats.documents_processed, 60);
        assert_eq!(the_job.stats.rollups_indexed, 3);
        assert_eq!(the_job.stats.trigger_count, 1);
    }

    #[tokio::test]
    async fn the_one_where_triggers_pile_up_while_the_indexer_is_busy() {
        let the_engine = InMemoryEngine::new();
        the_engine.put_job(&the_docs_job("job_1")).await.unwrap();
        assert!(!the_engine.begin_indexing("job_1").await.unwrap(), "stopped jobs ignore cron");
        assert!(!the_engine.complete_page("job_1", 5, 5).await.unwrap());

        the_engine.start_job("job_1").await.unwrap();
        assert!(the_engine.begin_indexing("job_1").await.unwrap());
        assert!(!the_engine.begin_indexing("job_1").await.unwrap());
        assert_eq!(the_engine.finish_indexing("job_1").await.unwrap(), JobState::Started);

        let the_job = &the_engine.get_jobs(&Selector::from("job_1")).await.unwrap()[0];
        assert_eq!(the_job.stats.trigger_count, 2);
        assert_eq!(the_job.stats.pages_processed, 0);
    }

    #[tokio::test]
    async fn the_one_where_recreating_a_job_resets_its_stats() {
        let the_engine = InMemoryEngine::new();
        the_engine.put_job(&the_docs_job("job_1")).await.unwrap();
        the_engine.start_job("job_1").await.unwrap();
        the_engine.begin_indexing("job_1").await.unwrap();
        the_engine.complete_page("job_1", 50, 2).await.unwrap();
        the_engine.finish_indexing("job_1").await.unwrap();
        the_engine.stop_job("job_1").await.unwrap();
        the_engine.delete_job("job_1").await.unwrap();

        the_engine.put_job(&the_docs_job("job_1")).await.unwrap();
        let the_job = &the_engine.get_jobs(&Selector::from("job_1")).await.unwrap()[0];
        assert_eq!(the_job.stats, JobStats::default());
    }

    #[tokio::test]
    async fn the_one_where_an_aborting_job_refuses_to_start_or_die() {
        let the_engine = InMemoryEngine::new();
        the_engine.put_job(&the_docs_job("job_1")).await.unwrap();
        the_engine.abort("job_1").await.unwrap();

        assert!(matches!(
            the_engine.start_job("job_1").await,
            Err(RollupError::AlreadyStarted(_))
        ));
        assert!(matches!(
            the_engine.delete_job("job_1").await,
            Err(RollupError::JobStillRunning(_))
        ));
        assert!(the_engine.abort("ghost").await.unwrap_err().is_not_found());
    }
}
