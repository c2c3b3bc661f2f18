//! 🎬 *[a job is born Stopped. it is started. it indexes. someone says "stop".]*
//! 🎬 *[it does not stop. it is mid-page. it has commitments.]*
//! 🎬 *[the controller waits, polling, like a parent outside a bathroom door.]* 🦆
//!
//! 🚦 The Job Lifecycle Controller: create, start, stop, delete and get, on top of
//! whichever engine the config picked. It owns exactly two policies:
//!
//! - validation happens before the engine hears anything, and
//! - "stop and wait" means polling the engine until the job reports `stopped`,
//!   or until the time budget runs out. Running out never forces the state.
//!
//! Everything else (conflicts, not-found, engine moods) passes through typed.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, trace, warn};

use crate::backends::{EngineBackend, RollupEngine};
use crate::client::AcknowledgedResponse;
use crate::error::RollupError;
use crate::job_config::{RollupJobConfig, RollupJobSpec};
use crate::job_status::{JobState, RollupJob};
use crate::selector::Selector;

/// ⏱️ Knobs for how patiently the controller waits on a stopping job.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// 🔁 Milliseconds between status polls while waiting for `stopped`.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// ⏳ How long "stop and wait" waits when the caller names no timeout.
    #[serde(default = "default_stop_timeout_ms")]
    pub default_stop_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    250
}

// -- 30s, the same patience the engine itself shows a stop request
fn default_stop_timeout_ms() -> u64 {
    30_000
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            default_stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl LifecycleConfig {
    pub fn poll_interval(&self) -> Duration {
        // -- zero would spin the poll loop hot, one millisecond is the floor
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn default_stop_timeout(&self) -> Duration {
        Duration::from_millis(self.default_stop_timeout_ms)
    }
}

/// 🚦 Drives jobs through their lifecycle. Cheap to clone; clones share the engine.
#[derive(Debug, Clone)]
pub struct JobLifecycleController {
    engine: Arc<EngineBackend>,
    settings: LifecycleConfig,
}

impl JobLifecycleController {
    pub fn new(engine: Arc<EngineBackend>, settings: LifecycleConfig) -> Self {
        Self { engine, settings }
    }

    pub fn engine(&self) -> &Arc<EngineBackend> {
        &self.engine
    }

    pub fn settings(&self) -> &LifecycleConfig {
        &self.settings
    }

    /// 📥 Register a job. It starts `Stopped`, with stats at zero.
    pub async fn create(&self, config: &RollupJobConfig) -> Result<AcknowledgedResponse, RollupError> {
        info!(
            "📥 creating rollup job [{}] over [{}] into [{}]",
            config.id(),
            config.index_pattern(),
            config.rollup_index()
        );
        self.engine.put_job(config).await?;
        Ok(AcknowledgedResponse::acknowledged())
    }

    /// 📝 Validate a draft, then create it. A bad draft never reaches the engine.
    pub async fn create_from_spec(&self, spec: RollupJobSpec) -> Result<AcknowledgedResponse, RollupError> {
        let config = RollupJobConfig::build(spec).inspect_err(|problems| {
            debug!("📋 rollup job draft rejected before the engine saw it: {}", problems);
        })?;
        self.create(&config).await
    }

    /// 🏃 `Stopped -> Started`. Anything else is `AlreadyStarted`.
    pub async fn start(&self, id: &str) -> Result<AcknowledgedResponse, RollupError> {
        info!("🏃 starting rollup job [{}]", id);
        self.engine.start_job(id).await?;
        Ok(AcknowledgedResponse::acknowledged())
    }

    /// 🛑 Ask a job to stop, and optionally wait until it really has.
    ///
    /// Without `wait_for_completion` this returns as soon as the engine accepts the
    /// request. With it, the engine is polled every `poll_interval` until the job
    /// reports `stopped`; after `timeout` (or the configured default) the answer is
    /// `RollupError::Timeout` and the job keeps whatever state the engine gave it.
    /// The budget covers the whole sequence, the stop request itself included.
    pub async fn stop(
        &self,
        id: &str,
        wait_for_completion: bool,
        timeout: Option<Duration>,
    ) -> Result<AcknowledgedResponse, RollupError> {
        info!(
            "🛑 stopping rollup job [{}] (wait_for_completion={})",
            id, wait_for_completion
        );
        if !wait_for_completion {
            self.engine.stop_job(id).await?;
            return Ok(AcknowledgedResponse::acknowledged());
        }

        let budget = timeout.unwrap_or_else(|| self.settings.default_stop_timeout());
        let stop_and_wait = async {
            self.engine.stop_job(id).await?;
            self.wait_until_stopped(id).await
        };
        match tokio::time::timeout(budget, stop_and_wait).await {
            Ok(waited) => waited.map(|_| AcknowledgedResponse::acknowledged()),
            Err(_elapsed) => {
                warn!(
                    "⏳ rollup job [{}] was still not stopped after {:?}, leaving it as it is",
                    id, budget
                );
                Err(RollupError::Timeout {
                    id: id.to_string(),
                    waited: budget,
                })
            }
        }
    }

    async fn wait_until_stopped(&self, id: &str) -> Result<(), RollupError> {
        let poll_interval = self.settings.poll_interval();
        let mut polls: u64 = 0;
        loop {
            let state = self.current_state(id).await?;
            polls += 1;
            trace!("🔁 poll #{} for rollup job [{}]: {}", polls, id, state);
            if state == JobState::Stopped {
                debug!("✅ rollup job [{}] reached stopped after {} poll(s)", id, polls);
                return Ok(());
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn current_state(&self, id: &str) -> Result<JobState, RollupError> {
        self.engine
            .get_jobs(&Selector::Named(id.to_string()))
            .await?
            .first()
            .map(RollupJob::state)
            .ok_or_else(|| RollupError::JobNotFound(id.to_string()))
    }

    /// 🗑️ Remove a stopped job. Never stops anything on the way.
    pub async fn delete(&self, id: &str) -> Result<AcknowledgedResponse, RollupError> {
        info!("🗑️ deleting rollup job [{}]", id);
        self.engine.delete_job(id).await?;
        Ok(AcknowledgedResponse::acknowledged())
    }

    /// 🔍 Jobs for the selector. `All` may come back empty; a named id may not.
    pub async fn get(&self, selector: &Selector) -> Result<Vec<RollupJob>, RollupError> {
        debug!("🔍 getting rollup job(s) [{}]", selector);
        let jobs = self.engine.get_jobs(selector).await?;
        match selector {
            Selector::Named(id) if jobs.is_empty() => Err(RollupError::JobNotFound(id.clone())),
            _ => Ok(jobs),
        }
    }
}
