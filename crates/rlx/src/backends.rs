//! 🔌 Backends: the engines that actually hold rollup jobs.
//!
//! 🚰 We don't roll anything up ourselves. We ask politely. The engine stores the
//! job metadata, runs the cron, indexes the rolled-up documents, and tells us how
//! it went. This module is the casting agency for "who do we ask".
//!
//! - `InMemoryEngine`: lives in RAM, plays the whole state machine, great for tests.
//! - `ElasticsearchEngine`: the real thing, over HTTP, with all the feelings that implies.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use async_trait::async_trait;

use crate::app_config::EngineConfig;
use crate::error::RollupError;
use crate::job_config::RollupJobConfig;
use crate::job_status::RollupJob;
use crate::selector::Selector;

pub mod elasticsearch;
pub mod in_mem;

pub use elasticsearch::{ElasticsearchEngine, ElasticsearchEngineConfig};
pub use in_mem::InMemoryEngine;

/// 🏗️ Everything the client needs from whoever stores and runs rollup jobs.
///
/// # Contract
/// - Failures are typed: not-found, conflict (already exists / already started /
///   still running), unavailable, transport. Never a silent `Ok`.
/// - Concurrent calls on *different* ids are fine. Concurrent calls on the *same*
///   id are serialized by the engine; the loser gets one of the typed errors.
/// - No retries here. Retry policy, if any, belongs to the transport.
#[async_trait]
pub trait RollupEngine: std::fmt::Debug + Send + Sync {
    /// 📥 Register a new job. It starts life `Stopped` with zeroed stats.
    async fn put_job(&self, config: &RollupJobConfig) -> Result<(), RollupError>;

    /// 🔍 Jobs matching the selector, in engine iteration order. An unknown id is
    /// an empty list here; turning that into `JobNotFound` is the caller's call.
    async fn get_jobs(&self, selector: &Selector) -> Result<Vec<RollupJob>, RollupError>;

    /// 🏃 `Stopped -> Started`.
    async fn start_job(&self, id: &str) -> Result<(), RollupError>;

    /// 🛑 Ask the job to stop. Returns once the request is accepted, which may be
    /// before the indexer has actually finished its current page.
    async fn stop_job(&self, id: &str) -> Result<(), RollupError>;

    /// 🗑️ Remove a stopped job.
    async fn delete_job(&self, id: &str) -> Result<(), RollupError>;
}

/// 🎭 The many faces of an engine. Dispatches like a universal remote.
#[derive(Debug)]
pub enum EngineBackend {
    InMemory(InMemoryEngine),
    Elasticsearch(ElasticsearchEngine),
}

impl EngineBackend {
    /// 🚀 Build the engine the config asks for. Elasticsearch gets pinged on the way.
    pub async fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        match config {
            EngineConfig::InMemory => Ok(EngineBackend::InMemory(InMemoryEngine::new())),
            EngineConfig::Elasticsearch(es_config) => Ok(EngineBackend::Elasticsearch(
                ElasticsearchEngine::new(es_config.clone()).await?,
            )),
        }
    }
}

#[async_trait]
impl RollupEngine for EngineBackend {
    async fn put_job(&self, config: &RollupJobConfig) -> Result<(), RollupError> {
        match self {
            EngineBackend::InMemory(engine) => engine.put_job(config).await,
            EngineBackend::Elasticsearch(engine) => engine.put_job(config).await,
        }
    }

    async fn get_jobs(&self, selector: &Selector) -> Result<Vec<RollupJob>, RollupError> {
        match self {
            EngineBackend::InMemory(engine) => engine.get_jobs(selector).await,
            EngineBackend::Elasticsearch(engine) => engine.get_jobs(selector).await,
        }
    }

    async fn start_job(&self, id: &str) -> Result<(), RollupError> {
        match self {
            EngineBackend::InMemory(engine) => engine.start_job(id).await,
            EngineBackend::Elasticsearch(engine) => engine.start_job(id).await,
        }
    }

    async fn stop_job(&self, id: &str) -> Result<(), RollupError> {
        match self {
            EngineBackend::InMemory(engine) => engine.stop_job(id).await,
            EngineBackend::Elasticsearch(engine) => engine.stop_job(id).await,
        }
    }

    async fn delete_job(&self, id: &str) -> Result<(), RollupError> {
        match self {
            EngineBackend::InMemory(engine) => engine.delete_job(id).await,
            EngineBackend::Elasticsearch(engine) => engine.delete_job(id).await,
        }
    }
}
