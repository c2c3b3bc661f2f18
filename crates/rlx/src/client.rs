//! 🚪 The client facade: one door, six operations, two ways to walk through it.
//!
//! 🎬 *[INT. CALLER'S CODE. the caller wants a rollup job. they do not want to know how.]*
//!
//! Every operation comes twice:
//!
//! - `put_rollup_job(req).await`: the calling task waits for the engine's answer.
//! - `put_rollup_job_async(req, listener)`: returns a `Cancellable` right away and
//!   calls the listener back exactly once, from a spawned task.
//!
//! The async forms spawn on the runtime the client was built inside (or the one
//! handed to `with_runtime`). Called from a plain thread with no runtime anywhere,
//! the listener hears `NoRuntime` instead of the caller hearing a panic.
//!
//! The facade validates nothing and retries nothing. It routes. 🦆

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::app_config::AppConfig;
use crate::backends::EngineBackend;
use crate::capabilities::CapabilityAggregator;
use crate::error::RollupError;
use crate::lifecycle::{JobLifecycleController, LifecycleConfig};
use crate::listener::{self, ActionListener, Cancellable};

pub mod requests;

pub use requests::{
    AcknowledgedResponse, DeleteRollupJobRequest, GetRollupCapsRequest, GetRollupCapsResponse,
    GetRollupJobRequest, GetRollupJobResponse, PutRollupJobRequest, StartRollupJobRequest,
    StopRollupJobRequest,
};

/// 🚪 Entry point for everything rollup. Clones share one engine.
#[derive(Debug, Clone)]
pub struct RollupClient {
    lifecycle: JobLifecycleController,
    capabilities: CapabilityAggregator,
    runtime: Option<Handle>,
}

impl RollupClient {
    /// Remembers the current tokio runtime, if there is one, for the `_async` forms.
    pub fn new(engine: EngineBackend, settings: LifecycleConfig) -> Self {
        let engine = Arc::new(engine);
        Self {
            capabilities: CapabilityAggregator::new(Arc::clone(&engine)),
            lifecycle: JobLifecycleController::new(engine, settings),
            runtime: Handle::try_current().ok(),
        }
    }

    /// 🧵 Spawn the `_async` forms on this runtime, wherever they get called from.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// 🚀 Build the engine the config names (pinging it, if it lives on a network).
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let engine = EngineBackend::from_config(&config.engine).await?;
        debug!("🚪 rollup client ready");
        Ok(Self::new(engine, config.lifecycle.clone()))
    }

    pub fn lifecycle(&self) -> &JobLifecycleController {
        &self.lifecycle
    }

    fn spawn<T, Fut>(&self, operation: Fut, listener: impl ActionListener<T>) -> Cancellable
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, RollupError>> + Send + 'static,
    {
        listener::spawn_with_listener(self.runtime.as_ref(), operation, listener)
    }

    pub async fn put_rollup_job(
        &self,
        request: PutRollupJobRequest,
    ) -> Result<AcknowledgedResponse, RollupError> {
        self.lifecycle.create(request.config()).await
    }

    pub fn put_rollup_job_async(
        &self,
        request: PutRollupJobRequest,
        listener: impl ActionListener<AcknowledgedResponse>,
    ) -> Cancellable {
        let client = self.clone();
        self.spawn(async move { client.put_rollup_job(request).await }, listener)
    }

    pub async fn get_rollup_job(
        &self,
        request: GetRollupJobRequest,
    ) -> Result<GetRollupJobResponse, RollupError> {
        let jobs = self.lifecycle.get(request.selector()).await?;
        Ok(GetRollupJobResponse { jobs })
    }

    pub fn get_rollup_job_async(
        &self,
        request: GetRollupJobRequest,
        listener: impl ActionListener<GetRollupJobResponse>,
    ) -> Cancellable {
        let client = self.clone();
        self.spawn(async move { client.get_rollup_job(request).await }, listener)
    }

    pub async fn start_rollup_job(
        &self,
        request: StartRollupJobRequest,
    ) -> Result<AcknowledgedResponse, RollupError> {
        self.lifecycle.start(request.id()).await
    }

    pub fn start_rollup_job_async(
        &self,
        request: StartRollupJobRequest,
        listener: impl ActionListener<AcknowledgedResponse>,
    ) -> Cancellable {
        let client = self.clone();
        self.spawn(async move { client.start_rollup_job(request).await }, listener)
    }

    pub async fn stop_rollup_job(
        &self,
        request: StopRollupJobRequest,
    ) -> Result<AcknowledgedResponse, RollupError> {
        self.lifecycle
            .stop(
                request.id(),
                request.waits_for_completion(),
                request.timeout_budget(),
            )
            .await
    }

    pub fn stop_rollup_job_async(
        &self,
        request: StopRollupJobRequest,
        listener: impl ActionListener<AcknowledgedResponse>,
    ) -> Cancellable {
        let client = self.clone();
        self.spawn(async move { client.stop_rollup_job(request).await }, listener)
    }

    pub async fn delete_rollup_job(
        &self,
        request: DeleteRollupJobRequest,
    ) -> Result<AcknowledgedResponse, RollupError> {
        self.lifecycle.delete(request.id()).await
    }

    pub fn delete_rollup_job_async(
        &self,
        request: DeleteRollupJobRequest,
        listener: impl ActionListener<AcknowledgedResponse>,
    ) -> Cancellable {
        let client = self.clone();
        self.spawn(async move { client.delete_rollup_job(request).await }, listener)
    }

    pub async fn get_rollup_caps(
        &self,
        request: GetRollupCapsRequest,
    ) -> Result<GetRollupCapsResponse, RollupError> {
        let caps = self
            .capabilities
            .get_capabilities(request.index_pattern())
            .await?;
        Ok(GetRollupCapsResponse { caps })
    }

    pub fn get_rollup_caps_async(
        &self,
        request: GetRollupCapsRequest,
        listener: impl ActionListener<GetRollupCapsResponse>,
    ) -> Cancellable {
        let client = self.clone();
        self.spawn(async move { client.get_rollup_caps(request).await }, listener)
    }
}
