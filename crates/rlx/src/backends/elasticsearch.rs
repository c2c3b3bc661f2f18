//! # 📡 THE ELASTICSEARCH BACKEND
//!
//! *Previously, on rlx...*
//!
//! 🎬 COLD OPEN. INT. SERVER ROOM, 3:47 AM
//!
//! The dashboards want hourly averages over two years of metrics. The raw index
//! is eleven terabytes. Somebody says "rollups" out loud, and the room goes quiet.
//!
//! 🚀 This module talks to the `_rollup/job` endpoints of an Elasticsearch cluster.
//! It creates jobs, reads them back, starts them, stops them, deletes them, and
//! turns whatever the cluster says into a `RollupError` you can actually `match`.
//! It does not retry. It does not guess. It reports.
//!
//! 🧠 Knowledge graph:
//! - `PUT    /_rollup/job/{id}`         -> `{"acknowledged": true}`
//! - `GET    /_rollup/job/{id|_all}`    -> `{"jobs": [{config, status, stats}]}`
//! - `POST   /_rollup/job/{id}/_start`  -> `{"started": true}`
//! - `POST   /_rollup/job/{id}/_stop`   -> `{"stopped": true}`
//! - `DELETE /_rollup/job/{id}`         -> `{"acknowledged": true}`
//!
//! 🦆 (mandatory duck, no context provided, none shall be requested)

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::backends::RollupEngine;
use crate::error::RollupError;
use crate::job_config::RollupJobConfig;
use crate::job_status::RollupJob;
use crate::selector::Selector;

// 📡 ElasticsearchEngineConfig: "It's just Elasticsearch", she said, before the cluster went red.
//
// 🔧 auth is tri-modal: username+password, api_key, or "I hope anonymous works" (it won't).
#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchEngineConfig {
    /// 📡 The URL of your Elasticsearch cluster. Include scheme + port. Yes, all of it.
    pub url: String,
    /// 🔒 Username for basic auth. Optional, like flossing.
    #[serde(default)]
    pub username: Option<String>,
    /// 🔒 Password. "password123" is not a password. It is a confession.
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key, the velvet rope variant. Beats basic auth when both are set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// 🔧 10 seconds to handshake. if ES can't say hello in 10s, it's not having a good day.
fn default_connect_timeout_secs() -> u64 {
    10
}

// 🔧 30 seconds per request, job CRUD is light but clusters under load are moody
fn default_request_timeout_secs() -> u64 {
    30
}

impl ElasticsearchEngineConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            api_key: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// 🏷️ Which call we were making, so failures can be classified (and logged) in context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EngineOp {
    Put,
    Get,
    Start,
    Stop,
    Delete,
}

impl fmt::Display for EngineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineOp::Put => "create",
            EngineOp::Get => "get",
            EngineOp::Start => "start",
            EngineOp::Stop => "stop",
            EngineOp::Delete => "delete",
        })
    }
}

/// ✅ `acknowledged`, `started` and `stopped` all mean the same thing: "yes, fine".
#[derive(Debug, Deserialize)]
struct AckBody {
    #[serde(alias = "started", alias = "stopped")]
    acknowledged: bool,
}

#[derive(Debug, Deserialize)]
struct GetJobsBody {
    #[serde(default)]
    jobs: Vec<RollupJob>,
}

/// 🔍 Turn a non-2xx answer into the error kind it actually represents.
///
/// Status codes get us most of the way. For the rest we read the exception type
/// and reason, because some conflicts come back as a 500 with a very sad sentence.
pub(crate) fn classify_failure(op: EngineOp, id: &str, status: u16, body: &str) -> RollupError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error_type = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/type"))
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let reason = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/reason"))
        .and_then(|v| v.as_str())
        .unwrap_or(body);
    let id = id.to_string();

    if status == 404 || error_type == "resource_not_found_exception" {
        return RollupError::JobNotFound(id);
    }
    match op {
        EngineOp::Put if status == 409 || error_type == "resource_already_exists_exception" => {
            RollupError::JobAlreadyExists(id)
        }
        EngineOp::Start if status == 409 || reason.contains("Cannot start task") => {
            RollupError::AlreadyStarted(id)
        }
        EngineOp::Delete if status == 409 || reason.contains("must be [STOPPED]") => {
            RollupError::JobStillRunning(id)
        }
        _ => RollupError::EngineUnavailable(format!(
            "{} of rollup job [{}] failed with HTTP {}: {}",
            op, id, status, reason
        )),
    }
}

/// 📡 A rollup engine reached over HTTP. Holds one pooled `reqwest::Client` for its whole life.
#[derive(Debug)]
pub struct ElasticsearchEngine {
    client: reqwest::Client,
    base: reqwest::Url,
    config: ElasticsearchEngineConfig,
}

impl ElasticsearchEngine {
    /// 🚀 Build the HTTP client and ping the cluster root, so a bad URL fails here
    /// and not halfway through someone's cleanup script.
    pub async fn new(config: ElasticsearchEngineConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            // -- 💀 the TLS stack wept. the architect shrugged.
            .context("💀 The HTTP client refused to be born. We tried to build a reqwest::Client and the universe said 'no'. Probably a missing TLS cert or a cursed system OpenSSL. Either way: tragic.")?;

        let base = reqwest::Url::parse(&config.url).with_context(|| {
            format!(
                "💀 '{}' is not a URL. It has the confidence of a URL, but not the scheme, host, or basic self-respect.",
                config.url
            )
        })?;
        if base.cannot_be_a_base() {
            anyhow::bail!(
                "💀 '{}' parses as a URL but cannot carry a path. Try something like http://localhost:9200.",
                config.url
            );
        }

        let engine = Self { client, base, config };

        // 📡 Connectivity ping: "Hello? Is this thing on?"
        let response = engine
            .authorize(engine.client.get(engine.base.clone()))
            .send()
            .await
            .with_context(|| {
                format!(
                    "💀 Reached out to the cluster at '{}' and got ghosted. Check the URL, check the firewall, check that the cluster is actually running.",
                    engine.config.url
                )
            })?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "💀 The cluster at '{}' answered the ping with '{}'. It's alive, but it does not like us. Check credentials.",
                engine.config.url,
                status
            );
        }
        debug!("✅ cluster at {} answered the ping, rollup engine ready", engine.config.url);
        Ok(engine)
    }

    /// 🧭 `{base}/_rollup/job/{id}[/{action}]`, with the id pushed as one percent-encoded
    /// segment. A `#`, `?` or `/` in an id stays in the id.
    fn job_url(&self, id: &str, action: Option<&str>) -> Result<reqwest::Url, RollupError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RollupError::Transport(format!(
                    "cluster url '{}' cannot carry a path for rollup job [{}]",
                    self.config.url, id
                ))
            })?;
            // -- one slash of difference. infinite suffering of difference.
            segments.pop_if_empty().extend(["_rollup", "job", id]);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    /// 🔒 API key wins over basic auth. This is not a democracy.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("ApiKey {}", api_key))
        } else if let Some(ref username) = self.config.username {
            request.basic_auth(username, self.config.password.as_ref())
        } else {
            request
        }
    }

    /// 📡 Send, read the body, and classify anything that isn't a 2xx.
    async fn execute(
        &self,
        op: EngineOp,
        id: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, RollupError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            RollupError::Transport(format!(
                "{} request for rollup job [{}] never made it to the cluster: {}",
                op, id, e
            ))
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            RollupError::Transport(format!(
                "{} response for rollup job [{}] could not be read: {}",
                op, id, e
            ))
        })?;

        if status.is_success() {
            trace!("📡 {} of rollup job [{}] answered {}", op, id, status);
            Ok(body)
        } else {
            let failure = classify_failure(op, id, status.as_u16(), &body);
            warn!("⚠️ {} of rollup job [{}] was refused: {}", op, id, failure);
            Err(failure)
        }
    }

    async fn execute_acknowledged(
        &self,
        op: EngineOp,
        id: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<(), RollupError> {
        let body = self.execute(op, id, request).await?;
        let ack: AckBody = serde_json::from_str(&body).map_err(|e| {
            RollupError::Transport(format!(
                "{} response for rollup job [{}] was not an acknowledgement: {}",
                op, id, e
            ))
        })?;
        if ack.acknowledged {
            Ok(())
        } else {
            Err(RollupError::EngineUnavailable(format!(
                "{} of rollup job [{}] was not acknowledged by the cluster",
                op, id
            )))
        }
    }
}

#[async_trait]
impl RollupEngine for ElasticsearchEngine {
    async fn put_job(&self, config: &RollupJobConfig) -> Result<(), RollupError> {
        // 📦 the id rides in the URL, the body carries everything else
        let mut body = serde_json::to_value(config).map_err(|e| {
            RollupError::Transport(format!(
                "rollup job [{}] could not be serialized: {}",
                config.id(),
                e
            ))
        })?;
        if let Some(fields) = body.as_object_mut() {
            fields.remove("id");
        }
        debug!("📥 creating rollup job [{}] on {}", config.id(), self.config.url);
        let request = self
            .client
            .put(self.job_url(config.id(), None)?)
            .header("Content-Type", "application/json")
            .body(body.to_string());
        self.execute_acknowledged(EngineOp::Put, config.id(), request)
            .await
    }

    async fn get_jobs(&self, selector: &Selector) -> Result<Vec<RollupJob>, RollupError> {
        let target = selector.as_path_segment();
        let request = self.client.get(self.job_url(target, None)?);
        let body = match self.execute(EngineOp::Get, target, request).await {
            Ok(body) => body,
            // -- some versions 404 an unknown id, others return an empty list. we normalize.
            Err(RollupError::JobNotFound(_)) => return Ok(Vec::new()),
            Err(other) => return Err(other),
        };
        let decoded: GetJobsBody = serde_json::from_str(&body).map_err(|e| {
            RollupError::Transport(format!(
                "get response for rollup job [{}] could not be decoded: {}",
                target, e
            ))
        })?;
        Ok(decoded.jobs)
    }

    async fn start_job(&self, id: &str) -> Result<(), RollupError> {
        let request = self.client.post(self.job_url(id, Some("_start"))?);
        self.execute_acknowledged(EngineOp::Start, id, request).await
    }

    async fn stop_job(&self, id: &str) -> Result<(), RollupError> {
        // -- 🛑 no wait_for_completion here: the lifecycle controller owns waiting
        let request = self.client.post(self.job_url(id, Some("_stop"))?);
        self.execute_acknowledged(EngineOp::Stop, id, request).await
    }

    async fn delete_job(&self, id: &str) -> Result<(), RollupError> {
        let request = self.client.delete(self.job_url(id, None)?);
        self.execute_acknowledged(EngineOp::Delete, id, request).await
    }
}
