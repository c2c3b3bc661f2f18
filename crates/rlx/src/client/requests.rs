//! 📨 Requests and responses: the envelopes the client passes around.
//!
//! Each request carries exactly what its engine call needs and nothing more.
//! No validation lives here; a `PutRollupJobRequest` can only be made from a
//! config that already passed `RollupJobConfig::build`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capabilities::RollableIndexCaps;
use crate::error::ValidationError;
use crate::job_config::{RollupJobConfig, RollupJobSpec};
use crate::job_status::RollupJob;
use crate::selector::Selector;

/// 📥 Create a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRollupJobRequest {
    config: RollupJobConfig,
}

impl PutRollupJobRequest {
    pub fn new(config: RollupJobConfig) -> Self {
        Self { config }
    }

    /// 📝 Validate a draft into a request in one go.
    pub fn from_spec(spec: RollupJobSpec) -> Result<Self, ValidationError> {
        RollupJobConfig::build(spec).map(Self::new)
    }

    pub fn config(&self) -> &RollupJobConfig {
        &self.config
    }
}

/// 🔍 Fetch one job, or all of them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetRollupJobRequest {
    selector: Selector,
}

impl GetRollupJobRequest {
    /// `"_all"`, `"*"` and `""` ask for every job.
    pub fn new(id: &str) -> Self {
        Self {
            selector: Selector::parse(id),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRollupJobRequest {
    id: String,
}

impl StartRollupJobRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// 🛑 Stop a job, optionally waiting until it really has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopRollupJobRequest {
    id: String,
    wait_for_completion: bool,
    timeout: Option<Duration>,
}

impl StopRollupJobRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            wait_for_completion: false,
            timeout: None,
        }
    }

    pub fn wait_for_completion(mut self, wait: bool) -> Self {
        self.wait_for_completion = wait;
        self
    }

    /// ⏳ Only meaningful with `wait_for_completion`. `None` means the configured default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn waits_for_completion(&self) -> bool {
        self.wait_for_completion
    }

    pub fn timeout_budget(&self) -> Option<Duration> {
        self.timeout
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRollupJobRequest {
    id: String,
}

impl DeleteRollupJobRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// 🗺️ Capabilities for one index pattern, or for every pattern with a job on it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetRollupCapsRequest {
    index_pattern: Selector,
}

impl GetRollupCapsRequest {
    pub fn new(index_pattern: &str) -> Self {
        Self {
            index_pattern: Selector::parse(index_pattern),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn index_pattern(&self) -> &Selector {
        &self.index_pattern
    }
}

/// ✅ The engine said yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgedResponse {
    pub acknowledged: bool,
}

impl AcknowledgedResponse {
    pub fn acknowledged() -> Self {
        Self { acknowledged: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetRollupJobResponse {
    pub jobs: Vec<RollupJob>,
}

/// 🗺️ Keyed by index pattern, same shape as the engine's `_rollup/data` answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GetRollupCapsResponse {
    pub caps: BTreeMap<String, RollableIndexCaps>,
}
