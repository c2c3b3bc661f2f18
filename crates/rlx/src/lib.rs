//! 🗜️ rlx: a client for rollup jobs. Create them, start them, stop them, delete
//! them, and ask which index patterns they roll up with which aggregations.
//!
//! 🎬 *[eleven terabytes of metrics walk into a bar. they leave as forty gigabytes of hourly buckets.]* 🦆
//!
//! 🧠 Knowledge graph:
//! - `job_config`: validated, immutable job configuration (the bouncer).
//! - `lifecycle`: create/start/stop/delete/get over an engine.
//! - `capabilities`: per-index-pattern aggregation caps, derived on demand.
//! - `client`: the facade, each operation awaitable or fire-and-callback.
//! - `backends`: the engine contract, in RAM or over HTTP to Elasticsearch.

pub mod app_config;
pub mod backends;
pub mod capabilities;
pub mod client;
pub mod error;
pub mod job_config;
pub mod job_status;
pub mod lifecycle;
pub mod listener;
pub mod selector;
pub mod time_value;

pub use client::RollupClient;
pub use error::{RollupError, ValidationError};
pub use job_config::{RollupJobConfig, RollupJobSpec};
pub use job_status::{JobState, JobStats, JobStatus, RollupJob};
pub use selector::Selector;
