//! 💀 Errors: the taxonomy of things that go wrong with rollup jobs.
//!
//! 🎬 *[a job is created twice. the engine sighs. a typed error is born.]*
//!
//! The library speaks `RollupError`, a closed set of failure kinds a caller can
//! `match` on. The binary (and config loading) speaks `anyhow`, same as ever,
//! because a human reading a context chain at 3am does not need an enum.
//!
//! 🧠 Knowledge graph:
//! - `ValidationError`: produced by `RollupJobConfig::build`, never leaves the client.
//! - Everything else is produced by an engine backend or the lifecycle controller.
//! - `Cancelled` and `NoRuntime` only ever reach an `ActionListener::on_failure`. 🦆

use std::time::Duration;

/// 📋 A rejected job configuration, with every problem we found (not just the first one).
///
/// Collecting them all is a kindness. Nobody wants to fix one typo, resubmit,
/// and discover the next typo. That's not validation, that's a scavenger hunt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .problems.join("; "))]
pub struct ValidationError {
    problems: Vec<String>,
}

impl ValidationError {
    pub(crate) fn from_problems(problems: Vec<String>) -> Self {
        Self { problems }
    }

    /// 📜 Every complaint, in the order it was noticed.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }
}

/// 🏷️ Every way a rollup job operation can fail.
///
/// Engine-reported failures pass through typed. Nothing here is swallowed;
/// if a caller wants best-effort cleanup that ignores `JobNotFound`, that is
/// the caller's policy to write, not ours.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RollupError {
    /// 📋 The configuration was malformed. Caught before any engine call.
    #[error("💀 rollup job configuration rejected: {0}")]
    Validation(#[from] ValidationError),

    /// 🔍 No job with this id exists. We looked. Under the couch, too.
    #[error("💀 rollup job [{0}] not found")]
    JobNotFound(String),

    /// 👯 A job with this id already exists and we refuse to clobber it.
    #[error("💀 rollup job [{0}] already exists")]
    JobAlreadyExists(String),

    /// 🏃 Start was asked of a job that is not stopped.
    #[error("💀 rollup job [{0}] is already started")]
    AlreadyStarted(String),

    /// 🛑 Delete was asked of a job that is not stopped. Stop it first.
    #[error("💀 rollup job [{0}] must be stopped before it can be deleted")]
    JobStillRunning(String),

    /// ⏳ Waited for the job to stop. It did not. The job state was left alone.
    #[error("💀 timed out after {waited:?} waiting for rollup job [{id}] to stop")]
    Timeout { id: String, waited: Duration },

    /// 🔥 The engine answered, and the answer was "no" in a way we can't classify.
    #[error("💀 rollup engine unavailable: {0}")]
    EngineUnavailable(String),

    /// 📡 The request never made it there (or the answer never made sense).
    #[error("💀 transport failure talking to the rollup engine: {0}")]
    Transport(String),

    /// 🚫 The caller cancelled the async operation before it completed.
    #[error("💀 operation cancelled by the caller")]
    Cancelled,

    /// 🧵 An async form was called with no tokio runtime to run it on.
    #[error("💀 no tokio runtime to run the operation on; build the client inside one or hand it a runtime handle")]
    NoRuntime,
}

impl RollupError {
    /// 🔍 Convenience for the classic "ignore 404s, someone raced us to it" cleanup path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RollupError::JobNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_every_problem_gets_its_moment_in_the_message() {
        let the_error = ValidationError::from_problems(vec![
            "id must not be blank".to_string(),
            "page_size must be greater than 0".to_string(),
        ]);
        assert_eq!(the_error.problems().len(), 2);
        assert_eq!(
            the_error.to_string(),
            "id must not be blank; page_size must be greater than 0"
        );
    }

    #[test]
    fn the_one_where_validation_errors_wrap_into_the_big_enum() {
        let the_grievances = ValidationError::from_problems(vec!["cron must not be blank".to_string()]);
        let the_rollup_error: RollupError = the_grievances.into();
        assert!(matches!(the_rollup_error, RollupError::Validation(_)));
        assert!(the_rollup_error.to_string().contains("cron must not be blank"));
        assert!(!the_rollup_error.is_not_found());
        assert!(RollupError::JobNotFound("job_1".into()).is_not_found());
    }

    #[test]
    fn the_one_where_timeouts_say_how_long_we_waited() {
        let the_error = RollupError::Timeout {
            id: "job_1".into(),
            waited: Duration::from_millis(1),
        };
        assert_eq!(
            the_error.to_string(),
            "💀 timed out after 1ms waiting for rollup job [job_1] to stop"
        );
    }
}
