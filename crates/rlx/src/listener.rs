//! 📞 Listeners: fire-and-forget calls that still call you back. Exactly once.
//!
//! 🎬 *[the caller hands over a request and walks away. the task runs. the engine answers.]*
//! 🎬 *[or the caller cancels. or the task panics. or the runtime shuts down mid-flight.]*
//! 🎬 *[in every timeline, the phone rings exactly once.]* 🦆
//!
//! The single-fire promise is held by `ListenerGuard`: it owns the listener, hands
//! it the outcome when the work finishes, and if it is dropped before that (panic,
//! abort, runtime teardown) it fires `on_failure(RollupError::Cancelled)` on the way
//! out. `Cancellable` is the caller's end: cancel the local wait, or join the task.
//! Cancelling stops *our* waiting. Whatever the engine already accepted, it keeps.

use std::future::Future;
use std::marker::PhantomData;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::RollupError;

/// 📞 Receives the outcome of one async operation. Consumed by whichever call fires.
pub trait ActionListener<T>: Send + 'static {
    fn on_response(self: Box<Self>, response: T);
    fn on_failure(self: Box<Self>, error: RollupError);
}

/// 🧩 A listener made of two closures.
pub struct FnListener<T, R, F> {
    on_response: R,
    on_failure: F,
    _response: PhantomData<fn(T)>,
}

impl<T, R, F> ActionListener<T> for FnListener<T, R, F>
where
    T: 'static,
    R: FnOnce(T) + Send + 'static,
    F: FnOnce(RollupError) + Send + 'static,
{
    fn on_response(self: Box<Self>, response: T) {
        (self.on_response)(response)
    }

    fn on_failure(self: Box<Self>, error: RollupError) {
        (self.on_failure)(error)
    }
}

pub fn from_fns<T, R, F>(on_response: R, on_failure: F) -> FnListener<T, R, F>
where
    R: FnOnce(T) + Send + 'static,
    F: FnOnce(RollupError) + Send + 'static,
{
    FnListener {
        on_response,
        on_failure,
        _response: PhantomData,
    }
}

/// 📬 A listener that drops the outcome into a oneshot channel.
#[derive(Debug)]
pub struct ChannelListener<T> {
    sender: oneshot::Sender<Result<T, RollupError>>,
}

impl<T: Send + 'static> ActionListener<T> for ChannelListener<T> {
    fn on_response(self: Box<Self>, response: T) {
        // -- nobody listening anymore is not our problem to report
        let _ = self.sender.send(Ok(response));
    }

    fn on_failure(self: Box<Self>, error: RollupError) {
        let _ = self.sender.send(Err(error));
    }
}

/// 📬 Listener + the receiver that will hold its one and only outcome.
pub fn channel<T>() -> (ChannelListener<T>, oneshot::Receiver<Result<T, RollupError>>) {
    let (sender, receiver) = oneshot::channel();
    (ChannelListener { sender }, receiver)
}

/// 🔒 Owns a listener until it fires. Dropping it unfired means cancellation.
pub(crate) struct ListenerGuard<T: 'static> {
    listener: Option<Box<dyn ActionListener<T>>>,
}

impl<T: 'static> ListenerGuard<T> {
    pub(crate) fn new(listener: Box<dyn ActionListener<T>>) -> Self {
        Self {
            listener: Some(listener),
        }
    }

    pub(crate) fn complete(mut self, outcome: Result<T, RollupError>) {
        if let Some(listener) = self.listener.take() {
            match outcome {
                Ok(response) => listener.on_response(response),
                Err(error) => listener.on_failure(error),
            }
        }
    }
}

impl<T: 'static> Drop for ListenerGuard<T> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            trace!("📞 listener dropped before completion, reporting cancellation");
            listener.on_failure(RollupError::Cancelled);
        }
    }
}

/// 🚫 The caller's handle on an in-flight async operation.
#[derive(Debug)]
pub struct Cancellable {
    token: CancellationToken,
    // -- None when there was no runtime to spawn on; the listener already heard about it
    handle: Option<JoinHandle<()>>,
}

impl Cancellable {
    /// 🚫 Stop waiting. The listener gets `Cancelled` unless it already fired.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// ⏳ Wait until the listener has fired. A panicked task still counts as done.
    pub async fn join(self) {
        let Some(handle) = self.handle else {
            return;
        };
        if let Err(join_error) = handle.await {
            warn!("💀 async rollup operation task ended abnormally: {}", join_error);
        }
    }
}

/// 🚀 Run `operation` and deliver its outcome to `listener`, once.
///
/// Spawns on `runtime` when given, else on whatever runtime the caller is inside.
/// With neither, nothing runs and the listener gets `NoRuntime` before this returns.
pub(crate) fn spawn_with_listener<T, Fut, L>(
    runtime: Option<&Handle>,
    operation: Fut,
    listener: L,
) -> Cancellable
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, RollupError>> + Send + 'static,
    L: ActionListener<T>,
{
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let guard = ListenerGuard::new(Box::new(listener));
    let Some(runtime) = runtime.cloned().or_else(|| Handle::try_current().ok()) else {
        warn!("🧵 async rollup operation called outside any tokio runtime");
        guard.complete(Err(RollupError::NoRuntime));
        return Cancellable {
            token,
            handle: None,
        };
    };
    let handle = runtime.spawn(async move {
        let outcome = tokio::select! {
            biased;
            _ = cancelled.cancelled() => Err(RollupError::Cancelled),
            result = operation => result,
        };
        guard.complete(outcome);
    });
    Cancellable {
        token,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Tally {
        responses: AtomicUsize,
        failures: AtomicUsize,
    }

    fn the_counting_listener(tally: &Arc<Tally>) -> impl ActionListener<u32> {
        let on_ok = Arc::clone(tally);
        let on_err = Arc::clone(tally);
        from_fns(
            move |_: u32| {
                on_ok.responses.fetch_add(1, Ordering::SeqCst);
            },
            move |_: RollupError| {
                on_err.failures.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    fn explode() -> Result<u32, RollupError> {
        panic!("💥 the operation blew up mid-flight")
    }

    #[tokio::test]
    async fn the_one_where_the_answer_arrives_by_channel() {
        let (the_listener, the_mailbox) = channel();
        let the_call = spawn_with_listener(None, async { Ok::<u32, RollupError>(42) }, the_listener);
        assert_eq!(the_mailbox.await.unwrap(), Ok(42));
        the_call.join().await;
    }

    #[tokio::test]
    async fn the_one_where_failures_are_delivered_not_thrown() {
        let (the_listener, the_mailbox) = channel::<u32>();
        spawn_with_listener(
            None,
            async { Err(RollupError::JobNotFound("ghost".into())) },
            the_listener,
        );
        assert_eq!(
            the_mailbox.await.unwrap(),
            Err(RollupError::JobNotFound("ghost".into()))
        );
    }

    #[tokio::test]
    async fn the_one_where_cancelling_still_rings_the_phone_once() {
        let the_tally = Arc::new(Tally::default());
        let the_call = spawn_with_listener(
            None,
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(1)
            },
            the_counting_listener(&the_tally),
        );
        the_call.cancel();
        assert!(the_call.is_cancelled());
        the_call.join().await;

        assert_eq!(the_tally.responses.load(Ordering::SeqCst), 0);
        assert_eq!(the_tally.failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn the_one_where_cancelling_after_the_fact_changes_nothing() {
        let the_tally = Arc::new(Tally::default());
        let the_call = spawn_with_listener(None, async { Ok(7) }, the_counting_listener(&the_tally));
        while !the_call.is_finished() {
            tokio::task::yield_now().await;
        }
        the_call.cancel();
        the_call.join().await;

        assert_eq!(the_tally.responses.load(Ordering::SeqCst), 1);
        assert_eq!(the_tally.failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn the_one_where_a_panicking_task_reports_cancelled() {
        let (the_listener, the_mailbox) = channel::<u32>();
        let the_call = spawn_with_listener(None, async { explode() }, the_listener);
        assert_eq!(the_mailbox.await.unwrap(), Err(RollupError::Cancelled));
        the_call.join().await;
    }

    #[tokio::test]
    async fn the_one_where_walking_away_does_not_cancel_anything() {
        let (the_listener, the_mailbox) = channel();
        drop(spawn_with_listener(
            None,
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<&'static str, RollupError>("still delivered")
            },
            the_listener,
        ));
        assert_eq!(the_mailbox.await.unwrap(), Ok("still delivered"));
    }

    #[test]
    fn the_one_where_there_is_no_runtime_and_the_phone_still_rings() {
        let (the_listener, mut the_mailbox) = channel::<u32>();
        let the_call = spawn_with_listener(None, async { Ok(1) }, the_listener);
        assert!(the_call.is_finished());
        assert_eq!(the_mailbox.try_recv().unwrap(), Err(RollupError::NoRuntime));
    }

    #[test]
    fn the_one_where_a_borrowed_runtime_does_the_work() {
        let the_runtime = tokio::runtime::Runtime::new().unwrap();
        let (the_listener, the_mailbox) = channel();
        spawn_with_listener(
            Some(the_runtime.handle()),
            async { Ok::<u32, RollupError>(42) },
            the_listener,
        );
        assert_eq!(the_mailbox.blocking_recv().unwrap(), Ok(42));
    }

    #[test]
    fn the_one_where_an_unfired_guard_cancels_on_drop() {
        let (the_listener, mut the_mailbox) = channel::<u32>();
        drop(ListenerGuard::new(Box::new(the_listener)));
        assert_eq!(the_mailbox.try_recv().unwrap(), Err(RollupError::Cancelled));
    }
}
