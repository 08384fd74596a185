//! Single-assignment futures
//!
//! A [`Promise`] is the write side and a [`TaskFuture`] the read side of a
//! value that is produced exactly once, usually on a worker thread. The read
//! side can block ([`TaskFuture::wait`]), register a completion observer
//! ([`TaskFuture::on_complete`]) or be `.await`ed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};
use std::fmt;
use parking_lot::{Condvar, Mutex};

use crate::engines::{EngineError, EngineResult};

type Callback<T> = Box<dyn FnOnce(EngineResult<T>) + Send>;
type SharedCallback<T> = Box<dyn FnOnce(&EngineResult<T>) + Send>;

struct Slot<T> {
    result: Option<EngineResult<T>>,
    callback: Option<Callback<T>>,
    waker: Option<Waker>,
}

struct State<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> State<T> {
    fn new(result: Option<EngineResult<T>>) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot {
                result,
                callback: None,
                waker: None,
            }),
            ready: Condvar::new(),
        })
    }

    fn complete(&self, result: EngineResult<T>) {
        let mut slot = self.slot.lock();

        // An observer takes the value directly; nobody else can read it
        if let Some(callback) = slot.callback.take() {
            drop(slot);
            callback(result);
            return;
        }

        slot.result = Some(result);
        let waker = slot.waker.take();
        drop(slot);

        self.ready.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// Create an unfulfilled promise and the future it will resolve
pub fn promise<T>() -> (Promise<T>, TaskFuture<T>) {
    let state = State::new(None);
    (
        Promise {
            state: Some(Arc::clone(&state)),
        },
        TaskFuture { state },
    )
}

/// Write side of a [`TaskFuture`]
///
/// Fulfilling consumes the promise, so a future is resolved at most once.
/// A promise dropped without being fulfilled resolves its future with
/// [`EngineError::Abandoned`].
pub struct Promise<T> {
    state: Option<Arc<State<T>>>,
}

impl<T> Promise<T> {
    /// Resolve the future with the given outcome
    pub fn fulfill(mut self, result: EngineResult<T>) {
        if let Some(state) = self.state.take() {
            state.complete(result);
        }
    }

    /// Resolve the future with a value
    pub fn succeed(self, value: T) {
        self.fulfill(Ok(value));
    }

    /// Resolve the future with an error
    pub fn fail(self, err: EngineError) {
        self.fulfill(Err(err));
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.complete(Err(EngineError::Abandoned));
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").finish_non_exhaustive()
    }
}

/// Handle to a value that becomes available once
pub struct TaskFuture<T> {
    state: Arc<State<T>>,
}

impl<T> TaskFuture<T> {
    /// A future that is already resolved
    pub fn ready(result: EngineResult<T>) -> Self {
        Self {
            state: State::new(Some(result)),
        }
    }

    /// Check whether the outcome is available without blocking
    pub fn is_ready(&self) -> bool {
        self.state.slot.lock().result.is_some()
    }

    /// Block the calling thread until the outcome is available
    pub fn wait(self) -> EngineResult<T> {
        let mut slot = self.state.slot.lock();
        loop {
            if let Some(result) = slot.result.take() {
                return result;
            }
            self.state.ready.wait(&mut slot);
        }
    }

    /// Block for at most `timeout`; hands the future back if it is still pending
    ///
    /// A timeout too large to express as a deadline waits without a bound.
    pub fn wait_timeout(self, timeout: Duration) -> Result<EngineResult<T>, Self> {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return Ok(self.wait()),
        };
        let outcome = {
            let mut slot = self.state.slot.lock();
            loop {
                if let Some(result) = slot.result.take() {
                    break Some(result);
                }
                if self.state.ready.wait_until(&mut slot, deadline).timed_out() {
                    break slot.result.take();
                }
            }
        };

        match outcome {
            Some(result) => Ok(result),
            None => Err(self),
        }
    }
}

impl<T: Send + 'static> TaskFuture<T> {
    /// Run `observer` exactly once with the outcome
    ///
    /// The observer runs on the thread that fulfills the promise, or inline
    /// when the future is already resolved.
    pub fn on_complete<F>(self, observer: F)
    where
        F: FnOnce(EngineResult<T>) + Send + 'static,
    {
        let mut slot = self.state.slot.lock();
        match slot.result.take() {
            Some(result) => {
                drop(slot);
                observer(result);
            }
            None => slot.callback = Some(Box::new(observer)),
        }
    }

    /// Transform the success value
    pub fn map<U, F>(self, f: F) -> TaskFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let (promise, future) = promise();
        self.on_complete(move |result| promise.fulfill(result.map(f)));
        future
    }

    /// Chain a fallible step onto the success value
    pub fn and_then<U, F>(self, f: F) -> TaskFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> EngineResult<U> + Send + 'static,
    {
        let (promise, future) = promise();
        self.on_complete(move |result| promise.fulfill(result.and_then(f)));
        future
    }

    /// Convert into a handle that any number of observers can read
    pub fn shared(self) -> SharedFuture<T>
    where
        T: Clone,
    {
        let state = Arc::new(SharedState {
            slot: Mutex::new(SharedSlot {
                result: None,
                observers: Vec::new(),
            }),
            ready: Condvar::new(),
        });

        let sink = Arc::clone(&state);
        self.on_complete(move |result| {
            let observers = {
                let mut slot = sink.slot.lock();
                slot.result = Some(result.clone());
                std::mem::take(&mut slot.observers)
            };
            sink.ready.notify_all();
            for observer in observers {
                observer(&result);
            }
        });

        SharedFuture { state }
    }
}

impl<T: Send + 'static> TaskFuture<TaskFuture<T>> {
    /// Resolve when the inner future resolves
    pub fn flatten(self) -> TaskFuture<T> {
        let (promise, future) = promise();
        self.on_complete(move |outer| match outer {
            Ok(inner) => inner.on_complete(move |result| promise.fulfill(result)),
            Err(err) => promise.fail(err),
        });
        future
    }
}

impl<T> Future for TaskFuture<T> {
    type Output = EngineResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.state.slot.lock();
        match slot.result.take() {
            Some(result) => Poll::Ready(result),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<T> fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}

struct SharedSlot<T> {
    result: Option<EngineResult<T>>,
    observers: Vec<SharedCallback<T>>,
}

struct SharedState<T> {
    slot: Mutex<SharedSlot<T>>,
    ready: Condvar,
}

/// Clonable read side of a future whose value is `Clone`
pub struct SharedFuture<T> {
    state: Arc<SharedState<T>>,
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone> SharedFuture<T> {
    pub fn is_ready(&self) -> bool {
        self.state.slot.lock().result.is_some()
    }

    /// Block until the outcome is available and return a copy of it
    pub fn wait(&self) -> EngineResult<T> {
        let mut slot = self.state.slot.lock();
        loop {
            if let Some(result) = slot.result.as_ref() {
                return result.clone();
            }
            self.state.ready.wait(&mut slot);
        }
    }

    /// Run `observer` once with the outcome
    pub fn on_complete<F>(&self, observer: F)
    where
        F: FnOnce(&EngineResult<T>) + Send + 'static,
    {
        let mut slot = self.state.slot.lock();
        match slot.result.clone() {
            Some(result) => {
                drop(slot);
                observer(&result);
            }
            None => slot.observers.push(Box::new(observer)),
        }
    }
}

impl<T> fmt::Debug for SharedFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFuture")
            .field("ready", &self.state.slot.lock().result.is_some())
            .finish()
    }
}

struct JoinState<T> {
    results: Vec<Option<EngineResult<T>>>,
    remaining: usize,
    promise: Option<Promise<Vec<EngineResult<T>>>>,
}

/// Resolve once every input future reached a terminal state
///
/// The output keeps the input positions, so the caller can decide which
/// failure to report. An empty input resolves immediately.
pub fn join_all<T: Send + 'static>(futures: Vec<TaskFuture<T>>) -> TaskFuture<Vec<EngineResult<T>>> {
    if futures.is_empty() {
        return TaskFuture::ready(Ok(Vec::new()));
    }

    let (promise, joined) = promise();
    let state = Arc::new(Mutex::new(JoinState {
        results: futures.iter().map(|_| None).collect(),
        remaining: futures.len(),
        promise: Some(promise),
    }));

    for (idx, future) in futures.into_iter().enumerate() {
        let state = Arc::clone(&state);
        future.on_complete(move |result| {
            let finished = {
                let mut guard = state.lock();
                guard.results[idx] = Some(result);
                guard.remaining -= 1;
                if guard.remaining == 0 {
                    let results = std::mem::take(&mut guard.results);
                    guard.promise.take().map(|promise| (promise, results))
                } else {
                    None
                }
            };

            if let Some((promise, results)) = finished {
                let results = results
                    .into_iter()
                    .map(|result| result.unwrap_or(Err(EngineError::Abandoned)))
                    .collect();
                promise.succeed(results);
            }
        });
    }

    joined
}
