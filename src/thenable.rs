//! Promise-like results
//!
//! A handler may hand back a result that is not available yet. Anything that
//! can be subscribed to for its eventual success or failure is a [`Thenable`].
//! Two implementations are provided:
//!
//! - [`FutureThenable`]: any `Send + 'static` future, driven on a tokio task
//! - [`Promise`]: a handle settled by hand through its [`Resolver`]
//!
//! Subscribers always run on a tokio task, never inside the call that
//! subscribed them, so a runtime must be available when [`Thenable::then`] is
//! called.

use crate::reply::{NoContinue, Reply};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use tokio::sync::oneshot;
use tracing::trace;

/// Subscriber invoked once a promise-like value settles.
///
/// `Ok` carries the resolved reply, `Err` the rejection reason.
pub type Settle<T, E> = Box<dyn FnOnce(Result<Reply<T>, E>) + Send>;

/// A value that settles later, exactly once, with a reply or a rejection
pub trait Thenable<T, E>: Send {
    /// Subscribe to the eventual outcome.
    ///
    /// Implementations must invoke `on_settle` at most once and never before
    /// `then` has returned. An implementation that never settles drops the
    /// subscriber without invoking it.
    fn then(self: Box<Self>, on_settle: Settle<T, E>);
}

/// What a handler returns when it does not fail synchronously
pub enum Returned<T, E> {
    /// The result is available now
    Immediate(Reply<T>),
    /// The result arrives later
    Deferred(Box<dyn Thenable<T, E>>),
}

impl<T, E> Returned<T, E> {
    pub fn value(value: T) -> Self {
        Returned::Immediate(Reply::Value(value))
    }

    pub fn deferred(thenable: impl Thenable<T, E> + 'static) -> Self {
        Returned::Deferred(Box::new(thenable))
    }

    /// Defer to a future, which starts running once something subscribes.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Reply<T>, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        Returned::Deferred(Box::new(FutureThenable::new(future)))
    }

    pub fn is_promise_like(&self) -> bool {
        matches!(self, Returned::Deferred(_))
    }
}

impl<T, E> From<Reply<T>> for Returned<T, E> {
    fn from(reply: Reply<T>) -> Self {
        Returned::Immediate(reply)
    }
}

impl<T, E> From<NoContinue> for Returned<T, E> {
    fn from(_: NoContinue) -> Self {
        Returned::Immediate(Reply::NoContinue)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Returned<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Returned::Immediate(reply) => f.debug_tuple("Immediate").field(reply).finish(),
            Returned::Deferred(_) => f.debug_tuple("Deferred").field(&"<thenable>").finish(),
        }
    }
}

/// A future subscribed to as a promise-like value
pub struct FutureThenable<T, E> {
    future: BoxFuture<'static, Result<Reply<T>, E>>,
}

impl<T, E> FutureThenable<T, E> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<Reply<T>, E>> + Send + 'static,
    {
        Self {
            future: future.boxed(),
        }
    }
}

impl<T, E> Thenable<T, E> for FutureThenable<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn then(self: Box<Self>, on_settle: Settle<T, E>) {
        let future = self.future;
        tokio::spawn(async move {
            on_settle(future.await);
        });
    }
}

/// A promise-like value settled by its [`Resolver`]
pub struct Promise<T, E> {
    settled: oneshot::Receiver<Result<Reply<T>, E>>,
}

/// The settling half of a [`Promise`]
pub struct Resolver<T, E> {
    settle: oneshot::Sender<Result<Reply<T>, E>>,
}

impl<T, E> Promise<T, E> {
    /// A promise that settles when its resolver is used.
    ///
    /// Dropping the resolver unused leaves the promise pending forever.
    pub fn pending() -> (Resolver<T, E>, Self) {
        let (settle, settled) = oneshot::channel();
        (Resolver { settle }, Promise { settled })
    }

    pub fn resolved(reply: Reply<T>) -> Self {
        let (resolver, promise) = Self::pending();
        resolver.settle(Ok(reply));
        promise
    }

    pub fn rejected(error: E) -> Self {
        let (resolver, promise) = Self::pending();
        resolver.reject(error);
        promise
    }
}

impl<T, E> Resolver<T, E> {
    /// Settle the promise. Returns `false` if nobody holds the promise anymore.
    pub fn settle(self, outcome: Result<Reply<T>, E>) -> bool {
        self.settle.send(outcome).is_ok()
    }

    pub fn resolve(self, value: T) -> bool {
        self.settle(Ok(Reply::Value(value)))
    }

    pub fn no_continue(self) -> bool {
        self.settle(Ok(Reply::NoContinue))
    }

    pub fn reject(self, error: E) -> bool {
        self.settle(Err(error))
    }
}

impl<T, E> Thenable<T, E> for Promise<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn then(self: Box<Self>, on_settle: Settle<T, E>) {
        let settled = self.settled;
        tokio::spawn(async move {
            match settled.await {
                Ok(outcome) => on_settle(outcome),
                Err(_) => trace!("Promise abandoned by its resolver, subscriber dropped"),
            }
        });
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").finish_non_exhaustive()
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}
