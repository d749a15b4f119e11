//! Wrapped handlers
//!
//! A [`Handler`] is the function being adapted. It receives the call arguments
//! (without the continuation) and either fails synchronously, returns a reply
//! right away, or returns a promise-like value.
//!
//! Closures of the right shape are handlers already. [`AsyncHandler`] adapts
//! `async` closures, and [`SharedHandler`] erases the handler type so handlers
//! of different kinds can be stored together.

use crate::arg::Arg;
use crate::reply::Reply;
use crate::thenable::Returned;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The function wrapped by an adapter
pub trait Handler<T, E>: Send + Sync {
    fn handle(&self, args: Vec<Arg<T, E>>) -> Result<Returned<T, E>, E>;
}

impl<F, T, E> Handler<T, E> for F
where
    F: Fn(Vec<Arg<T, E>>) -> Result<Returned<T, E>, E> + Send + Sync,
{
    fn handle(&self, args: Vec<Arg<T, E>>) -> Result<Returned<T, E>, E> {
        self(args)
    }
}

/// Handler built from an `async` closure.
///
/// The closure runs synchronously and its future becomes a deferred result, so
/// every failure surfaces as a rejection rather than a synchronous error.
#[derive(Clone)]
pub struct AsyncHandler<F> {
    f: F,
}

impl<F> AsyncHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut, T, E> Handler<T, E> for AsyncHandler<F>
where
    F: Fn(Vec<Arg<T, E>>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Reply<T>, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn handle(&self, args: Vec<Arg<T, E>>) -> Result<Returned<T, E>, E> {
        Ok(Returned::future((self.f)(args)))
    }
}

impl<F> fmt::Debug for AsyncHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncHandler")
            .field("f", &"<closure>")
            .finish()
    }
}

/// A type-erased, cheaply clonable handler
pub struct SharedHandler<T, E> {
    inner: Arc<dyn Handler<T, E>>,
}

impl<T, E> SharedHandler<T, E> {
    pub fn new(handler: impl Handler<T, E> + 'static) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }
}

impl<T, E> Clone for SharedHandler<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> Handler<T, E> for SharedHandler<T, E> {
    fn handle(&self, args: Vec<Arg<T, E>>) -> Result<Returned<T, E>, E> {
        self.inner.handle(args)
    }
}

impl<T, E> fmt::Debug for SharedHandler<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedHandler").finish_non_exhaustive()
    }
}
