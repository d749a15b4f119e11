//! The error-first continuation
//!
//! Middleware chains hand each stage a `next` callback that takes an optional
//! error and an optional result. [`Next`] is that callback. It is consumed when
//! invoked, so it can fire at most once.

use std::fmt;
use tokio::sync::oneshot;

/// A one-shot continuation receiving either an error or a result
pub struct Next<T, E> {
    callback: Box<dyn FnOnce(Result<T, E>) + Send>,
}

impl<T, E> Next<T, E> {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Build a continuation from an `(error, result)` callback.
    ///
    /// Exactly one of the two arguments is populated: the error on failure, the
    /// result on success.
    pub fn error_first<F>(callback: F) -> Self
    where
        F: FnOnce(Option<E>, Option<T>) + Send + 'static,
    {
        Self::new(move |outcome| match outcome {
            Ok(value) => callback(None, Some(value)),
            Err(error) => callback(Some(error), None),
        })
    }

    /// A continuation that forwards its outcome over a oneshot channel.
    ///
    /// If the continuation is dropped without being invoked the receiver
    /// resolves to `Err(RecvError)`.
    pub fn channel() -> (Self, oneshot::Receiver<Result<T, E>>)
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let next = Self::new(move |outcome| {
            // The receiver may have gone away; nothing left to notify then.
            let _ = tx.send(outcome);
        });
        (next, rx)
    }

    pub fn call(self, outcome: Result<T, E>) {
        (self.callback)(outcome)
    }

    pub fn resolve(self, value: T) {
        self.call(Ok(value))
    }

    pub fn reject(self, error: E) {
        self.call(Err(error))
    }
}

impl<T, E> fmt::Debug for Next<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("callback", &"<closure>")
            .finish()
    }
}
