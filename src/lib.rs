//! Asyncback - adapt handlers to the error-first continuation convention
//!
//! Middleware chains invoke each stage with some arguments followed by a
//! `next` continuation, which must be called exactly once with either an error
//! or a result. This library turns a handler that returns a value, returns a
//! promise-like value, or fails, into a callable following that convention.
//!
//! ```
//! use asyncback::{Arg, Next, Returned, asyncback, values};
//!
//! let adapter = asyncback(|args: Vec<Arg<u32, String>>| -> Result<Returned<u32, String>, String> {
//!     let sum = args.iter().filter_map(Arg::as_value).sum();
//!     Ok(Returned::value(sum))
//! });
//!
//! let mut args = values([1, 2, 3]);
//! args.push(Next::error_first(|err: Option<String>, sum: Option<u32>| {
//!     assert_eq!(err, None);
//!     assert_eq!(sum, Some(6));
//! }).into());
//! adapter.apply(args).unwrap();
//! ```
//!
//! A handler that has already produced its response can stop the chain by
//! returning [`NO_CONTINUE`]; the continuation is then never invoked.

pub mod adapter;
pub mod arg;
pub mod errors;
pub mod handler;
pub mod next;
pub mod reply;
pub mod thenable;

pub use adapter::Asyncback;
pub use arg::{Arg, values};
pub use errors::AdapterError;
pub use handler::{AsyncHandler, Handler, SharedHandler};
pub use next::Next;
pub use reply::{NO_CONTINUE, NoContinue, Reply};
pub use thenable::{FutureThenable, Promise, Resolver, Returned, Settle, Thenable};

use std::future::Future;

/// Adapt a handler to the error-first continuation convention.
pub fn asyncback<H, T, E>(handler: H) -> Asyncback<H, T, E>
where
    H: Handler<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    Asyncback::builder().handler(handler).build()
}

/// Adapt an `async` closure.
///
/// The closure is called synchronously on every invocation; its future is
/// driven on the tokio runtime and settles the continuation.
pub fn asyncback_async<F, Fut, T, E>(f: F) -> Asyncback<AsyncHandler<F>, T, E>
where
    F: Fn(Vec<Arg<T, E>>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Reply<T>, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    asyncback(AsyncHandler::new(f))
}
