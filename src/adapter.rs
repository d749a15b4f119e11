//! The adapter and its per-call dispatch protocol
//!
//! Every call goes through one of these paths:
//!
//! ```text
//! START -> no continuation   -> CALL_DIRECT
//!       -> has continuation  -> INVOKING -> threw            -> CONT_ERROR
//!                                        -> returned value   -> CONT_SUCCESS | SUPPRESSED
//!                                        -> returned thenable -> PENDING
//!                                              -> resolved -> CONT_SUCCESS | SUPPRESSED
//!                                              -> rejected -> CONT_ERROR
//! ```
//!
//! The continuation is invoked at most once per call, and not at all when the
//! result is [`NO_CONTINUE`].

use crate::arg::{Arg, values};
use crate::errors::AdapterError;
use crate::handler::Handler;
use crate::next::Next;
use crate::reply::{NO_CONTINUE, NoContinue, Reply};
use crate::thenable::Returned;
use bon::bon;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, trace};

const ANONYMOUS: &str = "anonymous";

/// A handler adapted to the error-first continuation convention.
///
/// Cloning is cheap: clones share the wrapped handler.
pub struct Asyncback<H, T, E> {
    handler: Arc<H>,
    name: Option<Arc<str>>,
    _marker: PhantomData<fn() -> (T, E)>,
}

#[bon]
impl<H, T, E> Asyncback<H, T, E>
where
    H: Handler<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Build an adapter, optionally naming it for log events.
    #[builder]
    pub fn new(handler: H, #[builder(into)] name: Option<String>) -> Self {
        Self {
            handler: Arc::new(handler),
            name: name.map(Arc::from),
            _marker: PhantomData,
        }
    }
}

impl<H, T, E> Asyncback<H, T, E>
where
    H: Handler<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    /// The suppression token, reachable from the adapter type itself.
    ///
    /// Naming it this way needs all three type parameters, which a handler
    /// closure cannot spell for itself; handlers usually return the
    /// crate-level [`NO_CONTINUE`] instead.
    pub const NO_CONTINUE: NoContinue = NO_CONTINUE;

    /// Build an adapter from a handler that may be missing.
    ///
    /// # Errors
    /// * `AdapterError::InvalidArgument` - no handler was supplied
    pub fn try_new(handler: Option<H>) -> Result<Self, AdapterError> {
        match handler {
            Some(handler) => Ok(Self::builder().handler(handler).build()),
            None => Err(AdapterError::not_a_function()),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(ANONYMOUS)
    }

    /// Invoke the adapted callable with a variadic argument list.
    ///
    /// When the last argument is a continuation it is split off and receives
    /// the outcome. Otherwise the handler gets the full list untouched and a
    /// synchronous failure is returned from here.
    pub fn apply(&self, mut args: Vec<Arg<T, E>>) -> Result<(), E> {
        match args.pop().map(Arg::into_next) {
            Some(Ok(next)) => {
                self.invoke(args, next);
                Ok(())
            }
            Some(Err(last)) => {
                args.push(last);
                self.call_direct_args(args)
            }
            None => self.call_direct_args(args),
        }
    }

    /// Invoke with plain values and an explicit continuation.
    pub fn call(&self, args: Vec<T>, next: Next<T, E>) {
        self.invoke(values(args), next)
    }

    /// Invoke with plain values and no continuation.
    pub fn call_direct(&self, args: Vec<T>) -> Result<(), E> {
        self.call_direct_args(values(args))
    }

    /// The adapted callable as a plain closure.
    pub fn into_fn(self) -> impl Fn(Vec<Arg<T, E>>) -> Result<(), E> + Send + Sync + Clone {
        move |args| self.apply(args)
    }

    fn call_direct_args(&self, args: Vec<Arg<T, E>>) -> Result<(), E> {
        let name = self.name();
        trace!(
            handler = name,
            state = "CALL_DIRECT",
            "Calling handler without continuation"
        );

        if let Returned::Deferred(thenable) = self.handler.handle(args)? {
            // Nobody is waiting on the outcome, but the work still has to run
            // when there is a runtime to run it on.
            if Handle::try_current().is_err() {
                debug!(handler = name, "No runtime available, dropping detached result");
                return Ok(());
            }
            let name = name.to_owned();
            thenable.then(Box::new(move |outcome: Result<Reply<T>, E>| match outcome {
                Ok(_) => debug!(handler = %name, "Detached result resolved"),
                Err(_) => debug!(handler = %name, "Detached result rejected"),
            }));
        }
        Ok(())
    }

    fn invoke(&self, args: Vec<Arg<T, E>>, next: Next<T, E>) {
        let name = self.name();
        trace!(
            handler = name,
            state = "INVOKING",
            args = args.len(),
            "Calling handler"
        );

        match self.handler.handle(args) {
            Err(error) => {
                trace!(handler = name, state = "CONT_ERROR", "Handler failed");
                next.reject(error);
            }
            Ok(Returned::Immediate(reply)) => complete(name, reply, next),
            Ok(Returned::Deferred(thenable)) => {
                trace!(
                    handler = name,
                    state = "PENDING",
                    "Handler returned a promise-like value"
                );
                let name = name.to_owned();
                thenable.then(Box::new(move |outcome: Result<Reply<T>, E>| match outcome {
                    Ok(reply) => complete(&name, reply, next),
                    Err(error) => {
                        trace!(handler = %name, state = "CONT_ERROR", "Handler rejected");
                        next.reject(error);
                    }
                }));
            }
        }
    }
}

fn complete<T, E>(name: &str, reply: Reply<T>, next: Next<T, E>) {
    match reply {
        Reply::Value(value) => {
            trace!(handler = name, state = "CONT_SUCCESS", "Handler succeeded");
            next.resolve(value);
        }
        Reply::NoContinue => {
            debug!(handler = name, state = "SUPPRESSED", "Continuation suppressed");
        }
    }
}

impl<H, T, E> Clone for Asyncback<H, T, E> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<H, T, E> fmt::Debug for Asyncback<H, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asyncback")
            .field("name", &self.name)
            .field("handler", &"<handler>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thenable::Promise;
    use rstest::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot::error::TryRecvError;

    type TestArg = Arg<u32, String>;
    type TestResult = Result<Returned<u32, String>, String>;

    /// Records every argument list the handler receives.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Vec<Option<u32>>>>>,
    }

    impl Recorder {
        fn record(&self, args: &[TestArg]) {
            let seen = args.iter().map(|a| a.as_value().copied()).collect();
            self.calls.lock().unwrap().push(seen);
        }

        fn calls(&self) -> Vec<Vec<Option<u32>>> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn counting_next(count: &Arc<AtomicUsize>) -> Next<u32, String> {
        let count = count.clone();
        Next::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_try_new_rejects_missing_handler() {
        type Fallible = fn(Vec<TestArg>) -> TestResult;
        let err = Asyncback::<Fallible, u32, String>::try_new(None).unwrap_err();
        assert_eq!(
            err,
            AdapterError::InvalidArgument("Parameter must be a function.".to_string())
        );
        assert_eq!(err.to_string(), "Invalid argument: Parameter must be a function.");
    }

    #[test]
    fn test_try_new_accepts_handler() {
        let handler: fn(Vec<TestArg>) -> TestResult = |_| Ok(Returned::value(0));
        assert!(Asyncback::try_new(Some(handler)).is_ok());
    }

    #[test]
    fn test_builder_names_adapter() {
        let handler = |_: Vec<TestArg>| -> TestResult { Ok(Returned::value(0)) };
        let named = Asyncback::builder().handler(handler).name("auth").build();
        assert_eq!(named.name(), "auth");

        let anonymous = Asyncback::builder().handler(handler).build();
        assert_eq!(anonymous.name(), ANONYMOUS);
    }

    #[test]
    fn test_sentinel_is_shared() {
        type Fallible = fn(Vec<TestArg>) -> TestResult;
        assert_eq!(Asyncback::<Fallible, u32, String>::NO_CONTINUE, NO_CONTINUE);
    }

    #[test]
    fn test_non_callable_last_argument_is_forwarded() {
        let recorder = Recorder::default();
        let seen = recorder.clone();
        let adapter = Asyncback::builder()
            .handler(move |args: Vec<TestArg>| -> TestResult {
                seen.record(&args);
                Ok(Returned::value(0))
            })
            .build();

        adapter.apply(values([1, 2, 3])).unwrap();

        assert_eq!(recorder.calls(), vec![vec![Some(1), Some(2), Some(3)]]);
    }

    #[test]
    fn test_empty_argument_list_calls_directly() {
        let recorder = Recorder::default();
        let seen = recorder.clone();
        let adapter = Asyncback::builder()
            .handler(move |args: Vec<TestArg>| -> TestResult {
                seen.record(&args);
                Ok(Returned::value(0))
            })
            .build();

        adapter.apply(Vec::new()).unwrap();

        assert_eq!(recorder.calls(), vec![Vec::<Option<u32>>::new()]);
    }

    #[test]
    fn test_error_without_continuation_propagates() {
        let adapter = Asyncback::builder()
            .handler(|_: Vec<TestArg>| -> TestResult { Err("direct".to_string()) })
            .build();

        assert_eq!(adapter.apply(values([1])), Err("direct".to_string()));
        assert_eq!(adapter.call_direct(vec![1]), Err("direct".to_string()));
    }

    #[test]
    fn test_continuation_is_not_forwarded() {
        let recorder = Recorder::default();
        let seen = recorder.clone();
        let adapter = Asyncback::builder()
            .handler(move |args: Vec<TestArg>| -> TestResult {
                seen.record(&args);
                Ok(Returned::value(0))
            })
            .build();

        let mut args = values([1, 2]);
        args.push(Next::new(|_| {}).into());
        adapter.apply(args).unwrap();

        assert_eq!(recorder.calls(), vec![vec![Some(1), Some(2)]]);
    }

    #[test]
    fn test_earlier_continuations_are_forwarded() {
        let recorder = Recorder::default();
        let seen = recorder.clone();
        let adapter = Asyncback::builder()
            .handler(move |args: Vec<TestArg>| -> TestResult {
                seen.record(&args);
                Ok(Returned::value(0))
            })
            .build();

        let args = vec![Next::new(|_| {}).into(), Arg::value(4)];
        adapter.apply(args).unwrap();

        assert_eq!(recorder.calls(), vec![vec![None, Some(4)]]);
    }

    #[rstest]
    #[case::value(Ok(Returned::value(42)), Some(Ok(42)))]
    #[case::unit_like_zero(Ok(Returned::value(0)), Some(Ok(0)))]
    #[case::suppressed(Ok(NO_CONTINUE.into()), None)]
    #[case::thrown(Err("thrown".to_string()), Some(Err("thrown".to_string())))]
    fn test_synchronous_outcomes(
        #[case] outcome: TestResult,
        #[case] expected: Option<Result<u32, String>>,
    ) {
        let outcome = Mutex::new(Some(outcome));
        let adapter = Asyncback::builder()
            .handler(move |_: Vec<TestArg>| -> TestResult {
                outcome.lock().unwrap().take().expect("handler called once")
            })
            .build();

        let (next, mut rx) = Next::channel();
        adapter.call(vec![1, 2, 3], next);

        match expected {
            Some(expected) => assert_eq!(rx.try_recv().unwrap(), expected),
            None => assert_eq!(rx.try_recv(), Err(TryRecvError::Closed)),
        }
    }

    #[tokio::test]
    async fn test_deferred_value_fires_after_call_returns() {
        let adapter = Asyncback::builder()
            .handler(|_: Vec<TestArg>| -> TestResult {
                Ok(Returned::future(async { Ok(Reply::Value(9)) }))
            })
            .build();

        let (next, mut rx) = Next::channel();
        adapter.call(vec![], next);

        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(rx.await.unwrap(), Ok(9));
    }

    #[tokio::test]
    async fn test_deferred_rejection_reaches_continuation() {
        let adapter = Asyncback::builder()
            .handler(|_: Vec<TestArg>| -> TestResult {
                Ok(Returned::deferred(Promise::rejected("later".to_string())))
            })
            .build();

        let (next, rx) = Next::channel();
        adapter.call(vec![], next);

        assert_eq!(rx.await.unwrap(), Err("later".to_string()));
    }

    #[tokio::test]
    async fn test_deferred_suppression_drops_continuation() {
        let adapter = Asyncback::builder()
            .handler(|_: Vec<TestArg>| -> TestResult {
                Ok(Returned::deferred(Promise::resolved(Reply::NoContinue)))
            })
            .build();

        let (next, rx) = Next::channel();
        adapter.call(vec![], next);

        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_never_settling_result_never_continues() {
        let resolvers = Arc::new(Mutex::new(Vec::new()));
        let keep = resolvers.clone();
        let adapter = Asyncback::builder()
            .handler(move |_: Vec<TestArg>| -> TestResult {
                let (resolver, promise) = Promise::pending();
                keep.lock().unwrap().push(resolver);
                Ok(Returned::deferred(promise))
            })
            .build();

        let count = Arc::new(AtomicUsize::new(0));
        adapter.call(vec![], counting_next(&count));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(resolvers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_detached_result_still_runs() {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let done_tx = Mutex::new(Some(done_tx));
        let adapter = Asyncback::builder()
            .handler(move |_: Vec<TestArg>| -> TestResult {
                let done_tx = done_tx.lock().unwrap().take();
                Ok(Returned::future(async move {
                    if let Some(tx) = done_tx {
                        let _ = tx.send(());
                    }
                    Err("nobody listens".to_string())
                }))
            })
            .build();

        assert_eq!(adapter.call_direct(vec![1]), Ok(()));
        done_rx.await.unwrap();
    }

    #[test]
    fn test_detached_result_without_runtime_is_dropped() {
        let adapter = Asyncback::builder()
            .handler(|_: Vec<TestArg>| -> TestResult {
                Ok(Returned::future(async { Ok(Reply::Value(1)) }))
            })
            .build();

        assert_eq!(adapter.apply(values([1, 2])), Ok(()));
        assert_eq!(adapter.call_direct(vec![3]), Ok(()));
    }

    #[test]
    fn test_each_call_is_independent() {
        let count = Arc::new(AtomicUsize::new(0));
        let adapter = Asyncback::builder()
            .handler(|args: Vec<TestArg>| -> TestResult {
                match args.first().and_then(Arg::as_value) {
                    Some(0) => Ok(NO_CONTINUE.into()),
                    Some(n) => Ok(Returned::value(*n)),
                    None => Err("missing".to_string()),
                }
            })
            .build();

        adapter.call(vec![0], counting_next(&count));
        adapter.call(vec![5], counting_next(&count));
        adapter.clone().call(vec![], counting_next(&count));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_into_fn_dispatches_like_apply() {
        let adapted = Asyncback::builder()
            .handler(|_: Vec<TestArg>| -> TestResult { Ok(Returned::value(1)) })
            .build()
            .into_fn();

        let (next, mut rx) = Next::channel();
        adapted(vec![Arg::value(3), next.into()]).unwrap();

        assert_eq!(rx.try_recv().unwrap(), Ok(1));
    }
}
