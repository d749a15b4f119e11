//! Handler results and the continuation-suppression token
//!
//! A handler either produces a value that is passed on to the continuation, or
//! the [`NO_CONTINUE`] token, which tells the adapter that the handler has
//! already produced its side effects and the chain should stop silently.

/// Token that suppresses the continuation for a single call.
///
/// The field is private, so [`NO_CONTINUE`] is the only value of this type that
/// can exist outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoContinue(());

/// The shared suppression token.
pub const NO_CONTINUE: NoContinue = NoContinue(());

/// The successful outcome of a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// Pass the value to the continuation
    Value(T),
    /// Do not invoke the continuation
    NoContinue,
}

impl<T> Reply<T> {
    pub fn is_no_continue(&self) -> bool {
        matches!(self, Reply::NoContinue)
    }

    /// The carried value, or `None` for the suppression token
    pub fn into_value(self) -> Option<T> {
        match self {
            Reply::Value(value) => Some(value),
            Reply::NoContinue => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Reply::Value(value) => Reply::Value(f(value)),
            Reply::NoContinue => Reply::NoContinue,
        }
    }
}

impl<T> From<NoContinue> for Reply<T> {
    fn from(_: NoContinue) -> Self {
        Reply::NoContinue
    }
}
