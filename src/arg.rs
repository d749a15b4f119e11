//! Call arguments
//!
//! An adapted callable receives an ordered list of arguments. Only the last one
//! is ever treated as the continuation, and only when it is callable.

use crate::next::Next;

/// A single argument of an adapted call
#[derive(Debug)]
pub enum Arg<T, E> {
    /// A plain value
    Value(T),
    /// A callable continuation
    Next(Next<T, E>),
}

impl<T, E> Arg<T, E> {
    pub fn value(value: T) -> Self {
        Arg::Value(value)
    }

    /// Whether this argument can serve as the continuation
    pub fn is_callable(&self) -> bool {
        matches!(self, Arg::Next(_))
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Arg::Value(value) => Some(value),
            Arg::Next(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Arg::Value(value) => Some(value),
            Arg::Next(_) => None,
        }
    }

    /// Split off the continuation, handing the argument back if it is a value
    pub fn into_next(self) -> Result<Next<T, E>, Self> {
        match self {
            Arg::Next(next) => Ok(next),
            other => Err(other),
        }
    }
}

impl<T, E> From<Next<T, E>> for Arg<T, E> {
    fn from(next: Next<T, E>) -> Self {
        Arg::Next(next)
    }
}

/// Wrap plain values as arguments.
pub fn values<T, E>(values: impl IntoIterator<Item = T>) -> Vec<Arg<T, E>> {
    values.into_iter().map(Arg::Value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_next_is_callable() {
        let value: Arg<u8, ()> = Arg::value(1);
        let next: Arg<u8, ()> = Next::new(|_| {}).into();

        assert!(!value.is_callable());
        assert!(next.is_callable());
    }

    #[test]
    fn test_into_next_returns_value_untouched() {
        let value: Arg<u8, ()> = Arg::value(9);
        let back = value.into_next().unwrap_err();
        assert_eq!(back.into_value(), Some(9));
    }

    #[test]
    fn test_values_preserves_order() {
        let args: Vec<Arg<u8, ()>> = values([1, 2, 3]);
        let seen: Vec<u8> = args.iter().filter_map(Arg::as_value).copied().collect();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
