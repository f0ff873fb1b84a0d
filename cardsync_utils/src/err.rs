//! A small multi-error accumulator for callers that want to keep checking
//! further inputs after the first failure instead of bailing out immediately.

use core::fmt;
use itertools::Itertools;

pub type Result<T, E> = std::result::Result<T, Errors<E>>;

#[derive(Debug)]
pub enum Errors<T> {
    Single(T),
    Multiple { errors: Vec<T> },
}
impl<T> Errors<T> {
    const fn empty() -> Self {
        Errors::Multiple { errors: vec![] }
    }

    /// Whether there are no errors stored in here.
    ///
    /// This would generally be considered a somewhat illegal state.
    pub fn is_empty(&self) -> bool {
        match self {
            Errors::Single(_) => false,
            Errors::Multiple { errors } => errors.is_empty(),
        }
    }

    /// The number of errors currently stored.
    pub fn len(&self) -> usize {
        match self {
            Errors::Single(_) => 1,
            Errors::Multiple { errors } => errors.len(),
        }
    }

    /// Add `error` to the existing errors at the end.
    pub fn push(&mut self, error: T) {
        // Temporarily swap an empty instance in place to avoid complicated variant matching.
        let mut vec = match std::mem::replace(self, Self::empty()) {
            Errors::Single(e) => vec![e],
            Errors::Multiple { errors } => errors,
        };
        vec.push(error);
        *self = Errors::Multiple { errors: vec };
    }
}

impl<T: fmt::Display> fmt::Display for Errors<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Errors::Single(e) => write!(f, "{e}"),
            Errors::Multiple { errors } => {
                write!(
                    f,
                    "Encountered multiple errors:\n{}",
                    errors.iter().map(|e| format!(" - {e}")).join("\n")
                )
            }
        }
    }
}
impl<T: fmt::Debug + fmt::Display> std::error::Error for Errors<T> {}

/// Extension methods for [`Result`] over [`Errors`] values.
pub trait ErrorsResultExt {
    type Error;

    /// Update the errors with `error`.
    fn push_err(&mut self, error: Self::Error);

    /// Produce a new value with `error` appended.
    fn append_err(self, error: Self::Error) -> Self;
}

impl<T, E> ErrorsResultExt for Result<T, E> {
    type Error = E;

    fn push_err(&mut self, error: Self::Error) {
        match self {
            Ok(_) => {
                *self = Err(Errors::Multiple {
                    errors: vec![error],
                })
            }
            Err(e) => e.push(error),
        }
    }

    fn append_err(mut self, error: Self::Error) -> Self {
        self.push_err(error);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_accumulate_in_order() {
        let mut errors: Errors<&str> = Errors::Single("first");
        errors.push("second");
        errors.push("third");
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.to_string(),
            "Encountered multiple errors:\n - first\n - second\n - third"
        );
    }

    #[test]
    fn single_error_is_not_empty() {
        let errors: Errors<&str> = Errors::Single("only");
        assert!(!errors.is_empty());
        assert_eq!(errors.len(), 1);
    }
}
