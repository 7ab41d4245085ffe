//! The diagnostic-carrying result type.
//!
//! A compilation step either produces a value alongside any errors found so
//! far (`Active`, a partial success) or produces nothing (`Failed`).
//! Sequencing short-circuits `Failed` for the branch it came from, while
//! combinators like [`Outcome::do_all`] and [`Outcome::zip`] preserve errors
//! from every sibling branch. `Failed` always carries at least one
//! diagnostic.

use crate::Error;
use crate::diagnostics::{Diagnostic, Diagnostics, SourcePos};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// A result is present but may be defective; errors may be non-empty.
    Active(T, Diagnostics),
    /// No result could be produced. The diagnostics are never empty.
    Failed(Diagnostics),
}

impl<T> Outcome<T> {
    pub fn succeed(value: T) -> Self {
        Outcome::Active(value, Diagnostics::new())
    }

    pub fn with_errors(value: T, errors: Diagnostics) -> Self {
        Outcome::Active(value, errors)
    }

    pub fn fail(diagnostic: Diagnostic) -> Self {
        Outcome::Failed(Diagnostics::one(diagnostic))
    }

    /// Fail with an already-collected set of diagnostics.
    ///
    /// Callers must pass a non-empty collection; `Failed` without an
    /// explanation would silence the problem it stands for.
    pub fn fail_all(errors: Diagnostics) -> Self {
        debug_assert!(!errors.is_empty(), "Failed outcome with no diagnostics");
        Outcome::Failed(errors)
    }

    /// Fail with a single prose message.
    pub fn error(pos: SourcePos, message: impl Into<String>) -> Self {
        Outcome::fail(Diagnostic::message(pos, message))
    }

    /// Fail stating the form that was expected.
    pub fn expected(pos: SourcePos, form: impl Into<String>) -> Self {
        Outcome::fail(Diagnostic::expect(pos, form))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Outcome::Active(..))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Active(value, _) => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn errors(&self) -> &Diagnostics {
        match self {
            Outcome::Active(_, errors) | Outcome::Failed(errors) => errors,
        }
    }

    pub fn split(self) -> (Option<T>, Diagnostics) {
        match self {
            Outcome::Active(value, errors) => (Some(value), errors),
            Outcome::Failed(errors) => (None, errors),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Active(value, errors) => Outcome::Active(f(value), errors),
            Outcome::Failed(errors) => Outcome::Failed(errors),
        }
    }

    /// Sequence with `f`. `Failed` short-circuits this branch; errors already
    /// collected travel forward either way.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Outcome::Active(value, mut errors) => match f(value) {
                Outcome::Active(next, more) => {
                    errors.extend(more);
                    Outcome::Active(next, errors)
                }
                Outcome::Failed(more) => {
                    errors.extend(more);
                    Outcome::Failed(errors)
                }
            },
            Outcome::Failed(errors) => Outcome::Failed(errors),
        }
    }

    /// Convert `Failed` into `Active` with a fallback value.
    ///
    /// The fallback is only evaluated when this outcome actually failed.
    pub fn recover_with(self, fallback: impl FnOnce() -> T) -> Outcome<T> {
        match self {
            Outcome::Active(..) => self,
            Outcome::Failed(errors) => Outcome::Active(fallback(), errors),
        }
    }

    /// Combine two outcomes, keeping errors from both sides.
    pub fn zip<U>(self, other: Outcome<U>) -> Outcome<(T, U)> {
        match (self, other) {
            (Outcome::Active(a, mut e1), Outcome::Active(b, e2)) => {
                e1.extend(e2);
                Outcome::Active((a, b), e1)
            }
            (a, b) => {
                let mut errors = Diagnostics::new();
                errors.extend(a.split().1);
                errors.extend(b.split().1);
                Outcome::Failed(errors)
            }
        }
    }

    /// Run every outcome, keeping the successes and all errors.
    ///
    /// Never fails: a failed element merely drops out of the result list.
    pub fn do_all(items: impl IntoIterator<Item = Outcome<T>>) -> Outcome<Vec<T>> {
        let mut values = Vec::new();
        let mut errors = Diagnostics::new();
        for item in items {
            match item {
                Outcome::Active(value, more) => {
                    values.push(value);
                    errors.extend(more);
                }
                Outcome::Failed(more) => errors.extend(more),
            }
        }
        Outcome::Active(values, errors)
    }

    /// Demand a clean result: any collected error becomes [`Error::Compile`].
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Outcome::Active(value, errors) if errors.is_empty() => Ok(value),
            Outcome::Active(_, errors) | Outcome::Failed(errors) => Err(Error::Compile(errors)),
        }
    }
}
