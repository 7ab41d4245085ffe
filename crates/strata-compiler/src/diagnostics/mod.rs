//! Compiler diagnostics.
//!
//! Errors are collected, not thrown: every analysis pass reports into a
//! [`Diagnostics`] and keeps going, so a single run surfaces as many problems
//! as possible.

mod message;

pub use message::{Diagnostic, DiagnosticKind, SourcePos};

#[cfg(test)]
mod diagnostics_tests;

/// Collection of diagnostic messages accumulated during compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A collection holding a single diagnostic.
    pub fn one(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Report a prose message at a position.
    pub fn report(&mut self, pos: SourcePos, message: impl Into<String>) {
        self.push(Diagnostic::message(pos, message));
    }

    /// Report the form that was expected at a position.
    pub fn expect(&mut self, pos: SourcePos, form: impl Into<String>) {
        self.push(Diagnostic::expect(pos, form));
    }

    pub fn extend(&mut self, iter: impl IntoIterator<Item = Diagnostic>) {
        self.0.extend(iter);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }

    /// Render all messages sorted by position, collapsing exact duplicates.
    pub fn to_strings(&self) -> Vec<String> {
        let mut sorted = self.0.clone();
        sorted.sort();
        sorted.dedup();
        sorted.iter().map(|d| d.to_string()).collect()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
