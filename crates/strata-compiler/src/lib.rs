//! Strata schema compiler: semantic analysis and wire layout.
//!
//! This crate consumes an already-parsed schema AST and produces a fully
//! resolved, numerically laid-out descriptor tree:
//! - `ast` - the parser contract (input)
//! - `diagnostics` - located error messages
//! - `outcome` - the diagnostic-carrying result type
//! - `schema` - the descriptor pool plus compiled types and values
//! - `analyze` - name resolution, type/value/annotation compilation, validators
//! - `layout` - bit-packed struct layout
//! - `compile` - declaration compiler and file driver
//!
//! Lexing, parsing, code emission, and import path resolution are external
//! collaborators; the latter two enter through the callbacks of
//! [`compile::compile_file`].

pub mod analyze;
pub mod ast;
pub mod compile;
pub mod diagnostics;
pub mod layout;
pub mod outcome;
pub mod schema;

#[cfg(test)]
pub mod test_utils;

pub use compile::{CompileOptions, compile_file, compile_file_with, parse_and_compile_file};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, SourcePos};
pub use outcome::Outcome;
pub use schema::{DescBody, DescId, SchemaPool};
pub use strata_wire::{
    DataSectionSize, DataSize, FieldOffset, FieldSize, MAX_ORDINAL, StructLayout,
};

/// Error surfaced when a caller wants a hard failure instead of an outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Compilation produced error diagnostics.
    #[error("schema compilation failed with {} error(s)", .0.len())]
    Compile(Diagnostics),
}

/// Result type for strict entry points.
pub type Result<T> = std::result::Result<T, Error>;
