// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the bytecode compiler.

use thiserror::Error;

/// Result type for compilation operations.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors that abort a compilation unit.
///
/// Every failure is fatal and synchronous: the first error aborts the
/// whole unit and no artifact is produced. Correctness of the binary
/// output is non-negotiable, so unhandled constructs fail loudly
/// instead of compiling to something plausible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The AST node kind has no compilation rule.
    #[error("unsupported syntax: {construct}")]
    UnsupportedSyntax {
        /// Human-readable name of the construct that was encountered
        construct: &'static str,
    },

    /// The operator has no entry in the operator-to-opcode table.
    #[error("unsupported operator: {op}")]
    UnsupportedOperator {
        /// Source-level spelling of the operator
        op: &'static str,
    },

    /// The name-resolution oracle found nothing for this identifier.
    #[error("could not resolve identifier '{name}'")]
    UnresolvedIdentifier {
        /// The identifier text
        name: String,
    },

    /// The identifier resolved to a binding kind the backend does not
    /// handle yet (block-scoped locals are declared but never read back).
    #[error("unsupported binding kind for '{name}'")]
    UnsupportedBinding {
        /// The identifier text
        name: String,
    },

    /// The left-hand side of an assignment cannot be stored into.
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    /// A table literal exceeds what a single SETLIST instruction covers.
    #[error("table literal with {count} elements exceeds the {max}-element limit")]
    TooManyElements {
        /// Number of elements in the offending literal
        count: usize,
        /// The single-instruction capacity
        max: usize,
    },

    /// An expression needed more registers than one function frame can
    /// encode.
    #[error("function needs more than {max} registers")]
    TooManyRegisters {
        /// The register-file capacity
        max: u8,
    },

    /// The operand stack was popped while empty. This is an emitter bug,
    /// not a user error.
    #[error("internal error: operand stack underflow")]
    StackUnderflow,

    /// A descriptor or AST shape reached a path with no defined rule.
    #[error("not implemented: {what}")]
    NotImplemented {
        /// What was being attempted
        what: &'static str,
    },
}
