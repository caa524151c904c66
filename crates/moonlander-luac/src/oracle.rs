// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Name-resolution oracle boundary.
//!
//! The backend performs no scope analysis of its own beyond per-function
//! register and upvalue bookkeeping. Declaration knowledge comes from
//! the frontend's type checker, exposed to us through the [`NameOracle`]
//! trait. The backend trusts the oracle completely.

use rustc_hash::FxHashMap;

/// The declaration kind of a resolved name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// A function declaration
    Function,
    /// A block-scoped (`let`/`const`) variable declaration
    BlockScopedVariable,
    /// A non-block-scoped (`var`) variable declaration
    Variable,
}

/// What the oracle knows about one declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// The kind of the declaration
    pub kind: DeclarationKind,
    /// The declared type name, when the frontend has one
    pub type_name: Option<String>,
}

impl Declaration {
    /// A declaration with no type annotation.
    pub fn new(kind: DeclarationKind) -> Self {
        Self {
            kind,
            type_name: None,
        }
    }

    /// A declaration with a declared type name.
    pub fn typed(kind: DeclarationKind, type_name: impl Into<String>) -> Self {
        Self {
            kind,
            type_name: Some(type_name.into()),
        }
    }
}

/// Resolves identifier references to their declarations.
pub trait NameOracle {
    /// Looks up the declaration for `name`, or `None` if the frontend
    /// knows no such binding.
    fn resolve_name(&self, name: &str) -> Option<Declaration>;
}

/// A map-backed oracle for hosts and tests that precompute the whole
/// declaration table up front.
#[derive(Debug, Default)]
pub struct StaticOracle {
    declarations: FxHashMap<String, Declaration>,
}

impl StaticOracle {
    /// Creates an empty oracle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a declaration for `name`.
    pub fn declare(&mut self, name: impl Into<String>, declaration: Declaration) {
        self.declarations.insert(name.into(), declaration);
    }
}

impl NameOracle for StaticOracle {
    fn resolve_name(&self, name: &str) -> Option<Declaration> {
        self.declarations.get(name).cloned()
    }
}
