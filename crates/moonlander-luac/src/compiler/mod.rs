// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The compiler backend: AST in, `.luac` chunk out.
//!
//! Submodules, leaves first: [`opcodes`] (the instruction encoding
//! table), [`writer`] (the byte sink), [`context`] (per-function
//! compile state), [`resolver`] (identifier resolution), and
//! [`emitter`] (the tree walk plus serialization).

pub mod context;
pub mod emitter;
pub mod opcodes;
pub mod resolver;
pub mod writer;

pub use emitter::Emitter;

use crate::ast::Program;
use crate::error::Result;
use crate::oracle::NameOracle;

/// The compiler facade.
///
/// Holds the host-provided name oracle; each [`compile`](Self::compile)
/// call owns an independent emitter, so a `Compiler` can be reused
/// across units.
pub struct Compiler<'a> {
    oracle: &'a dyn NameOracle,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler resolving names against `oracle`.
    pub fn new(oracle: &'a dyn NameOracle) -> Self {
        Self { oracle }
    }

    /// Compiles `program` into a complete `.luac` chunk.
    pub fn compile(&self, program: &Program) -> Result<Vec<u8>> {
        Emitter::new(self.oracle).emit_program(program)
    }
}

/// One-shot convenience over [`Compiler`].
pub fn compile_program(program: &Program, oracle: &dyn NameOracle) -> Result<Vec<u8>> {
    Compiler::new(oracle).compile(program)
}
