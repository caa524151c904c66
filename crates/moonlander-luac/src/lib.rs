// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # moonlander-luac
//!
//! A Lua 5.3 bytecode compiler backend for a typed JavaScript-like
//! language, implemented in Rust.
//!
//! ## Overview
//!
//! This crate takes a type-checked AST plus a name-resolution oracle
//! from a host frontend and lowers it directly to a `.luac` chunk that
//! an unmodified Lua 5.3 loader accepts:
//! - Instruction encoding table, bit-exact with the VM's ISA
//! - Register allocation as a LIFO stack projected onto the register file
//! - Identifier resolution through the `_ENV` environment upvalue
//! - Single-pass binary serialization of the prototype tree
//!
//! Unsupported constructs fail loudly with a typed error; the backend
//! never emits a plausible-but-wrong chunk.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use moonlander_luac::{compile_program, StaticOracle};
//!
//! let chunk = compile_program(&program, &oracle)?;
//! std::fs::write("out.luac", chunk)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod compiler;
pub mod error;
pub mod oracle;

// Re-exports for convenience
pub use compiler::{compile_program, Compiler};
pub use error::{CompileError, Result};
pub use oracle::{Declaration, DeclarationKind, NameOracle, StaticOracle};
