// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Identifier resolution against the frontend's name oracle.
//!
//! Given an identifier reference and the active function context, the
//! resolver decides whether it denotes a register-bound local, a
//! captured upvalue, or a global/member access through the environment
//! table. Globals on this VM are fields of a table reached through a
//! captured upvalue conventionally named `_ENV`, so `var` and function
//! declarations resolve to member accesses keyed by the identifier's
//! name constant.
//!
//! Resolution results for identifiers bound to an owner are memoized in
//! a side table keyed by node identity; the input tree is never mutated.

use rustc_hash::FxHashMap;

use crate::ast::{Identifier, NodeId};
use crate::compiler::context::{Constant, FunctionContext, Operand};
use crate::error::{CompileError, Result};
use crate::oracle::{DeclarationKind, NameOracle};

/// The environment-table upvalue name.
pub const ENV_NAME: &str = "_ENV";

/// The conventional logging call, rebound at this layer to the target
/// runtime's built-in print routine.
const LOG_NAME: &str = "log";
const PRINT_NAME: &str = "print";

/// Outcome of resolving one identifier reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A member access on an owner operand: the emitter materializes it
    /// as a table get through an upvalue.
    Member {
        /// The owning operand (the `_ENV` upvalue for globals)
        owner: Operand,
        /// The member name's constant-pool index
        key: usize,
    },
    /// The key constant for a property name resolved under an owner
    /// override; the caller already holds the object operand.
    MemberKey(usize),
    /// A direct operand: a register-bound local, an upvalue, or a
    /// constant, usable as-is.
    Direct(Operand),
}

/// Resolves identifiers for the emitter.
pub struct IdentifierResolver<'a> {
    oracle: &'a dyn NameOracle,
    /// Memoized owners keyed by node identity.
    resolved_owners: FxHashMap<NodeId, Operand>,
    /// Owner override stack, pushed around property-name resolution.
    owners: Vec<Operand>,
}

impl<'a> IdentifierResolver<'a> {
    /// Creates a resolver over the frontend's oracle.
    pub fn new(oracle: &'a dyn NameOracle) -> Self {
        Self {
            oracle,
            resolved_owners: FxHashMap::default(),
            owners: Vec::new(),
        }
    }

    /// Makes `owner` the resolution owner for identifiers resolved
    /// until the matching [`pop_owner`](Self::pop_owner).
    pub fn push_owner(&mut self, owner: Operand) {
        self.owners.push(owner);
    }

    /// Ends the innermost owner override.
    pub fn pop_owner(&mut self) {
        self.owners.pop();
    }

    /// Resolves one identifier reference in `context`.
    pub fn resolve(
        &mut self,
        identifier: &Identifier,
        context: &mut FunctionContext,
    ) -> Result<Resolution> {
        // a property name under an active owner override
        if let Some(owner) = self.owners.last().cloned() {
            let key = self.member_key(&owner, identifier, context)?;
            self.resolved_owners.insert(identifier.id, owner);
            return Ok(Resolution::MemberKey(key));
        }

        // previously bound to an owner
        if let Some(owner) = self.resolved_owners.get(&identifier.id).cloned() {
            let key = self.member_key(&owner, identifier, context)?;
            return Ok(Resolution::Member { owner, key });
        }

        let Some(declaration) = self.oracle.resolve_name(&identifier.name) else {
            return Err(CompileError::UnresolvedIdentifier {
                name: identifier.name.clone(),
            });
        };

        match declaration.kind {
            DeclarationKind::BlockScopedVariable => Err(CompileError::UnsupportedBinding {
                name: identifier.name.clone(),
            }),
            DeclarationKind::Variable if declaration.type_name.as_deref() == Some("Console") => {
                Ok(Resolution::Direct(self.environment(context)))
            }
            DeclarationKind::Variable | DeclarationKind::Function => {
                let owner = self.environment(context);
                self.resolved_owners.insert(identifier.id, owner.clone());
                let key = self.member_key(&owner, identifier, context)?;
                Ok(Resolution::Member { owner, key })
            }
        }
    }

    /// The implicit global environment as an `_ENV` upvalue operand,
    /// interning the upvalue on first use.
    pub fn environment(&self, context: &mut FunctionContext) -> Operand {
        Operand::Upvalue(context.find_or_create_upvalue(ENV_NAME))
    }

    /// Interns the name constant for a member access under `owner`.
    fn member_key(
        &self,
        owner: &Operand,
        identifier: &Identifier,
        context: &mut FunctionContext,
    ) -> Result<usize> {
        let Operand::Upvalue(index) = owner else {
            return Err(CompileError::NotImplemented {
                what: "member access on a non-upvalue owner",
            });
        };

        let mut name = identifier.name.as_str();
        if context.upvalues[*index].name == ENV_NAME && name == LOG_NAME {
            name = PRINT_NAME;
        }
        Ok(context.find_or_create_const(Constant::String(name.to_string())))
    }
}
