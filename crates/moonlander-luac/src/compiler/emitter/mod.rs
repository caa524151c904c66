// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode emitter.
//!
//! Walks the AST in a single depth-first pass, mutating the active
//! [`FunctionContext`] (registers allocated, constants and upvalues
//! interned, instructions appended) and, once the tree is exhausted,
//! serializes the finished context tree into a `.luac` chunk.
//!
//! Every expression node compiles to exactly one operand descriptor
//! pushed onto the active context's operand stack. Consumers pop
//! descriptors and either embed them in an instruction operand or
//! promote them into a register. After each complete statement the
//! operand stack is drained back to its pre-statement depth, so no
//! descriptor ever leaks across statements.
//!
//! Multi-operand instructions (CALL, SETLIST) require their operands in
//! contiguous ascending registers. The emitter establishes that
//! adjacency by materializing each operand into the next free register
//! as it is compiled, in the order the instruction consumes them; the
//! LIFO allocator then yields consecutive indices by construction.

use tracing::{debug, trace};

use crate::ast::{
    ArrowBody, BinaryExpression, BinaryOperator, CallExpression, Expression, FunctionDeclaration,
    Identifier, MemberExpression, NumberLiteral, Program, ReturnStatement, Statement,
    UnaryExpression, VariableDeclaration,
};
use crate::compiler::context::{Constant, FunctionContext, Operand};
use crate::compiler::opcodes::{
    binary_opcode, encode, lua_type, pool_index, unary_opcode, Op,
};
use crate::compiler::resolver::{IdentifierResolver, Resolution, ENV_NAME};
use crate::compiler::writer::BinaryWriter;
use crate::error::{CompileError, Result};
use crate::oracle::NameOracle;


/// Chunk signature, `\x1bLua`.
const LUAC_SIGNATURE: [u8; 4] = [0x1b, b'L', b'u', b'a'];
/// Target VM version, 5.3.
const LUAC_VERSION: u8 = 0x53;
/// Official format.
const LUAC_FORMAT: u8 = 0;
/// Conversion-check bytes the loader uses to catch text-mode mangling.
const LUAC_DATA: [u8; 6] = [0x19, 0x93, 0x0d, 0x0a, 0x1a, 0x0a];
/// Width bytes: int, size_t, Instruction, lua_Integer, lua_Number.
const LUAC_SIZES: [u8; 5] = [4, 8, 4, 8, 8];
/// Endianness-check integer.
const LUAC_INT: i64 = 0x5678;
/// Float-format-check number.
const LUAC_NUM: f64 = 370.5;

/// Largest table literal compilable with a single C=1 SETLIST batch.
const MAX_TABLE_ELEMENTS: usize = 511;

/// Syntactic position of a call expression, which decides the
/// return-count operand of the CALL instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallPosition {
    /// A bare expression statement: no return values requested.
    Statement,
    /// An argument to an enclosing call: all results are requested
    /// (C=0) and the value is read from the callee register.
    Argument,
    /// Any other value position: exactly one return value.
    Value,
}

/// How an assignment's left-hand side stores a value.
enum AssignmentTarget {
    /// A field of the environment table, written with SETTABUP.
    EnvironmentMember {
        /// Upvalue index of the owning table
        owner: usize,
        /// Constant-pool index of the field name
        key: usize,
    },
    /// A register-bound binding, written with a move.
    Register(u8),
    /// An element access, written with SETTABLE.
    Element {
        /// The table operand
        object: Operand,
        /// The key operand
        index: Operand,
    },
}

/// Compiles one program into a `.luac` byte stream.
pub struct Emitter<'a> {
    resolver: IdentifierResolver<'a>,
    /// Enclosing function contexts; the active one lives in `context`.
    enclosing: Vec<FunctionContext>,
    context: FunctionContext,
}

impl<'a> Emitter<'a> {
    /// Creates an emitter resolving names against `oracle`.
    pub fn new(oracle: &'a dyn NameOracle) -> Self {
        Self {
            resolver: IdentifierResolver::new(oracle),
            enclosing: Vec::new(),
            context: FunctionContext::new(false),
        }
    }

    /// Compiles `program` to a complete chunk.
    pub fn emit_program(mut self, program: &Program) -> Result<Vec<u8>> {
        debug!(statements = program.body.len(), "compiling program");
        self.context.is_vararg = true;
        for statement in &program.body {
            self.compile_statement(statement)?;
        }
        self.context.emit(Op::Return, 0, 1, 0);

        let mut writer = BinaryWriter::new();
        emit_header(&mut writer);
        writer.write_byte(self.context.upvalues.len() as u8);
        emit_function(&mut writer, &self.context)?;
        debug!(bytes = writer.len(), "serialized chunk");
        Ok(writer.into_bytes())
    }

    // ---- function context nesting ----

    fn begin_function(&mut self) {
        let parent = std::mem::replace(&mut self.context, FunctionContext::new(true));
        self.enclosing.push(parent);
        trace!(depth = self.enclosing.len(), "begin function context");
    }

    /// Seals the active context with its implicit return and restores
    /// the parent as the active one.
    fn end_function(&mut self) -> FunctionContext {
        self.context.emit(Op::Return, 0, 1, 0);
        trace!(
            instructions = self.context.code.len(),
            "end function context"
        );
        let parent = self.enclosing.pop().expect("balanced function context stack");
        std::mem::replace(&mut self.context, parent)
    }

    /// Compiles a function body into a child context and pushes a
    /// closure descriptor referencing the registered prototype.
    fn compile_function(&mut self, params: &[Identifier], body: &[Statement]) -> Result<()> {
        self.begin_function();
        self.context.num_params = params.len() as u8;
        let result = params
            .iter()
            .try_for_each(|param| self.context.create_local(&param.name).map(|_| ()))
            .and_then(|()| {
                body.iter()
                    .try_for_each(|statement| self.compile_statement(statement))
            });
        let child = self.end_function();
        result?;
        let proto = self.context.create_proto(child);
        self.context.push(Operand::Closure(proto));
        Ok(())
    }

    // ---- statements ----

    /// Compiles one statement and drains the operand stack back to its
    /// pre-statement depth, releasing any leftover registers.
    fn compile_statement(&mut self, statement: &Statement) -> Result<()> {
        let depth = self.context.stack_depth();
        self.compile_statement_inner(statement)?;
        while self.context.stack_depth() > depth {
            self.context.pop()?;
        }
        Ok(())
    }

    fn compile_statement_inner(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Empty => Ok(()),
            Statement::VariableDeclaration(declaration) => {
                self.compile_variable_declaration(declaration)
            }
            Statement::FunctionDeclaration(declaration) => {
                self.compile_function_declaration(declaration)
            }
            Statement::Expression(Expression::Call(call)) => {
                self.compile_call(call, CallPosition::Statement)
            }
            Statement::Expression(expression) => self.compile_expression(expression),
            Statement::Return(statement) => self.compile_return(statement),
            Statement::Block(_) => Err(CompileError::UnsupportedSyntax {
                construct: "block statement",
            }),
            Statement::If(_) => Err(CompileError::UnsupportedSyntax {
                construct: "if statement",
            }),
            Statement::While(_) => Err(CompileError::UnsupportedSyntax {
                construct: "while statement",
            }),
        }
    }

    fn compile_variable_declaration(&mut self, declaration: &VariableDeclaration) -> Result<()> {
        for declarator in &declaration.declarations {
            if declaration.kind.is_block_scoped() {
                let slot = self.context.create_local(&declarator.id.name)?;
                let target = slot.register()?;
                match &declarator.init {
                    Some(init) => {
                        self.compile_expression(init)?;
                        let value = self.context.pop_deferred()?;
                        self.store_into(target, value)?;
                    }
                    None => self.context.emit(Op::LoadNil, target, 0, 0),
                }
            } else if let Some(init) = &declarator.init {
                let key = self
                    .context
                    .find_or_create_const(Constant::String(declarator.id.name.clone()));
                self.compile_expression(init)?;
                let value = self.context.pop_deferred()?;
                self.store_to_environment(key, value)?;
            }
            // a `var` without initializer emits nothing: the binding
            // springs into existence on first store
        }
        Ok(())
    }

    fn compile_function_declaration(&mut self, declaration: &FunctionDeclaration) -> Result<()> {
        let key = self
            .context
            .find_or_create_const(Constant::String(declaration.id.name.clone()));
        self.compile_function(&declaration.params, &declaration.body)?;
        let Operand::Closure(proto) = self.context.pop_deferred()? else {
            return Err(CompileError::NotImplemented {
                what: "function declaration without a prototype descriptor",
            });
        };
        let target = self.context.use_register()?;
        self.context
            .emit(Op::Closure, target.register()?, pool_index(proto), 0);
        let env = self.context.find_or_create_upvalue(ENV_NAME);
        self.context
            .emit(Op::SetTabUp, pool_index(env), pool_index(key), target.register()?);
        self.context.release_register(&target);
        Ok(())
    }

    fn compile_return(&mut self, statement: &ReturnStatement) -> Result<()> {
        match &statement.argument {
            Some(argument) => {
                self.compile_expression(argument)?;
                self.materialize_top()?;
                let value = self.context.pop()?;
                self.context.emit(Op::Return, value.register()?, 2, 0);
            }
            None => self.context.emit(Op::Return, 0, 1, 0),
        }
        Ok(())
    }

    // ---- expressions ----

    /// Compiles one expression, pushing exactly one operand descriptor.
    fn compile_expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Boolean(value) => {
                let target = self.context.use_register_and_push()?;
                self.context
                    .emit(Op::LoadBool, target.register()?, i32::from(*value), 0);
                Ok(())
            }
            Expression::Null => {
                let target = self.context.use_register_and_push()?;
                self.context.emit(Op::LoadNil, target.register()?, 0, 0);
                Ok(())
            }
            Expression::Number(literal) => {
                let constant = match literal {
                    NumberLiteral::Integer(value) => Constant::Integer(*value),
                    NumberLiteral::Float(value) => Constant::Float(*value),
                };
                self.push_constant(constant)
            }
            Expression::String(value) => self.push_constant(Constant::String(value.clone())),
            Expression::Identifier(identifier) => self.compile_identifier(identifier),
            Expression::Member(member) => self.compile_member(member),
            Expression::Index(index) => {
                self.compile_expression(&index.object)?;
                self.compile_expression(&index.index)?;
                let key = self.context.pop_deferred()?;
                let object = self.context.pop_deferred()?;
                self.context.push(Operand::PendingElementLoad {
                    object: Box::new(object),
                    index: Box::new(key),
                });
                Ok(())
            }
            Expression::Binary(binary) => self.compile_binary(binary),
            Expression::Unary(unary) => self.compile_unary(unary),
            Expression::Call(call) => self.compile_call(call, CallPosition::Value),
            Expression::Function(function) => {
                self.compile_function(&function.params, &function.body)
            }
            Expression::Arrow(arrow) => match &arrow.body {
                ArrowBody::Block(body) => self.compile_function(&arrow.params, body),
                ArrowBody::Expression(_) => Err(CompileError::UnsupportedSyntax {
                    construct: "expression-bodied arrow function",
                }),
            },
            Expression::Array(elements) => self.compile_array(elements),
            Expression::Object(_) => Err(CompileError::UnsupportedSyntax {
                construct: "object literal",
            }),
        }
    }

    /// Interns a constant and pushes an undecided descriptor for it.
    /// Consumers that accept RK operands embed it directly; all others
    /// force a LOADK through [`consume`](Self::consume).
    fn push_constant(&mut self, constant: Constant) -> Result<()> {
        let index = self.context.find_or_create_const(constant);
        self.context.push(Operand::Const(index));
        Ok(())
    }

    fn compile_identifier(&mut self, identifier: &Identifier) -> Result<()> {
        match self.resolver.resolve(identifier, &mut self.context)? {
            Resolution::Direct(Operand::Register(source)) => {
                let target = self.context.use_register_and_push()?;
                self.context
                    .emit(Op::Move, target.register()?, i32::from(source), 0);
            }
            // constants and upvalues stay undecided until a consumer
            // forces materialization
            Resolution::Direct(operand) => self.context.push(operand),
            Resolution::Member { owner, key } => {
                let Operand::Upvalue(owner) = owner else {
                    return Err(CompileError::NotImplemented {
                        what: "member access on a non-upvalue owner",
                    });
                };
                let target = self.context.use_register_and_push()?;
                self.context.emit(
                    Op::GetTabUp,
                    target.register()?,
                    pool_index(owner),
                    pool_index(key),
                );
            }
            Resolution::MemberKey(key) => self.context.push(Operand::Const(key)),
        }
        Ok(())
    }

    /// Property access `a.b`: the property name is resolved as if it
    /// were an identifier scoped to the object's operand.
    fn compile_member(&mut self, member: &MemberExpression) -> Result<()> {
        self.compile_expression(&member.object)?;
        let key = self.resolve_property(&member.property)?;
        let Operand::Upvalue(owner) = self.context.pop()? else {
            return Err(CompileError::NotImplemented {
                what: "property access on a non-upvalue owner",
            });
        };
        let target = self.context.use_register_and_push()?;
        self.context.emit(
            Op::GetTabUp,
            target.register()?,
            pool_index(owner),
            pool_index(key),
        );
        Ok(())
    }

    /// Resolves a property name against the object operand currently on
    /// top of the stack, returning the name's constant-pool index.
    fn resolve_property(&mut self, property: &Identifier) -> Result<usize> {
        let owner = self.context.peek()?.clone();
        self.resolver.push_owner(owner);
        let resolution = self.resolver.resolve(property, &mut self.context);
        self.resolver.pop_owner();
        match resolution? {
            Resolution::MemberKey(key) => Ok(key),
            _ => Err(CompileError::NotImplemented {
                what: "property resolution outside an owner scope",
            }),
        }
    }

    fn compile_binary(&mut self, binary: &BinaryExpression) -> Result<()> {
        if binary.operator == BinaryOperator::Assign {
            return self.compile_assignment(binary);
        }
        let Some(op) = binary_opcode(binary.operator) else {
            return Err(CompileError::UnsupportedOperator {
                op: binary.operator.symbol(),
            });
        };

        // the right operand compiles and reduces first, so any register
        // it needs sits below the left's and frees stay in LIFO order
        self.compile_expression(&binary.right)?;
        let right = self.context.pop_deferred()?;
        let right = self.consume(right, true)?;
        self.compile_expression(&binary.left)?;
        let left = self.context.pop_deferred()?;
        let left = self.consume(left, true)?;

        let left_rk = left.register_or_index()?;
        let right_rk = right.register_or_index()?;
        self.context.release_register(&left);
        self.context.release_register(&right);
        let result = self.context.use_register_and_push()?;
        self.context.emit(op, result.register()?, left_rk, right_rk);
        Ok(())
    }

    fn compile_assignment(&mut self, binary: &BinaryExpression) -> Result<()> {
        // reduce the value before the target compiles, so a deferred
        // load's GETTABLE target cannot land above the target's
        // registers and break the LIFO free order
        self.compile_expression(&binary.right)?;
        let value = self.context.pop_deferred()?;
        let value = self.consume(value, true)?;
        self.context.push(value);
        let target = self.resolve_assignment_target(&binary.left)?;
        let value = self.context.pop_deferred()?;
        match target {
            AssignmentTarget::EnvironmentMember { owner, key } => {
                let value_rk = value.register_or_index()?;
                self.context.release_register(&value);
                self.context
                    .emit(Op::SetTabUp, pool_index(owner), pool_index(key), value_rk);
            }
            AssignmentTarget::Register(register) => {
                self.store_into(i32::from(register), value)?;
            }
            AssignmentTarget::Element { object, index } => {
                let object = self.force_register(object)?;
                let index = self.consume(index, true)?;
                self.context.emit(
                    Op::SetTable,
                    object.register()?,
                    index.register_or_index()?,
                    value.register_or_index()?,
                );
                // registers free top-down: the index's sit above the
                // object's, which sit above the value's
                self.context.release_register(&index);
                self.context.release_register(&object);
                self.context.release_register(&value);
            }
        }
        Ok(())
    }

    /// Compiles an assignment left-hand side as a store target instead
    /// of a value read.
    fn resolve_assignment_target(&mut self, expression: &Expression) -> Result<AssignmentTarget> {
        match expression {
            Expression::Identifier(identifier) => {
                match self.resolver.resolve(identifier, &mut self.context)? {
                    Resolution::Member {
                        owner: Operand::Upvalue(owner),
                        key,
                    } => Ok(AssignmentTarget::EnvironmentMember { owner, key }),
                    Resolution::Direct(Operand::Register(register)) => {
                        Ok(AssignmentTarget::Register(register))
                    }
                    _ => Err(CompileError::InvalidAssignmentTarget),
                }
            }
            Expression::Member(member) => {
                self.compile_expression(&member.object)?;
                let key = self.resolve_property(&member.property)?;
                let Operand::Upvalue(owner) = self.context.pop()? else {
                    return Err(CompileError::InvalidAssignmentTarget);
                };
                Ok(AssignmentTarget::EnvironmentMember { owner, key })
            }
            Expression::Index(index) => {
                self.compile_expression(&index.object)?;
                self.compile_expression(&index.index)?;
                let key = self.context.pop_deferred()?;
                let object = self.context.pop_deferred()?;
                Ok(AssignmentTarget::Element { object, index: key })
            }
            _ => Err(CompileError::InvalidAssignmentTarget),
        }
    }

    fn compile_unary(&mut self, unary: &UnaryExpression) -> Result<()> {
        let Some(op) = unary_opcode(unary.operator) else {
            return Err(CompileError::UnsupportedOperator {
                op: unary.operator.symbol(),
            });
        };
        self.compile_expression(&unary.argument)?;
        let operand = self.context.pop_deferred()?;
        let operand = self.force_register(operand)?;
        let source = operand.register()?;
        self.context.release_register(&operand);
        let result = self.context.use_register_and_push()?;
        self.context.emit(op, result.register()?, source, 0);
        Ok(())
    }

    fn compile_call(&mut self, call: &CallExpression, position: CallPosition) -> Result<()> {
        self.compile_expression(&call.callee)?;
        self.materialize_top()?;
        let function = self.context.peek()?.register()?;

        for argument in &call.arguments {
            self.compile_expression_at(argument, CallPosition::Argument)?;
            self.materialize_top()?;
        }

        let return_count = match position {
            CallPosition::Statement => 1,
            CallPosition::Argument => 0,
            CallPosition::Value => 2,
        };
        self.context.emit(
            Op::Call,
            function,
            call.arguments.len() as i32 + 1,
            return_count,
        );

        for _ in &call.arguments {
            self.context.pop()?;
        }
        if position == CallPosition::Statement {
            // no result requested; free the callee register too
            self.context.pop()?;
        }
        Ok(())
    }

    /// Dispatches an expression with its call position, so nested calls
    /// pick the argument-position return-count rule.
    fn compile_expression_at(
        &mut self,
        expression: &Expression,
        position: CallPosition,
    ) -> Result<()> {
        match expression {
            Expression::Call(call) => self.compile_call(call, position),
            _ => self.compile_expression(expression),
        }
    }

    fn compile_array(&mut self, elements: &[Expression]) -> Result<()> {
        if elements.len() > MAX_TABLE_ELEMENTS {
            return Err(CompileError::TooManyElements {
                count: elements.len(),
                max: MAX_TABLE_ELEMENTS,
            });
        }
        let table = self.context.use_register_and_push()?;
        let table_register = table.register()?;
        self.context
            .emit(Op::NewTable, table_register, elements.len() as i32, 0);

        let Some((first, rest)) = elements.split_first() else {
            return Ok(());
        };

        if !rest.is_empty() {
            for element in rest {
                self.compile_expression_at(element, CallPosition::Argument)?;
                self.materialize_top()?;
            }
            for _ in rest {
                self.context.pop()?;
            }
            self.context
                .emit(Op::SetList, table_register, rest.len() as i32, 1);
        }

        // index 0 is set individually; SETLIST batches start at index 1
        let zero = self.context.find_or_create_const(Constant::Integer(0));
        self.compile_expression_at(first, CallPosition::Argument)?;
        let value = self.context.pop_deferred()?;
        let value = self.consume(value, true)?;
        let value_rk = value.register_or_index()?;
        self.context.release_register(&value);
        self.context
            .emit(Op::SetTable, table_register, pool_index(zero), value_rk);
        Ok(())
    }

    // ---- operand plumbing ----

    /// Reduces an operand descriptor into one an instruction field can
    /// carry. Constants stay symbolic when the consumer accepts RK
    /// operands; a deferred element load collapses into a GETTABLE.
    fn consume(&mut self, operand: Operand, allow_const: bool) -> Result<Operand> {
        match operand {
            Operand::Register(_) | Operand::Upvalue(_) => Ok(operand),
            Operand::Const(_) if allow_const => Ok(operand),
            Operand::Const(index) => {
                let target = self.context.use_register()?;
                self.context
                    .emit(Op::LoadK, target.register()?, pool_index(index), 0);
                Ok(target)
            }
            Operand::PendingElementLoad { object, index } => {
                let object = self.force_register(*object)?;
                let index = self.consume(*index, true)?;
                let object_register = object.register()?;
                let index_rk = index.register_or_index()?;
                self.context.release_register(&index);
                self.context.release_register(&object);
                let target = self.context.use_register()?;
                self.context
                    .emit(Op::GetTable, target.register()?, object_register, index_rk);
                Ok(target)
            }
            Operand::Closure(_) => Err(CompileError::NotImplemented {
                what: "closure value outside a declaration store",
            }),
        }
    }

    /// Like [`consume`](Self::consume), but guarantees a register:
    /// upvalues are fetched with GETUPVAL.
    fn force_register(&mut self, operand: Operand) -> Result<Operand> {
        let operand = self.consume(operand, false)?;
        match operand {
            Operand::Upvalue(index) => {
                let target = self.context.use_register()?;
                self.context
                    .emit(Op::GetUpval, target.register()?, pool_index(index), 0);
                Ok(target)
            }
            other => Ok(other),
        }
    }

    /// Ensures the top stack descriptor is register-resident, promoting
    /// it into the next free register if not. The descriptor stays on
    /// the stack so its register stays pinned for adjacency.
    fn materialize_top(&mut self) -> Result<()> {
        if matches!(self.context.peek()?, Operand::Register(_)) {
            return Ok(());
        }
        let operand = self.context.pop_deferred()?;
        let operand = self.force_register(operand)?;
        self.context.push(operand);
        Ok(())
    }

    /// Stores `value` into a specific register.
    fn store_into(&mut self, target: i32, value: Operand) -> Result<()> {
        match value {
            Operand::Register(source) => {
                self.context.emit(Op::Move, target, i32::from(source), 0);
                self.context.release_register(&value);
            }
            Operand::Const(index) => {
                self.context.emit(Op::LoadK, target, pool_index(index), 0);
            }
            Operand::Upvalue(index) => {
                self.context.emit(Op::GetUpval, target, pool_index(index), 0);
            }
            other => {
                let source = self.force_register(other)?;
                let register = source.register()?;
                self.context.release_register(&source);
                self.context.emit(Op::Move, target, register, 0);
            }
        }
        Ok(())
    }

    /// Stores `value` into the environment table under the name
    /// constant `key`.
    fn store_to_environment(&mut self, key: usize, value: Operand) -> Result<()> {
        let value = self.consume(value, true)?;
        let value_rk = value.register_or_index()?;
        self.context.release_register(&value);
        let env = self.context.find_or_create_upvalue(ENV_NAME);
        self.context
            .emit(Op::SetTabUp, pool_index(env), pool_index(key), value_rk);
        Ok(())
    }
}

// ---- serialization ----

/// Writes the fixed chunk header.
fn emit_header(writer: &mut BinaryWriter) {
    writer.write_bytes(&LUAC_SIGNATURE);
    writer.write_byte(LUAC_VERSION);
    writer.write_byte(LUAC_FORMAT);
    writer.write_bytes(&LUAC_DATA);
    writer.write_bytes(&LUAC_SIZES);
    writer.write_integer(LUAC_INT);
    writer.write_number(LUAC_NUM);
}

/// Writes one function-prototype record, recursing into nested
/// prototypes. The debug block is always the three empty counts; real
/// line data has no serialization rule yet.
fn emit_function(writer: &mut BinaryWriter, context: &FunctionContext) -> Result<()> {
    if !context.line_info.is_empty() {
        return Err(CompileError::NotImplemented {
            what: "line debug information",
        });
    }

    writer.write_string(None); // source name
    writer.write_int(0); // linedefined
    writer.write_int(0); // lastlinedefined
    writer.write_byte(context.num_params);
    writer.write_byte(u8::from(context.is_vararg));
    writer.write_byte(context.max_stack_size);

    writer.write_int(context.code.len() as i32);
    for instruction in &context.code {
        writer.write_instruction(encode(instruction));
    }

    writer.write_int(context.constants.len() as i32);
    for constant in &context.constants {
        match constant {
            Constant::Nil => writer.write_byte(lua_type::NIL),
            Constant::Boolean(value) => {
                writer.write_byte(lua_type::BOOLEAN);
                writer.write_byte(u8::from(*value));
            }
            Constant::Integer(value) => {
                writer.write_byte(lua_type::NUMINT);
                writer.write_integer(*value);
            }
            Constant::Float(value) => {
                writer.write_byte(lua_type::NUMFLT);
                writer.write_number(*value);
            }
            Constant::String(value) => {
                writer.write_byte(if value.len() > 255 {
                    lua_type::LNGSTR
                } else {
                    lua_type::SHRSTR
                });
                writer.write_string(Some(value));
            }
        }
    }

    writer.write_int(context.upvalues.len() as i32);
    for (index, upvalue) in context.upvalues.iter().enumerate() {
        writer.write_byte(u8::from(upvalue.in_stack));
        writer.write_byte(index as u8);
    }

    writer.write_int(context.protos.len() as i32);
    for proto in &context.protos {
        emit_function(writer, proto)?;
    }

    // debug block: line info, locals, upvalue names
    writer.write_int(0);
    writer.write_int(0);
    writer.write_int(0);
    Ok(())
}
