// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-function compile-time state.
//!
//! A [`FunctionContext`] owns everything one function compiles to: its
//! instruction buffer, interned constant pool, interned upvalue table,
//! locals, nested prototypes, and the operand/register stacks the
//! emitter works with. Contexts form a tree owned top-down; the root is
//! the whole program.
//!
//! The register file is modeled as a growing stack projected onto the
//! VM's register machine: transient registers are allocated and freed in
//! strict LIFO order mirroring expression nesting, while locals keep
//! their register for the rest of the function.

use crate::compiler::opcodes::{self, Instruction, Op};
use crate::error::{CompileError, Result};

/// Registers one function frame can address. Instruction register
/// fields are eight bits wide, and index 255 is reserved so the
/// used-register count itself stays encodable.
pub const MAX_REGISTERS: u8 = 255;

/// A constant-pool entry.
///
/// Interned per function by structural equality: an integer `5` and a
/// float `5.0` are distinct entries.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// nil
    Nil,
    /// A boolean
    Boolean(bool),
    /// An integer number
    Integer(i64),
    /// A float number
    Float(f64),
    /// A string
    String(String),
}

/// An upvalue captured by a function.
#[derive(Debug, Clone, PartialEq)]
pub struct Upvalue {
    /// The captured name
    pub name: String,
    /// Whether it is captured from the enclosing function's register
    /// stack (true only in the root context) or relayed from the
    /// enclosing function's own upvalue list.
    pub in_stack: bool,
}

/// A named local bound to a register for the rest of the function.
#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    /// The variable name
    pub name: String,
    /// The register it occupies
    pub register: u8,
}

/// Where an in-progress expression's result currently lives.
///
/// Descriptors are produced and consumed strictly within one
/// statement's compilation; each one pushed onto the operand stack is
/// popped exactly once, either into an instruction operand or promoted
/// into a register.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// In a register
    Register(u8),
    /// A constant-pool reference, not yet materialized
    Const(usize),
    /// An upvalue reference
    Upvalue(usize),
    /// A nested prototype awaiting its closure-creation instruction
    Closure(usize),
    /// A deferred table access, reduced to a GETTABLE only when a
    /// consumer needs the value
    PendingElementLoad {
        /// The table operand
        object: Box<Operand>,
        /// The key operand
        index: Box<Operand>,
    },
}

impl Operand {
    /// The register index, for instruction fields that accept only
    /// registers.
    pub fn register(&self) -> Result<i32> {
        match self {
            Operand::Register(register) => Ok(i32::from(*register)),
            _ => Err(CompileError::NotImplemented {
                what: "operand is not register-resident",
            }),
        }
    }

    /// The register index or negative pool sentinel, for RK, upvalue,
    /// and prototype instruction fields.
    pub fn register_or_index(&self) -> Result<i32> {
        match self {
            Operand::Register(register) => Ok(i32::from(*register)),
            Operand::Const(index) | Operand::Upvalue(index) | Operand::Closure(index) => {
                Ok(opcodes::pool_index(*index))
            }
            Operand::PendingElementLoad { .. } => Err(CompileError::NotImplemented {
                what: "pending element load used as a direct operand",
            }),
        }
    }
}

/// Compile-time state of one function.
#[derive(Debug)]
pub struct FunctionContext {
    /// The instruction buffer, in program order
    pub code: Vec<Instruction>,
    /// The interned constant pool
    pub constants: Vec<Constant>,
    /// The interned upvalue table
    pub upvalues: Vec<Upvalue>,
    /// Named locals (block-scoped declarations)
    pub locals: Vec<Local>,
    /// Nested prototypes, in creation order
    pub protos: Vec<FunctionContext>,
    /// Per-instruction line numbers; debug plumbing is a stub and this
    /// stays empty
    pub line_info: Vec<i32>,
    /// High-water mark of register usage; never decreases
    pub max_stack_size: u8,
    /// Number of declared parameters
    pub num_params: u8,
    /// Whether the function accepts varargs (the program root only)
    pub is_vararg: bool,
    /// Whether this context has a lexically enclosing function
    pub is_nested: bool,
    stack: Vec<Operand>,
    used_registers: u8,
}

impl FunctionContext {
    /// Creates a fresh context. `is_nested` is true for every context
    /// except the program root.
    pub fn new(is_nested: bool) -> Self {
        Self {
            code: Vec::new(),
            constants: Vec::new(),
            upvalues: Vec::new(),
            locals: Vec::new(),
            protos: Vec::new(),
            line_info: Vec::new(),
            // the VM requires at least two stack slots per frame
            max_stack_size: 2,
            num_params: 0,
            is_vararg: false,
            is_nested,
            stack: Vec::new(),
            used_registers: 0,
        }
    }

    /// Appends an instruction to the code buffer.
    pub fn emit(&mut self, op: Op, a: i32, b: i32, c: i32) {
        self.code.push(Instruction::new(op, a, b, c));
    }

    /// Reserves the next free register, raising the high-water mark,
    /// and pushes a descriptor bound to it onto the operand stack.
    pub fn use_register_and_push(&mut self) -> Result<Operand> {
        let register = self.allocate_register()?;
        let operand = Operand::Register(register);
        self.stack.push(operand.clone());
        Ok(operand)
    }

    /// Reserves the next free register without touching the operand
    /// stack.
    pub fn use_register(&mut self) -> Result<Operand> {
        Ok(Operand::Register(self.allocate_register()?))
    }

    fn allocate_register(&mut self) -> Result<u8> {
        if self.used_registers == MAX_REGISTERS {
            return Err(CompileError::TooManyRegisters {
                max: MAX_REGISTERS,
            });
        }
        let register = self.used_registers;
        self.used_registers += 1;
        if self.used_registers > self.max_stack_size {
            self.max_stack_size = self.used_registers;
        }
        Ok(register)
    }

    /// Frees the register held by `operand` if it is the top of the
    /// register stack. Registers are released in strict LIFO order.
    /// A deferred element load releases its index and object operands,
    /// which still pin their registers.
    pub fn release_register(&mut self, operand: &Operand) {
        match operand {
            Operand::Register(register) if register + 1 == self.used_registers => {
                self.used_registers -= 1;
            }
            Operand::PendingElementLoad { object, index } => {
                self.release_register(index);
                self.release_register(object);
            }
            _ => {}
        }
    }

    /// Pushes an operand descriptor.
    pub fn push(&mut self, operand: Operand) {
        self.stack.push(operand);
    }

    /// Pops the top operand descriptor, releasing its register when it
    /// holds the top transient one.
    ///
    /// Popping an empty stack is a fatal internal-consistency error:
    /// it indicates an emitter bug, never a user error.
    pub fn pop(&mut self) -> Result<Operand> {
        let operand = self.stack.pop().ok_or(CompileError::StackUnderflow)?;
        self.release_register(&operand);
        Ok(operand)
    }

    /// Pops the top operand descriptor without releasing any register
    /// it holds. Used when the descriptor is folded into a deferred
    /// load, or handed to a consumer that manages the release itself.
    pub fn pop_deferred(&mut self) -> Result<Operand> {
        self.stack.pop().ok_or(CompileError::StackUnderflow)
    }

    /// The top operand descriptor, without popping.
    pub fn peek(&self) -> Result<&Operand> {
        self.stack.last().ok_or(CompileError::StackUnderflow)
    }

    /// Current operand stack depth.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of registers currently reserved.
    pub fn used_registers(&self) -> u8 {
        self.used_registers
    }

    /// Binds `name` to the next register for the remainder of the
    /// function. Unlike transient allocations, the binding is never
    /// released.
    pub fn create_local(&mut self, name: &str) -> Result<Operand> {
        let operand = self.use_register()?;
        if let Operand::Register(register) = &operand {
            self.locals.push(Local {
                name: name.to_string(),
                register: *register,
            });
        }
        Ok(operand)
    }

    /// Interns `value` in the constant pool, returning its index.
    /// Structurally equal constants share one slot.
    pub fn find_or_create_const(&mut self, value: Constant) -> usize {
        if let Some(index) = self.constants.iter().position(|c| *c == value) {
            return index;
        }
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Interns `name` in the upvalue table, returning its index.
    pub fn find_or_create_upvalue(&mut self, name: &str) -> usize {
        if let Some(index) = self.upvalues.iter().position(|u| u.name == name) {
            return index;
        }
        self.upvalues.push(Upvalue {
            name: name.to_string(),
            in_stack: !self.is_nested,
        });
        self.upvalues.len() - 1
    }

    /// Registers a finished child context as a numbered prototype.
    pub fn create_proto(&mut self, child: FunctionContext) -> usize {
        self.protos.push(child);
        self.protos.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_allocation_is_lifo() {
        let mut context = FunctionContext::new(false);
        let first = context.use_register_and_push().unwrap();
        let second = context.use_register_and_push().unwrap();
        assert_eq!(first, Operand::Register(0));
        assert_eq!(second, Operand::Register(1));

        assert_eq!(context.pop().unwrap(), Operand::Register(1));
        assert_eq!(context.used_registers(), 1);
        assert_eq!(context.pop().unwrap(), Operand::Register(0));
        assert_eq!(context.used_registers(), 0);

        // freed registers are reused
        assert_eq!(
            context.use_register_and_push().unwrap(),
            Operand::Register(0)
        );
    }

    #[test]
    fn test_register_file_exhaustion_is_an_error() {
        let mut context = FunctionContext::new(false);
        for expected in 0..MAX_REGISTERS {
            assert_eq!(
                context.use_register().unwrap(),
                Operand::Register(expected)
            );
        }
        assert_eq!(
            context.use_register(),
            Err(CompileError::TooManyRegisters { max: MAX_REGISTERS })
        );
        // a freed slot makes allocation possible again
        context.release_register(&Operand::Register(MAX_REGISTERS - 1));
        assert_eq!(
            context.use_register().unwrap(),
            Operand::Register(MAX_REGISTERS - 1)
        );
    }

    #[test]
    fn test_max_stack_size_never_decreases() {
        let mut context = FunctionContext::new(false);
        assert_eq!(context.max_stack_size, 2);
        for _ in 0..5 {
            context.use_register_and_push().unwrap();
        }
        assert_eq!(context.max_stack_size, 5);
        for _ in 0..5 {
            context.pop().unwrap();
        }
        assert_eq!(context.max_stack_size, 5);
    }

    #[test]
    fn test_pop_empty_stack_is_underflow() {
        let mut context = FunctionContext::new(false);
        assert_eq!(context.pop(), Err(CompileError::StackUnderflow));
    }

    #[test]
    fn test_constant_interning() {
        let mut context = FunctionContext::new(false);
        let a = context.find_or_create_const(Constant::Integer(5));
        let b = context.find_or_create_const(Constant::String("five".into()));
        let c = context.find_or_create_const(Constant::Integer(5));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(context.constants.len(), 2);
    }

    #[test]
    fn test_integer_and_float_constants_are_distinct() {
        let mut context = FunctionContext::new(false);
        let int = context.find_or_create_const(Constant::Integer(5));
        let float = context.find_or_create_const(Constant::Float(5.0));
        assert_ne!(int, float);
        assert_eq!(context.constants.len(), 2);
    }

    #[test]
    fn test_upvalue_interning_and_instack_flag() {
        let mut root = FunctionContext::new(false);
        let a = root.find_or_create_upvalue("_ENV");
        let b = root.find_or_create_upvalue("_ENV");
        assert_eq!(a, b);
        assert_eq!(root.upvalues.len(), 1);
        assert!(root.upvalues[0].in_stack);

        let mut nested = FunctionContext::new(true);
        nested.find_or_create_upvalue("_ENV");
        assert!(!nested.upvalues[0].in_stack);
    }

    #[test]
    fn test_create_local_is_not_released_by_pop() {
        let mut context = FunctionContext::new(false);
        let local = context.create_local("x").unwrap();
        assert_eq!(local, Operand::Register(0));
        assert_eq!(context.locals.len(), 1);
        // the local's register stays reserved; only stack pops release
        assert_eq!(context.used_registers(), 1);
    }

    #[test]
    fn test_popping_a_deferred_load_releases_its_registers() {
        let mut context = FunctionContext::new(false);
        let object = context.use_register().unwrap();
        let index = context.use_register().unwrap();
        context.push(Operand::PendingElementLoad {
            object: Box::new(object),
            index: Box::new(index),
        });
        assert_eq!(context.used_registers(), 2);
        context.pop().unwrap();
        assert_eq!(context.used_registers(), 0);
    }

    #[test]
    fn test_pop_deferred_keeps_registers_pinned() {
        let mut context = FunctionContext::new(false);
        context.use_register_and_push().unwrap();
        assert_eq!(context.pop_deferred().unwrap(), Operand::Register(0));
        assert_eq!(context.used_registers(), 1);
    }

    #[test]
    fn test_operand_register_or_index_sentinels() {
        assert_eq!(Operand::Register(3).register_or_index().unwrap(), 3);
        assert_eq!(Operand::Const(0).register_or_index().unwrap(), -1);
        assert_eq!(Operand::Upvalue(1).register_or_index().unwrap(), -2);
        assert!(Operand::Const(0).register().is_err());
    }
}
