// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lua 5.3 instruction set: opcode numbering, operand layouts, and the
//! bit packing that produces the 4-byte instruction words the VM loads.
//!
//! The layout is the reference VM's:
//!
//! ```text
//! iABC:   | B: 9 bits | C: 9 bits | A: 8 bits | opcode: 6 bits |
//! iABx:   |      Bx: 18 bits      | A: 8 bits | opcode: 6 bits |
//! iAsBx:  |     sBx: 18 bits      | A: 8 bits | opcode: 6 bits |
//! iAx:    |            Ax: 26 bits            | opcode: 6 bits |
//! ```
//!
//! In-memory instructions carry constant-pool, upvalue, and prototype
//! references as negative sentinels `-(index + 1)`; the packer rewrites
//! them according to each field's kind (RK fields get the constant bit,
//! index fields get the bare index).

use crate::ast::{BinaryOperator, UnaryOperator};

/// Lua 5.3 opcodes, numbered exactly as the reference VM defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Op {
    Move = 0,
    LoadK = 1,
    LoadKx = 2,
    LoadBool = 3,
    LoadNil = 4,
    GetUpval = 5,
    GetTabUp = 6,
    GetTable = 7,
    SetTabUp = 8,
    SetUpval = 9,
    SetTable = 10,
    NewTable = 11,
    SelfOp = 12,
    Add = 13,
    Sub = 14,
    Mul = 15,
    Mod = 16,
    Pow = 17,
    Div = 18,
    IDiv = 19,
    BAnd = 20,
    BOr = 21,
    BXor = 22,
    Shl = 23,
    Shr = 24,
    Unm = 25,
    BNot = 26,
    Not = 27,
    Len = 28,
    Concat = 29,
    Jmp = 30,
    Eq = 31,
    Lt = 32,
    Le = 33,
    Test = 34,
    TestSet = 35,
    Call = 36,
    TailCall = 37,
    Return = 38,
    ForLoop = 39,
    ForPrep = 40,
    TForCall = 41,
    TForLoop = 42,
    SetList = 43,
    Closure = 44,
    Vararg = 45,
    ExtraArg = 46,
}

/// A single in-memory instruction: an opcode plus up to three operands.
///
/// Immutable once appended to a function's code buffer. Operands are
/// register indices, negative pool sentinels, or signed jump offsets,
/// depending on the opcode's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The opcode
    pub op: Op,
    /// The A operand
    pub a: i32,
    /// The B operand (Bx/sBx for the wide layouts)
    pub b: i32,
    /// The C operand
    pub c: i32,
}

impl Instruction {
    /// Creates a new instruction.
    pub fn new(op: Op, a: i32, b: i32, c: i32) -> Self {
        Self { op, a, b, c }
    }
}

/// Converts a pool index into the negative operand sentinel.
pub fn pool_index(index: usize) -> i32 {
    -(index as i32) - 1
}

/// Operand packing mode of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    /// Three fields: A, B, C
    ABC,
    /// A plus an 18-bit unsigned Bx
    ABx,
    /// A plus an 18-bit signed sBx
    AsBx,
    /// A single 26-bit Ax
    Ax,
}

/// How an operand field's sentinel values are rewritten when packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    /// Field is not used by this opcode
    Unused,
    /// Plain unsigned value (counts, flags, sizes)
    Plain,
    /// A register index
    Reg,
    /// Register or constant: negative sentinels get the constant bit
    RegOrConst,
    /// Bare pool index (constants in Bx, upvalues, prototypes)
    Index,
}

/// Operand layout of one opcode.
#[derive(Debug, Clone, Copy)]
struct OpLayout {
    mode: OpMode,
    a: FieldKind,
    b: FieldKind,
    c: FieldKind,
}

const fn layout(mode: OpMode, a: FieldKind, b: FieldKind, c: FieldKind) -> OpLayout {
    OpLayout { mode, a, b, c }
}

/// The per-opcode operand layout table.
fn op_layout(op: Op) -> OpLayout {
    use FieldKind::*;
    use OpMode::*;
    match op {
        Op::Move => layout(ABC, Reg, Reg, Unused),
        Op::LoadK => layout(ABx, Reg, Index, Unused),
        Op::LoadKx => layout(ABx, Reg, Unused, Unused),
        Op::LoadBool => layout(ABC, Reg, Plain, Plain),
        Op::LoadNil => layout(ABC, Reg, Plain, Unused),
        Op::GetUpval => layout(ABC, Reg, Index, Unused),
        Op::GetTabUp => layout(ABC, Reg, Index, RegOrConst),
        Op::GetTable => layout(ABC, Reg, Reg, RegOrConst),
        Op::SetTabUp => layout(ABC, Index, RegOrConst, RegOrConst),
        Op::SetUpval => layout(ABC, Reg, Index, Unused),
        Op::SetTable => layout(ABC, Reg, RegOrConst, RegOrConst),
        Op::NewTable => layout(ABC, Reg, Plain, Plain),
        Op::SelfOp => layout(ABC, Reg, Reg, RegOrConst),
        Op::Add
        | Op::Sub
        | Op::Mul
        | Op::Mod
        | Op::Pow
        | Op::Div
        | Op::IDiv
        | Op::BAnd
        | Op::BOr
        | Op::BXor
        | Op::Shl
        | Op::Shr => layout(ABC, Reg, RegOrConst, RegOrConst),
        Op::Unm | Op::BNot | Op::Not | Op::Len => layout(ABC, Reg, Reg, Unused),
        Op::Concat => layout(ABC, Reg, Reg, Reg),
        Op::Jmp => layout(AsBx, Plain, Plain, Unused),
        Op::Eq | Op::Lt | Op::Le => layout(ABC, Plain, RegOrConst, RegOrConst),
        Op::Test => layout(ABC, Reg, Unused, Plain),
        Op::TestSet => layout(ABC, Reg, Reg, Plain),
        Op::Call => layout(ABC, Reg, Plain, Plain),
        Op::TailCall => layout(ABC, Reg, Plain, Unused),
        Op::Return => layout(ABC, Reg, Plain, Unused),
        Op::ForLoop | Op::ForPrep | Op::TForLoop => layout(AsBx, Reg, Plain, Unused),
        Op::TForCall => layout(ABC, Reg, Unused, Plain),
        Op::SetList => layout(ABC, Reg, Plain, Plain),
        Op::Closure => layout(ABx, Reg, Index, Unused),
        Op::Vararg => layout(ABC, Reg, Plain, Unused),
        Op::ExtraArg => layout(Ax, Plain, Unused, Unused),
    }
}

/// Bit position of the A field.
const POS_A: u32 = 6;
/// Bit position of the C field.
const POS_C: u32 = 14;
/// Bit position of the B field.
const POS_B: u32 = 23;
/// Bit position of the Bx/sBx/Ax fields.
const POS_BX: u32 = 14;
/// The constant marker bit of RK fields.
const BIT_RK: u32 = 1 << 8;
/// Bias added to sBx so it packs as an unsigned field.
const MAX_SBX: i32 = (1 << 17) - 1;

fn pack_field(value: i32, kind: FieldKind) -> u32 {
    match kind {
        FieldKind::Unused | FieldKind::Plain | FieldKind::Reg => value as u32,
        FieldKind::RegOrConst => {
            if value < 0 {
                BIT_RK | (-value - 1) as u32
            } else {
                value as u32
            }
        }
        FieldKind::Index => {
            if value < 0 {
                (-value - 1) as u32
            } else {
                value as u32
            }
        }
    }
}

/// Packs an instruction into the 4-byte word the VM's loader expects.
pub fn encode(instruction: &Instruction) -> u32 {
    let l = op_layout(instruction.op);
    let op = instruction.op as u32;
    let a = pack_field(instruction.a, l.a);
    match l.mode {
        OpMode::ABC => {
            op | (a << POS_A)
                | (pack_field(instruction.c, l.c) << POS_C)
                | (pack_field(instruction.b, l.b) << POS_B)
        }
        OpMode::ABx => op | (a << POS_A) | (pack_field(instruction.b, l.b) << POS_BX),
        OpMode::AsBx => op | (a << POS_A) | (((instruction.b + MAX_SBX) as u32) << POS_BX),
        OpMode::Ax => op | (a << POS_A),
    }
}

/// Value-type tags used in the constant section of a dumped chunk.
pub mod lua_type {
    /// nil
    pub const NIL: u8 = 0x00;
    /// boolean
    pub const BOOLEAN: u8 = 0x01;
    /// float number
    pub const NUMFLT: u8 = 0x03;
    /// integer number
    pub const NUMINT: u8 = 0x13;
    /// short string
    pub const SHRSTR: u8 = 0x04;
    /// long string
    pub const LNGSTR: u8 = 0x14;
}

/// The binary operator-to-opcode table.
///
/// Comparison and logical operators have no entry: they compile to
/// jump pairs on this VM and that path is not implemented. `|` is
/// registered so the bitwise surface is complete; integer-divide still
/// has no source-level spelling here.
pub fn binary_opcode(operator: BinaryOperator) -> Option<Op> {
    match operator {
        BinaryOperator::Add => Some(Op::Add),
        BinaryOperator::Subtract => Some(Op::Sub),
        BinaryOperator::Multiply => Some(Op::Mul),
        BinaryOperator::Modulo => Some(Op::Mod),
        BinaryOperator::Exponent => Some(Op::Pow),
        BinaryOperator::Divide => Some(Op::Div),
        BinaryOperator::BitwiseAnd => Some(Op::BAnd),
        BinaryOperator::BitwiseOr => Some(Op::BOr),
        BinaryOperator::BitwiseXor => Some(Op::BXor),
        BinaryOperator::LeftShift => Some(Op::Shl),
        // the VM has no unsigned shift; both map to SHR
        BinaryOperator::RightShift | BinaryOperator::UnsignedRightShift => Some(Op::Shr),
        _ => None,
    }
}

/// The unary operator-to-opcode table.
pub fn unary_opcode(operator: UnaryOperator) -> Option<Op> {
    match operator {
        UnaryOperator::Minus => Some(Op::Unm),
        UnaryOperator::BitwiseNot => Some(Op::BNot),
        UnaryOperator::LogicalNot => Some(Op::Not),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_move() {
        // MOVE R1 <- R0
        let word = encode(&Instruction::new(Op::Move, 1, 0, 0));
        assert_eq!(word, 1 << 6);
    }

    #[test]
    fn test_encode_loadk_bx_sentinel() {
        // LOADK R2 <- K5, carried as the sentinel -6
        let word = encode(&Instruction::new(Op::LoadK, 2, pool_index(5), 0));
        assert_eq!(word, 1 | (2 << 6) | (5 << 14));
    }

    #[test]
    fn test_encode_add_rk_constant() {
        // ADD R2 <- R0 + K1
        let word = encode(&Instruction::new(Op::Add, 2, 0, pool_index(1)));
        assert_eq!(word, 13 | (2 << 6) | ((0x100 | 1) << 14));
    }

    #[test]
    fn test_encode_gettabup() {
        // GETTABUP R0 <- U0[K0]
        let word = encode(&Instruction::new(Op::GetTabUp, 0, pool_index(0), pool_index(0)));
        assert_eq!(word, 6 | (0x100 << 14));
    }

    #[test]
    fn test_encode_settabup() {
        // SETTABUP U0[K0] <- R0
        let word = encode(&Instruction::new(
            Op::SetTabUp,
            pool_index(0),
            pool_index(0),
            0,
        ));
        assert_eq!(word, 8 | ((0x100u32) << 23));
    }

    #[test]
    fn test_encode_return_no_value() {
        // RETURN A=0 B=1
        let word = encode(&Instruction::new(Op::Return, 0, 1, 0));
        assert_eq!(word, 38 | (1 << 23));
    }

    #[test]
    fn test_encode_jmp_sbx_bias() {
        let word = encode(&Instruction::new(Op::Jmp, 0, -1, 0));
        assert_eq!(word, 30 | (131070 << 14));
    }

    #[test]
    fn test_opcode_numbering_matches_vm() {
        assert_eq!(Op::Move as u8, 0);
        assert_eq!(Op::GetTabUp as u8, 6);
        assert_eq!(Op::SetTabUp as u8, 8);
        assert_eq!(Op::Add as u8, 13);
        assert_eq!(Op::Shr as u8, 24);
        assert_eq!(Op::Call as u8, 36);
        assert_eq!(Op::Return as u8, 38);
        assert_eq!(Op::SetList as u8, 43);
        assert_eq!(Op::Closure as u8, 44);
        assert_eq!(Op::ExtraArg as u8, 46);
    }

    #[test]
    fn test_binary_opcode_table() {
        assert_eq!(binary_opcode(BinaryOperator::Add), Some(Op::Add));
        assert_eq!(binary_opcode(BinaryOperator::Modulo), Some(Op::Mod));
        assert_eq!(binary_opcode(BinaryOperator::BitwiseOr), Some(Op::BOr));
        assert_eq!(
            binary_opcode(BinaryOperator::UnsignedRightShift),
            Some(Op::Shr)
        );
        // comparisons and logical operators are intentionally absent
        assert_eq!(binary_opcode(BinaryOperator::Equal), None);
        assert_eq!(binary_opcode(BinaryOperator::LessThan), None);
        assert_eq!(binary_opcode(BinaryOperator::LogicalAnd), None);
        assert_eq!(binary_opcode(BinaryOperator::Assign), None);
    }

    #[test]
    fn test_unary_opcode_table() {
        assert_eq!(unary_opcode(UnaryOperator::Minus), Some(Op::Unm));
        assert_eq!(unary_opcode(UnaryOperator::BitwiseNot), Some(Op::BNot));
        assert_eq!(unary_opcode(UnaryOperator::LogicalNot), Some(Op::Not));
        assert_eq!(unary_opcode(UnaryOperator::Typeof), None);
    }
}
