use std::fmt;

use bytes::{Buf, Bytes};
use runtime::{error::Throwable, internal, object::value::Value, vm::VM};
use support::bytes_ext::SafeBuf;

use crate::frame::Frame;

mod invoke;
mod load_store;
mod ops;

pub enum Progression {
    JumpRel(i32),
    Next,
    /// Enter a new frame. The current one resumes at its next instruction.
    Call(Frame),
    Return(Option<Value>),
}

pub trait Instruction: fmt::Debug {
    fn handle(&self, _vm: &mut VM, _frame: &mut Frame) -> Result<Progression, Throwable> {
        Ok(Progression::Next)
    }
}

/// Utility to box a value. Used below to box each instruction that we decode
fn b<T>(v: T) -> Box<T> {
    Box::new(v)
}

/// Decode the instruction at `pc`, returning it and its length in bytes.
pub fn decode_instruction(code: &[u8], pc: usize) -> Result<(Box<dyn Instruction>, usize), Throwable> {
    let slice = code
        .get(pc..)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| internal!("execution fell off the end of the code at {}", pc))?;

    let mut bytes = Bytes::copy_from_slice(slice);
    let before = bytes.remaining();
    let opcode = bytes.try_get_u8()?;

    let instruction: Box<dyn Instruction> = match opcode {
        0x00 => b(ops::Nop),

        // Constants
        0x01 => b(ops::PushConst { value: Value::null() }),
        0x02..=0x08 => b(ops::PushConst {
            value: Value::Int(opcode as i32 - 0x03),
        }),
        0x09 => b(ops::PushConst { value: Value::Long(0) }),
        0x0a => b(ops::PushConst { value: Value::Long(1) }),
        0x0b => b(ops::PushConst { value: Value::Float(0.0) }),
        0x0c => b(ops::PushConst { value: Value::Float(1.0) }),
        0x0d => b(ops::PushConst { value: Value::Float(2.0) }),
        0x0e => b(ops::PushConst { value: Value::Double(0.0) }),
        0x0f => b(ops::PushConst { value: Value::Double(1.0) }),
        0x10 => b(ops::PushConst {
            value: Value::Int(bytes.try_get_i8()? as i32),
        }),
        0x11 => b(ops::PushConst {
            // The intermediate value is then sign-extended to an int value.
            value: Value::Int(bytes.try_get_i16()? as i32),
        }),
        0x12 => b(ops::Ldc {
            index: bytes.try_get_u8()? as u16,
        }),
        0x13 => b(ops::Ldc {
            index: bytes.try_get_u16()?,
        }),
        0x14 => b(ops::Ldc2W {
            index: bytes.try_get_u16()?,
        }),

        // Loads: iload, lload, fload, dload, aload
        0x15 | 0x17 | 0x19 => b(load_store::Load {
            index: bytes.try_get_u8()? as usize,
            size: 1,
        }),
        0x16 | 0x18 => b(load_store::Load {
            index: bytes.try_get_u8()? as usize,
            size: 2,
        }),
        // Implicit index, one slot
        0x1a..=0x1d => b(load_store::Load {
            index: (opcode - 0x1a) as usize,
            size: 1,
        }),
        0x22..=0x25 => b(load_store::Load {
            index: (opcode - 0x22) as usize,
            size: 1,
        }),
        0x2a..=0x2d => b(load_store::Load {
            index: (opcode - 0x2a) as usize,
            size: 1,
        }),
        // Implicit index, two slots
        0x1e..=0x21 => b(load_store::Load {
            index: (opcode - 0x1e) as usize,
            size: 2,
        }),
        0x26..=0x29 => b(load_store::Load {
            index: (opcode - 0x26) as usize,
            size: 2,
        }),

        // Stores: istore, lstore, fstore, dstore, astore
        0x36 | 0x38 | 0x3a => b(load_store::Store {
            index: bytes.try_get_u8()? as usize,
            size: 1,
        }),
        0x37 | 0x39 => b(load_store::Store {
            index: bytes.try_get_u8()? as usize,
            size: 2,
        }),
        0x3b..=0x3e => b(load_store::Store {
            index: (opcode - 0x3b) as usize,
            size: 1,
        }),
        0x43..=0x46 => b(load_store::Store {
            index: (opcode - 0x43) as usize,
            size: 1,
        }),
        0x4b..=0x4e => b(load_store::Store {
            index: (opcode - 0x4b) as usize,
            size: 1,
        }),
        0x3f..=0x42 => b(load_store::Store {
            index: (opcode - 0x3f) as usize,
            size: 2,
        }),
        0x47..=0x4a => b(load_store::Store {
            index: (opcode - 0x47) as usize,
            size: 2,
        }),

        // Stack
        0x57 => b(ops::Pop { count: 1 }),
        0x58 => b(ops::Pop { count: 2 }),
        0x59 => b(ops::Dup),

        // Math
        0x60 => b(ops::IntMath { op: ops::MathOp::Add }),
        0x61 => b(ops::LongMath { op: ops::MathOp::Add }),
        0x64 => b(ops::IntMath { op: ops::MathOp::Sub }),
        0x65 => b(ops::LongMath { op: ops::MathOp::Sub }),
        0x68 => b(ops::IntMath { op: ops::MathOp::Mul }),
        0x69 => b(ops::LongMath { op: ops::MathOp::Mul }),
        0x84 => b(ops::Iinc {
            index: bytes.try_get_u8()? as usize,
            constant: bytes.try_get_i8()? as i32,
        }),

        // Control
        0x99..=0x9e => b(ops::IfZero {
            comparison: ops::Comparison::from_opcode(opcode - 0x99)?,
            offset: bytes.try_get_i16()?,
        }),
        0xa7 => b(ops::Goto {
            offset: bytes.try_get_i16()?,
        }),
        0xac => b(ops::Return { kind: ops::ReturnKind::Int }),
        0xad => b(ops::Return { kind: ops::ReturnKind::Long }),
        0xae => b(ops::Return { kind: ops::ReturnKind::Float }),
        0xaf => b(ops::Return { kind: ops::ReturnKind::Double }),
        0xb0 => b(ops::Return { kind: ops::ReturnKind::Reference }),
        0xb1 => b(ops::Return { kind: ops::ReturnKind::Void }),

        // References
        0xb2 => b(load_store::GetStatic {
            index: bytes.try_get_u16()?,
        }),
        0xb3 => b(load_store::PutStatic {
            index: bytes.try_get_u16()?,
        }),
        0xb4 => b(load_store::GetField {
            index: bytes.try_get_u16()?,
        }),
        0xb5 => b(load_store::PutField {
            index: bytes.try_get_u16()?,
        }),
        0xb7 => b(invoke::InvokeSpecial {
            index: bytes.try_get_u16()?,
        }),
        0xb8 => b(invoke::InvokeStatic {
            index: bytes.try_get_u16()?,
        }),
        0xbb => b(load_store::New {
            index: bytes.try_get_u16()?,
        }),

        _ => return Err(internal!("unsupported opcode {:#04x} at {}", opcode, pc)),
    };

    let consumed = before - bytes.remaining();
    Ok((instruction, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_measures_instruction_lengths() {
        // iconst_2, bipush -3, sipush 300, invokestatic #7, return
        let code = [0x05, 0x10, 0xfd, 0x11, 0x01, 0x2c, 0xb8, 0x00, 0x07, 0xb1];

        let lengths = [(0, 1), (1, 2), (3, 3), (6, 3), (9, 1)];
        for (pc, length) in lengths {
            let (_, consumed) = decode_instruction(&code, pc).unwrap();
            assert_eq!(consumed, length, "at {}", pc);
        }
    }

    #[test]
    fn it_rejects_truncated_operands() {
        assert!(decode_instruction(&[0xb8, 0x00], 0).is_err());
    }

    #[test]
    fn running_off_the_end_is_an_error() {
        assert!(decode_instruction(&[0xb1], 1).is_err());
    }

    #[test]
    fn unknown_opcodes_are_internal_errors() {
        let err = decode_instruction(&[0xba, 0x00, 0x00, 0x00, 0x00], 0).unwrap_err();
        assert!(err.is_internal());
    }
}
