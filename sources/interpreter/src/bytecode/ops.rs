use runtime::{
    error::Throwable,
    internal,
    object::{pool::Constant, value::Value},
    vm::VM,
};

use super::{Instruction, Progression};
use crate::frame::Frame;

#[derive(Debug)]
pub struct Nop;

impl Instruction for Nop {}

#[derive(Debug)]
pub struct PushConst {
    pub(crate) value: Value,
}

impl Instruction for PushConst {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        frame.operands.push_value(self.value.clone());
        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct Ldc {
    pub(crate) index: u16,
}

impl Instruction for Ldc {
    fn handle(&self, vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let constant = frame
            .class()
            .read()
            .constant_pool()
            .get(self.index)?
            .clone();

        let value = match constant {
            Constant::Integer(v) => Value::Int(v),
            Constant::Float(v) => Value::Float(v),
            Constant::String(text) => Value::Ref(Some(vm.class_loader().intern_string(&text)?)),
            Constant::Class(name) => {
                // Loading a class constant does not initialise it
                let class = vm.class_loader().load_class(&name)?;
                let type_object = class.read().type_object();
                Value::Ref(type_object)
            }
            v => return Err(internal!("cannot load {:?} with ldc", v)),
        };

        frame.operands.push_value(value);
        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct Ldc2W {
    pub(crate) index: u16,
}

impl Instruction for Ldc2W {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let value = match frame.class().read().constant_pool().get(self.index)? {
            Constant::Long(v) => Value::Long(*v),
            Constant::Double(v) => Value::Double(*v),
            v => return Err(internal!("cannot load {:?} with ldc2_w", v)),
        };

        frame.operands.push_value(value);
        Ok(Progression::Next)
    }
}

/// `pop` and `pop2`, which only care about slot counts.
#[derive(Debug)]
pub struct Pop {
    pub(crate) count: usize,
}

impl Instruction for Pop {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        frame.operands.pop_slots(self.count)?;
        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct Dup;

impl Instruction for Dup {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let top = frame.operands.peek()?.clone();
        frame.operands.push(top);
        Ok(Progression::Next)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
}

#[derive(Debug)]
pub struct IntMath {
    pub(crate) op: MathOp,
}

impl Instruction for IntMath {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let rhs = frame.operands.pop_int()?;
        let lhs = frame.operands.pop_int()?;

        // The result is the 32 low-order bits of the true mathematical result
        frame.operands.push_int(match self.op {
            MathOp::Add => lhs.wrapping_add(rhs),
            MathOp::Sub => lhs.wrapping_sub(rhs),
            MathOp::Mul => lhs.wrapping_mul(rhs),
        });

        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct LongMath {
    pub(crate) op: MathOp,
}

impl Instruction for LongMath {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let rhs = frame.operands.pop_long()?;
        let lhs = frame.operands.pop_long()?;

        frame.operands.push_long(match self.op {
            MathOp::Add => lhs.wrapping_add(rhs),
            MathOp::Sub => lhs.wrapping_sub(rhs),
            MathOp::Mul => lhs.wrapping_mul(rhs),
        });

        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct Iinc {
    pub(crate) index: usize,
    pub(crate) constant: i32,
}

impl Instruction for Iinc {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let value = frame.locals.get_int(self.index)?;
        frame
            .locals
            .set_int(self.index, value.wrapping_add(self.constant))?;

        Ok(Progression::Next)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl Comparison {
    /// Offset from `ifeq`.
    pub fn from_opcode(offset: u8) -> Result<Self, Throwable> {
        Ok(match offset {
            0 => Comparison::Eq,
            1 => Comparison::Ne,
            2 => Comparison::Lt,
            3 => Comparison::Ge,
            4 => Comparison::Gt,
            5 => Comparison::Le,
            _ => return Err(internal!("no comparison at offset {}", offset)),
        })
    }

    fn holds(&self, value: i32) -> bool {
        match self {
            Comparison::Eq => value == 0,
            Comparison::Ne => value != 0,
            Comparison::Lt => value < 0,
            Comparison::Ge => value >= 0,
            Comparison::Gt => value > 0,
            Comparison::Le => value <= 0,
        }
    }
}

#[derive(Debug)]
pub struct IfZero {
    pub(crate) comparison: Comparison,
    pub(crate) offset: i16,
}

impl Instruction for IfZero {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let value = frame.operands.pop_int()?;

        if self.comparison.holds(value) {
            Ok(Progression::JumpRel(self.offset as i32))
        } else {
            Ok(Progression::Next)
        }
    }
}

#[derive(Debug)]
pub struct Goto {
    pub(crate) offset: i16,
}

impl Instruction for Goto {
    fn handle(&self, _vm: &mut VM, _frame: &mut Frame) -> Result<Progression, Throwable> {
        Ok(Progression::JumpRel(self.offset as i32))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ReturnKind {
    Void,
    Int,
    Long,
    Float,
    Double,
    Reference,
}

#[derive(Debug)]
pub struct Return {
    pub(crate) kind: ReturnKind,
}

impl Instruction for Return {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let operands = &mut frame.operands;

        let value = match self.kind {
            ReturnKind::Void => None,
            ReturnKind::Int => Some(Value::Int(operands.pop_int()?)),
            ReturnKind::Long => Some(Value::Long(operands.pop_long()?)),
            ReturnKind::Float => Some(Value::Float(f32::from_bits(operands.pop_int()? as u32))),
            ReturnKind::Double => Some(Value::Double(f64::from_bits(operands.pop_long()? as u64))),
            ReturnKind::Reference => Some(Value::Ref(operands.pop_ref()?)),
        };

        Ok(Progression::Return(value))
    }
}
