use std::{fmt, rc::Rc};

use enum_as_inner::EnumAsInner;
use runtime::{
    error::Throwable,
    internal,
    object::{
        method::Method,
        slots::{Slot, Slots},
        value::Value,
        ClassRef, Reference,
    },
};

#[derive(Clone, EnumAsInner)]
pub enum FrameState {
    Ready,
    /// The instruction at `pc` needs this class initialised before it can run.
    AwaitingInitialisation(ClassRef),
}

impl fmt::Debug for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameState::Ready => write!(f, "Ready"),
            FrameState::AwaitingInitialisation(class) => {
                write!(f, "AwaitingInitialisation({})", class.read().name())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct OperandStack {
    slots: Vec<Slot>,
}

impl OperandStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn push(&mut self, slot: Slot) {
        self.slots.push(slot);
    }

    pub fn pop(&mut self) -> Result<Slot, Throwable> {
        self.slots
            .pop()
            .ok_or_else(|| internal!("no value to pop from the operand stack"))
    }

    pub fn peek(&self) -> Result<&Slot, Throwable> {
        self.slots
            .last()
            .ok_or_else(|| internal!("no value to peek on the operand stack"))
    }

    pub fn push_int(&mut self, value: i32) {
        self.push(Slot::Num(value));
    }

    pub fn pop_int(&mut self) -> Result<i32, Throwable> {
        match self.pop()? {
            Slot::Num(value) => Ok(value),
            Slot::Ref(_) => Err(internal!("expected an int on the operand stack, got a reference")),
        }
    }

    pub fn push_long(&mut self, value: i64) {
        self.push_int(value as i32);
        self.push_int((value >> 32) as i32);
    }

    pub fn pop_long(&mut self) -> Result<i64, Throwable> {
        let high = self.pop_int()? as i64;
        let low = self.pop_int()? as u32 as i64;

        Ok(high << 32 | low)
    }

    pub fn push_ref(&mut self, value: Reference) {
        self.push(Slot::Ref(value));
    }

    /// A zeroed slot, such as an unassigned reference field, pops as `null`.
    pub fn pop_ref(&mut self) -> Result<Reference, Throwable> {
        match self.pop()? {
            Slot::Ref(value) => Ok(value),
            Slot::Num(0) => Ok(None),
            Slot::Num(_) => Err(internal!("expected a reference on the operand stack, got a number")),
        }
    }

    pub fn push_value(&mut self, value: Value) {
        match value {
            Value::Int(v) => self.push_int(v),
            Value::Long(v) => self.push_long(v),
            Value::Float(v) => self.push_int(v.to_bits() as i32),
            Value::Double(v) => self.push_long(v.to_bits() as i64),
            Value::Ref(v) => self.push_ref(v),
        }
    }

    /// Pop the top `count` slots, keeping their order.
    pub fn pop_slots(&mut self, count: usize) -> Result<Vec<Slot>, Throwable> {
        if count > self.slots.len() {
            return Err(internal!(
                "wanted {} operands, the stack holds {}",
                count,
                self.slots.len()
            ));
        }

        Ok(self.slots.split_off(self.slots.len() - count))
    }
}

/// One method activation.
pub struct Frame {
    class: ClassRef,
    method: Rc<Method>,
    code: Rc<[u8]>,

    /// Start of the instruction being executed.
    pub pc: usize,
    /// Where execution continues once the current instruction completes.
    pub next_pc: usize,

    pub locals: Slots,
    pub operands: OperandStack,

    state: FrameState,
    /// Set on `<clinit>` frames. The class becomes initialised when the frame returns.
    pub(crate) initialising: Option<ClassRef>,
    /// The frame was entered from outside the interpreter, its return value goes back out.
    pub(crate) returns_to_host: bool,
}

impl Frame {
    /// `arguments` are copied into the first local slots.
    pub fn new(class: ClassRef, method: Rc<Method>, arguments: Vec<Slot>) -> Result<Self, Throwable> {
        let code = method.code().ok_or_else(|| {
            internal!(
                "{}.{}{} has no code",
                method.class_name(),
                method.name(),
                method.descriptor()
            )
        })?;

        if arguments.len() > code.max_locals as usize {
            return Err(internal!(
                "{}.{} takes {} argument slots but has {} locals",
                method.class_name(),
                method.name(),
                arguments.len(),
                code.max_locals
            ));
        }

        let mut locals = Slots::new(code.max_locals as usize);
        for (index, argument) in arguments.into_iter().enumerate() {
            locals.set(index, argument)?;
        }

        Ok(Self {
            code: Rc::from(code.code.as_slice()),
            operands: OperandStack::with_capacity(code.max_stack as usize),
            locals,
            class,
            method,
            pc: 0,
            next_pc: 0,
            state: FrameState::Ready,
            initialising: None,
            returns_to_host: false,
        })
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn method(&self) -> &Rc<Method> {
        &self.method
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn set_state(&mut self, state: FrameState) {
        self.state = state;
    }

    /// Arrange for the current instruction to run again instead of moving on.
    pub fn rewind(&mut self) {
        self.next_pc = self.pc;
    }

    pub fn is_class_initialiser(&self) -> bool {
        self.initialising.is_some()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}{} @ {} ({:?})",
            self.method.class_name(),
            self.method.name(),
            self.method.descriptor(),
            self.pc,
            self.state
        )
    }
}
