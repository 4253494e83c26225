pub mod bytecode;
pub mod frame;
pub mod initialise;

use std::rc::Rc;

use runtime::{
    error::{Throwable, VMError},
    internal,
    object::{class::InitState, method::Method, slots::Slot, value::Value, ClassRef},
    vm::VM,
};
use tracing::{debug, info};

use bytecode::{decode_instruction, Progression};
use frame::{Frame, FrameState};

#[derive(Debug, Clone, Copy)]
pub struct BootOptions {
    /// Deepest the frame stack may grow before `StackOverflowError`.
    pub max_stack: usize,
    /// Log every instruction before it executes.
    pub log_instructions: bool,
}

impl Default for BootOptions {
    fn default() -> Self {
        Self {
            max_stack: 1024,
            log_instructions: false,
        }
    }
}

/// Executes bytecode on one logical thread. Every call, whether it comes from
/// bytecode, from a class initialiser or from the host, runs on the same
/// frame stack.
pub struct Interpreter {
    vm: VM,
    frames: Vec<Frame>,
    options: BootOptions,
    returned: Option<Value>,
}

impl Interpreter {
    pub fn new(vm: VM, options: BootOptions) -> Self {
        Self {
            vm,
            frames: Vec::new(),
            options,
            returned: None,
        }
    }

    pub fn vm(&self) -> &VM {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut VM {
        &mut self.vm
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn options(&self) -> BootOptions {
        self.options
    }

    pub fn push_frame(&mut self, frame: Frame) -> Result<(), Throwable> {
        if self.frames.len() >= self.options.max_stack {
            return Err(VMError::StackOverflow {
                depth: self.frames.len(),
            }
            .into());
        }

        self.frames.push(frame);
        Ok(())
    }

    /// Run one instruction of the top frame, or schedule the initialiser the
    /// top frame is waiting for.
    pub fn step(&mut self) -> Result<(), Throwable> {
        let mut frame = self
            .frames
            .pop()
            .ok_or_else(|| internal!("no frame to execute"))?;

        let awaiting = frame.state().as_awaiting_initialisation().cloned();
        if let Some(class) = awaiting {
            if class.read().needs_initialisation() {
                self.frames.push(frame);
                return self.schedule_initialisation(&class);
            }

            frame.set_state(FrameState::Ready);
        }

        match self.execute(&mut frame) {
            Ok(progression) => self.progress(frame, progression),
            Err(e) => {
                self.frames.push(frame);
                Err(e)
            }
        }
    }

    fn execute(&mut self, frame: &mut Frame) -> Result<Progression, Throwable> {
        let (instruction, length) = decode_instruction(frame.code(), frame.pc)?;
        frame.next_pc = frame.pc + length;

        if self.options.log_instructions {
            info!(
                "{}.{} @ {}: {:?}",
                frame.method().class_name(),
                frame.method().name(),
                frame.pc,
                instruction
            );
        }

        instruction.handle(&mut self.vm, frame)
    }

    fn progress(&mut self, mut frame: Frame, progression: Progression) -> Result<(), Throwable> {
        match progression {
            Progression::Next => {
                frame.pc = frame.next_pc;
                self.frames.push(frame);
            }
            Progression::JumpRel(offset) => {
                let target = frame.pc as i64 + offset as i64;
                if target < 0 || target as usize >= frame.code().len() {
                    let e = internal!("jump from {} by {} leaves the method", frame.pc, offset);
                    self.frames.push(frame);
                    return Err(e);
                }

                frame.pc = target as usize;
                self.frames.push(frame);
            }
            Progression::Call(callee) => {
                frame.pc = frame.next_pc;
                self.frames.push(frame);
                self.push_frame(callee)?;
            }
            Progression::Return(value) => self.complete(frame, value)?,
        }

        Ok(())
    }

    /// A frame has returned. Finish the class it was initialising, then hand its
    /// value to whoever called it.
    fn complete(&mut self, frame: Frame, value: Option<Value>) -> Result<(), Throwable> {
        if let Some(class) = &frame.initialising {
            let mut class = class.write();
            class.set_state(InitState::Initialized)?;
            info!("Initialised {}", class.name());
        }

        if frame.returns_to_host {
            self.returned = value;
            return Ok(());
        }

        if let Some(value) = value {
            let caller = self.frames.last_mut().ok_or_else(|| {
                internal!(
                    "{}.{} returned a value with no caller",
                    frame.method().class_name(),
                    frame.method().name()
                )
            })?;

            caller.operands.push_value(value);
        }

        Ok(())
    }

    /// Step until the stack is back down to `base` frames. On failure the
    /// frames above `base` are discarded.
    pub fn run_until(&mut self, base: usize) -> Result<(), Throwable> {
        while self.frames.len() > base {
            if let Err(e) = self.step() {
                self.frames.truncate(base);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Start initialising `class` (JVMS §5.5). A superclass that still needs
    /// initialising is scheduled instead, `class` stays Linked and is picked up
    /// again when the waiting instruction re-triggers it.
    pub fn schedule_initialisation(&mut self, class: &ClassRef) -> Result<(), Throwable> {
        let super_class = class.read().super_class();
        if let Some(super_class) = super_class {
            if super_class.read().needs_initialisation() {
                return self.schedule_initialisation(&super_class);
            }
        }

        let (name, clinit) = {
            let mut class = class.write();
            class.set_state(InitState::Initializing)?;
            (class.name().to_string(), class.class_initialiser())
        };

        match clinit {
            Some(method) => {
                info!("Initialising {}", name);
                let mut frame = Frame::new(Rc::clone(class), method, vec![])?;
                frame.initialising = Some(Rc::clone(class));
                self.push_frame(frame)
            }
            None => {
                debug!("No <clinit> in {}", name);
                class.write().set_state(InitState::Initialized)
            }
        }
    }

    /// Initialise `class` and its superclasses now, running their initialisers
    /// to completion.
    pub fn initialise(&mut self, class: &ClassRef) -> Result<(), Throwable> {
        while class.read().needs_initialisation() {
            let base = self.frames.len();
            self.schedule_initialisation(class)?;
            self.run_until(base)?;
        }

        Ok(())
    }

    /// Call `method` of `class` from outside the interpreter and run it to
    /// completion. The class is initialised first.
    pub fn invoke(
        &mut self,
        class: &ClassRef,
        method: Rc<Method>,
        arguments: Vec<Slot>,
    ) -> Result<Option<Value>, Throwable> {
        self.initialise(class)?;

        if method.is_native() {
            let native = self
                .vm
                .natives()
                .lookup(method.class_name(), method.name(), method.descriptor())
                .ok_or_else(|| VMError::UnsatisfiedLink {
                    class: method.class_name().to_string(),
                    name: method.name().to_string(),
                    descriptor: method.descriptor().to_string(),
                })?;

            return (*native)(&mut self.vm, arguments.into());
        }

        let base = self.frames.len();
        let mut frame = Frame::new(Rc::clone(class), method, arguments)?;
        frame.returns_to_host = true;

        self.push_frame(frame)?;
        self.run_until(base)?;

        Ok(self.returned.take())
    }
}
