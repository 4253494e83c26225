use std::rc::Rc;

use runtime::{
    error::{Throwable, VMError},
    object::{class::Class, method::Method, pool::MemberRef, slots::{Slot, Slots}, ClassRef},
    vm::VM,
};
use tracing::debug;

use super::{Instruction, Progression};
use crate::{frame::Frame, initialise};

fn method_ref(frame: &Frame, index: u16) -> Result<MemberRef, Throwable> {
    Ok(frame
        .class()
        .read()
        .constant_pool()
        .member(index)?
        .clone())
}

/// Method resolution (JVMS §5.4.3.3), loading the referenced class if needed.
fn resolve_method(vm: &mut VM, member: &MemberRef) -> Result<(ClassRef, Rc<Method>), Throwable> {
    let class = vm.class_loader().load_class(&member.class)?;

    Class::resolve_method(&class, &member.name, &member.descriptor).ok_or_else(|| {
        VMError::NoSuchMethod {
            class: member.class.clone(),
            name: member.name.clone(),
            descriptor: member.descriptor.clone(),
        }
        .into()
    })
}

/// Pop the arguments off the caller's stack and either run the native
/// implementation in place or hand back a frame for the interpreter to enter.
fn dispatch(
    vm: &mut VM,
    frame: &mut Frame,
    class: ClassRef,
    method: Rc<Method>,
) -> Result<Progression, Throwable> {
    let arguments = frame.operands.pop_slots(method.argument_slots())?;

    if !method.is_static() {
        if !matches!(arguments.first(), Some(Slot::Ref(Some(_)))) {
            return Err(VMError::NullPointer {
                context: format!("invoking {}.{} on null", method.class_name(), method.name()),
            }
            .into());
        }
    }

    if method.is_native() {
        let native = vm
            .natives()
            .lookup(method.class_name(), method.name(), method.descriptor())
            .ok_or_else(|| VMError::UnsatisfiedLink {
                class: method.class_name().to_string(),
                name: method.name().to_string(),
                descriptor: method.descriptor().to_string(),
            })?;

        debug!(
            "Calling native {}.{}{}",
            method.class_name(),
            method.name(),
            method.descriptor()
        );

        if let Some(value) = (*native)(vm, Slots::from(arguments))? {
            frame.operands.push_value(value);
        }

        return Ok(Progression::Next);
    }

    if method.is_abstract() {
        return Err(VMError::IncompatibleClassChange {
            context: format!(
                "{}.{}{} is abstract",
                method.class_name(),
                method.name(),
                method.descriptor()
            ),
        }
        .into());
    }

    Ok(Progression::Call(Frame::new(class, method, arguments)?))
}

#[derive(Debug)]
pub struct InvokeStatic {
    pub(crate) index: u16,
}

impl Instruction for InvokeStatic {
    fn handle(&self, vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let member = method_ref(frame, self.index)?;

        if member.name == "<init>" || member.name == "<clinit>" {
            return Err(VMError::IncompatibleClassChange {
                context: format!("invokestatic of {}.{}", member.class, member.name),
            }
            .into());
        }

        let (class, method) = resolve_method(vm, &member)?;

        // On successful resolution of the method, the class or interface that
        // declared the resolved method is initialized if that class or
        // interface has not already been initialized (§5.5).
        if !initialise::trigger(frame, &class) {
            return Ok(Progression::Next);
        }

        // If the resolved method is an instance method, the invokestatic
        // instruction throws an IncompatibleClassChangeError.
        if !method.is_static() {
            return Err(VMError::IncompatibleClassChange {
                context: format!(
                    "invokestatic of instance method {}.{}{}",
                    method.class_name(),
                    method.name(),
                    method.descriptor()
                ),
            }
            .into());
        }

        dispatch(vm, frame, class, method)
    }
}

/// Constructors and private methods. Superclass method selection for
/// `ACC_SUPER` classes is not performed, the resolved method is invoked.
#[derive(Debug)]
pub struct InvokeSpecial {
    pub(crate) index: u16,
}

impl Instruction for InvokeSpecial {
    fn handle(&self, vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let member = method_ref(frame, self.index)?;
        let (class, method) = resolve_method(vm, &member)?;

        if method.is_static() {
            return Err(VMError::IncompatibleClassChange {
                context: format!(
                    "invokespecial of static method {}.{}{}",
                    method.class_name(),
                    method.name(),
                    method.descriptor()
                ),
            }
            .into());
        }

        dispatch(vm, frame, class, method)
    }
}
