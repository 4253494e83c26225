use std::rc::Rc;

use runtime::{
    error::{Throwable, VMError},
    object::{class::Class, field::Field, pool::MemberRef, ClassRef, Object},
    vm::VM,
};

use super::{Instruction, Progression};
use crate::{frame::Frame, initialise};

/// Every typed load, `size` being 2 for longs and doubles.
#[derive(Debug)]
pub struct Load {
    pub(crate) index: usize,
    pub(crate) size: usize,
}

impl Instruction for Load {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        for offset in 0..self.size {
            let slot = frame.locals.get(self.index + offset)?.clone();
            frame.operands.push(slot);
        }

        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct Store {
    pub(crate) index: usize,
    pub(crate) size: usize,
}

impl Instruction for Store {
    fn handle(&self, _vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let slots = frame.operands.pop_slots(self.size)?;
        for (offset, slot) in slots.into_iter().enumerate() {
            frame.locals.set(self.index + offset, slot)?;
        }

        Ok(Progression::Next)
    }
}

fn field_ref(frame: &Frame, index: u16) -> Result<MemberRef, Throwable> {
    Ok(frame
        .class()
        .read()
        .constant_pool()
        .member(index)?
        .clone())
}

/// Field resolution (JVMS §5.4.3.2), loading the referenced class if needed.
fn resolve_field(vm: &mut VM, member: &MemberRef) -> Result<(ClassRef, Field), Throwable> {
    let class = vm.class_loader().load_class(&member.class)?;

    Class::resolve_field(&class, &member.name, &member.descriptor).ok_or_else(|| {
        VMError::NoSuchField {
            class: member.class.clone(),
            name: member.name.clone(),
            descriptor: member.descriptor.clone(),
        }
        .into()
    })
}

fn expect_static(field: &Field, wanted: bool, instruction: &str) -> Result<(), Throwable> {
    if field.is_static() == wanted {
        return Ok(());
    }

    Err(VMError::IncompatibleClassChange {
        context: format!(
            "{} on {} field {}.{}",
            instruction,
            if field.is_static() { "static" } else { "instance" },
            field.class_name(),
            field.name()
        ),
    }
    .into())
}

#[derive(Debug)]
pub struct GetStatic {
    pub(crate) index: u16,
}

impl Instruction for GetStatic {
    fn handle(&self, vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let member = field_ref(frame, self.index)?;
        let (class, field) = resolve_field(vm, &member)?;

        // On successful resolution of the field, the class or interface that
        // declared the resolved field is initialized if that class or interface
        // has not already been initialized (§5.5).
        if !initialise::trigger(frame, &class) {
            return Ok(Progression::Next);
        }

        // Otherwise, if the resolved field is not a static (class) field or an
        // interface field, getstatic throws an IncompatibleClassChangeError.
        expect_static(&field, true, "getstatic")?;

        let class = class.read();
        for offset in 0..field.slot_size() {
            let slot = class.statics().get(field.slot() + offset)?.clone();
            frame.operands.push(slot);
        }

        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct PutStatic {
    pub(crate) index: u16,
}

impl Instruction for PutStatic {
    fn handle(&self, vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let member = field_ref(frame, self.index)?;
        let (class, field) = resolve_field(vm, &member)?;

        if !initialise::trigger(frame, &class) {
            return Ok(Progression::Next);
        }

        expect_static(&field, true, "putstatic")?;

        let slots = frame.operands.pop_slots(field.slot_size())?;
        let mut class = class.write();
        for (offset, slot) in slots.into_iter().enumerate() {
            class.statics_mut().set(field.slot() + offset, slot)?;
        }

        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct GetField {
    pub(crate) index: u16,
}

impl Instruction for GetField {
    fn handle(&self, vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let member = field_ref(frame, self.index)?;
        let (_, field) = resolve_field(vm, &member)?;
        expect_static(&field, false, "getfield")?;

        let object = frame.operands.pop_ref()?.ok_or_else(|| VMError::NullPointer {
            context: format!("getfield {}.{}", member.class, member.name),
        })?;

        let object = object.read();
        for offset in 0..field.slot_size() {
            let slot = object.fields.get(field.slot() + offset)?.clone();
            frame.operands.push(slot);
        }

        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct PutField {
    pub(crate) index: u16,
}

impl Instruction for PutField {
    fn handle(&self, vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let member = field_ref(frame, self.index)?;
        let (_, field) = resolve_field(vm, &member)?;
        expect_static(&field, false, "putfield")?;

        let slots = frame.operands.pop_slots(field.slot_size())?;
        let object = frame.operands.pop_ref()?.ok_or_else(|| VMError::NullPointer {
            context: format!("putfield {}.{}", member.class, member.name),
        })?;

        let mut object = object.write();
        for (offset, slot) in slots.into_iter().enumerate() {
            object.fields.set(field.slot() + offset, slot)?;
        }

        Ok(Progression::Next)
    }
}

#[derive(Debug)]
pub struct New {
    pub(crate) index: u16,
}

impl Instruction for New {
    fn handle(&self, vm: &mut VM, frame: &mut Frame) -> Result<Progression, Throwable> {
        let name = frame
            .class()
            .read()
            .constant_pool()
            .class_name(self.index)?
            .to_string();

        let class = vm.class_loader().load_class(&name)?;

        // If the symbolic reference to the class resolves to an interface or an
        // abstract class, new throws an InstantiationError.
        let abstract_type = {
            let class = class.read();
            class.is_interface() || class.is_abstract() || class.is_array() || class.is_primitive()
        };

        if abstract_type {
            return Err(VMError::Instantiation { name }.into());
        }

        // On successful resolution of the class, it is initialized if it has
        // not already been initialized (§5.5).
        if !initialise::trigger(frame, &class) {
            return Ok(Progression::Next);
        }

        let object = Object::new(Rc::clone(&class)).into_ref();
        frame.operands.push_ref(Some(object));

        Ok(Progression::Next)
    }
}
