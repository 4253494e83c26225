//! Linking (JVMS §5.4): verification and preparation.

use support::descriptor::{BaseType, FieldType};
use tracing::{debug, warn};

use super::{
    class::InitState, field::Field, loader::ClassLoader, pool::Constant, string::JAVA_LANG_STRING,
    value::Value, ClassRef,
};
use crate::error::{Throwable, VMError};

pub fn link(loader: &mut ClassLoader, class: &ClassRef) -> Result<(), Throwable> {
    verify(class)?;
    prepare(loader, class)
}

// Bytecode verification is not performed
fn verify(_class: &ClassRef) -> Result<(), Throwable> {
    Ok(())
}

fn prepare(loader: &mut ClassLoader, class: &ClassRef) -> Result<(), Throwable> {
    calculate_instance_slots(class);
    calculate_static_slots(class);
    initialise_statics(loader, class)?;

    let mut class = class.write();
    debug!(
        "Prepared {} ({} instance slots, {} static slots)",
        class.name(),
        class.instance_slot_count,
        class.static_slot_count
    );

    class.set_state(InitState::Linked)
}

/// Instance slots continue from where the superclass's left off.
fn calculate_instance_slots(class: &ClassRef) {
    let super_class = class.read().super_class();
    let mut next = super_class
        .map(|super_class| super_class.read().instance_slot_count())
        .unwrap_or(0);

    let mut class = class.write();
    for field in class.fields.iter_mut().filter(|f| !f.is_static()) {
        field.set_slot(next);
        next += field.slot_size();
    }

    class.instance_slot_count = next;
}

fn calculate_static_slots(class: &ClassRef) {
    let mut next = 0;

    let mut class = class.write();
    for field in class.fields.iter_mut().filter(|f| f.is_static()) {
        field.set_slot(next);
        next += field.slot_size();
    }

    class.static_slot_count = next;
}

/// Allocate static storage and store the compile time constants of `static final` fields.
fn initialise_statics(loader: &mut ClassLoader, class: &ClassRef) -> Result<(), Throwable> {
    let (name, constants) = {
        let mut class = class.write();
        class.allocate_statics();

        let constants = class
            .fields()
            .iter()
            .filter(|f| f.is_static() && f.is_final() && f.constant_value_index() > 0)
            .map(|f| {
                let constant = class.constant_pool().get(f.constant_value_index())?;
                Ok((f.clone(), constant.clone()))
            })
            .collect::<Result<Vec<_>, Throwable>>()?;

        (class.name().to_string(), constants)
    };

    // The class is not locked here, interning a string may load classes
    for (field, constant) in constants {
        if let Some(value) = constant_value(loader, &name, &field, constant)? {
            class.write().statics_mut().set_value(field.slot(), value)?;
        }
    }

    Ok(())
}

fn constant_value(
    loader: &mut ClassLoader,
    class_name: &str,
    field: &Field,
    constant: Constant,
) -> Result<Option<Value>, Throwable> {
    let value = match (field.field_type(), constant) {
        (FieldType::Base(ty), Constant::Integer(v)) if ty.is_int_like() => Value::Int(v),
        (FieldType::Base(BaseType::Long), Constant::Long(v)) => Value::Long(v),
        (FieldType::Base(BaseType::Float), Constant::Float(v)) => Value::Float(v),
        (FieldType::Base(BaseType::Double), Constant::Double(v)) => Value::Double(v),
        (FieldType::Object(ty), Constant::String(text)) if ty.class_name == JAVA_LANG_STRING => {
            Value::Ref(Some(loader.intern_string(&text)?))
        }
        (FieldType::Object(ty), constant) if ty.class_name != JAVA_LANG_STRING => {
            warn!(
                "Ignoring constant {:?} on reference field {}.{}",
                constant,
                class_name,
                field.name()
            );
            return Ok(None);
        }
        (FieldType::Array(_), constant) => {
            warn!(
                "Ignoring constant {:?} on array field {}.{}",
                constant,
                class_name,
                field.name()
            );
            return Ok(None);
        }
        (ty, constant) => {
            return Err(VMError::ClassFormat {
                name: class_name.to_string(),
                reason: format!(
                    "constant {:?} does not fit field {} of type {}",
                    constant,
                    field.name(),
                    ty
                ),
            }
            .into())
        }
    };

    Ok(Some(value))
}
