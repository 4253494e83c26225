use enum_as_inner::EnumAsInner;

use super::Reference;

/// A typed value, as pushed by `ldc`, returned from methods and passed to natives.
#[derive(Debug, Clone, EnumAsInner)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(Reference),
}

impl Value {
    pub fn null() -> Self {
        Value::Ref(None)
    }

    pub fn slot_size(&self) -> usize {
        match self {
            Value::Long(_) | Value::Double(_) => 2,
            _ => 1,
        }
    }
}
