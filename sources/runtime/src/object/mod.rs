use std::{
    fmt,
    rc::{Rc, Weak},
};

use enum_as_inner::EnumAsInner;
use parking_lot::RwLock;

use self::{class::Class, slots::Slots};

pub mod class;
pub mod field;
pub mod link;
pub mod loader;
pub mod method;
pub mod pool;
pub mod slots;
pub mod string;
pub mod value;

/// Shared handle to a class descriptor. The registry hands out clones of the
/// same `Rc`, so pointer equality is class identity.
pub type ClassRef = Rc<RwLock<Class>>;

pub type ObjectRef = Rc<RwLock<Object>>;

/// A nullable object reference.
pub type Reference = Option<ObjectRef>;

/// Data an object carries beyond its declared fields.
#[derive(EnumAsInner)]
pub enum ObjectExtra {
    None,
    /// This object is the `java/lang/Class` instance for the pointed-to descriptor.
    TypeOf(Weak<RwLock<Class>>),
    Chars(Vec<u16>),
    Refs(Vec<Reference>),
}

pub struct Object {
    class: ClassRef,
    pub fields: Slots,
    pub extra: ObjectExtra,
}

impl Object {
    pub fn new(class: ClassRef) -> Self {
        let size = class.read().instance_slot_count();

        Self {
            class,
            fields: Slots::new(size),
            extra: ObjectExtra::None,
        }
    }

    pub fn with_extra(class: ClassRef, extra: ObjectExtra) -> Self {
        let mut object = Self::new(class);
        object.extra = extra;
        object
    }

    pub fn class(&self) -> ClassRef {
        Rc::clone(&self.class)
    }

    pub fn class_name(&self) -> String {
        self.class.read().name().to_string()
    }

    /// The descriptor this type object stands for, if this is a type object.
    pub fn type_of(&self) -> Option<ClassRef> {
        match &self.extra {
            ObjectExtra::TypeOf(class) => class.upgrade(),
            _ => None,
        }
    }

    pub fn into_ref(self) -> ObjectRef {
        Rc::new(RwLock::new(self))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extra = match &self.extra {
            ObjectExtra::None => "none".to_string(),
            ObjectExtra::TypeOf(class) => match class.upgrade() {
                Some(class) => format!("type of {}", class.read().name()),
                None => "type of <dropped>".to_string(),
            },
            ObjectExtra::Chars(chars) => format!("{} chars", chars.len()),
            ObjectExtra::Refs(refs) => format!("{} refs", refs.len()),
        };

        f.debug_struct("Object")
            .field("class", &self.class_name())
            .field("fields", &self.fields.len())
            .field("extra", &extra)
            .finish()
    }
}
