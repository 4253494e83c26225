use std::{fmt, rc::Rc};

use parse::{
    classfile::ClassFile,
    constants::CLASS_INITIALISER,
    flags::{ClassFileAccessFlag, ClassFileAccessFlags},
};
use support::descriptor::BaseType;

use super::{
    field::Field, method::Method, pool::RuntimeConstantPool, slots::Slots, ClassRef, Reference,
};
use crate::{classpath::ClassSource, error::Throwable, internal};

/// Where a class is in its lifecycle. States only ever move forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InitState {
    /// Parsed and registered, not yet prepared.
    Defined,
    /// Slots laid out and static storage allocated.
    Linked,
    /// The class initialiser has started.
    Initializing,
    Initialized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    Primitive(BaseType),
    Reference,
    Array { component: String },
}

pub struct Class {
    name: String,
    kind: ClassKind,
    flags: ClassFileAccessFlags,
    source: ClassSource,

    super_name: Option<String>,
    interface_names: Vec<String>,
    pub(crate) super_class: Option<ClassRef>,
    pub(crate) interfaces: Vec<ClassRef>,

    pub(crate) fields: Vec<Field>,
    methods: Vec<Rc<Method>>,
    pool: RuntimeConstantPool,

    pub(crate) instance_slot_count: usize,
    pub(crate) static_slot_count: usize,
    statics: Slots,

    state: InitState,
    type_object: Reference,
}

impl Class {
    /// Build an unlinked descriptor from a parsed class file. Super types are
    /// attached by the loader.
    pub fn from_class_file(file: &ClassFile, source: ClassSource) -> anyhow::Result<Self> {
        let name = file.name()?.to_string();
        let pool = &file.constant_pool;

        let fields = file
            .fields
            .iter()
            .map(|field| Field::from_class_file(&name, field, pool))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let methods = file
            .methods
            .values
            .iter()
            .map(|method| Method::from_class_file(&name, method, pool).map(Rc::new))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            kind: ClassKind::Reference,
            flags: file.access_flags,
            source,
            super_name: file.super_name()?.map(str::to_string),
            interface_names: file
                .interface_names()?
                .into_iter()
                .map(str::to_string)
                .collect(),
            super_class: None,
            interfaces: vec![],
            fields,
            methods,
            pool: RuntimeConstantPool::new(pool)?,
            instance_slot_count: 0,
            static_slot_count: 0,
            statics: Slots::default(),
            state: InitState::Defined,
            type_object: None,
            name,
        })
    }

    /// Arrays are created ready to use, they have no initialiser to run.
    pub fn array(
        name: &str,
        component: &str,
        super_class: ClassRef,
        interfaces: Vec<ClassRef>,
    ) -> Self {
        let super_name = super_class.read().name().to_string();
        let interface_names = interfaces.iter().map(|i| i.read().name().to_string()).collect();

        Self {
            name: name.to_string(),
            kind: ClassKind::Array {
                component: component.to_string(),
            },
            flags: ClassFileAccessFlags::new(ClassFileAccessFlag::PUBLIC),
            source: ClassSource::Synthetic,
            super_name: Some(super_name),
            interface_names,
            super_class: Some(super_class),
            interfaces,
            fields: vec![],
            methods: vec![],
            pool: RuntimeConstantPool::default(),
            instance_slot_count: 0,
            static_slot_count: 0,
            statics: Slots::default(),
            state: InitState::Initialized,
            type_object: None,
        }
    }

    pub fn primitive(ty: BaseType) -> Self {
        Self {
            name: ty.class_name().to_string(),
            kind: ClassKind::Primitive(ty),
            flags: ClassFileAccessFlags::new(ClassFileAccessFlag::PUBLIC),
            source: ClassSource::Synthetic,
            super_name: None,
            interface_names: vec![],
            super_class: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            pool: RuntimeConstantPool::default(),
            instance_slot_count: 0,
            static_slot_count: 0,
            statics: Slots::default(),
            state: InitState::Initialized,
            type_object: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ClassKind {
        &self.kind
    }

    pub fn flags(&self) -> ClassFileAccessFlags {
        self.flags
    }

    pub fn source(&self) -> &ClassSource {
        &self.source
    }

    pub fn is_interface(&self) -> bool {
        self.flags.has(ClassFileAccessFlag::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.has(ClassFileAccessFlag::ABSTRACT)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ClassKind::Array { .. })
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ClassKind::Primitive(_))
    }

    pub fn super_name(&self) -> Option<&str> {
        self.super_name.as_deref()
    }

    pub fn interface_names(&self) -> &[String] {
        &self.interface_names
    }

    pub fn super_class(&self) -> Option<ClassRef> {
        self.super_class.clone()
    }

    pub fn interfaces(&self) -> &[ClassRef] {
        &self.interfaces
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str, descriptor: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name() == name && f.descriptor() == descriptor)
    }

    pub fn methods(&self) -> &[Rc<Method>] {
        &self.methods
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<Rc<Method>> {
        self.methods
            .iter()
            .find(|m| m.name() == name && m.descriptor() == descriptor)
            .cloned()
    }

    pub fn class_initialiser(&self) -> Option<Rc<Method>> {
        self.method(CLASS_INITIALISER, "()V")
    }

    pub fn constant_pool(&self) -> &RuntimeConstantPool {
        &self.pool
    }

    pub fn instance_slot_count(&self) -> usize {
        self.instance_slot_count
    }

    pub fn static_slot_count(&self) -> usize {
        self.static_slot_count
    }

    pub fn statics(&self) -> &Slots {
        &self.statics
    }

    pub fn statics_mut(&mut self) -> &mut Slots {
        &mut self.statics
    }

    pub(crate) fn allocate_statics(&mut self) {
        self.statics = Slots::new(self.static_slot_count);
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    pub fn set_state(&mut self, state: InitState) -> Result<(), Throwable> {
        if state < self.state {
            return Err(internal!(
                "class {} cannot move from {:?} back to {:?}",
                self.name,
                self.state,
                state
            ));
        }

        self.state = state;
        Ok(())
    }

    /// Linked but not yet initialised. Initialising classes report false, so a
    /// class's own initialiser can use the class it is initialising.
    pub fn needs_initialisation(&self) -> bool {
        self.state == InitState::Linked
    }

    pub fn is_initialised(&self) -> bool {
        self.state == InitState::Initialized
    }

    pub fn type_object(&self) -> Reference {
        self.type_object.clone()
    }

    pub(crate) fn set_type_object(&mut self, object: Reference) {
        self.type_object = object;
    }

    /// Find a method by walking from `class` up the superclass chain.
    pub fn resolve_method(
        class: &ClassRef,
        name: &str,
        descriptor: &str,
    ) -> Option<(ClassRef, Rc<Method>)> {
        let mut current = Some(Rc::clone(class));

        while let Some(class) = current {
            let found = class.read().method(name, descriptor);
            if let Some(method) = found {
                return Some((class, method));
            }

            current = class.read().super_class();
        }

        None
    }

    /// Field resolution (JVMS §5.4.3.2): the class itself, then its superinterfaces,
    /// then its superclass.
    pub fn resolve_field(class: &ClassRef, name: &str, descriptor: &str) -> Option<(ClassRef, Field)> {
        let (own, interfaces, super_class) = {
            let locked = class.read();
            (
                locked.field(name, descriptor).cloned(),
                locked.interfaces().to_vec(),
                locked.super_class(),
            )
        };

        if let Some(field) = own {
            return Some((Rc::clone(class), field));
        }

        interfaces
            .iter()
            .find_map(|interface| Self::resolve_field(interface, name, descriptor))
            .or_else(|| {
                super_class.and_then(|super_class| Self::resolve_field(&super_class, name, descriptor))
            })
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("super", &self.super_name)
            .field("state", &self.state)
            .finish()
    }
}
