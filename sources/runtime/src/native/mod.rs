use std::{collections::HashMap, rc::Rc};

use crate::{
    error::Throwable,
    object::{slots::Slots, value::Value},
    vm::VM,
};

pub mod debug;
pub mod lang;

/// A method implemented by the VM. Arguments arrive laid out the way the
/// method's locals would be (wide values in two slots, `this` first for
/// instance methods).
pub type NativeFunction = Rc<dyn Fn(&mut VM, Slots) -> Result<Option<Value>, Throwable>>;

pub type NameAndDescriptor = (String, String);

pub trait NativeModule {
    fn classname(&self) -> &'static str;
    fn methods(&self) -> Vec<(NameAndDescriptor, NativeFunction)>;
}

#[derive(Default)]
pub struct NativeRegistry {
    methods: HashMap<(String, NameAndDescriptor), NativeFunction>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the natives every program can rely on.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_module(&lang::LangObject);
        registry.register_module(&debug::DebugPrinter);
        registry
    }

    pub fn register_module(&mut self, module: &dyn NativeModule) {
        for ((name, descriptor), method) in module.methods() {
            self.register(module.classname(), &name, &descriptor, method);
        }
    }

    pub fn register(&mut self, class: &str, name: &str, descriptor: &str, method: NativeFunction) {
        self.methods.insert(
            (class.to_string(), (name.to_string(), descriptor.to_string())),
            method,
        );
    }

    pub fn lookup(&self, class: &str, name: &str, descriptor: &str) -> Option<NativeFunction> {
        self.methods
            .get(&(class.to_string(), (name.to_string(), descriptor.to_string())))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[macro_export]
macro_rules! static_method {
    (name: $name: expr, descriptor: $descriptor: expr => $method: expr) => {
        (
            ($name.to_string(), $descriptor.to_string()),
            std::rc::Rc::new($method) as $crate::native::NativeFunction,
        )
    };
}
