use crate::{native::NativeRegistry, object::loader::ClassLoader};

/// State shared by everything that executes: the class registry and the natives.
pub struct VM {
    class_loader: ClassLoader,
    natives: NativeRegistry,
}

impl VM {
    pub fn new(class_loader: ClassLoader, natives: NativeRegistry) -> Self {
        Self {
            class_loader,
            natives,
        }
    }

    pub fn class_loader(&mut self) -> &mut ClassLoader {
        &mut self.class_loader
    }

    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    pub fn natives_mut(&mut self) -> &mut NativeRegistry {
        &mut self.natives
    }
}
