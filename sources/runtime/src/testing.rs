//! Class files for unit tests, there is no JDK to load from.

use std::{cell::RefCell, rc::Rc};

use parse::{
    builder::ClassBuilder,
    flags::{FieldAccessFlag, MethodAccessFlag},
};

use crate::{
    classpath::{ClassPath, ClassSource, MemoryClassPath},
    error::Throwable,
    object::loader::{ClassLoader, LoaderOptions},
};

pub fn add(path: &mut MemoryClassPath, name: &str, builder: &ClassBuilder) {
    path.insert(name, builder.build());
}

/// The handful of classes the loader needs before anything else will load.
pub fn bootstrap_class_path() -> MemoryClassPath {
    let mut path = MemoryClassPath::new();

    let mut object = ClassBuilder::new("java/lang/Object", None);
    object.method(MethodAccessFlag::PUBLIC, "<init>", "()V", 0, 1, vec![0xb1]);
    add(&mut path, "java/lang/Object", &object);

    add(
        &mut path,
        "java/lang/Class",
        &ClassBuilder::new("java/lang/Class", Some("java/lang/Object")),
    );

    let mut string = ClassBuilder::new("java/lang/String", Some("java/lang/Object"));
    string.field(FieldAccessFlag::PRIVATE | FieldAccessFlag::FINAL, "value", "[C");
    add(&mut path, "java/lang/String", &string);

    add(&mut path, "java/lang/Cloneable", &ClassBuilder::interface("java/lang/Cloneable"));
    add(&mut path, "java/io/Serializable", &ClassBuilder::interface("java/io/Serializable"));

    path
}

pub fn loader_with(path: MemoryClassPath) -> ClassLoader {
    ClassLoader::new(path, LoaderOptions { verbose: true }).unwrap()
}

/// Records every name the loader asks for, then defers to a memory class path.
#[derive(Debug)]
pub struct RecordingClassPath {
    inner: MemoryClassPath,
    requests: Rc<RefCell<Vec<String>>>,
}

impl RecordingClassPath {
    pub fn new(inner: MemoryClassPath) -> (Self, Rc<RefCell<Vec<String>>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let path = Self {
            inner,
            requests: Rc::clone(&requests),
        };

        (path, requests)
    }
}

impl ClassPath for RecordingClassPath {
    fn resolve(&self, name: &str) -> Result<(Vec<u8>, ClassSource), Throwable> {
        self.requests.borrow_mut().push(name.to_string());
        self.inner.resolve(name)
    }
}
