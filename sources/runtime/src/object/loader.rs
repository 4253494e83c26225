use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

use parking_lot::RwLock;
use parse::parser::Parser;
use support::descriptor::{BaseType, FieldType};
use tracing::{debug, info};

use super::{
    class::Class,
    link::link,
    string::{self, StringInterner},
    ClassRef, Object, ObjectExtra, ObjectRef, Reference,
};
use crate::{
    classpath::{ClassPath, ClassSource},
    error::{Throwable, VMError},
};

pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";
pub const JAVA_LANG_CLASS: &str = "java/lang/Class";
pub const JAVA_LANG_CLONEABLE: &str = "java/lang/Cloneable";
pub const JAVA_IO_SERIALIZABLE: &str = "java/io/Serializable";

#[derive(Debug, Clone, Copy, Default)]
pub struct LoaderOptions {
    /// Report every class as it is loaded.
    pub verbose: bool,
}

/// The one class registry of a VM. Every class name maps to at most one
/// descriptor for the lifetime of the loader.
pub struct ClassLoader {
    classes: HashMap<String, ClassRef>,
    class_path: Box<dyn ClassPath>,
    options: LoaderOptions,
    strings: StringInterner,
    /// Names currently between "resolve the bytes" and "registered".
    in_flight: HashSet<String>,
}

impl ClassLoader {
    /// Create a loader and bootstrap `java/lang/Class` and the primitive classes.
    pub fn new(
        class_path: impl ClassPath + 'static,
        options: LoaderOptions,
    ) -> Result<Self, Throwable> {
        let mut loader = Self {
            classes: HashMap::new(),
            class_path: Box::new(class_path),
            options,
            strings: StringInterner::new(),
            in_flight: HashSet::new(),
        };

        loader.bootstrap()?;
        Ok(loader)
    }

    fn bootstrap(&mut self) -> Result<(), Throwable> {
        debug!("Bootstrapping class loader");
        let meta_class = self.load_class(JAVA_LANG_CLASS)?;

        // Everything loaded on the way to java/lang/Class predates it
        let missing = self
            .classes
            .values()
            .filter(|class| class.read().type_object().is_none())
            .cloned()
            .collect::<Vec<_>>();

        for class in missing {
            self.attach_type_object(&meta_class, &class);
        }

        for ty in BaseType::ALL {
            let class = Rc::new(RwLock::new(Class::primitive(ty)));
            self.attach_type_object(&meta_class, &class);
            self.classes.insert(ty.class_name().to_string(), class);
        }

        debug!("Bootstrapped {} classes", self.classes.len());
        Ok(())
    }

    fn attach_type_object(&self, meta_class: &ClassRef, class: &ClassRef) {
        let object = Object::with_extra(
            Rc::clone(meta_class),
            ObjectExtra::TypeOf(Rc::downgrade(class)),
        );

        class.write().set_type_object(Some(object.into_ref()));
    }

    /// Load, define and link `name` if it is not loaded yet. Repeated calls
    /// return the same descriptor.
    pub fn load_class(&mut self, name: &str) -> Result<ClassRef, Throwable> {
        if let Some(class) = self.classes.get(name) {
            debug!("Fast path: {}", name);
            return Ok(Rc::clone(class));
        }

        debug!("Slow path: {}", name);

        let class = if name.starts_with('[') {
            self.load_array_class(name)?
        } else {
            self.load_non_array_class(name)?
        };

        if let Some(meta_class) = self.classes.get(JAVA_LANG_CLASS).cloned() {
            if class.read().type_object().is_none() {
                self.attach_type_object(&meta_class, &class);
            }
        }

        Ok(class)
    }

    fn load_array_class(&mut self, name: &str) -> Result<ClassRef, Throwable> {
        let component = FieldType::parse(&name[1..]).map_err(|_| VMError::ClassNotFound {
            name: name.to_string(),
        })?;

        let super_class = self.load_class(JAVA_LANG_OBJECT)?;
        let interfaces = vec![
            self.load_class(JAVA_LANG_CLONEABLE)?,
            self.load_class(JAVA_IO_SERIALIZABLE)?,
        ];

        let class = Rc::new(RwLock::new(Class::array(
            name,
            &component.class_name(),
            super_class,
            interfaces,
        )));

        self.classes.insert(name.to_string(), Rc::clone(&class));

        if self.options.verbose {
            info!("[Loaded Array Class {}]", name);
        }

        Ok(class)
    }

    fn load_non_array_class(&mut self, name: &str) -> Result<ClassRef, Throwable> {
        if !self.in_flight.insert(name.to_string()) {
            return Err(VMError::ClassCircularity {
                name: name.to_string(),
            }
            .into());
        }

        let result = self
            .class_path
            .resolve(name)
            .and_then(|(bytes, source)| self.define_class(name, &bytes, source));
        self.in_flight.remove(name);

        let class = result?;

        if let Err(e) = link(self, &class) {
            self.classes.remove(name);
            return Err(e);
        }

        if self.options.verbose {
            info!("[Loaded {} from {}]", name, class.read().source());
        }

        Ok(class)
    }

    fn define_class(
        &mut self,
        name: &str,
        bytes: &[u8],
        source: ClassSource,
    ) -> Result<ClassRef, Throwable> {
        let format_error = |e: anyhow::Error| VMError::ClassFormat {
            name: name.to_string(),
            reason: format!("{:#}", e),
        };

        let file = Parser::new(bytes).parse().map_err(format_error)?;
        let class = Class::from_class_file(&file, source).map_err(format_error)?;

        if class.name() != name {
            return Err(VMError::ClassFormat {
                name: name.to_string(),
                reason: format!("class file declares {}", class.name()),
            }
            .into());
        }

        let class = Rc::new(RwLock::new(class));
        self.resolve_super_class(&class)?;
        self.resolve_interfaces(&class)?;

        self.classes.insert(name.to_string(), Rc::clone(&class));
        Ok(class)
    }

    fn resolve_super_class(&mut self, class: &ClassRef) -> Result<(), Throwable> {
        let (name, super_name) = {
            let class = class.read();
            (class.name().to_string(), class.super_name().map(str::to_string))
        };

        let Some(super_name) = super_name else {
            if name == JAVA_LANG_OBJECT {
                return Ok(());
            }

            return Err(VMError::ClassFormat {
                name,
                reason: "missing superclass".to_string(),
            }
            .into());
        };

        let super_class = self.load_class(&super_name)?;
        if super_class.read().is_interface() {
            return Err(VMError::IncompatibleClassChange {
                context: format!("class {} has interface {} as super class", name, super_name),
            }
            .into());
        }

        class.write().super_class = Some(super_class);
        Ok(())
    }

    fn resolve_interfaces(&mut self, class: &ClassRef) -> Result<(), Throwable> {
        let (name, interface_names) = {
            let class = class.read();
            (class.name().to_string(), class.interface_names().to_vec())
        };

        let mut interfaces = Vec::with_capacity(interface_names.len());
        for interface_name in interface_names {
            let interface = self.load_class(&interface_name)?;
            if !interface.read().is_interface() {
                return Err(VMError::IncompatibleClassChange {
                    context: format!("class {} implements non-interface {}", name, interface_name),
                }
                .into());
            }

            interfaces.push(interface);
        }

        class.write().interfaces = interfaces;
        Ok(())
    }

    pub fn find_loaded(&self, name: &str) -> Option<ClassRef> {
        self.classes.get(name).cloned()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassRef> {
        self.classes.values()
    }

    pub fn options(&self) -> LoaderOptions {
        self.options
    }

    /// The runtime string for `text`. Equal texts give the same object.
    pub fn intern_string(&mut self, text: &str) -> Result<ObjectRef, Throwable> {
        if let Some(string) = self.strings.get(text) {
            return Ok(string);
        }

        let string = string::new_string(self, text)?;
        self.strings.insert(text, Rc::clone(&string));

        Ok(string)
    }

    pub fn new_object(&self, class: &ClassRef) -> ObjectRef {
        Object::new(Rc::clone(class)).into_ref()
    }

    /// An array of references, `component` being the element class name.
    pub fn new_reference_array(
        &mut self,
        component: &str,
        values: Vec<Reference>,
    ) -> Result<ObjectRef, Throwable> {
        let descriptor = if component.starts_with('[') {
            component.to_string()
        } else {
            format!("L{};", component)
        };

        let class = self.load_class(&format!("[{}", descriptor))?;
        Ok(Object::with_extra(class, ObjectExtra::Refs(values)).into_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use parse::builder::ClassBuilder;
    use support::descriptor::BaseType;

    use super::*;
    use crate::{
        classpath::MemoryClassPath,
        object::class::{ClassKind, InitState},
        testing::{add, bootstrap_class_path, loader_with, RecordingClassPath},
    };

    #[test]
    fn it_bootstraps_the_meta_class_and_primitives() {
        let loader = loader_with(bootstrap_class_path());

        let meta_class = loader.find_loaded(JAVA_LANG_CLASS).unwrap();
        assert!(loader.is_loaded(JAVA_LANG_OBJECT));

        for ty in BaseType::ALL {
            let class = loader.find_loaded(ty.class_name()).unwrap();
            let class_ref = Rc::clone(&class);
            let class = class.read();

            assert_eq!(class.state(), InitState::Initialized);
            assert_eq!(class.kind(), &ClassKind::Primitive(ty));
            assert!(class.super_class().is_none());

            let type_object = class.type_object().unwrap();
            let type_object = type_object.read();
            assert!(Rc::ptr_eq(&type_object.class(), &meta_class));
            assert!(Rc::ptr_eq(&type_object.type_of().unwrap(), &class_ref));
        }
    }

    #[test]
    fn classes_loaded_before_the_meta_class_get_type_objects() {
        let loader = loader_with(bootstrap_class_path());

        for class in loader.classes() {
            let type_object = class.read().type_object().unwrap();
            assert!(Rc::ptr_eq(&type_object.read().type_of().unwrap(), class));
        }
    }

    #[test]
    fn it_returns_the_same_descriptor() {
        let mut loader = loader_with(bootstrap_class_path());

        let first = loader.load_class("java/lang/String").unwrap();
        let second = loader.load_class("java/lang/String").unwrap();

        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn it_synthesises_array_classes() {
        let mut loader = loader_with(bootstrap_class_path());

        let array = loader.load_class("[I").unwrap();
        let object = loader.find_loaded(JAVA_LANG_OBJECT).unwrap();
        let array = array.read();

        assert!(array.is_array());
        assert_eq!(array.state(), InitState::Initialized);
        assert_eq!(array.source(), &ClassSource::Synthetic);
        assert!(Rc::ptr_eq(&array.super_class().unwrap(), &object));
        assert_eq!(
            array.interface_names(),
            &["java/lang/Cloneable".to_string(), "java/io/Serializable".to_string()]
        );
        assert_eq!(
            array.kind(),
            &ClassKind::Array {
                component: "int".to_string()
            }
        );
        assert!(array.type_object().is_some());
    }

    #[test]
    fn array_classes_never_reach_the_class_path() {
        let mut path = bootstrap_class_path();
        add(&mut path, "pkg/A", &ClassBuilder::new("pkg/A", Some("java/lang/Object")));

        let (path, requests) = RecordingClassPath::new(path);
        let mut loader = ClassLoader::new(path, LoaderOptions::default()).unwrap();

        loader.load_class("[I").unwrap();
        loader.load_class("[[Ljava/lang/String;").unwrap();
        loader.load_class("[Lpkg/A;").unwrap();
        loader.load_class("pkg/A").unwrap();

        let requests = requests.borrow();
        assert!(requests.iter().all(|name| !name.starts_with('[')), "{:?}", requests);
        assert!(requests.iter().any(|name| name == "pkg/A"));
    }

    #[test]
    fn it_records_nested_array_components() {
        let mut loader = loader_with(bootstrap_class_path());
        let array = loader.load_class("[[Ljava/lang/String;").unwrap();

        assert_eq!(
            array.read().kind(),
            &ClassKind::Array {
                component: "[Ljava/lang/String;".to_string()
            }
        );
        // The component class is only loaded when asked for
        assert!(!loader.is_loaded("[Ljava/lang/String;"));
    }

    #[test]
    fn it_resolves_supers_before_registering() {
        let mut path = bootstrap_class_path();
        add(&mut path, "pkg/A", &ClassBuilder::new("pkg/A", Some("java/lang/Object")));
        let mut b = ClassBuilder::new("pkg/B", Some("pkg/A"));
        b.implements("java/lang/Cloneable");
        add(&mut path, "pkg/B", &b);

        let mut loader = loader_with(path);
        let b = loader.load_class("pkg/B").unwrap();
        let a = loader.find_loaded("pkg/A").unwrap();

        assert!(Rc::ptr_eq(&b.read().super_class().unwrap(), &a));
        assert_eq!(b.read().interfaces().len(), 1);
        assert_eq!(b.read().state(), InitState::Linked);
        assert_eq!(a.read().state(), InitState::Linked);
        assert_eq!(b.read().source(), &ClassSource::Memory);
    }

    #[test]
    fn it_reports_missing_classes() {
        let mut loader = loader_with(bootstrap_class_path());
        let err = loader.load_class("pkg/Missing").unwrap_err();

        assert_eq!(
            err.vm_error(),
            Some(&VMError::ClassNotFound {
                name: "pkg/Missing".to_string()
            })
        );
        assert!(!loader.is_loaded("pkg/Missing"));
    }

    #[test]
    fn it_reports_malformed_classes() {
        let mut path = bootstrap_class_path();
        path.insert("pkg/Broken", vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00]);
        let mut loader = loader_with(path);

        let err = loader.load_class("pkg/Broken").unwrap_err();
        assert!(matches!(err.vm_error(), Some(VMError::ClassFormat { .. })));
        assert!(!loader.is_loaded("pkg/Broken"));
    }

    #[test]
    fn it_rejects_misnamed_classes() {
        let mut path = bootstrap_class_path();
        add(&mut path, "pkg/A", &ClassBuilder::new("pkg/NotA", Some("java/lang/Object")));
        let mut loader = loader_with(path);

        let err = loader.load_class("pkg/A").unwrap_err();
        assert!(matches!(err.vm_error(), Some(VMError::ClassFormat { .. })));
    }

    #[test]
    fn a_failed_super_leaves_nothing_behind() {
        let mut path = bootstrap_class_path();
        add(&mut path, "pkg/B", &ClassBuilder::new("pkg/B", Some("pkg/Gone")));
        let mut loader = loader_with(path);

        let err = loader.load_class("pkg/B").unwrap_err();
        assert!(matches!(err.vm_error(), Some(VMError::ClassNotFound { .. })));
        assert!(!loader.is_loaded("pkg/B"));
    }

    #[test]
    fn it_detects_circular_supers() {
        let mut path = bootstrap_class_path();
        add(&mut path, "pkg/A", &ClassBuilder::new("pkg/A", Some("pkg/B")));
        add(&mut path, "pkg/B", &ClassBuilder::new("pkg/B", Some("pkg/A")));
        let mut loader = loader_with(path);

        let err = loader.load_class("pkg/A").unwrap_err();
        assert!(matches!(err.vm_error(), Some(VMError::ClassCircularity { .. })));
    }

    #[test]
    fn interfaces_cannot_be_extended_as_classes() {
        let mut path = bootstrap_class_path();
        add(&mut path, "pkg/A", &ClassBuilder::new("pkg/A", Some("java/lang/Cloneable")));
        let mut loader = loader_with(path);

        let err = loader.load_class("pkg/A").unwrap_err();
        assert!(matches!(
            err.vm_error(),
            Some(VMError::IncompatibleClassChange { .. })
        ));
    }

    #[test]
    fn bootstrap_needs_the_meta_class() {
        let result = ClassLoader::new(MemoryClassPath::new(), LoaderOptions::default());

        assert!(matches!(
            result.err().and_then(|e| e.vm_error().cloned()),
            Some(VMError::ClassNotFound { .. })
        ));
    }

    #[test]
    fn it_builds_reference_arrays() {
        let mut loader = loader_with(bootstrap_class_path());
        let text = loader.intern_string("a").unwrap();

        let array = loader
            .new_reference_array("java/lang/String", vec![Some(text), None])
            .unwrap();
        let array = array.read();

        assert_eq!(array.class_name(), "[Ljava/lang/String;");
        assert_eq!(array.extra.as_refs().unwrap().len(), 2);
    }
}
