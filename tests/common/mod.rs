#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use interpreter::{BootOptions, Interpreter};
use parse::{
    builder::ClassBuilder,
    flags::{FieldAccessFlag, MethodAccessFlag},
};
use runtime::{
    classpath::MemoryClassPath,
    error::Throwable,
    native::NativeRegistry,
    object::{
        loader::{ClassLoader, LoaderOptions},
        slots::Slots,
        string::rust_string,
        value::Value,
        ClassRef,
    },
    vm::VM,
};
use tracing::Level;
use tracing_subscriber::fmt;

/// Class declaring the `capture` natives tests report through.
pub const PROBE: &str = "Probe";

pub mod op {
    pub const ACONST_NULL: u8 = 0x01;
    pub const ICONST_0: u8 = 0x03;
    pub const ICONST_1: u8 = 0x04;
    pub const LCONST_1: u8 = 0x0a;
    pub const BIPUSH: u8 = 0x10;
    pub const LDC: u8 = 0x12;
    pub const LDC2_W: u8 = 0x14;
    pub const ILOAD_0: u8 = 0x1a;
    pub const ILOAD_1: u8 = 0x1b;
    pub const LLOAD_0: u8 = 0x1e;
    pub const LLOAD_2: u8 = 0x20;
    pub const ALOAD_0: u8 = 0x2a;
    pub const ISTORE_0: u8 = 0x3b;
    pub const POP: u8 = 0x57;
    pub const DUP: u8 = 0x59;
    pub const IADD: u8 = 0x60;
    pub const LADD: u8 = 0x61;
    pub const ISUB: u8 = 0x64;
    pub const IINC: u8 = 0x84;
    pub const IFEQ: u8 = 0x99;
    pub const GOTO: u8 = 0xa7;
    pub const IRETURN: u8 = 0xac;
    pub const LRETURN: u8 = 0xad;
    pub const ARETURN: u8 = 0xb0;
    pub const RETURN: u8 = 0xb1;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const NEW: u8 = 0xbb;
}

/// An instruction taking a two byte pool index.
pub fn indexed(opcode: u8, index: u16) -> Vec<u8> {
    let [high, low] = index.to_be_bytes();
    vec![opcode, high, low]
}

pub fn public_static() -> MethodAccessFlag {
    MethodAccessFlag::PUBLIC | MethodAccessFlag::STATIC
}

pub fn static_field() -> FieldAccessFlag {
    FieldAccessFlag::PUBLIC | FieldAccessFlag::STATIC
}

pub fn add(path: &mut MemoryClassPath, builder: &ClassBuilder, name: &str) {
    path.insert(name, builder.build());
}

/// The classes the loader needs before anything else will load, and the probe.
pub fn bootstrap_class_path() -> MemoryClassPath {
    let mut path = MemoryClassPath::new();

    let mut object = ClassBuilder::new("java/lang/Object", None);
    object
        .method(MethodAccessFlag::PUBLIC, "<init>", "()V", 0, 1, vec![op::RETURN])
        .bodiless_method(
            MethodAccessFlag::PRIVATE | MethodAccessFlag::STATIC | MethodAccessFlag::NATIVE,
            "registerNatives",
            "()V",
        );
    add(&mut path, &object, "java/lang/Object");

    add(
        &mut path,
        &ClassBuilder::new("java/lang/Class", Some("java/lang/Object")),
        "java/lang/Class",
    );

    let mut string = ClassBuilder::new("java/lang/String", Some("java/lang/Object"));
    string.field(FieldAccessFlag::PRIVATE | FieldAccessFlag::FINAL, "value", "[C");
    add(&mut path, &string, "java/lang/String");

    add(&mut path, &ClassBuilder::interface("java/lang/Cloneable"), "java/lang/Cloneable");
    add(&mut path, &ClassBuilder::interface("java/io/Serializable"), "java/io/Serializable");

    let native = public_static() | MethodAccessFlag::NATIVE;
    let mut probe = ClassBuilder::new(PROBE, Some("java/lang/Object"));
    probe
        .bodiless_method(native, "capture", "(I)V")
        .bodiless_method(native, "capture", "(J)V")
        .bodiless_method(native, "capture", "(Ljava/lang/String;)V");
    add(&mut path, &probe, PROBE);

    path
}

pub fn init_logging() {
    let format = fmt::format()
        .with_ansi(false)
        .without_time()
        .with_level(true)
        .with_target(false)
        .with_thread_names(false)
        .with_source_location(false)
        .compact();

    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .event_format(format)
        .with_test_writer()
        .try_init();
}

/// Values handed to `Probe.capture`, in call order.
#[derive(Clone, Default)]
pub struct Captures {
    values: Rc<RefCell<Vec<Value>>>,
}

impl Captures {
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn ints(&self) -> Vec<i32> {
        self.values
            .borrow()
            .iter()
            .map(|value| match value {
                Value::Int(v) => *v,
                v => panic!("expected an int capture, got {:?}", v),
            })
            .collect()
    }

    pub fn get(&self, index: usize) -> Value {
        self.values
            .borrow()
            .get(index)
            .cloned()
            .expect("index to be in range")
    }
}

pub fn attach_utils(natives: &mut NativeRegistry) -> Captures {
    let captures = Captures::default();

    let values = Rc::clone(&captures.values);
    natives.register(
        PROBE,
        "capture",
        "(I)V",
        Rc::new(move |_: &mut VM, args: Slots| -> Result<Option<Value>, Throwable> {
            values.borrow_mut().push(Value::Int(args.get_int(0)?));
            Ok(None)
        }),
    );

    let values = Rc::clone(&captures.values);
    natives.register(
        PROBE,
        "capture",
        "(J)V",
        Rc::new(move |_: &mut VM, args: Slots| -> Result<Option<Value>, Throwable> {
            values.borrow_mut().push(Value::Long(args.get_long(0)?));
            Ok(None)
        }),
    );

    let values = Rc::clone(&captures.values);
    natives.register(
        PROBE,
        "capture",
        "(Ljava/lang/String;)V",
        Rc::new(move |_: &mut VM, args: Slots| -> Result<Option<Value>, Throwable> {
            values.borrow_mut().push(Value::Ref(args.get_ref(0)?));
            Ok(None)
        }),
    );

    captures
}

pub fn make_loader(path: MemoryClassPath) -> ClassLoader {
    init_logging();
    ClassLoader::new(path, LoaderOptions { verbose: true }).expect("classloader bootstrap to succeed")
}

pub fn make_vm(path: MemoryClassPath) -> (Interpreter, Captures) {
    make_vm_with(path, BootOptions::default())
}

pub fn make_vm_with(path: MemoryClassPath, options: BootOptions) -> (Interpreter, Captures) {
    let loader = make_loader(path);
    let mut natives = NativeRegistry::with_builtins();
    let captures = attach_utils(&mut natives);

    (Interpreter::new(VM::new(loader, natives), options), captures)
}

pub fn load(vm: &mut Interpreter, name: &str) -> ClassRef {
    vm.vm_mut()
        .class_loader()
        .load_class(name)
        .expect("class to load")
}

/// Run `name.runTest()V` to completion.
pub fn execute_test(vm: &mut Interpreter, name: &str) -> Result<(), Throwable> {
    let class = load(vm, name);
    let method = class
        .read()
        .method("runTest", "()V")
        .expect("runTest to exist");

    vm.invoke(&class, method, vec![]).map(|_| ())
}

#[track_caller]
pub fn sassert_eq(expected: &str, value: Value) {
    let string = value
        .as_ref()
        .cloned()
        .flatten()
        .expect("was not a non-null reference");

    assert_eq!(expected, rust_string(&string).expect("could not decode string"));
}
