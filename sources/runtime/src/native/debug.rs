//! `rt/Debug.print`, the only way a program can produce output.

use super::{NameAndDescriptor, NativeFunction, NativeModule};
use crate::{
    error::Throwable,
    object::{slots::Slots, string::rust_string, value::Value},
    static_method,
    vm::VM,
};

pub struct DebugPrinter;

impl NativeModule for DebugPrinter {
    fn classname(&self) -> &'static str {
        "rt/Debug"
    }

    fn methods(&self) -> Vec<(NameAndDescriptor, NativeFunction)> {
        fn print_int(_: &mut VM, args: Slots) -> Result<Option<Value>, Throwable> {
            println!("{}", args.get_int(0)?);
            Ok(None)
        }

        fn print_long(_: &mut VM, args: Slots) -> Result<Option<Value>, Throwable> {
            println!("{}", args.get_long(0)?);
            Ok(None)
        }

        fn print_boolean(_: &mut VM, args: Slots) -> Result<Option<Value>, Throwable> {
            println!("{}", args.get_int(0)? != 0);
            Ok(None)
        }

        fn print_string(_: &mut VM, args: Slots) -> Result<Option<Value>, Throwable> {
            match args.get_ref(0)? {
                Some(string) => println!("{}", rust_string(&string)?),
                None => println!("null"),
            }
            Ok(None)
        }

        vec![
            static_method!(name: "print", descriptor: "(I)V" => print_int),
            static_method!(name: "print", descriptor: "(J)V" => print_long),
            static_method!(name: "print", descriptor: "(Z)V" => print_boolean),
            static_method!(name: "print", descriptor: "(Ljava/lang/String;)V" => print_string),
        ]
    }
}
