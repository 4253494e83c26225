use super::{NameAndDescriptor, NativeFunction, NativeModule};
use crate::{error::Throwable, object::slots::Slots, object::value::Value, static_method, vm::VM};

pub struct LangObject;

impl NativeModule for LangObject {
    fn classname(&self) -> &'static str {
        "java/lang/Object"
    }

    fn methods(&self) -> Vec<(NameAndDescriptor, NativeFunction)> {
        fn register_natives(_: &mut VM, _: Slots) -> Result<Option<Value>, Throwable> {
            Ok(None)
        }

        vec![static_method!(name: "registerNatives", descriptor: "()V" => register_natives)]
    }
}
