use anyhow::Result;
use parse::{
    attributes::CodeAttribute,
    classfile,
    constants::{CLASS_INITIALISER, INSTANCE_INITIALISER},
    flags::{MethodAccessFlag, MethodAccessFlags},
    pool::ConstantPool,
};
use support::descriptor::MethodType;

#[derive(Debug, Clone)]
pub struct Method {
    class_name: String,
    flags: MethodAccessFlags,
    name: String,
    descriptor: String,
    method_type: MethodType,
    code: Option<CodeAttribute>,
}

impl Method {
    pub fn from_class_file(
        class_name: &str,
        method: &classfile::Method,
        pool: &ConstantPool,
    ) -> Result<Self> {
        let descriptor = pool.utf8(method.descriptor)?.to_string();

        Ok(Self {
            class_name: class_name.to_string(),
            flags: method.flags,
            name: pool.utf8(method.name)?.to_string(),
            method_type: MethodType::parse(&descriptor)?,
            descriptor,
            code: method
                .attributes
                .maybe_known_attribute::<CodeAttribute>(pool)?,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn method_type(&self) -> &MethodType {
        &self.method_type
    }

    pub fn flags(&self) -> MethodAccessFlags {
        self.flags
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.code.as_ref()
    }

    pub fn is_static(&self) -> bool {
        self.flags.has(MethodAccessFlag::STATIC)
    }

    pub fn is_native(&self) -> bool {
        self.flags.has(MethodAccessFlag::NATIVE)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.has(MethodAccessFlag::ABSTRACT)
    }

    /// `<clinit>` or `<init>`.
    pub fn is_initialiser(&self) -> bool {
        self.name == CLASS_INITIALISER || self.name == INSTANCE_INITIALISER
    }

    /// Local slots the arguments take on entry, including `this` for instance methods.
    pub fn argument_slots(&self) -> usize {
        let receiver = if self.is_static() { 0 } else { 1 };
        self.method_type.argument_slots() + receiver
    }
}
