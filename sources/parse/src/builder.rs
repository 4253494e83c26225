//! Writes class files. The runtime never needs this; it exists so tests and demos
//! can produce real class file bytes without a Java compiler.

use bytes::BufMut;

use crate::{
    attributes::{CodeAttribute, ConstantValueAttribute, KnownAttribute},
    constants::MAGIC,
    flags::{ClassFileAccessFlag, FieldAccessFlag, MethodAccessFlag},
    pool::{
        ConstantClass, ConstantEntry, ConstantMember, ConstantNameAndType, ConstantPool,
        ConstantString, ConstantUtf8,
    },
};

/// A literal that can live in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

struct FieldEntry {
    flags: FieldAccessFlag,
    name: u16,
    descriptor: u16,
    constant_value: Option<u16>,
}

struct MethodEntry {
    flags: MethodAccessFlag,
    name: u16,
    descriptor: u16,
    code: Option<(u16, u16, Vec<u8>)>,
}

pub struct ClassBuilder {
    pool: ConstantPool,
    flags: ClassFileAccessFlag,
    this_class: u16,
    super_class: Option<u16>,
    interfaces: Vec<u16>,
    fields: Vec<FieldEntry>,
    methods: Vec<MethodEntry>,
    major_version: u16,
}

impl ClassBuilder {
    /// Start a public class. `super_name` is `None` only for `java/lang/Object`.
    pub fn new(name: &str, super_name: Option<&str>) -> Self {
        let mut builder = Self {
            pool: ConstantPool::new(),
            flags: ClassFileAccessFlag::PUBLIC | ClassFileAccessFlag::SUPER,
            this_class: 0,
            super_class: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            major_version: 52,
        };

        builder.this_class = builder.class(name);
        builder.super_class = super_name.map(|s| builder.class(s));
        builder
    }

    pub fn interface(name: &str) -> Self {
        let mut builder = Self::new(name, Some("java/lang/Object"));
        builder.flags =
            ClassFileAccessFlag::PUBLIC | ClassFileAccessFlag::INTERFACE | ClassFileAccessFlag::ABSTRACT;
        builder
    }

    pub fn implements(&mut self, name: &str) -> &mut Self {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    pub fn version(&mut self, major: u16) -> &mut Self {
        self.major_version = major;
        self
    }

    fn intern(&mut self, entry: ConstantEntry) -> u16 {
        let existing = self
            .pool
            .entries()
            .iter()
            .position(|e| *e == entry);

        match existing {
            Some(position) => position as u16 + 1,
            None => self.pool.insert(entry),
        }
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        self.intern(ConstantEntry::Utf8(ConstantUtf8 {
            value: value.to_string(),
        }))
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.intern(ConstantEntry::Class(ConstantClass { name }))
    }

    pub fn literal(&mut self, literal: Literal) -> u16 {
        match literal {
            Literal::Int(v) => self.intern(ConstantEntry::Integer(v)),
            Literal::Long(v) => self.intern(ConstantEntry::Long(v)),
            Literal::Float(v) => self.intern(ConstantEntry::Float(v)),
            Literal::Double(v) => self.intern(ConstantEntry::Double(v)),
            Literal::String(v) => {
                let string = self.utf8(&v);
                self.intern(ConstantEntry::String(ConstantString { string }))
            }
        }
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.intern(ConstantEntry::NameAndType(ConstantNameAndType { name, descriptor }))
    }

    fn member(&mut self, class: &str, name: &str, descriptor: &str) -> ConstantMember {
        ConstantMember {
            class: self.class(class),
            name_and_type: self.name_and_type(name, descriptor),
        }
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let member = self.member(class, name, descriptor);
        self.intern(ConstantEntry::Field(member))
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let member = self.member(class, name, descriptor);
        self.intern(ConstantEntry::Method(member))
    }

    pub fn field(&mut self, flags: FieldAccessFlag, name: &str, descriptor: &str) -> &mut Self {
        let (name, descriptor) = (self.utf8(name), self.utf8(descriptor));
        self.fields.push(FieldEntry {
            flags,
            name,
            descriptor,
            constant_value: None,
        });
        self
    }

    /// A field carrying a ConstantValue attribute.
    pub fn constant_field(
        &mut self,
        flags: FieldAccessFlag,
        name: &str,
        descriptor: &str,
        value: Literal,
    ) -> &mut Self {
        let (name, descriptor) = (self.utf8(name), self.utf8(descriptor));
        let value = self.literal(value);
        self.utf8(ConstantValueAttribute::id());

        self.fields.push(FieldEntry {
            flags,
            name,
            descriptor,
            constant_value: Some(value),
        });
        self
    }

    pub fn method(
        &mut self,
        flags: MethodAccessFlag,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: Vec<u8>,
    ) -> &mut Self {
        let (name, descriptor) = (self.utf8(name), self.utf8(descriptor));
        self.utf8(CodeAttribute::id());

        self.methods.push(MethodEntry {
            flags,
            name,
            descriptor,
            code: Some((max_stack, max_locals, code)),
        });
        self
    }

    /// A method without a Code attribute (native or abstract).
    pub fn bodiless_method(&mut self, flags: MethodAccessFlag, name: &str, descriptor: &str) -> &mut Self {
        let (name, descriptor) = (self.utf8(name), self.utf8(descriptor));
        self.methods.push(MethodEntry {
            flags,
            name,
            descriptor,
            code: None,
        });
        self
    }

    fn write_pool(&self, out: &mut Vec<u8>) {
        out.put_u16(self.pool.count());

        for entry in self.pool.entries() {
            let Some(tag) = entry.tag() else {
                continue;
            };

            out.put_u8(tag as u8);
            match entry {
                ConstantEntry::Utf8(data) => {
                    let encoded = cesu8::to_java_cesu8(&data.value);
                    out.put_u16(encoded.len() as u16);
                    out.put_slice(&encoded);
                }
                ConstantEntry::Integer(v) => out.put_i32(*v),
                ConstantEntry::Float(v) => out.put_f32(*v),
                ConstantEntry::Long(v) => out.put_i64(*v),
                ConstantEntry::Double(v) => out.put_f64(*v),
                ConstantEntry::Class(data) => out.put_u16(data.name),
                ConstantEntry::String(data) => out.put_u16(data.string),
                ConstantEntry::Field(data)
                | ConstantEntry::Method(data)
                | ConstantEntry::InterfaceMethod(data) => {
                    out.put_u16(data.class);
                    out.put_u16(data.name_and_type);
                }
                ConstantEntry::NameAndType(data) => {
                    out.put_u16(data.name);
                    out.put_u16(data.descriptor);
                }
                ConstantEntry::MethodHandle(data) => {
                    out.put_u8(data.kind);
                    out.put_u16(data.reference);
                }
                ConstantEntry::MethodType(data) => out.put_u16(data.descriptor),
                ConstantEntry::Dynamic(data) | ConstantEntry::InvokeDynamic(data) => {
                    out.put_u16(data.bootstrap_method);
                    out.put_u16(data.name_and_type);
                }
                ConstantEntry::Module(data) | ConstantEntry::Package(data) => {
                    out.put_u16(data.name)
                }
                ConstantEntry::Reserved => unreachable!("reserved entries have no tag"),
            }
        }
    }

    fn find_utf8(&self, value: &str) -> u16 {
        self.pool
            .entries()
            .iter()
            .position(|e| matches!(e, ConstantEntry::Utf8(data) if data.value == value))
            .map(|position| position as u16 + 1)
            .unwrap_or(0)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u32(MAGIC);
        out.put_u16(0);
        out.put_u16(self.major_version);

        self.write_pool(&mut out);

        out.put_u16(self.flags.bits());
        out.put_u16(self.this_class);
        out.put_u16(self.super_class.unwrap_or(0));

        out.put_u16(self.interfaces.len() as u16);
        for interface in &self.interfaces {
            out.put_u16(*interface);
        }

        out.put_u16(self.fields.len() as u16);
        for field in &self.fields {
            out.put_u16(field.flags.bits());
            out.put_u16(field.name);
            out.put_u16(field.descriptor);

            match field.constant_value {
                Some(value) => {
                    out.put_u16(1);
                    out.put_u16(self.find_utf8(ConstantValueAttribute::id()));
                    out.put_u32(2);
                    out.put_u16(value);
                }
                None => out.put_u16(0),
            }
        }

        out.put_u16(self.methods.len() as u16);
        for method in &self.methods {
            out.put_u16(method.flags.bits());
            out.put_u16(method.name);
            out.put_u16(method.descriptor);

            match &method.code {
                Some((max_stack, max_locals, code)) => {
                    out.put_u16(1);
                    out.put_u16(self.find_utf8(CodeAttribute::id()));
                    // max_stack + max_locals + code_length + code + exception_table_length + attributes_count
                    out.put_u32(2 + 2 + 4 + code.len() as u32 + 2 + 2);
                    out.put_u16(*max_stack);
                    out.put_u16(*max_locals);
                    out.put_u32(code.len() as u32);
                    out.put_slice(code);
                    out.put_u16(0);
                    out.put_u16(0);
                }
                None => out.put_u16(0),
            }
        }

        // Class attributes
        out.put_u16(0);
        out
    }
}
