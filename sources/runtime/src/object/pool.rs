use anyhow::{anyhow, Result};
use enum_as_inner::EnumAsInner;
use parse::pool::{ConstantEntry, ConstantPool, ConstantTag};

use crate::{error::Throwable, internal};

/// A symbolic reference to a field or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub class: String,
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Constant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
    NameAndType { name: String, descriptor: String },
    Utf8(String),
    /// Method handles, method types and dynamic constants, which nothing here executes.
    Opaque(ConstantTag),
    Reserved,
}

/// The class file's constant pool with every symbolic reference spelled out,
/// indexed the same way (from 1).
#[derive(Debug, Clone, Default)]
pub struct RuntimeConstantPool {
    entries: Vec<Constant>,
}

impl RuntimeConstantPool {
    pub fn new(pool: &ConstantPool) -> Result<Self> {
        let mut entries = Vec::with_capacity(pool.entries().len());

        for (position, entry) in pool.entries().iter().enumerate() {
            let index = position as u16 + 1;
            let member = |index| -> Result<MemberRef> {
                let (class, name, descriptor) = pool.member_ref(index)?;
                Ok(MemberRef {
                    class: class.to_string(),
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                })
            };

            entries.push(match entry {
                ConstantEntry::Integer(v) => Constant::Integer(*v),
                ConstantEntry::Float(v) => Constant::Float(*v),
                ConstantEntry::Long(v) => Constant::Long(*v),
                ConstantEntry::Double(v) => Constant::Double(*v),
                ConstantEntry::String(data) => Constant::String(pool.utf8(data.string)?.to_string()),
                ConstantEntry::Class(data) => Constant::Class(pool.utf8(data.name)?.to_string()),
                ConstantEntry::Field(_) => Constant::FieldRef(member(index)?),
                ConstantEntry::Method(_) => Constant::MethodRef(member(index)?),
                ConstantEntry::InterfaceMethod(_) => Constant::InterfaceMethodRef(member(index)?),
                ConstantEntry::NameAndType(_) => {
                    let (name, descriptor) = pool.name_and_type(index)?;
                    Constant::NameAndType {
                        name: name.to_string(),
                        descriptor: descriptor.to_string(),
                    }
                }
                ConstantEntry::Utf8(data) => Constant::Utf8(data.value.clone()),
                ConstantEntry::Reserved => Constant::Reserved,
                other => Constant::Opaque(
                    other
                        .tag()
                        .ok_or_else(|| anyhow!("untagged constant at {}", index))?,
                ),
            });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&Constant, Throwable> {
        if index == 0 {
            return Err(internal!("constant pool index 0 is never valid"));
        }

        self.entries
            .get(index as usize - 1)
            .ok_or_else(|| internal!("constant pool index {} out of range", index))
    }

    /// The member reference at `index`, be it a field, method or interface method.
    pub fn member(&self, index: u16) -> Result<&MemberRef, Throwable> {
        match self.get(index)? {
            Constant::FieldRef(member)
            | Constant::MethodRef(member)
            | Constant::InterfaceMethodRef(member) => Ok(member),
            other => Err(internal!("expected a member reference at {}, got {:?}", index, other)),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<&str, Throwable> {
        match self.get(index)? {
            Constant::Class(name) => Ok(name),
            other => Err(internal!("expected a class at {}, got {:?}", index, other)),
        }
    }
}
