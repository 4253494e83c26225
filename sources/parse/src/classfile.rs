use crate::{
    attributes::{Attributes, ConstantValueAttribute},
    flags::{ClassFileAccessFlags, FieldAccessFlags, MethodAccessFlags},
    pool::ConstantPool,
};
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub constant_pool: ConstantPool,
    pub meta_data: MetaData,

    pub access_flags: ClassFileAccessFlags,
    pub this_class: u16,
    pub super_class: Option<u16>,

    pub interfaces: Vec<u16>,
    pub fields: Vec<Field>,
    pub methods: Methods,
    pub attributes: Attributes,
}

impl ClassFile {
    pub fn name(&self) -> Result<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> Result<Option<&str>> {
        self.super_class
            .map(|index| self.constant_pool.class_name(index))
            .transpose()
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|index| self.constant_pool.class_name(*index))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub flags: FieldAccessFlags,
    pub name: u16,
    pub descriptor: u16,
    pub attributes: Attributes,
}

impl Field {
    /// Index of the ConstantValue attribute's entry, 0 when there is none.
    pub fn constant_value_index(&self, pool: &ConstantPool) -> Result<u16> {
        Ok(self
            .attributes
            .maybe_known_attribute::<ConstantValueAttribute>(pool)?
            .map(|attr| attr.value)
            .unwrap_or(0))
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    pub flags: MethodAccessFlags,
    pub name: u16,
    pub descriptor: u16,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default)]
pub struct Methods {
    pub values: Vec<Method>,
}

impl Methods {
    pub fn locate(&self, pool: &ConstantPool, name: &str, descriptor: &str) -> Option<&Method> {
        self.values.iter().find(|v| {
            let (Ok(mname), Ok(mdescriptor)) = (pool.utf8(v.name), pool.utf8(v.descriptor)) else {
                return false;
            };

            name == mname && descriptor == mdescriptor
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaData {
    pub minor_version: u16,
    pub major_version: u16,
}
