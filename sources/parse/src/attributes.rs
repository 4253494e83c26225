use crate::pool::ConstantPool;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use support::bytes_ext::SafeBuf;

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Attributes {
    pub values: Vec<Attribute>,
}

impl Attributes {
    fn find<T: KnownAttribute>(&self, constant_pool: &ConstantPool) -> Result<Option<&Attribute>> {
        for attr in self.values.iter() {
            if constant_pool.utf8(attr.name)? == T::id() {
                return Ok(Some(attr));
            }
        }

        Ok(None)
    }

    /// Decode the attribute `T`, if this set carries one.
    pub fn maybe_known_attribute<T>(&self, constant_pool: &ConstantPool) -> Result<Option<T>>
    where
        T: KnownAttribute,
    {
        match self.find::<T>(constant_pool)? {
            Some(attr) => {
                let bytes = Bytes::copy_from_slice(&attr.data);
                T::decode(bytes, constant_pool).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn known_attribute<T>(&self, constant_pool: &ConstantPool) -> Result<T>
    where
        T: KnownAttribute,
    {
        self.maybe_known_attribute(constant_pool)?
            .ok_or(anyhow!("could not locate known attribute {}", T::id()))
    }

    pub fn parse(bytes: &mut Bytes) -> Result<Self> {
        let length = bytes.try_get_u16()?;
        let mut attributes = Attributes {
            values: Vec::with_capacity(length.into()),
        };

        for _ in 0..length {
            let name = bytes.try_get_u16()?;
            let attr_length = bytes.try_get_u32()?;
            let data = bytes.try_get_bytes(attr_length as usize)?;

            attributes.values.push(Attribute { name, data });
        }

        Ok(attributes)
    }
}

pub trait KnownAttribute
where
    Self: Sized,
{
    fn decode(bytes: Bytes, constant_pool: &ConstantPool) -> Result<Self>;
    fn id() -> &'static str;
}

#[derive(Debug, Clone)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionEntry>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone)]
pub struct ExceptionEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

impl KnownAttribute for CodeAttribute {
    fn decode(mut bytes: Bytes, _constant_pool: &ConstantPool) -> Result<Self> {
        let max_stack = bytes.try_get_u16()?;
        let max_locals = bytes.try_get_u16()?;

        let code_length = bytes.try_get_u32()?;
        let code = bytes.try_get_bytes(code_length as usize)?;

        let exception_length = bytes.try_get_u16()?;
        let mut exception_table = Vec::with_capacity(exception_length.into());
        for _ in 0..exception_length {
            exception_table.push(ExceptionEntry {
                start_pc: bytes.try_get_u16()?,
                end_pc: bytes.try_get_u16()?,
                handler_pc: bytes.try_get_u16()?,
                catch_type: bytes.try_get_u16()?,
            })
        }
        let attributes = Attributes::parse(&mut bytes)?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    fn id() -> &'static str {
        "Code"
    }
}

/// Points at the compile-time constant of a `static final` field.
#[derive(Debug, Clone)]
pub struct ConstantValueAttribute {
    pub value: u16,
}

impl KnownAttribute for ConstantValueAttribute {
    fn decode(mut bytes: Bytes, constant_pool: &ConstantPool) -> Result<Self> {
        let value = bytes.try_get_u16()?;
        // Format checking: the index must be a valid entry
        constant_pool.try_get(value)?;

        Ok(ConstantValueAttribute { value })
    }

    fn id() -> &'static str {
        "ConstantValue"
    }
}

#[derive(Debug, Clone)]
pub struct SourceFileAttribute {
    pub file_name: String,
}

impl KnownAttribute for SourceFileAttribute {
    fn decode(mut bytes: Bytes, constant_pool: &ConstantPool) -> Result<Self> {
        let index = bytes.try_get_u16()?;
        Ok(SourceFileAttribute {
            file_name: constant_pool.utf8(index)?.to_string(),
        })
    }

    fn id() -> &'static str {
        "SourceFile"
    }
}
