use anyhow::{anyhow, Context, Result};
use bytes::Bytes;

use crate::attributes::Attributes;
use crate::classfile::{ClassFile, Field, MetaData, Method, Methods};
use crate::constants::{MAGIC, MAX_MAJOR_VERSION, MIN_MAJOR_VERSION};
use crate::flags::{ClassFileAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::pool::{
    ConstantClass, ConstantDynamic, ConstantEntry, ConstantMember, ConstantMethodHandle,
    ConstantMethodType, ConstantNameAndType, ConstantNamed, ConstantPool, ConstantString,
    ConstantTag, ConstantUtf8,
};
use support::bytes_ext::SafeBuf;

pub struct Parser {
    bytes: Bytes,
}

impl Parser {
    pub fn new(data: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    fn parse_utf8(&mut self) -> Result<ConstantUtf8> {
        let length = self.bytes.try_get_u16()?;
        let bytes = self.bytes.try_get_bytes(length.into())?;

        // Modified UTF-8: NUL is 0xC0 0x80, supplementary characters are surrogate pairs
        let value = cesu8::from_java_cesu8(&bytes)
            .context("invalid modified utf-8 in constant pool")?
            .into_owned();
        Ok(ConstantUtf8 { value })
    }

    fn parse_member(&mut self) -> Result<ConstantMember> {
        Ok(ConstantMember {
            class: self.bytes.try_get_u16()?,
            name_and_type: self.bytes.try_get_u16()?,
        })
    }

    fn parse_dynamic(&mut self) -> Result<ConstantDynamic> {
        Ok(ConstantDynamic {
            bootstrap_method: self.bytes.try_get_u16()?,
            name_and_type: self.bytes.try_get_u16()?,
        })
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let length = self.bytes.try_get_u16()?;
        if length == 0 {
            return Err(anyhow!("constant pool count must be at least 1"));
        }

        let mut pool = ConstantPool::new();

        // Entries are numbered from 1, `length` is one more than the entry count
        while pool.count() < length {
            let tag = ConstantTag::from_tag(self.bytes.try_get_u8()?)?;
            let entry = match tag {
                ConstantTag::Utf8 => ConstantEntry::Utf8(self.parse_utf8()?),
                ConstantTag::Integer => ConstantEntry::Integer(self.bytes.try_get_i32()?),
                ConstantTag::Float => ConstantEntry::Float(self.bytes.try_get_f32()?),
                ConstantTag::Long => ConstantEntry::Long(self.bytes.try_get_i64()?),
                ConstantTag::Double => ConstantEntry::Double(self.bytes.try_get_f64()?),
                ConstantTag::Class => ConstantEntry::Class(ConstantClass {
                    name: self.bytes.try_get_u16()?,
                }),
                ConstantTag::String => ConstantEntry::String(ConstantString {
                    string: self.bytes.try_get_u16()?,
                }),
                ConstantTag::Field => ConstantEntry::Field(self.parse_member()?),
                ConstantTag::Method => ConstantEntry::Method(self.parse_member()?),
                ConstantTag::InterfaceMethod => {
                    ConstantEntry::InterfaceMethod(self.parse_member()?)
                }
                ConstantTag::NameAndType => ConstantEntry::NameAndType(ConstantNameAndType {
                    name: self.bytes.try_get_u16()?,
                    descriptor: self.bytes.try_get_u16()?,
                }),
                ConstantTag::MethodHandle => ConstantEntry::MethodHandle(ConstantMethodHandle {
                    kind: self.bytes.try_get_u8()?,
                    reference: self.bytes.try_get_u16()?,
                }),
                ConstantTag::MethodType => ConstantEntry::MethodType(ConstantMethodType {
                    descriptor: self.bytes.try_get_u16()?,
                }),
                ConstantTag::Dynamic => ConstantEntry::Dynamic(self.parse_dynamic()?),
                ConstantTag::InvokeDynamic => ConstantEntry::InvokeDynamic(self.parse_dynamic()?),
                ConstantTag::Module => ConstantEntry::Module(ConstantNamed {
                    name: self.bytes.try_get_u16()?,
                }),
                ConstantTag::Package => ConstantEntry::Package(ConstantNamed {
                    name: self.bytes.try_get_u16()?,
                }),
            };

            pool.insert(entry);
        }

        // A wide constant in the last position overshoots the declared count
        if pool.count() != length {
            return Err(anyhow!(
                "constant pool declared {} entries but held {}",
                length,
                pool.count()
            ));
        }

        Ok(pool)
    }

    fn parse_interfaces(&mut self) -> Result<Vec<u16>> {
        let length = self.bytes.try_get_u16()?;
        (0..length).map(|_| self.bytes.try_get_u16()).collect()
    }

    fn parse_fields(&mut self) -> Result<Vec<Field>> {
        let length = self.bytes.try_get_u16()?;
        let mut fields = Vec::with_capacity(length.into());

        for _ in 0..length {
            fields.push(Field {
                flags: FieldAccessFlags::from_bits(self.bytes.try_get_u16()?)?,
                name: self.bytes.try_get_u16()?,
                descriptor: self.bytes.try_get_u16()?,
                attributes: Attributes::parse(&mut self.bytes)?,
            });
        }

        Ok(fields)
    }

    fn parse_methods(&mut self) -> Result<Methods> {
        let length = self.bytes.try_get_u16()?;
        let mut methods = Methods {
            values: Vec::with_capacity(length.into()),
        };

        for _ in 0..length {
            methods.values.push(Method {
                flags: MethodAccessFlags::from_bits(self.bytes.try_get_u16()?)?,
                name: self.bytes.try_get_u16()?,
                descriptor: self.bytes.try_get_u16()?,
                attributes: Attributes::parse(&mut self.bytes)?,
            });
        }

        Ok(methods)
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        let magic = self.bytes.try_get_u32()?;

        // Format checking: The first four bytes must contain the right magic number
        if magic != MAGIC {
            return Err(anyhow!("invalid magic value '{:#x}'", magic));
        }

        let minor = self.bytes.try_get_u16()?;
        let major = self.bytes.try_get_u16()?;

        if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major) {
            return Err(anyhow!("unsupported class file version {}.{}", major, minor));
        }

        let meta_data = MetaData {
            minor_version: minor,
            major_version: major,
        };

        let constant_pool = self.parse_constant_pool()?;
        // Format checking: The constant pool must satisfy the constraints documented throughout §4.4.
        constant_pool.perform_format_checking()?;

        let access_flags = ClassFileAccessFlags::from_bits(self.bytes.try_get_u16()?)?;
        let this_class = self.bytes.try_get_u16()?;
        constant_pool.class_name(this_class)?;

        let super_class = match self.bytes.try_get_u16()? {
            0 => None,
            index => {
                constant_pool.class_name(index)?;
                Some(index)
            }
        };

        let interfaces = self.parse_interfaces()?;
        let fields = self.parse_fields()?;
        let methods = self.parse_methods()?;
        let attributes = Attributes::parse(&mut self.bytes)?;

        // Format checking: The class file must not be truncated or have extra bytes at the end
        if !self.bytes.is_empty() {
            return Err(anyhow!("classfile has extra bytes at the end"));
        }

        Ok(ClassFile {
            constant_pool,
            meta_data,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }
}
