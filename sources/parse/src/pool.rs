use anyhow::{anyhow, Result};
use enum_as_inner::EnumAsInner;

/// The constant pool as read from the class file. Indices are 1-based, the way
/// every other structure in the class file refers to them. Wide constants (long
/// and double) are followed by a `Reserved` entry, so indices line up.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<ConstantEntry>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self { entries: vec![] }
    }

    /// Push an entry, returning the index it can be referred to by.
    pub fn insert(&mut self, entry: ConstantEntry) -> u16 {
        let wide = entry.is_wide();
        self.entries.push(entry);
        let index = self.entries.len() as u16;

        // Special case: 64 Bit types are supposed to take up 2 slots
        if wide {
            self.entries.push(ConstantEntry::Reserved);
        }

        index
    }

    /// Size of the pool as written in the class file (entry count + 1).
    pub fn count(&self) -> u16 {
        self.entries.len() as u16 + 1
    }

    pub fn entries(&self) -> &[ConstantEntry] {
        &self.entries
    }

    pub fn get(&self, index: u16) -> Option<&ConstantEntry> {
        if index == 0 {
            return None;
        }

        self.entries.get((index - 1) as usize)
    }

    pub fn try_get(&self, index: u16) -> Result<&ConstantEntry> {
        self.get(index)
            .ok_or(anyhow!("constant pool index {} out of range", index))
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.try_get(index)? {
            ConstantEntry::Utf8(data) => Ok(&data.value),
            e => Err(anyhow!("expected Utf8 at {}, got {:?}", index, e)),
        }
    }

    /// Resolve a `Class` entry to the name it refers to.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.try_get(index)? {
            ConstantEntry::Class(data) => self.utf8(data.name),
            e => Err(anyhow!("expected Class at {}, got {:?}", index, e)),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.try_get(index)? {
            ConstantEntry::NameAndType(data) => {
                Ok((self.utf8(data.name)?, self.utf8(data.descriptor)?))
            }
            e => Err(anyhow!("expected NameAndType at {}, got {:?}", index, e)),
        }
    }

    /// Resolve a field, method or interface method reference into
    /// (class name, member name, member descriptor).
    pub fn member_ref(&self, index: u16) -> Result<(&str, &str, &str)> {
        let member = match self.try_get(index)? {
            ConstantEntry::Field(data)
            | ConstantEntry::Method(data)
            | ConstantEntry::InterfaceMethod(data) => data,
            e => return Err(anyhow!("expected a member reference at {}, got {:?}", index, e)),
        };

        let class = self.class_name(member.class)?;
        let (name, descriptor) = self.name_and_type(member.name_and_type)?;
        Ok((class, name, descriptor))
    }

    /// Check that every cross reference inside the pool points at an entry of the right kind.
    pub(crate) fn perform_format_checking(&self) -> Result<()> {
        for (position, item) in self.entries.iter().enumerate() {
            let index = position as u16 + 1;
            let checked = match item {
                ConstantEntry::Class(data) => self.utf8(data.name).map(|_| ()),
                ConstantEntry::Field(_)
                | ConstantEntry::Method(_)
                | ConstantEntry::InterfaceMethod(_) => self.member_ref(index).map(|_| ()),
                ConstantEntry::String(data) => self.utf8(data.string).map(|_| ()),
                ConstantEntry::NameAndType(_) => self.name_and_type(index).map(|_| ()),
                ConstantEntry::MethodType(data) => self.utf8(data.descriptor).map(|_| ()),
                ConstantEntry::Dynamic(data) | ConstantEntry::InvokeDynamic(data) => {
                    self.name_and_type(data.name_and_type).map(|_| ())
                }
                ConstantEntry::Module(data) | ConstantEntry::Package(data) => {
                    self.utf8(data.name).map(|_| ())
                }
                ConstantEntry::MethodHandle(data) => {
                    if !(1..=9).contains(&data.kind) {
                        Err(anyhow!("bogus method handle kind {}", data.kind))
                    } else {
                        self.member_ref(data.reference).map(|_| ())
                    }
                }
                ConstantEntry::Integer(_)
                | ConstantEntry::Float(_)
                | ConstantEntry::Long(_)
                | ConstantEntry::Double(_)
                | ConstantEntry::Utf8(_)
                | ConstantEntry::Reserved => Ok(()),
            };

            checked.map_err(|e| e.context(format!("malformed constant pool entry {}", index)))?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    Field = 9,
    Method = 10,
    InterfaceMethod = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

impl ConstantTag {
    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            1 => ConstantTag::Utf8,
            3 => ConstantTag::Integer,
            4 => ConstantTag::Float,
            5 => ConstantTag::Long,
            6 => ConstantTag::Double,
            7 => ConstantTag::Class,
            8 => ConstantTag::String,
            9 => ConstantTag::Field,
            10 => ConstantTag::Method,
            11 => ConstantTag::InterfaceMethod,
            12 => ConstantTag::NameAndType,
            15 => ConstantTag::MethodHandle,
            16 => ConstantTag::MethodType,
            17 => ConstantTag::Dynamic,
            18 => ConstantTag::InvokeDynamic,
            19 => ConstantTag::Module,
            20 => ConstantTag::Package,
            _ => return Err(anyhow!("{} is an unknown tag", tag)),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantClass {
    pub name: u16,
}

/// Shared shape of Fieldref, Methodref and InterfaceMethodref.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantMember {
    pub class: u16,
    pub name_and_type: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantString {
    pub string: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNameAndType {
    pub name: u16,
    pub descriptor: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantUtf8 {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantMethodHandle {
    pub kind: u8,
    pub reference: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantMethodType {
    pub descriptor: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDynamic {
    pub bootstrap_method: u16,
    pub name_and_type: u16,
}

/// Module and Package entries only carry a name.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNamed {
    pub name: u16,
}

#[derive(EnumAsInner, Clone, Debug, PartialEq)]
pub enum ConstantEntry {
    Class(ConstantClass),
    Field(ConstantMember),
    Method(ConstantMember),
    InterfaceMethod(ConstantMember),
    String(ConstantString),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    NameAndType(ConstantNameAndType),
    Utf8(ConstantUtf8),
    MethodHandle(ConstantMethodHandle),
    MethodType(ConstantMethodType),
    Dynamic(ConstantDynamic),
    InvokeDynamic(ConstantDynamic),
    Module(ConstantNamed),
    Package(ConstantNamed),
    Reserved,
}

impl ConstantEntry {
    pub fn is_wide(&self) -> bool {
        matches!(self, ConstantEntry::Long(_) | ConstantEntry::Double(_))
    }

    pub fn tag(&self) -> Option<ConstantTag> {
        Some(match self {
            ConstantEntry::Class(_) => ConstantTag::Class,
            ConstantEntry::Field(_) => ConstantTag::Field,
            ConstantEntry::Method(_) => ConstantTag::Method,
            ConstantEntry::InterfaceMethod(_) => ConstantTag::InterfaceMethod,
            ConstantEntry::String(_) => ConstantTag::String,
            ConstantEntry::Integer(_) => ConstantTag::Integer,
            ConstantEntry::Float(_) => ConstantTag::Float,
            ConstantEntry::Long(_) => ConstantTag::Long,
            ConstantEntry::Double(_) => ConstantTag::Double,
            ConstantEntry::NameAndType(_) => ConstantTag::NameAndType,
            ConstantEntry::Utf8(_) => ConstantTag::Utf8,
            ConstantEntry::MethodHandle(_) => ConstantTag::MethodHandle,
            ConstantEntry::MethodType(_) => ConstantTag::MethodType,
            ConstantEntry::Dynamic(_) => ConstantTag::Dynamic,
            ConstantEntry::InvokeDynamic(_) => ConstantTag::InvokeDynamic,
            ConstantEntry::Module(_) => ConstantTag::Module,
            ConstantEntry::Package(_) => ConstantTag::Package,
            ConstantEntry::Reserved => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_entries_reserve_the_next_index() {
        let mut pool = ConstantPool::new();
        let long = pool.insert(ConstantEntry::Long(7));
        let int = pool.insert(ConstantEntry::Integer(3));

        assert_eq!(long, 1);
        assert_eq!(int, 3);
        assert_eq!(pool.get(2), Some(&ConstantEntry::Reserved));
        assert_eq!(pool.count(), 4);
    }

    #[test]
    fn it_resolves_member_refs() {
        let mut pool = ConstantPool::new();
        let class_name = pool.insert(ConstantEntry::Utf8(ConstantUtf8 {
            value: "Foo".to_string(),
        }));
        let class = pool.insert(ConstantEntry::Class(ConstantClass { name: class_name }));
        let name = pool.insert(ConstantEntry::Utf8(ConstantUtf8 {
            value: "bar".to_string(),
        }));
        let descriptor = pool.insert(ConstantEntry::Utf8(ConstantUtf8 {
            value: "()V".to_string(),
        }));
        let nat = pool.insert(ConstantEntry::NameAndType(ConstantNameAndType {
            name,
            descriptor,
        }));
        let method = pool.insert(ConstantEntry::Method(ConstantMember {
            class,
            name_and_type: nat,
        }));

        assert_eq!(pool.member_ref(method).unwrap(), ("Foo", "bar", "()V"));
        assert!(pool.perform_format_checking().is_ok());
        assert!(pool.member_ref(class).is_err());
        assert!(pool.get(0).is_none());
    }

    #[test]
    fn format_checking_catches_dangling_references() {
        let mut pool = ConstantPool::new();
        pool.insert(ConstantEntry::Class(ConstantClass { name: 9 }));

        assert!(pool.perform_format_checking().is_err());
    }
}
