use anyhow::{anyhow, Result};
use parse::{
    classfile,
    flags::{FieldAccessFlag, FieldAccessFlags},
    pool::ConstantPool,
};
use support::descriptor::{BaseType, FieldType};

#[derive(Debug, Clone)]
pub struct Field {
    class_name: String,
    flags: FieldAccessFlags,
    name: String,
    descriptor: String,
    field_type: FieldType,
    /// Index of the ConstantValue entry, 0 when the field has none.
    constant_value_index: u16,
    /// Static or instance slot id, depending on `is_static`. Assigned during preparation.
    slot: usize,
}

impl Field {
    pub fn from_class_file(
        class_name: &str,
        field: &classfile::Field,
        pool: &ConstantPool,
    ) -> Result<Self> {
        let descriptor = pool.utf8(field.descriptor)?.to_string();
        let field_type = FieldType::parse(&descriptor)?;
        if field_type == FieldType::Base(BaseType::Void) {
            return Err(anyhow!("field {} cannot be void", class_name));
        }

        Ok(Self {
            class_name: class_name.to_string(),
            flags: field.flags,
            name: pool.utf8(field.name)?.to_string(),
            field_type,
            descriptor,
            constant_value_index: field.constant_value_index(pool)?,
            slot: 0,
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

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn flags(&self) -> FieldAccessFlags {
        self.flags
    }

    pub fn is_static(&self) -> bool {
        self.flags.has(FieldAccessFlag::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.flags.has(FieldAccessFlag::FINAL)
    }

    /// Longs and doubles occupy two slots.
    pub fn slot_size(&self) -> usize {
        self.field_type.slot_size()
    }

    pub fn constant_value_index(&self) -> u16 {
        self.constant_value_index
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub(crate) fn set_slot(&mut self, slot: usize) {
        self.slot = slot;
    }
}
