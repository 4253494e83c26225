use enum_as_inner::EnumAsInner;

use super::{value::Value, Reference};
use crate::{error::Throwable, internal};

/// One 32 bit lane of storage. Longs and doubles take two consecutive
/// numeric lanes, low half first.
#[derive(Debug, Clone, EnumAsInner)]
pub enum Slot {
    Num(i32),
    Ref(Reference),
}

impl Default for Slot {
    fn default() -> Self {
        Slot::Num(0)
    }
}

/// Fixed size slot storage, used for static fields, instance fields and frame locals.
#[derive(Debug, Clone, Default)]
pub struct Slots {
    slots: Vec<Slot>,
}

impl Slots {
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![Slot::default(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Slot, Throwable> {
        self.slots
            .get(index)
            .ok_or_else(|| internal!("slot {} out of range (size {})", index, self.slots.len()))
    }

    pub fn set(&mut self, index: usize, slot: Slot) -> Result<(), Throwable> {
        let size = self.slots.len();
        let target = self
            .slots
            .get_mut(index)
            .ok_or_else(|| internal!("slot {} out of range (size {})", index, size))?;

        *target = slot;
        Ok(())
    }

    pub fn get_int(&self, index: usize) -> Result<i32, Throwable> {
        match self.get(index)? {
            Slot::Num(value) => Ok(*value),
            Slot::Ref(_) => Err(internal!("slot {} holds a reference, not a number", index)),
        }
    }

    pub fn set_int(&mut self, index: usize, value: i32) -> Result<(), Throwable> {
        self.set(index, Slot::Num(value))
    }

    pub fn get_long(&self, index: usize) -> Result<i64, Throwable> {
        let low = self.get_int(index)? as u32 as i64;
        let high = self.get_int(index + 1)? as i64;

        Ok(high << 32 | low)
    }

    pub fn set_long(&mut self, index: usize, value: i64) -> Result<(), Throwable> {
        // Check the upper lane first so a failed write leaves nothing half done
        self.get(index + 1)?;
        self.set_int(index, value as i32)?;
        self.set_int(index + 1, (value >> 32) as i32)
    }

    pub fn get_float(&self, index: usize) -> Result<f32, Throwable> {
        Ok(f32::from_bits(self.get_int(index)? as u32))
    }

    pub fn set_float(&mut self, index: usize, value: f32) -> Result<(), Throwable> {
        self.set_int(index, value.to_bits() as i32)
    }

    pub fn get_double(&self, index: usize) -> Result<f64, Throwable> {
        Ok(f64::from_bits(self.get_long(index)? as u64))
    }

    pub fn set_double(&mut self, index: usize, value: f64) -> Result<(), Throwable> {
        self.set_long(index, value.to_bits() as i64)
    }

    /// A zeroed slot reads as `null`.
    pub fn get_ref(&self, index: usize) -> Result<Reference, Throwable> {
        match self.get(index)? {
            Slot::Ref(reference) => Ok(reference.clone()),
            Slot::Num(0) => Ok(None),
            Slot::Num(_) => Err(internal!("slot {} holds a number, not a reference", index)),
        }
    }

    pub fn set_ref(&mut self, index: usize, value: Reference) -> Result<(), Throwable> {
        self.set(index, Slot::Ref(value))
    }

    pub fn set_value(&mut self, index: usize, value: Value) -> Result<(), Throwable> {
        match value {
            Value::Int(v) => self.set_int(index, v),
            Value::Long(v) => self.set_long(index, v),
            Value::Float(v) => self.set_float(index, v),
            Value::Double(v) => self.set_double(index, v),
            Value::Ref(v) => self.set_ref(index, v),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }
}

impl From<Vec<Slot>> for Slots {
    fn from(slots: Vec<Slot>) -> Self {
        Self { slots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longs_are_stored_low_half_first() {
        let mut slots = Slots::new(2);
        slots.set_long(0, 0x1234_5678_9abc_def0).unwrap();

        assert_eq!(slots.get_int(0).unwrap(), 0x9abc_def0_u32 as i32);
        assert_eq!(slots.get_int(1).unwrap(), 0x1234_5678);
        assert_eq!(slots.get_long(0).unwrap(), 0x1234_5678_9abc_def0);
    }

    #[test]
    fn it_keeps_negative_longs() {
        let mut slots = Slots::new(3);
        slots.set_long(1, -2).unwrap();

        assert_eq!(slots.get_long(1).unwrap(), -2);
        assert_eq!(slots.get_int(0).unwrap(), 0);
    }

    #[test]
    fn it_stores_floating_point_bits() {
        let mut slots = Slots::new(3);
        slots.set_float(0, 1.5).unwrap();
        slots.set_double(1, -0.25).unwrap();

        assert_eq!(slots.get_float(0).unwrap(), 1.5);
        assert_eq!(slots.get_double(1).unwrap(), -0.25);
    }

    #[test]
    fn zeroed_slots_read_as_null() {
        let slots = Slots::new(1);

        assert!(slots.get_ref(0).unwrap().is_none());
    }

    #[test]
    fn it_never_resizes() {
        let mut slots = Slots::new(1);

        assert!(slots.set_int(1, 3).is_err());
        assert!(slots.set_long(0, 3).is_err());
        assert_eq!(slots.get_int(0).unwrap(), 0);
        assert_eq!(slots.len(), 1);
    }
}
