use std::collections::HashMap;

use super::{loader::ClassLoader, ClassRef, Object, ObjectExtra, ObjectRef};
use crate::{error::Throwable, internal};

pub const JAVA_LANG_STRING: &str = "java/lang/String";

/// One `java/lang/String` object per distinct text.
#[derive(Debug, Default)]
pub struct StringInterner {
    strings: HashMap<String, ObjectRef>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, text: &str) -> Option<ObjectRef> {
        self.strings.get(text).cloned()
    }

    pub fn insert(&mut self, text: &str, object: ObjectRef) {
        self.strings.insert(text.to_string(), object);
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

fn value_slot(class: &ClassRef) -> Result<usize, Throwable> {
    class
        .read()
        .field("value", "[C")
        .filter(|field| !field.is_static())
        .map(|field| field.slot())
        .ok_or_else(|| internal!("java/lang/String has no value field"))
}

/// Create a fresh, uninterned string object holding `text` as UTF-16.
pub fn new_string(loader: &mut ClassLoader, text: &str) -> Result<ObjectRef, Throwable> {
    let string_class = loader.load_class(JAVA_LANG_STRING)?;
    let char_array = loader.load_class("[C")?;

    let chars = Object::with_extra(char_array, ObjectExtra::Chars(text.encode_utf16().collect()));
    let slot = value_slot(&string_class)?;

    let mut string = Object::new(string_class);
    string.fields.set_ref(slot, Some(chars.into_ref()))?;

    Ok(string.into_ref())
}

/// Read a string object's characters back out.
pub fn rust_string(string: &ObjectRef) -> Result<String, Throwable> {
    let string = string.read();
    let slot = value_slot(&string.class())?;

    let chars = string
        .fields
        .get_ref(slot)?
        .ok_or_else(|| internal!("string has a null value"))?;

    let chars = chars.read();
    match &chars.extra {
        ObjectExtra::Chars(chars) => Ok(String::from_utf16_lossy(chars)),
        _ => Err(internal!("string value was not a char array")),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::testing::{bootstrap_class_path, loader_with};

    #[test]
    fn equal_texts_share_one_object() {
        let mut loader = loader_with(bootstrap_class_path());

        let first = loader.intern_string("loader").unwrap();
        let second = loader.intern_string("loader").unwrap();
        let other = loader.intern_string("other").unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert!(!Rc::ptr_eq(&first, &other));
    }

    #[test]
    fn it_reads_strings_back() {
        let mut loader = loader_with(bootstrap_class_path());
        let string = loader.intern_string("héllo ☃").unwrap();

        assert_eq!(rust_string(&string).unwrap(), "héllo ☃");
        assert_eq!(string.read().class_name(), JAVA_LANG_STRING);
    }

    #[test]
    fn fresh_strings_are_not_interned() {
        let mut loader = loader_with(bootstrap_class_path());

        let interned = loader.intern_string("a").unwrap();
        let fresh = new_string(&mut loader, "a").unwrap();

        assert!(!Rc::ptr_eq(&interned, &fresh));
    }
}
