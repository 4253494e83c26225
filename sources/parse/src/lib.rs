pub mod attributes;
pub mod builder;
pub mod classfile;
pub mod constants;
pub mod flags;
pub mod parser;
pub mod pool;

extern crate anyhow;
extern crate bytes;
extern crate cesu8;
extern crate enum_as_inner;
extern crate support;

#[cfg(test)]
mod tests {
    use crate::{
        attributes::CodeAttribute,
        builder::{ClassBuilder, Literal},
        flags::{ClassFileAccessFlag, FieldAccessFlag, MethodAccessFlag},
        parser::Parser,
        pool::ConstantEntry,
    };

    fn sample() -> Vec<u8> {
        let mut builder = ClassBuilder::new("pkg/Sample", Some("java/lang/Object"));
        builder
            .implements("java/lang/Runnable")
            .constant_field(
                FieldAccessFlag::STATIC | FieldAccessFlag::FINAL,
                "LIMIT",
                "J",
                Literal::Long(1 << 40),
            )
            .field(FieldAccessFlag::PRIVATE, "count", "I")
            .method(
                MethodAccessFlag::PUBLIC | MethodAccessFlag::STATIC,
                "run",
                "()V",
                0,
                0,
                vec![0xb1],
            );

        builder.build()
    }

    #[test]
    fn it_parses_a_built_class() {
        let class = Parser::new(&sample()).parse().unwrap();

        assert_eq!(class.name().unwrap(), "pkg/Sample");
        assert_eq!(class.super_name().unwrap(), Some("java/lang/Object"));
        assert_eq!(class.interface_names().unwrap(), vec!["java/lang/Runnable"]);
        assert!(class.access_flags.has(ClassFileAccessFlag::SUPER));
        assert_eq!(class.fields.len(), 2);

        let limit = &class.fields[0];
        let index = limit.constant_value_index(&class.constant_pool).unwrap();
        assert_eq!(
            class.constant_pool.get(index),
            Some(&ConstantEntry::Long(1 << 40))
        );
        assert_eq!(
            class.fields[1]
                .constant_value_index(&class.constant_pool)
                .unwrap(),
            0
        );

        let run = class
            .methods
            .locate(&class.constant_pool, "run", "()V")
            .unwrap();
        let code = run
            .attributes
            .known_attribute::<CodeAttribute>(&class.constant_pool)
            .unwrap();
        assert_eq!(code.code, vec![0xb1]);
        assert!(class
            .methods
            .locate(&class.constant_pool, "run", "(I)V")
            .is_none());
    }

    #[test]
    fn it_accepts_a_root_class() {
        let bytes = ClassBuilder::new("java/lang/Object", None).build();
        let class = Parser::new(&bytes).parse().unwrap();

        assert_eq!(class.super_name().unwrap(), None);
    }

    #[test]
    fn it_rejects_bad_magic() {
        let mut bytes = sample();
        bytes[0] = 0xDE;

        assert!(Parser::new(&bytes).parse().is_err());
    }

    #[test]
    fn it_rejects_unsupported_versions() {
        let mut builder = ClassBuilder::new("Old", Some("java/lang/Object"));
        builder.version(44);

        assert!(Parser::new(&builder.build()).parse().is_err());
    }

    #[test]
    fn it_rejects_truncated_input() {
        let bytes = sample();
        let truncated = &bytes[..bytes.len() - 3];

        assert!(Parser::new(truncated).parse().is_err());
    }

    #[test]
    fn it_rejects_trailing_bytes() {
        let mut bytes = sample();
        bytes.push(0);

        assert!(Parser::new(&bytes).parse().is_err());
    }

    #[test]
    fn it_decodes_modified_utf8() {
        let mut builder = ClassBuilder::new("Text", Some("java/lang/Object"));
        let text = builder.utf8("a\0b\u{1F600}");
        let bytes = builder.build();

        // NUL and the two halves of the surrogate pair
        let expected: &[u8] = &[
            b'a', 0xC0, 0x80, b'b', 0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80,
        ];
        assert!(bytes.windows(expected.len()).any(|w| w == expected));
        assert!(!bytes.windows(4).any(|w| w == [0xF0, 0x9F, 0x98, 0x80]));

        let class = Parser::new(&bytes).parse().unwrap();
        assert_eq!(class.constant_pool.utf8(text).unwrap(), "a\0b\u{1F600}");
    }

    #[test]
    fn it_rejects_invalid_utf8() {
        let mut builder = ClassBuilder::new("Text", Some("java/lang/Object"));
        builder.utf8("xyz");
        let mut bytes = builder.build();

        let at = bytes
            .windows(3)
            .position(|w| w == b"xyz")
            .unwrap();
        bytes[at] = 0xFF;

        assert!(Parser::new(&bytes).parse().is_err());
    }

    #[test]
    fn builder_dedups_pool_entries() {
        let mut builder = ClassBuilder::new("A", Some("java/lang/Object"));
        let first = builder.class("B");
        let second = builder.class("B");
        let long = builder.literal(Literal::Long(5));
        let after = builder.literal(Literal::Int(5));

        assert_eq!(first, second);
        assert_eq!(after, long + 2);
    }
}
