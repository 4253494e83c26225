pub mod bytes_ext;
pub mod descriptor;

#[cfg(test)]
mod tests {
    use crate::descriptor::{BaseType, FieldType, MethodType, ObjectType};
    use anyhow::Result;

    #[test]
    fn it_parses_simple_descriptors() -> Result<()> {
        let descriptor = FieldType::parse("Z")?;
        let descriptor = descriptor.into_base().unwrap();

        assert!(descriptor.is_boolean());

        Ok(())
    }

    #[test]
    fn it_parses_array_descriptors() -> Result<()> {
        let descriptor = FieldType::parse("[D")?;
        let descriptor = descriptor.into_array().unwrap();

        let field = descriptor.field_type;
        let field = field.into_base().unwrap();

        assert!(field.is_double());

        Ok(())
    }

    #[test]
    fn it_parses_class_descriptors() -> Result<()> {
        let descriptor = FieldType::parse("Ljava/lang/Object;")?;
        let descriptor = descriptor.into_object().unwrap();

        let class_name = descriptor.class_name;
        assert_eq!(class_name, "java/lang/Object");

        Ok(())
    }

    #[test]
    fn it_parses_method_descriptors() -> Result<()> {
        let descriptor = MethodType::parse("(IDLjava/lang/Thread;)Ljava/lang/Object;")?;
        assert_eq!(
            descriptor.parameters,
            vec![
                FieldType::Base(BaseType::Int),
                FieldType::Base(BaseType::Double),
                FieldType::Object(ObjectType {
                    class_name: "java/lang/Thread".to_string()
                })
            ]
        );

        assert_eq!(
            descriptor.return_type,
            FieldType::Object(ObjectType {
                class_name: "java/lang/Object".to_string()
            })
        );

        Ok(())
    }

    #[test]
    fn it_rejects_malformed_descriptors() {
        assert!(FieldType::parse("Ljava/lang/Object").is_err());
        assert!(FieldType::parse("Q").is_err());
        assert!(FieldType::parse("II").is_err());
        assert!(MethodType::parse("(I").is_err());
        assert!(MethodType::parse("I)V").is_err());
    }

    #[test]
    fn it_counts_argument_slots() -> Result<()> {
        let descriptor = MethodType::parse("(JIDLjava/lang/String;[J)V")?;
        assert_eq!(descriptor.argument_slots(), 2 + 1 + 2 + 1 + 1);

        Ok(())
    }

    #[test]
    fn it_names_classes_for_types() -> Result<()> {
        assert_eq!(FieldType::parse("I")?.class_name(), "int");
        assert_eq!(FieldType::parse("[I")?.class_name(), "[I");
        assert_eq!(
            FieldType::parse("Ljava/lang/String;")?.class_name(),
            "java/lang/String"
        );
        assert_eq!(BaseType::from_class_name("double"), Some(BaseType::Double));

        Ok(())
    }

    #[test]
    fn it_unparses_method_descriptors() -> Result<()> {
        let descriptor = MethodType::parse("(IDLjava/lang/Thread;)Ljava/lang/Object;")?;
        let unparsed = descriptor.to_string();

        assert_eq!(unparsed, "(IDLjava/lang/Thread;)Ljava/lang/Object;");

        Ok(())
    }

    #[test]
    fn it_unparses_array_descriptors() -> Result<()> {
        let descriptor = FieldType::parse("[[Ljava/lang/String;")?;
        assert_eq!(descriptor.to_string(), "[[Ljava/lang/String;");

        Ok(())
    }
}
