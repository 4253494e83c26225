use std::{fmt, iter::Peekable, str::Chars};

use anyhow::{anyhow, Result};
use enum_as_inner::EnumAsInner;

/// <BaseType> ::= 'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z'
#[derive(EnumAsInner, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BaseType {
    Boolean, // Z
    Char,    // C
    Float,   // F
    Double,  // D
    Byte,    // B
    Short,   // S
    Int,     // I
    Long,    // J
    Void,    // V
}

impl BaseType {
    pub const ALL: [BaseType; 9] = [
        BaseType::Void,
        BaseType::Boolean,
        BaseType::Byte,
        BaseType::Char,
        BaseType::Short,
        BaseType::Int,
        BaseType::Long,
        BaseType::Float,
        BaseType::Double,
    ];

    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'Z' => BaseType::Boolean,
            'C' => BaseType::Char,
            'F' => BaseType::Float,
            'D' => BaseType::Double,
            'B' => BaseType::Byte,
            'S' => BaseType::Short,
            'I' => BaseType::Int,
            'J' => BaseType::Long,
            'V' => BaseType::Void,
            _ => return None,
        })
    }

    pub fn code(&self) -> char {
        match self {
            BaseType::Boolean => 'Z',
            BaseType::Char => 'C',
            BaseType::Float => 'F',
            BaseType::Double => 'D',
            BaseType::Byte => 'B',
            BaseType::Short => 'S',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Void => 'V',
        }
    }

    /// The name the type goes by as a class, `int` for `I` and so on.
    pub fn class_name(&self) -> &'static str {
        match self {
            BaseType::Boolean => "boolean",
            BaseType::Char => "char",
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::Byte => "byte",
            BaseType::Short => "short",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Void => "void",
        }
    }

    pub fn from_class_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.class_name() == name)
    }

    /// Long and double take two slots in locals, operands and field storage.
    pub fn is_wide(&self) -> bool {
        matches!(self, BaseType::Long | BaseType::Double)
    }

    /// Types the JVM computes with as an `int`.
    pub fn is_int_like(&self) -> bool {
        matches!(
            self,
            BaseType::Boolean | BaseType::Byte | BaseType::Char | BaseType::Short | BaseType::Int
        )
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// <ObjectType> ::= 'L' <ClassName> ';'
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ObjectType {
    pub class_name: String,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{};", self.class_name)
    }
}

/// <ArrayType> ::= '[' <FieldType>
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ArrayType {
    pub field_type: Box<FieldType>,
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.field_type)
    }
}

#[derive(EnumAsInner, Debug, PartialEq, Eq, Clone, Hash)]
pub enum FieldType {
    Base(BaseType),
    Object(ObjectType),
    Array(ArrayType),
}

impl FieldType {
    fn parse_from_iterator(chars: &mut Peekable<Chars>) -> Result<Self> {
        let first = chars.next().ok_or(anyhow!("unexpected end of descriptor"))?;

        if let Some(base) = BaseType::from_code(first) {
            return Ok(FieldType::Base(base));
        }

        Ok(match first {
            '[' => FieldType::Array(ArrayType {
                field_type: Box::new(FieldType::parse_from_iterator(chars)?),
            }),
            'L' => {
                let mut class_name = String::new();
                loop {
                    match chars.next() {
                        Some(';') => break,
                        Some(c) => class_name.push(c),
                        None => return Err(anyhow!("unterminated class name {class_name}")),
                    }
                }

                if class_name.is_empty() {
                    return Err(anyhow!("empty class name in descriptor"));
                }

                FieldType::Object(ObjectType { class_name })
            }
            _ => return Err(anyhow!("unknown type {first}")),
        })
    }

    pub fn parse(str: &str) -> Result<Self> {
        let mut chars = str.chars().peekable();
        let ty = FieldType::parse_from_iterator(&mut chars)?;

        if chars.next().is_some() {
            return Err(anyhow!("trailing characters in field descriptor {str}"));
        }

        Ok(ty)
    }

    /// Number of slots a value of this type takes up.
    pub fn slot_size(&self) -> usize {
        match self {
            FieldType::Base(BaseType::Void) => 0,
            FieldType::Base(base) if base.is_wide() => 2,
            _ => 1,
        }
    }

    pub fn is_wide(&self) -> bool {
        self.slot_size() == 2
    }

    pub fn is_reference(&self) -> bool {
        !matches!(self, FieldType::Base(_))
    }

    /// The name of the class representing values of this type:
    /// `int`, `java/lang/String` or `[I`.
    pub fn class_name(&self) -> String {
        match self {
            FieldType::Base(base) => base.class_name().to_string(),
            FieldType::Object(object) => object.class_name.clone(),
            FieldType::Array(array) => array.to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Base(base) => base.fmt(f),
            FieldType::Object(object) => object.fmt(f),
            FieldType::Array(array) => array.fmt(f),
        }
    }
}

/// <MethodType> ::= '(' { <FieldType> } ')' <FieldType>
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct MethodType {
    pub parameters: Vec<FieldType>,
    pub return_type: FieldType,
}

impl MethodType {
    pub fn parse(str: &str) -> Result<Self> {
        let mut chars = str.chars().peekable();
        if chars.next() != Some('(') {
            return Err(anyhow!("descriptor did not start with ("));
        }

        let mut parameters = Vec::new();

        loop {
            match chars.peek() {
                Some(')') => break,
                Some(_) => parameters.push(FieldType::parse_from_iterator(&mut chars)?),
                None => return Err(anyhow!("descriptor {str} did not close its parameters")),
            }
        }

        // Skip )
        chars.next();

        let return_type = FieldType::parse_from_iterator(&mut chars)?;

        if chars.next().is_some() {
            return Err(anyhow!("trailing characters in method descriptor {str}"));
        }

        Ok(MethodType {
            parameters,
            return_type,
        })
    }

    /// Slots taken by the parameters, not counting `this`.
    pub fn argument_slots(&self) -> usize {
        self.parameters.iter().map(FieldType::slot_size).sum()
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for parameter in &self.parameters {
            write!(f, "{parameter}")?;
        }
        write!(f, "){}", self.return_type)
    }
}
