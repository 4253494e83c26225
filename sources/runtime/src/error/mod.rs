use thiserror::Error;

/// Conditions the JVM specification defines as linkage or runtime errors.
/// None of them are catchable here; any that escapes terminates the program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VMError {
    #[error("{name}")]
    ClassNotFound { name: String },

    #[error("{name} ({reason})")]
    ClassFormat { name: String, reason: String },

    #[error("{name}")]
    ClassCircularity { name: String },

    #[error("{context}")]
    IncompatibleClassChange { context: String },

    #[error("{name}")]
    Instantiation { name: String },

    #[error("{class}.{name}{descriptor}")]
    NoSuchMethod {
        class: String,
        name: String,
        descriptor: String,
    },

    #[error("{class}.{name}:{descriptor}")]
    NoSuchField {
        class: String,
        name: String,
        descriptor: String,
    },

    #[error("{class}.{name}{descriptor}")]
    UnsatisfiedLink {
        class: String,
        name: String,
        descriptor: String,
    },

    #[error("thread main has overflowed its stack ({depth} frames)")]
    StackOverflow { depth: usize },

    #[error("{context}")]
    NullPointer { context: String },
}

impl VMError {
    pub fn class_name(&self) -> &'static str {
        match self {
            VMError::ClassNotFound { .. } => "java/lang/ClassNotFoundException",
            VMError::ClassFormat { .. } => "java/lang/ClassFormatError",
            VMError::ClassCircularity { .. } => "java/lang/ClassCircularityError",
            VMError::IncompatibleClassChange { .. } => "java/lang/IncompatibleClassChangeError",
            VMError::Instantiation { .. } => "java/lang/InstantiationError",
            VMError::NoSuchMethod { .. } => "java/lang/NoSuchMethodError",
            VMError::NoSuchField { .. } => "java/lang/NoSuchFieldError",
            VMError::UnsatisfiedLink { .. } => "java/lang/UnsatisfiedLinkError",
            VMError::StackOverflow { .. } => "java/lang/StackOverflowError",
            VMError::NullPointer { .. } => "java/lang/NullPointerException",
        }
    }

    /// `java.lang.ClassNotFoundException: Foo`, the way the JVM reports it.
    pub fn message(&self) -> String {
        format!("{}: {}", self.class_name().replace('/', "."), self)
    }
}

#[derive(Error, Debug)]
pub enum Throwable {
    #[error("{}", .0.message())]
    Vm(#[from] VMError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Throwable {
    pub fn vm_error(&self) -> Option<&VMError> {
        match self {
            Throwable::Vm(err) => Some(err),
            Throwable::Internal(_) => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Throwable::Internal(_))
    }
}

#[macro_export]
macro_rules! internal {
    ($msg:literal $(,)?) => {
        $crate::error::Throwable::Internal(anyhow::anyhow!($msg))
    };
    ($err:expr $(,)?) => {
        $crate::error::Throwable::Internal(anyhow::anyhow!($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Throwable::Internal(anyhow::anyhow!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internalise {
    () => {
        |f| $crate::internal!(f)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_formats_like_the_jvm() {
        let err = VMError::ClassNotFound {
            name: "pkg/Missing".to_string(),
        };

        assert_eq!(err.message(), "java.lang.ClassNotFoundException: pkg/Missing");
        assert_eq!(
            Throwable::from(err).to_string(),
            "java.lang.ClassNotFoundException: pkg/Missing"
        );
    }

    #[test]
    fn internal_errors_are_not_vm_errors() {
        let err = internal!("unsupported opcode {}", 0xba);

        assert!(err.is_internal());
        assert!(err.vm_error().is_none());
        assert_eq!(err.to_string(), "unsupported opcode 186");
    }
}
