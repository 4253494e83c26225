//! Where class file bytes come from.

use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::{Throwable, VMError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassSource {
    File(PathBuf),
    Memory,
    /// Arrays and primitives, which the VM makes up itself.
    Synthetic,
}

impl fmt::Display for ClassSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassSource::File(path) => write!(f, "{}", path.display()),
            ClassSource::Memory => write!(f, "memory"),
            ClassSource::Synthetic => write!(f, "synthetic"),
        }
    }
}

pub trait ClassPath: fmt::Debug {
    /// Find the bytes for a binary class name such as `java/lang/Object`.
    /// Absence is a `ClassNotFound`, anything else that goes wrong is internal.
    fn resolve(&self, name: &str) -> Result<(Vec<u8>, ClassSource), Throwable>;
}

fn not_found(name: &str) -> Throwable {
    VMError::ClassNotFound {
        name: name.to_string(),
    }
    .into()
}

/// A directory tree laid out by package, `java/lang/Object.class` and so on.
#[derive(Debug, Clone)]
pub struct DirectoryClassPath {
    root: PathBuf,
}

impl DirectoryClassPath {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ClassPath for DirectoryClassPath {
    fn resolve(&self, name: &str) -> Result<(Vec<u8>, ClassSource), Throwable> {
        let path = self.root.join(format!("{}.class", name));

        match fs::read(&path) {
            Ok(bytes) => Ok((bytes, ClassSource::File(path))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(name)),
            Err(e) => Err(Throwable::Internal(
                anyhow::Error::new(e).context(format!("could not read {}", path.display())),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryClassPath {
    classes: HashMap<String, Vec<u8>>,
}

impl MemoryClassPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> &mut Self {
        self.classes.insert(name.into(), bytes);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }
}

impl ClassPath for MemoryClassPath {
    fn resolve(&self, name: &str) -> Result<(Vec<u8>, ClassSource), Throwable> {
        self.classes
            .get(name)
            .map(|bytes| (bytes.clone(), ClassSource::Memory))
            .ok_or_else(|| not_found(name))
    }
}

/// Searches its entries in order, the first hit wins.
#[derive(Debug, Default)]
pub struct CompositeClassPath {
    entries: Vec<Box<dyn ClassPath>>,
}

impl CompositeClassPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl ClassPath + 'static) -> &mut Self {
        self.entries.push(Box::new(entry));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ClassPath for CompositeClassPath {
    fn resolve(&self, name: &str) -> Result<(Vec<u8>, ClassSource), Throwable> {
        for entry in &self.entries {
            match entry.resolve(name) {
                Err(Throwable::Vm(VMError::ClassNotFound { .. })) => {
                    debug!("{} not in {:?}", name, entry);
                    continue;
                }
                found => return found,
            }
        }

        Err(not_found(name))
    }
}
