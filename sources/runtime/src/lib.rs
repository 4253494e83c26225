#![allow(clippy::new_without_default)]

pub mod classpath;
pub mod error;
pub mod native;
pub mod object;
pub mod vm;

#[cfg(test)]
pub(crate) mod testing;
