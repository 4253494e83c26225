pub const MAGIC: u32 = 0xCAFE_BABE;

/// Oldest and newest major versions we accept (Java 1.1 through Java 21).
pub const MIN_MAJOR_VERSION: u16 = 45;
pub const MAX_MAJOR_VERSION: u16 = 65;

pub const CLASS_INITIALISER: &str = "<clinit>";
pub const INSTANCE_INITIALISER: &str = "<init>";
