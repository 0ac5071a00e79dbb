use std::fmt::{self, Display, Formatter};

/// The version of the class file format a class is written in.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ClassFileVersion(u16, u16);

impl ClassFileVersion {
    pub const JAVA_8: ClassFileVersion = ClassFileVersion::new(52, 0);
    pub const JAVA_11: ClassFileVersion = ClassFileVersion::new(55, 0);
    pub const JAVA_17: ClassFileVersion = ClassFileVersion::new(61, 0);

    pub const fn new(major_version: u16, minor_version: u16) -> ClassFileVersion {
        ClassFileVersion(major_version, minor_version)
    }

    pub fn major_version(&self) -> u16 {
        self.0
    }

    pub fn minor_version(&self) -> u16 {
        self.1
    }
}

impl Default for ClassFileVersion {
    fn default() -> Self {
        Self::JAVA_8
    }
}

impl Display for ClassFileVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0, self.1)
    }
}

/// Settings for assembling a single class.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuilderConfig {
    /// The version written into the class header.
    pub version: ClassFileVersion,
    /// The number of distinct constants to make room for before the interning table grows.
    pub initial_pool_capacity: usize,
    /// The number of distinct bootstrap methods to make room for before their table grows.
    pub initial_bootstrap_capacity: usize,
}

impl BuilderConfig {
    pub fn with_version(version: ClassFileVersion) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            version: ClassFileVersion::default(),
            initial_pool_capacity: 64,
            initial_bootstrap_capacity: 0,
        }
    }
}
