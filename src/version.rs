//! Binding version checks.

use std::fmt;

/// A `major.minor.micro` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

impl BindingVersion {
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }
}

impl fmt::Display for BindingVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

/// Version of these bindings.
pub const BINDING_VERSION: BindingVersion = BindingVersion::new(0, 1, 0);

/// Check that the bindings are at least `major.minor.micro`.
pub fn check_binding_version(major: u32, minor: u32, micro: u32) -> bool {
    BINDING_VERSION >= BindingVersion::new(major, minor, micro)
}
