//! Type registry crate for gbridge.
//!
//! - [`TypeHierarchy`]: arena of native type descriptors with ancestry queries
//! - [`CodecRegistry`]: enum/flags classes and their integer encoding
//! - [`TypeRegistry`]: both of the above, populated by native modules

pub mod codec;
pub mod hierarchy;
mod registry;

pub use codec::{CodecRegistry, ENCODED_LEN, EncodedValue};
pub use hierarchy::{HierarchyEdge, TypeDescriptor, TypeHierarchy, TypeKind};
pub use registry::TypeRegistry;
