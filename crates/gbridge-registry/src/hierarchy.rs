//! Type Hierarchy - arena of native type descriptors.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: one slot per known [`GType`], filled with a [`TypeDescriptor`]
//!   once the type is registered
//! - Edges: `Inherits` (child -> parent) and `Implements` (type -> interface)
//!
//! Node indices are the arena handles. Native types are not guaranteed to be
//! loaded parent-first, so registering a descriptor reserves a slot for every
//! type it references. A reserved slot that never gets filled counts as an
//! unregistered type: queries on it fail with `RegistryError::UnknownType` and
//! ancestor walks stop before it.
//!
//! # Thread Safety
//!
//! Population takes `&mut self` and must finish before queries start. After
//! that the hierarchy is read-only and can be shared freely.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};

use gbridge_core::{GType, RegistryError};

/// Category of a native type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Root of a type family (`GObject`, `GEnum`, ...).
    Fundamental,
    /// Instantiatable object class.
    Object,
    /// Interface implemented by object classes.
    Interface,
    Enum,
    Flags,
    /// Reference-counted or copied plain structure.
    Boxed,
}

/// Description of one native type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub gtype: GType,
    pub name: String,
    pub kind: TypeKind,
    pub parent: Option<GType>,
    pub interfaces: Vec<GType>,
}

impl TypeDescriptor {
    /// Create a descriptor; its identifier is derived from `name`.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        let name = name.into();
        Self {
            gtype: GType::from_name(&name),
            name,
            kind,
            parent: None,
            interfaces: Vec::new(),
        }
    }

    /// Create an object class descriptor deriving from `parent`.
    pub fn object(name: impl Into<String>, parent: GType) -> Self {
        Self::new(name, TypeKind::Object).with_parent(parent)
    }

    pub fn with_parent(mut self, parent: GType) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_interface(mut self, interface: GType) -> Self {
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
        self
    }
}

/// Edge types in the hierarchy graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyEdge {
    /// Child -> parent.
    Inherits,
    /// Type -> implemented interface.
    Implements,
}

#[derive(Debug)]
struct TypeSlot {
    gtype: GType,
    descriptor: Option<TypeDescriptor>,
}

/// Registry of native type descriptors forming a single-parent tree.
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    graph: DiGraph<TypeSlot, HierarchyEdge>,
    slots: FxHashMap<GType, NodeIndex>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Population
    // ==========================================================================

    /// Reserve a slot for `gtype` without describing it yet.
    ///
    /// Returns the existing slot if the type is already known.
    pub fn reserve(&mut self, gtype: GType) -> NodeIndex {
        if let Some(&index) = self.slots.get(&gtype) {
            return index;
        }
        let index = self.graph.add_node(TypeSlot {
            gtype,
            descriptor: None,
        });
        self.slots.insert(gtype, index);
        index
    }

    /// Fill the slot of `descriptor.gtype`.
    ///
    /// The parent and interfaces may be registered later.
    ///
    /// # Errors
    ///
    /// - `DuplicateType` if the type was already registered
    /// - `InheritanceCycle` if the type would become its own ancestor
    /// - `NotAnInterface` if a listed interface is registered with another kind
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<NodeIndex, RegistryError> {
        let existing = self.slots.get(&descriptor.gtype).copied();
        if existing.is_some_and(|index| self.graph[index].descriptor.is_some()) {
            return Err(RegistryError::DuplicateType {
                name: descriptor.name,
            });
        }

        if let Some(other) = descriptor
            .interfaces
            .iter()
            .filter_map(|&interface| self.get(interface).ok())
            .find(|d| d.kind != TypeKind::Interface)
        {
            return Err(RegistryError::NotAnInterface {
                name: other.name.clone(),
            });
        }

        if let Some(parent) = descriptor.parent {
            let cycle = parent == descriptor.gtype
                || existing
                    .zip(self.slots.get(&parent).copied())
                    .is_some_and(|(index, parent_index)| {
                        self.reaches_through_parents(parent_index, index)
                    });
            if cycle {
                return Err(RegistryError::InheritanceCycle {
                    name: descriptor.name,
                });
            }
        }

        let index = self.reserve(descriptor.gtype);
        if let Some(parent) = descriptor.parent {
            let parent_index = self.reserve(parent);
            self.graph
                .add_edge(index, parent_index, HierarchyEdge::Inherits);
        }

        for &interface in &descriptor.interfaces {
            let interface_index = self.reserve(interface);
            self.graph
                .add_edge(index, interface_index, HierarchyEdge::Implements);
        }

        tracing::trace!(name = %descriptor.name, gtype = ?descriptor.gtype, "registered type");
        self.graph[index].descriptor = Some(descriptor);
        Ok(index)
    }

    /// Check whether walking parents from `from` reaches `target`.
    fn reaches_through_parents(&self, from: NodeIndex, target: NodeIndex) -> bool {
        let mut visited = FxHashSet::default();
        let mut current = Some(from);
        while let Some(index) = current {
            if index == target {
                return true;
            }
            if !visited.insert(index) {
                return false;
            }
            current = self.parent_index(index);
        }
        false
    }

    fn parent_index(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .find(|e| *e.weight() == HierarchyEdge::Inherits)
            .map(|e| e.target())
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    /// Slot of a registered (filled) type.
    fn filled(&self, gtype: GType) -> Result<NodeIndex, RegistryError> {
        self.slots
            .get(&gtype)
            .copied()
            .filter(|&index| self.graph[index].descriptor.is_some())
            .ok_or(RegistryError::UnknownType(gtype))
    }

    fn descriptor_at(&self, index: NodeIndex) -> Option<&TypeDescriptor> {
        self.graph[index].descriptor.as_ref()
    }

    /// Check if the type has been registered.
    pub fn contains(&self, gtype: GType) -> bool {
        self.filled(gtype).is_ok()
    }

    /// Get the descriptor of a registered type.
    pub fn get(&self, gtype: GType) -> Result<&TypeDescriptor, RegistryError> {
        self.slots
            .get(&gtype)
            .and_then(|&index| self.descriptor_at(index))
            .ok_or(RegistryError::UnknownType(gtype))
    }

    /// Find a registered type by its native name.
    pub fn get_by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.get(GType::from_name(name)).ok()
    }

    /// The registered parent of a type.
    ///
    /// Returns `Ok(None)` for root types and for types whose parent has only
    /// been reserved so far.
    pub fn parent(&self, gtype: GType) -> Result<Option<&TypeDescriptor>, RegistryError> {
        let index = self.filled(gtype)?;
        Ok(self
            .parent_index(index)
            .and_then(|parent| self.descriptor_at(parent)))
    }

    /// The type followed by its ancestors, root last.
    pub fn ancestors(&self, gtype: GType) -> Result<Vec<&TypeDescriptor>, RegistryError> {
        let start = self.filled(gtype)?;
        let mut chain = Vec::new();
        let mut visited = FxHashSet::default();
        let mut current = Some(start);

        while let Some(index) = current {
            if !visited.insert(index) {
                break;
            }
            let Some(descriptor) = self.descriptor_at(index) else {
                break;
            };
            chain.push(descriptor);
            current = self.parent_index(index);
        }
        Ok(chain)
    }

    /// Registered direct children of a type, in registration order.
    pub fn children(&self, gtype: GType) -> Result<Vec<&TypeDescriptor>, RegistryError> {
        let index = self.filled(gtype)?;
        let mut children: Vec<NodeIndex> = self.child_indices(index).collect();
        children.sort();
        Ok(children
            .into_iter()
            .filter_map(|child| self.descriptor_at(child))
            .collect())
    }

    fn child_indices(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .edges_directed(index, Direction::Incoming)
            .filter(|e| *e.weight() == HierarchyEdge::Inherits)
            .map(|e| e.source())
    }

    /// The type together with every type deriving from it.
    ///
    /// Each type is visited once even if the graph contains shared
    /// references through interfaces.
    pub fn descendants(&self, gtype: GType) -> Result<FxHashSet<GType>, RegistryError> {
        let start = self.filled(gtype)?;
        let mut visited = FxHashSet::default();
        let mut result = FxHashSet::default();
        let mut stack = vec![start];

        while let Some(index) = stack.pop() {
            if !visited.insert(index) {
                continue;
            }
            if self.descriptor_at(index).is_some() {
                result.insert(self.graph[index].gtype);
            }
            stack.extend(self.child_indices(index));
        }
        Ok(result)
    }

    /// Interfaces the type declares directly.
    pub fn interfaces(&self, gtype: GType) -> Result<&[GType], RegistryError> {
        Ok(&self.get(gtype)?.interfaces)
    }

    /// Check whether `gtype` is `ancestor`, derives from it, or implements it
    /// (directly or through one of its ancestors).
    pub fn is_a(&self, gtype: GType, ancestor: GType) -> Result<bool, RegistryError> {
        Ok(self
            .ancestors(gtype)?
            .iter()
            .any(|d| d.gtype == ancestor || d.interfaces.contains(&ancestor)))
    }

    /// Registered types without a parent.
    pub fn roots(&self) -> Vec<&TypeDescriptor> {
        self.graph
            .node_indices()
            .filter(|&index| self.parent_index(index).is_none())
            .filter_map(|index| self.descriptor_at(index))
            .collect()
    }

    /// Types that are referenced but have not been registered.
    pub fn unresolved(&self) -> Vec<GType> {
        self.graph
            .node_weights()
            .filter(|slot| slot.descriptor.is_none())
            .map(|slot| slot.gtype)
            .collect()
    }

    /// Iterate over registered descriptors in registration-slot order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.graph.node_weights().filter_map(|slot| slot.descriptor.as_ref())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
