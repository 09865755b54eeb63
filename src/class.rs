//! Host-side class dispatch tables.
//!
//! Every bound native type gets a [`ClassTable`]: instance members, class
//! members (called on the type itself) and named constants, each keyed by
//! name. Lookups are plain hash lookups into a table built once per type.
//!
//! [`ClassRegistry`] owns the tables. Inherited members are resolved by
//! walking the type's ancestors in the [`TypeHierarchy`].

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;

use gbridge_core::{Arity, DefinitionError, Dynamic, GType, IntoDynamic, NativeFn};
use gbridge_registry::TypeHierarchy;

/// Which table a member lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberScope {
    /// Called on instances.
    Instance,
    /// Called on the type itself.
    Class,
}

impl MemberScope {
    pub const BOTH: [MemberScope; 2] = [MemberScope::Instance, MemberScope::Class];
}

/// How a member came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOrigin {
    Native,
    Synthesized,
}

/// A named callable on a class.
#[derive(Clone)]
pub struct Member {
    pub func: NativeFn,
    pub origin: MemberOrigin,
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("arity", &self.func.arity())
            .field("origin", &self.origin)
            .finish()
    }
}

/// Check a member name against the host naming rule.
///
/// `[A-Za-z_][A-Za-z0-9_]*` optionally followed by one of `?`, `!`, `=`.
pub fn is_valid_member_name(name: &str) -> bool {
    let body = name
        .strip_suffix(['?', '!', '='])
        .unwrap_or(name);
    is_identifier(body)
}

/// Check a constant name: an identifier starting with an uppercase letter.
pub fn is_valid_constant_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase()) && is_identifier(name)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// MemberTable
// ============================================================================

/// Member storage the accessor synthesizer runs against.
pub trait MemberTable {
    /// Name of the owning class, used in errors.
    fn owner_name(&self) -> &str;

    /// Type of the owning class.
    fn owner_type(&self) -> GType;

    /// Operations defined directly on this class, sorted by name.
    fn operations(&self, scope: MemberScope) -> Vec<(String, Arity)>;

    /// An operation defined directly on this class.
    fn operation(&self, scope: MemberScope, name: &str) -> Option<NativeFn>;

    /// Check whether `name` resolves, including inherited members.
    fn has_member(&self, scope: MemberScope, name: &str) -> bool;

    /// Define a synthesized member.
    fn define_member(
        &mut self,
        scope: MemberScope,
        name: &str,
        func: NativeFn,
    ) -> Result<(), DefinitionError>;

    fn is_synthesized(&self) -> bool;

    fn mark_synthesized(&mut self);
}

// ============================================================================
// ClassTable
// ============================================================================

/// Dispatch table of one bound type.
#[derive(Debug)]
pub struct ClassTable {
    gtype: GType,
    name: String,
    instance_members: FxHashMap<String, Member>,
    class_members: FxHashMap<String, Member>,
    constants: BTreeMap<String, Dynamic>,
    synthesized: bool,
    sealed: bool,
}

impl ClassTable {
    /// Create a table for a type; the identifier is derived from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            gtype: GType::from_name(&name),
            name,
            instance_members: FxHashMap::default(),
            class_members: FxHashMap::default(),
            constants: BTreeMap::new(),
            synthesized: false,
            sealed: false,
        }
    }

    pub fn gtype(&self) -> GType {
        self.gtype
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn members(&self, scope: MemberScope) -> &FxHashMap<String, Member> {
        match scope {
            MemberScope::Instance => &self.instance_members,
            MemberScope::Class => &self.class_members,
        }
    }

    fn members_mut(&mut self, scope: MemberScope) -> &mut FxHashMap<String, Member> {
        match scope {
            MemberScope::Instance => &mut self.instance_members,
            MemberScope::Class => &mut self.class_members,
        }
    }

    fn check_open(&self, name: &str) -> Result<(), DefinitionError> {
        if self.sealed {
            return Err(DefinitionError::Sealed {
                owner: self.name.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn check_name(&self, name: &str, valid: bool) -> Result<(), DefinitionError> {
        if !valid {
            return Err(DefinitionError::InvalidName {
                owner: self.name.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn insert(
        &mut self,
        scope: MemberScope,
        name: &str,
        func: NativeFn,
        origin: MemberOrigin,
    ) -> Result<(), DefinitionError> {
        if origin == MemberOrigin::Native {
            self.check_open(name)?;
        }
        self.check_name(name, is_valid_member_name(name))?;
        if self.members(scope).contains_key(name) {
            return Err(DefinitionError::Collision {
                owner: self.name.clone(),
                name: name.to_string(),
            });
        }
        self.members_mut(scope)
            .insert(name.to_string(), Member { func, origin });
        Ok(())
    }

    /// Define a native member.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if the name breaks the host naming rule
    /// - `Collision` if the class already defines the name in that scope
    /// - `Sealed` once the owning bindings are sealed; synthesized
    ///   accessors may still be added afterwards
    pub fn define(
        &mut self,
        scope: MemberScope,
        name: &str,
        func: NativeFn,
    ) -> Result<(), DefinitionError> {
        self.insert(scope, name, func, MemberOrigin::Native)
    }

    /// Define a native instance method.
    pub fn define_method(&mut self, name: &str, func: NativeFn) -> Result<(), DefinitionError> {
        self.define(MemberScope::Instance, name, func)
    }

    /// Define a native class-level method.
    pub fn define_class_method(
        &mut self,
        name: &str,
        func: NativeFn,
    ) -> Result<(), DefinitionError> {
        self.define(MemberScope::Class, name, func)
    }

    /// Builder form of [`define_method`](Self::define_method).
    pub fn with_method(mut self, name: &str, func: NativeFn) -> Result<Self, DefinitionError> {
        self.define_method(name, func)?;
        Ok(self)
    }

    /// Builder form of [`define_class_method`](Self::define_class_method).
    pub fn with_class_method(
        mut self,
        name: &str,
        func: NativeFn,
    ) -> Result<Self, DefinitionError> {
        self.define_class_method(name, func)?;
        Ok(self)
    }

    pub fn get(&self, scope: MemberScope, name: &str) -> Option<&Member> {
        self.members(scope).get(name)
    }

    pub fn contains(&self, scope: MemberScope, name: &str) -> bool {
        self.members(scope).contains_key(name)
    }

    /// Member names of a scope, sorted.
    pub fn member_names(&self, scope: MemberScope) -> Vec<&str> {
        let mut names: Vec<&str> = self.members(scope).keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// Define a named constant.
    pub fn define_constant(
        &mut self,
        name: &str,
        value: impl IntoDynamic,
    ) -> Result<(), DefinitionError> {
        self.check_open(name)?;
        self.check_name(name, is_valid_constant_name(name))?;
        if self.constants.contains_key(name) {
            return Err(DefinitionError::Collision {
                owner: self.name.clone(),
                name: name.to_string(),
            });
        }
        self.constants.insert(name.to_string(), value.into_dynamic());
        Ok(())
    }

    pub fn constant(&self, name: &str) -> Option<&Dynamic> {
        self.constants.get(name)
    }

    /// Constants in name order.
    pub fn constants(&self) -> impl Iterator<Item = (&str, &Dynamic)> {
        self.constants.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Define `X` for every constant named `<prefix>X`.
    ///
    /// Existing names are left alone, as are suffixes that are not valid
    /// constant names. Returns the names that were defined.
    pub fn alias_prefixed_constants(&mut self, prefix: &str) -> Vec<String> {
        let candidates: Vec<(String, Dynamic)> = self
            .constants
            .iter()
            .filter_map(|(name, value)| {
                let alias = name.strip_prefix(prefix)?;
                Some((alias.to_string(), value.clone()))
            })
            .collect();

        let mut defined = Vec::new();
        for (alias, value) in candidates {
            if self.define_constant(&alias, value).is_ok() {
                defined.push(alias);
            }
        }
        defined
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

impl MemberTable for ClassTable {
    fn owner_name(&self) -> &str {
        &self.name
    }

    fn owner_type(&self) -> GType {
        self.gtype
    }

    fn operations(&self, scope: MemberScope) -> Vec<(String, Arity)> {
        let mut ops: Vec<(String, Arity)> = self
            .members(scope)
            .iter()
            .map(|(name, member)| (name.clone(), member.func.arity()))
            .collect();
        ops.sort_by(|a, b| a.0.cmp(&b.0));
        ops
    }

    fn operation(&self, scope: MemberScope, name: &str) -> Option<NativeFn> {
        self.get(scope, name).map(|member| member.func.clone())
    }

    fn has_member(&self, scope: MemberScope, name: &str) -> bool {
        self.contains(scope, name)
    }

    fn define_member(
        &mut self,
        scope: MemberScope,
        name: &str,
        func: NativeFn,
    ) -> Result<(), DefinitionError> {
        self.insert(scope, name, func, MemberOrigin::Synthesized)
    }

    fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    fn mark_synthesized(&mut self) {
        self.synthesized = true;
    }
}

// ============================================================================
// ClassRegistry
// ============================================================================

/// Owner of every class table.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    tables: FxHashMap<GType, ClassTable>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class table.
    ///
    /// # Errors
    ///
    /// Returns `Collision` if a table for the same type already exists.
    pub fn insert(&mut self, table: ClassTable) -> Result<GType, DefinitionError> {
        let gtype = table.gtype();
        if self.tables.contains_key(&gtype) {
            return Err(DefinitionError::Collision {
                owner: table.name.clone(),
                name: table.name,
            });
        }
        self.tables.insert(gtype, table);
        Ok(gtype)
    }

    /// The table of `gtype`, created empty if missing.
    pub fn table_mut(&mut self, gtype: GType, name: &str) -> &mut ClassTable {
        self.tables
            .entry(gtype)
            .or_insert_with(|| ClassTable::new(name))
    }

    pub fn get(&self, gtype: GType) -> Option<&ClassTable> {
        self.tables.get(&gtype)
    }

    pub fn get_mut(&mut self, gtype: GType) -> Option<&mut ClassTable> {
        self.tables.get_mut(&gtype)
    }

    pub fn contains(&self, gtype: GType) -> bool {
        self.tables.contains_key(&gtype)
    }

    /// Types with a table, sorted by identifier.
    pub fn types(&self) -> Vec<GType> {
        let mut types: Vec<GType> = self.tables.keys().copied().collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Resolve a member on `gtype` or its nearest ancestor that defines it.
    ///
    /// Types missing from the hierarchy only see their own table.
    pub fn resolve(
        &self,
        hierarchy: &TypeHierarchy,
        gtype: GType,
        scope: MemberScope,
        name: &str,
    ) -> Option<&Member> {
        self.lineage(hierarchy, gtype)
            .into_iter()
            .filter_map(|ancestor| self.tables.get(&ancestor))
            .find_map(|table| table.get(scope, name))
    }

    fn lineage(&self, hierarchy: &TypeHierarchy, gtype: GType) -> Vec<GType> {
        match hierarchy.ancestors(gtype) {
            Ok(chain) => chain.iter().map(|d| d.gtype).collect(),
            Err(_) => vec![gtype],
        }
    }

    /// Inheritance-aware view of one class, for the accessor synthesizer.
    pub fn view<'a>(
        &'a mut self,
        hierarchy: &'a TypeHierarchy,
        gtype: GType,
    ) -> Option<ClassView<'a>> {
        if !self.tables.contains_key(&gtype) {
            return None;
        }
        Some(ClassView {
            registry: self,
            hierarchy,
            gtype,
        })
    }

    pub fn seal(&mut self) {
        for table in self.tables.values_mut() {
            table.seal();
        }
    }
}

/// A class table whose collision checks see inherited members.
#[derive(Debug)]
pub struct ClassView<'a> {
    registry: &'a mut ClassRegistry,
    hierarchy: &'a TypeHierarchy,
    gtype: GType,
}

impl ClassView<'_> {
    fn table(&self) -> Option<&ClassTable> {
        self.registry.tables.get(&self.gtype)
    }
}

impl MemberTable for ClassView<'_> {
    fn owner_name(&self) -> &str {
        self.table().map_or("", ClassTable::name)
    }

    fn owner_type(&self) -> GType {
        self.gtype
    }

    fn operations(&self, scope: MemberScope) -> Vec<(String, Arity)> {
        self.table()
            .map(|table| table.operations(scope))
            .unwrap_or_default()
    }

    fn operation(&self, scope: MemberScope, name: &str) -> Option<NativeFn> {
        self.table()?.operation(scope, name)
    }

    fn has_member(&self, scope: MemberScope, name: &str) -> bool {
        self.registry
            .resolve(self.hierarchy, self.gtype, scope, name)
            .is_some()
    }

    fn define_member(
        &mut self,
        scope: MemberScope,
        name: &str,
        func: NativeFn,
    ) -> Result<(), DefinitionError> {
        match self.registry.tables.get_mut(&self.gtype) {
            Some(table) => table.define_member(scope, name, func),
            None => Err(DefinitionError::InvalidName {
                owner: String::new(),
                name: name.to_string(),
            }),
        }
    }

    fn is_synthesized(&self) -> bool {
        self.table().is_some_and(ClassTable::is_synthesized)
    }

    fn mark_synthesized(&mut self) {
        if let Some(table) = self.registry.tables.get_mut(&self.gtype) {
            table.mark_synthesized();
        }
    }
}
