//! Flags (bitmask) classes and values.
//!
//! A [`FlagsValue`] is a bitmask tagged with its [`FlagsClass`]. Decoding a
//! flags integer never fails in lenient mode, even for bits no declared
//! constant names, so every native value survives a round trip.
//!
//! Flags compare by bit containment: `a >= b` holds when every bit of `b` is
//! also set in `a`. Two values neither of which contains the other are
//! unordered.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::enums::{DecodeMode, find_declared};
use crate::{CodecError, GType};

/// Delimiter between constant nicks in a rendered flags value.
pub const FLAGS_DELIMITER: &str = "|";

/// Rendering of a flags value that matches no declared constant.
pub const EMPTY_FLAGS: &str = "{}";

/// A declared flags constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagsValueInfo {
    pub value: u32,
    pub name: String,
    pub nick: String,
}

/// Registry entry for a native flags type.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagsClass {
    gtype: GType,
    name: String,
    values: Vec<FlagsValueInfo>,
}

impl FlagsClass {
    /// Create a flags class; its identifier is derived from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            gtype: GType::from_name(&name),
            name,
            values: Vec::new(),
        }
    }

    /// Add a declared constant.
    pub fn with_value(
        mut self,
        value: u32,
        name: impl Into<String>,
        nick: impl Into<String>,
    ) -> Self {
        self.values.push(FlagsValueInfo {
            value,
            name: name.into(),
            nick: nick.into(),
        });
        self
    }

    pub fn gtype(&self) -> GType {
        self.gtype
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[FlagsValueInfo] {
        &self.values
    }

    /// Union of every declared constant.
    pub fn mask(&self) -> u32 {
        self.values.iter().fold(0, |acc, v| acc | v.value)
    }

    /// Declared constant whose value equals `bits` exactly.
    pub fn find_exact(&self, bits: u32) -> Option<&FlagsValueInfo> {
        self.values.iter().find(|v| v.value == bits)
    }

    /// Look up a constant by nick, full name, or underscored nick.
    pub fn find_by_name(&self, name: &str) -> Option<&FlagsValueInfo> {
        find_declared(&self.values, name, |v| (&v.name, &v.nick))
    }

    /// The most specific declared constants covered by `bits`.
    ///
    /// Every returned constant has all of its bits set in `bits`, and no
    /// returned constant is a strict bit-subset of another covered constant.
    /// Constants with more bits come first; ties keep declaration order.
    /// Zero-valued constants carry no bits and are never part of the result.
    pub fn covering(&self, bits: u32) -> Vec<&FlagsValueInfo> {
        let covered: Vec<&FlagsValueInfo> = self
            .values
            .iter()
            .filter(|v| v.value != 0 && bits & v.value == v.value)
            .collect();

        let mut minimal: Vec<&FlagsValueInfo> = covered
            .iter()
            .copied()
            .filter(|x| {
                !covered
                    .iter()
                    .any(|y| y.value != x.value && y.value & x.value == x.value)
            })
            .collect();

        minimal.sort_by_key(|v| std::cmp::Reverse(v.value.count_ones()));
        minimal
    }
}

/// A value of a native flags type.
#[derive(Clone)]
pub struct FlagsValue {
    class: Arc<FlagsClass>,
    bits: u32,
}

impl FlagsValue {
    /// Decode a bitmask.
    ///
    /// `Lenient` never fails. `Exact` requires a declared constant equal to
    /// `bits`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidValue` in `Exact` mode when no declared
    /// constant equals `bits`.
    pub fn from_raw(
        class: &Arc<FlagsClass>,
        bits: u32,
        mode: DecodeMode,
    ) -> Result<Self, CodecError> {
        if mode == DecodeMode::Exact && class.find_exact(bits).is_none() {
            return Err(CodecError::InvalidValue {
                type_name: class.name.clone(),
                value: i64::from(bits),
            });
        }
        Ok(Self::wrap(class, bits))
    }

    /// Wrap a bitmask without any validation.
    pub fn wrap(class: &Arc<FlagsClass>, bits: u32) -> Self {
        Self {
            class: Arc::clone(class),
            bits,
        }
    }

    /// The empty bitmask of `class`.
    pub fn empty(class: &Arc<FlagsClass>) -> Self {
        Self::wrap(class, 0)
    }

    /// Look up a declared constant by name.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownName` when nothing matches.
    pub fn from_name(class: &Arc<FlagsClass>, name: &str) -> Result<Self, CodecError> {
        Self::from_names(class, [name])
    }

    /// Combine several declared constants, looked up by name.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownName` for the first name that matches
    /// nothing.
    pub fn from_names<'n>(
        class: &Arc<FlagsClass>,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self, CodecError> {
        let mut bits = 0;
        for name in names {
            let info = class
                .find_by_name(name)
                .ok_or_else(|| CodecError::UnknownName {
                    type_name: class.name.clone(),
                    name: name.to_string(),
                })?;
            bits |= info.value;
        }
        Ok(Self::wrap(class, bits))
    }

    /// The backing bitmask.
    pub fn to_raw(&self) -> u32 {
        self.bits
    }

    pub fn gtype(&self) -> GType {
        self.class.gtype
    }

    pub fn class(&self) -> &Arc<FlagsClass> {
        &self.class
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Check that every bit of `other` is set in `self`.
    pub fn contains(&self, other: &FlagsValue) -> bool {
        self.bits & other.bits == other.bits
    }

    /// Nick of the declared constant equal to this value, if any.
    pub fn nick(&self) -> Option<&str> {
        self.class.find_exact(self.bits).map(|v| v.nick.as_str())
    }

    /// Bits set in either value.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::TypeMismatch` when the values belong to
    /// different flags types.
    pub fn union(&self, other: &FlagsValue) -> Result<Self, CodecError> {
        self.combine(other, |a, b| a | b)
    }

    /// Bits set in both values.
    pub fn intersection(&self, other: &FlagsValue) -> Result<Self, CodecError> {
        self.combine(other, |a, b| a & b)
    }

    /// Bits set in `self` but not in `other`.
    pub fn difference(&self, other: &FlagsValue) -> Result<Self, CodecError> {
        self.combine(other, |a, b| a & !b)
    }

    /// Bits set in exactly one of the values.
    pub fn symmetric_difference(&self, other: &FlagsValue) -> Result<Self, CodecError> {
        self.combine(other, |a, b| a ^ b)
    }

    fn combine(
        &self,
        other: &FlagsValue,
        op: impl Fn(u32, u32) -> u32,
    ) -> Result<Self, CodecError> {
        if self.class.gtype != other.class.gtype {
            return Err(CodecError::TypeMismatch {
                expected: self.class.name.clone(),
                actual: other.class.name.clone(),
            });
        }
        Ok(Self::wrap(&self.class, op(self.bits, other.bits)))
    }

    /// Render as `#<TypeName body>`.
    pub fn inspect(&self) -> String {
        format!("#<{} {}>", self.class.name, self)
    }
}

impl fmt::Display for FlagsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(nick) = self.nick() {
            return f.write_str(nick);
        }
        let covering = self.class.covering(self.bits);
        if covering.is_empty() {
            return f.write_str(EMPTY_FLAGS);
        }
        for (i, info) in covering.iter().enumerate() {
            if i > 0 {
                f.write_str(FLAGS_DELIMITER)?;
            }
            f.write_str(&info.nick)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FlagsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagsValue")
            .field("type", &self.class.name)
            .field("bits", &format_args!("{:#x}", self.bits))
            .finish()
    }
}

impl PartialEq for FlagsValue {
    fn eq(&self, other: &Self) -> bool {
        self.class.gtype == other.class.gtype && self.bits == other.bits
    }
}

impl Eq for FlagsValue {}

impl Hash for FlagsValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.gtype.hash(state);
        self.bits.hash(state);
    }
}

impl PartialOrd for FlagsValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.class.gtype != other.class.gtype {
            return None;
        }
        match (self.contains(other), other.contains(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (false, false) => None,
        }
    }
}
