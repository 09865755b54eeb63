//! Enumeration classes and values.
//!
//! An [`EnumClass`] describes one native enumeration: its identifier, its name
//! and its declared constants. An [`EnumValue`] is an integer tagged with the
//! class it belongs to.
//!
//! Native enumerations are plain integers, so nothing stops the native side
//! from handing out a value with no declared constant. Decoding such a value
//! is governed by [`DecodeMode`]: `Exact` rejects it, `Lenient` wraps the raw
//! integer so that it survives a round trip.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{CodecError, GType};

/// How to treat integers that match no declared constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Fail with `CodecError::InvalidValue`.
    #[default]
    Exact,
    /// Wrap the raw integer.
    Lenient,
}

/// A declared enumeration constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueInfo {
    /// Backing integer.
    pub value: i32,
    /// Full constant name (e.g. `GTK_PACK_START`).
    pub name: String,
    /// Short symbolic name (e.g. `start`).
    pub nick: String,
}

/// Registry entry for a native enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumClass {
    gtype: GType,
    name: String,
    values: Vec<EnumValueInfo>,
}

impl EnumClass {
    /// Create an enum class; its identifier is derived from `name`.
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
        value: i32,
        name: impl Into<String>,
        nick: impl Into<String>,
    ) -> Self {
        self.values.push(EnumValueInfo {
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

    pub fn values(&self) -> &[EnumValueInfo] {
        &self.values
    }

    /// First declared constant with the given backing integer.
    pub fn find(&self, value: i32) -> Option<&EnumValueInfo> {
        self.values.iter().find(|v| v.value == value)
    }

    /// Look up a constant by nick, by full name, or by a nick spelled with
    /// underscores instead of dashes (`"left_to_right"` for `"left-to-right"`).
    pub fn find_by_name(&self, name: &str) -> Option<&EnumValueInfo> {
        find_declared(&self.values, name, |v| (&v.name, &v.nick))
    }
}

/// Shared name lookup for enum and flags constants.
pub(crate) fn find_declared<'a, T>(
    values: &'a [T],
    name: &str,
    names: impl Fn(&'a T) -> (&'a String, &'a String),
) -> Option<&'a T> {
    let dashed = name.replace('_', "-");
    values
        .iter()
        .find(|v| names(v).1 == name)
        .or_else(|| values.iter().find(|v| names(v).0 == name))
        .or_else(|| values.iter().find(|v| *names(v).1 == dashed))
}

/// A value of a native enumeration.
///
/// Equality and hashing consider only the type identifier and the backing
/// integer.
#[derive(Clone)]
pub struct EnumValue {
    class: Arc<EnumClass>,
    value: i32,
}

impl EnumValue {
    /// Decode a backing integer.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidValue` in `Exact` mode when no declared
    /// constant carries `value`.
    pub fn from_raw(
        class: &Arc<EnumClass>,
        value: i32,
        mode: DecodeMode,
    ) -> Result<Self, CodecError> {
        if mode == DecodeMode::Exact && class.find(value).is_none() {
            return Err(CodecError::InvalidValue {
                type_name: class.name.clone(),
                value: i64::from(value),
            });
        }
        Ok(Self {
            class: Arc::clone(class),
            value,
        })
    }

    /// Look up a declared constant by name.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownName` when nothing matches.
    pub fn from_name(class: &Arc<EnumClass>, name: &str) -> Result<Self, CodecError> {
        let info = class
            .find_by_name(name)
            .ok_or_else(|| CodecError::UnknownName {
                type_name: class.name.clone(),
                name: name.to_string(),
            })?;
        Ok(Self {
            class: Arc::clone(class),
            value: info.value,
        })
    }

    /// The backing integer.
    pub fn to_raw(&self) -> i32 {
        self.value
    }

    pub fn gtype(&self) -> GType {
        self.class.gtype
    }

    pub fn class(&self) -> &Arc<EnumClass> {
        &self.class
    }

    /// Nick of the declared constant, if the value is declared.
    pub fn nick(&self) -> Option<&str> {
        self.class.find(self.value).map(|v| v.nick.as_str())
    }

    /// Full name of the declared constant, if the value is declared.
    pub fn name(&self) -> Option<&str> {
        self.class.find(self.value).map(|v| v.name.as_str())
    }

    /// Render as `#<TypeName nick>`.
    pub fn inspect(&self) -> String {
        format!("#<{} {}>", self.class.name, self)
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nick() {
            Some(nick) => f.write_str(nick),
            None => write!(f, "{}", self.value),
        }
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumValue")
            .field("type", &self.class.name)
            .field("value", &self.value)
            .finish()
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.class.gtype == other.class.gtype && self.value == other.value
    }
}

impl Eq for EnumValue {}

impl Hash for EnumValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.gtype.hash(state);
        self.value.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_type() -> Arc<EnumClass> {
        Arc::new(
            EnumClass::new("GtkPackType")
                .with_value(0, "GTK_PACK_START", "start")
                .with_value(1, "GTK_PACK_END", "end"),
        )
    }

    fn text_direction() -> Arc<EnumClass> {
        Arc::new(
            EnumClass::new("GtkTextDirection")
                .with_value(0, "GTK_TEXT_DIR_NONE", "none")
                .with_value(1, "GTK_TEXT_DIR_LTR", "left-to-right"),
        )
    }

    #[test]
    fn exact_decode_of_declared_value() {
        let class = pack_type();
        let value = EnumValue::from_raw(&class, 1, DecodeMode::Exact).unwrap();
        assert_eq!(value.nick(), Some("end"));
        assert_eq!(value.name(), Some("GTK_PACK_END"));
    }

    #[test]
    fn exact_decode_rejects_undeclared_value() {
        let class = pack_type();
        let err = EnumValue::from_raw(&class, 9, DecodeMode::Exact).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidValue {
                type_name: "GtkPackType".into(),
                value: 9
            }
        );
    }

    #[test]
    fn lenient_decode_wraps_undeclared_value() {
        let class = pack_type();
        let value = EnumValue::from_raw(&class, 9, DecodeMode::Lenient).unwrap();
        assert_eq!(value.to_raw(), 9);
        assert_eq!(value.nick(), None);
        assert_eq!(value.to_string(), "9");
    }

    #[test]
    fn lookup_by_nick_name_and_underscored_nick() {
        let class = text_direction();
        let by_nick = EnumValue::from_name(&class, "left-to-right").unwrap();
        let by_name = EnumValue::from_name(&class, "GTK_TEXT_DIR_LTR").unwrap();
        let by_symbol = EnumValue::from_name(&class, "left_to_right").unwrap();
        assert_eq!(by_nick, by_name);
        assert_eq!(by_nick, by_symbol);
    }

    #[test]
    fn lookup_of_unknown_name_fails() {
        let class = pack_type();
        let err = EnumValue::from_name(&class, "middle").unwrap_err();
        assert!(err.is_invalid_value());
    }

    #[test]
    fn inspect_format() {
        let class = pack_type();
        let value = EnumValue::from_raw(&class, 0, DecodeMode::Exact).unwrap();
        assert_eq!(value.inspect(), "#<GtkPackType start>");
    }

    #[test]
    fn values_of_different_types_are_not_equal() {
        let a = EnumValue::from_raw(&pack_type(), 0, DecodeMode::Exact).unwrap();
        let b = EnumValue::from_raw(&text_direction(), 0, DecodeMode::Exact).unwrap();
        assert_ne!(a, b);
    }
}
