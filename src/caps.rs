//! Pipeline capabilities.
//!
//! A [`Caps`] set is either `ANY` (accepts every format) or an ordered list
//! of [`Structure`]s, each a media type name plus typed fields.

use std::collections::BTreeMap;
use std::fmt;

use gbridge_core::{Dynamic, IntoDynamic};

/// A media type with named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    name: String,
    fields: BTreeMap<String, Dynamic>,
}

impl Structure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl IntoDynamic) -> Self {
        self.fields.insert(key.into(), value.into_dynamic());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Dynamic> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Dynamic)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn write_field(f: &mut fmt::Formatter<'_>, value: &Dynamic) -> fmt::Result {
    match value {
        Dynamic::Bool(b) => write!(f, "(boolean){b}"),
        Dynamic::Int(i) => write!(f, "(int){i}"),
        Dynamic::Float(x) => write!(f, "(double){x}"),
        Dynamic::String(s) => write!(f, "(string){s}"),
        Dynamic::Enum(e) => write!(f, "({}){e}", e.class().name()),
        Dynamic::Flags(v) => write!(f, "({}){v}", v.class().name()),
        other => write!(f, "{other:?}"),
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, value) in &self.fields {
            write!(f, ", {key}=")?;
            write_field(f, value)?;
        }
        Ok(())
    }
}

/// A set of accepted media formats.
#[derive(Debug, Clone, PartialEq)]
pub struct Caps {
    any: bool,
    structures: Vec<Structure>,
}

impl Caps {
    /// Caps accepting every format.
    pub fn any() -> Self {
        Self {
            any: true,
            structures: Vec::new(),
        }
    }

    /// Caps accepting nothing.
    pub fn empty() -> Self {
        Self {
            any: false,
            structures: Vec::new(),
        }
    }

    pub fn new(structures: impl IntoIterator<Item = Structure>) -> Self {
        Self {
            any: false,
            structures: structures.into_iter().collect(),
        }
    }

    /// Append a structure. Has no effect on `ANY` caps.
    pub fn append(&mut self, structure: Structure) {
        if !self.any {
            self.structures.push(structure);
        }
    }

    pub fn is_any(&self) -> bool {
        self.any
    }

    pub fn is_empty(&self) -> bool {
        !self.any && self.structures.is_empty()
    }

    /// Number of structures.
    pub fn size(&self) -> usize {
        self.structures.len()
    }

    pub fn structure(&self, index: usize) -> Option<&Structure> {
        self.structures.get(index)
    }

    /// Every structure, in order.
    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.any {
            return f.write_str("ANY");
        }
        if self.structures.is_empty() {
            return f.write_str("EMPTY");
        }
        for (i, structure) in self.structures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{structure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> Structure {
        Structure::new("video/x-raw")
            .with_field("width", 320i32)
            .with_field("height", 240i32)
            .with_field("format", "I420")
    }

    #[test]
    fn any_and_empty() {
        let any = Caps::any();
        assert!(any.is_any());
        assert!(!any.is_empty());
        assert_eq!(any.size(), 0);
        assert_eq!(any.to_string(), "ANY");

        let empty = Caps::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(), "EMPTY");
    }

    #[test]
    fn structures_in_order() {
        let mut caps = Caps::new([video()]);
        caps.append(Structure::new("audio/x-raw").with_field("channels", 2i32));

        assert_eq!(caps.size(), 2);
        assert_eq!(caps.structure(1).unwrap().name(), "audio/x-raw");
        assert!(caps.structure(2).is_none());
        let names: Vec<&str> = caps.structures().iter().map(Structure::name).collect();
        assert_eq!(names, ["video/x-raw", "audio/x-raw"]);
        assert_eq!(caps.structure(0).unwrap().get("width"), Some(&Dynamic::Int(320)));
    }

    #[test]
    fn display() {
        let caps = Caps::new([video()]);
        assert_eq!(
            caps.to_string(),
            "video/x-raw, format=(string)I420, height=(int)240, width=(int)320"
        );
    }

    #[test]
    fn any_ignores_append() {
        let mut caps = Caps::any();
        caps.append(video());
        assert_eq!(caps.size(), 0);
    }
}
