//! Enum/flags codec registry.
//!
//! Keeps the loaded [`EnumClass`] and [`FlagsClass`] descriptors keyed by
//! [`GType`] and translates between host values and their integer encoding.
//!
//! An encoded value travels as [`EncodedValue`]: the type tag followed by the
//! backing integer, both little-endian, 16 bytes total. Decoding a tag that was
//! never registered fails with `RegistryError::UnknownType`.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use gbridge_core::{
    BridgeError, CodecError, DecodeMode, Dynamic, EnumClass, EnumValue, FlagsClass, FlagsValue,
    GType, RegistryError,
};

/// Size of [`EncodedValue::to_bytes`].
pub const ENCODED_LEN: usize = 16;

/// A marshaled enum or flags value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedValue {
    pub gtype: GType,
    pub raw: i64,
}

impl EncodedValue {
    pub fn new(gtype: GType, raw: i64) -> Self {
        Self { gtype, raw }
    }

    /// Serialize to the wire form.
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        out[..8].copy_from_slice(&self.gtype.as_u64().to_le_bytes());
        out[8..].copy_from_slice(&self.raw.to_le_bytes());
        out
    }

    /// Parse the wire form. Trailing bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let (Some(tag), Some(raw)) = (bytes.get(..8), bytes.get(8..ENCODED_LEN)) else {
            return Err(CodecError::Truncated {
                expected: ENCODED_LEN,
                actual: bytes.len(),
            });
        };
        let mut tag_buf = [0u8; 8];
        let mut raw_buf = [0u8; 8];
        tag_buf.copy_from_slice(tag);
        raw_buf.copy_from_slice(raw);
        Ok(Self {
            gtype: GType(u64::from_le_bytes(tag_buf)),
            raw: i64::from_le_bytes(raw_buf),
        })
    }
}

impl From<&EnumValue> for EncodedValue {
    fn from(value: &EnumValue) -> Self {
        Self::new(value.gtype(), i64::from(value.to_raw()))
    }
}

impl From<&FlagsValue> for EncodedValue {
    fn from(value: &FlagsValue) -> Self {
        Self::new(value.gtype(), i64::from(value.to_raw()))
    }
}

/// Registry of enum and flags classes.
#[derive(Debug, Default)]
pub struct CodecRegistry {
    enums: FxHashMap<GType, Arc<EnumClass>>,
    flags: FxHashMap<GType, Arc<FlagsClass>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register an enum class.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateType` if an enum or flags class with the same
    /// identifier is already known.
    pub fn register_enum(&mut self, class: EnumClass) -> Result<Arc<EnumClass>, RegistryError> {
        self.check_vacant(class.gtype(), class.name())?;
        let class = Arc::new(class);
        self.enums.insert(class.gtype(), Arc::clone(&class));
        Ok(class)
    }

    /// Register a flags class.
    pub fn register_flags(
        &mut self,
        class: FlagsClass,
    ) -> Result<Arc<FlagsClass>, RegistryError> {
        self.check_vacant(class.gtype(), class.name())?;
        let class = Arc::new(class);
        self.flags.insert(class.gtype(), Arc::clone(&class));
        Ok(class)
    }

    fn check_vacant(&self, gtype: GType, name: &str) -> Result<(), RegistryError> {
        if self.enums.contains_key(&gtype) || self.flags.contains_key(&gtype) {
            return Err(RegistryError::DuplicateType {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn enum_class(&self, gtype: GType) -> Result<&Arc<EnumClass>, RegistryError> {
        self.enums
            .get(&gtype)
            .ok_or(RegistryError::UnknownType(gtype))
    }

    pub fn flags_class(&self, gtype: GType) -> Result<&Arc<FlagsClass>, RegistryError> {
        self.flags
            .get(&gtype)
            .ok_or(RegistryError::UnknownType(gtype))
    }

    pub fn contains(&self, gtype: GType) -> bool {
        self.enums.contains_key(&gtype) || self.flags.contains_key(&gtype)
    }

    pub fn len(&self) -> usize {
        self.enums.len() + self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ==========================================================================
    // Encode / Decode
    // ==========================================================================

    /// Encode an enum or flags host value.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::TypeMismatch` for any other kind of value.
    pub fn encode(&self, value: &Dynamic) -> Result<EncodedValue, CodecError> {
        match value {
            Dynamic::Enum(v) => Ok(EncodedValue::from(v)),
            Dynamic::Flags(v) => Ok(EncodedValue::from(v)),
            other => Err(CodecError::TypeMismatch {
                expected: "enum or flags".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }

    /// Decode an enum value.
    pub fn decode_enum(
        &self,
        gtype: GType,
        raw: i32,
        mode: DecodeMode,
    ) -> Result<EnumValue, BridgeError> {
        let class = self.enum_class(gtype)?;
        Ok(EnumValue::from_raw(class, raw, mode)?)
    }

    /// Decode a flags value.
    pub fn decode_flags(
        &self,
        gtype: GType,
        bits: u32,
        mode: DecodeMode,
    ) -> Result<FlagsValue, BridgeError> {
        let class = self.flags_class(gtype)?;
        Ok(FlagsValue::from_raw(class, bits, mode)?)
    }

    /// Decode a marshaled value back into a host value.
    ///
    /// Enums decode exactly, flags decode leniently.
    ///
    /// # Errors
    ///
    /// - `RegistryError::UnknownType` for an unregistered tag
    /// - `CodecError::InvalidValue` when the integer does not fit the backing
    ///   type or (for enums) names no declared constant
    pub fn decode(&self, encoded: EncodedValue) -> Result<Dynamic, BridgeError> {
        if let Some(class) = self.enums.get(&encoded.gtype) {
            let raw = i32::try_from(encoded.raw).map_err(|_| CodecError::InvalidValue {
                type_name: class.name().to_string(),
                value: encoded.raw,
            })?;
            return Ok(Dynamic::Enum(EnumValue::from_raw(
                class,
                raw,
                DecodeMode::Exact,
            )?));
        }
        if let Some(class) = self.flags.get(&encoded.gtype) {
            let bits = u32::try_from(encoded.raw).map_err(|_| CodecError::InvalidValue {
                type_name: class.name().to_string(),
                value: encoded.raw,
            })?;
            return Ok(Dynamic::Flags(FlagsValue::from_raw(
                class,
                bits,
                DecodeMode::Lenient,
            )?));
        }
        Err(RegistryError::UnknownType(encoded.gtype).into())
    }

    /// Decode the 16-byte wire form.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Dynamic, BridgeError> {
        self.decode(EncodedValue::from_bytes(bytes)?)
    }
}
