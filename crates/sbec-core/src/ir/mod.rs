//! Schema intermediate representation.
//!
//! The IR is a flat, ordered token stream per type and per message. Structural
//! constructs appear as contiguous `[BEGIN_x, ..members.., END_x]` runs whose
//! outer token carries the run length in `componentTokenCount`.
//!
//! IR documents are exchanged as JSON (camelCase keys, SCREAMING_SNAKE_CASE
//! signals) or built in code with [`builder`].

pub mod builder;

use crate::error::{Error, Result};
use crate::naming::to_snake_case;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

/// Structural role of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    /// Start of a message
    BeginMessage,
    /// End of a message
    EndMessage,
    /// Start of a composite
    BeginComposite,
    /// End of a composite
    EndComposite,
    /// Start of a message field wrapper
    BeginField,
    /// End of a message field wrapper
    EndField,
    /// Start of a repeating group
    BeginGroup,
    /// End of a repeating group
    EndGroup,
    /// Start of an enum
    BeginEnum,
    /// A single enum value
    ValidValue,
    /// End of an enum
    EndEnum,
    /// Start of a bit set
    BeginSet,
    /// A single bit set choice
    Choice,
    /// End of a bit set
    EndSet,
    /// Start of a variable length data member
    BeginVarData,
    /// End of a variable length data member
    EndVarData,
    /// A primitive encoding leaf
    Encoding,
}

impl Signal {
    /// Returns the signal that closes a run opened by this one
    pub fn closing(self) -> Option<Signal> {
        match self {
            Signal::BeginMessage => Some(Signal::EndMessage),
            Signal::BeginComposite => Some(Signal::EndComposite),
            Signal::BeginField => Some(Signal::EndField),
            Signal::BeginGroup => Some(Signal::EndGroup),
            Signal::BeginEnum => Some(Signal::EndEnum),
            Signal::BeginSet => Some(Signal::EndSet),
            Signal::BeginVarData => Some(Signal::EndVarData),
            _ => None,
        }
    }
}

/// Primitive wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// Single byte character
    Char,
    /// Signed 8 bit integer
    Int8,
    /// Signed 16 bit integer
    Int16,
    /// Signed 32 bit integer
    Int32,
    /// Signed 64 bit integer
    Int64,
    /// Unsigned 8 bit integer
    Uint8,
    /// Unsigned 16 bit integer
    Uint16,
    /// Unsigned 32 bit integer
    Uint32,
    /// Unsigned 64 bit integer
    Uint64,
    /// IEEE 754 single precision
    Float,
    /// IEEE 754 double precision
    Double,
}

impl PrimitiveType {
    /// All primitive types in declaration order
    pub const ALL: [PrimitiveType; 11] = [
        PrimitiveType::Char,
        PrimitiveType::Int8,
        PrimitiveType::Int16,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::Uint8,
        PrimitiveType::Uint16,
        PrimitiveType::Uint32,
        PrimitiveType::Uint64,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Schema name of the type
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Char => "char",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Uint8 => "uint8",
            PrimitiveType::Uint16 => "uint16",
            PrimitiveType::Uint32 => "uint32",
            PrimitiveType::Uint64 => "uint64",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Encoded size in bytes
    pub fn size(self) -> usize {
        match self {
            PrimitiveType::Char | PrimitiveType::Int8 | PrimitiveType::Uint8 => 1,
            PrimitiveType::Int16 | PrimitiveType::Uint16 => 2,
            PrimitiveType::Int32 | PrimitiveType::Uint32 | PrimitiveType::Float => 4,
            PrimitiveType::Int64 | PrimitiveType::Uint64 | PrimitiveType::Double => 8,
        }
    }

    /// Returns true for `float` and `double`
    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Returns true for the signed integer types
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::Int8 | PrimitiveType::Int16 | PrimitiveType::Int32 | PrimitiveType::Int64
        )
    }

    /// Default minimum value
    pub fn min_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Int(0x20),
            PrimitiveType::Int8 => PrimitiveValue::Int(i8::MIN as i128 + 1),
            PrimitiveType::Int16 => PrimitiveValue::Int(i16::MIN as i128 + 1),
            PrimitiveType::Int32 => PrimitiveValue::Int(i32::MIN as i128 + 1),
            PrimitiveType::Int64 => PrimitiveValue::Int(i64::MIN as i128 + 1),
            PrimitiveType::Uint8
            | PrimitiveType::Uint16
            | PrimitiveType::Uint32
            | PrimitiveType::Uint64 => PrimitiveValue::Int(0),
            PrimitiveType::Float => PrimitiveValue::Float(-(f32::MAX as f64)),
            PrimitiveType::Double => PrimitiveValue::Float(-f64::MAX),
        }
    }

    /// Default maximum value
    pub fn max_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Int(0x7e),
            PrimitiveType::Int8 => PrimitiveValue::Int(i8::MAX as i128),
            PrimitiveType::Int16 => PrimitiveValue::Int(i16::MAX as i128),
            PrimitiveType::Int32 => PrimitiveValue::Int(i32::MAX as i128),
            PrimitiveType::Int64 => PrimitiveValue::Int(i64::MAX as i128),
            PrimitiveType::Uint8 => PrimitiveValue::Int(u8::MAX as i128 - 1),
            PrimitiveType::Uint16 => PrimitiveValue::Int(u16::MAX as i128 - 1),
            PrimitiveType::Uint32 => PrimitiveValue::Int(u32::MAX as i128 - 1),
            PrimitiveType::Uint64 => PrimitiveValue::Int(u64::MAX as i128 - 1),
            PrimitiveType::Float => PrimitiveValue::Float(f32::MAX as f64),
            PrimitiveType::Double => PrimitiveValue::Float(f64::MAX),
        }
    }

    /// Default null sentinel
    ///
    /// Unsigned types reserve their maximum, signed types their minimum and
    /// floating point types NaN.
    pub fn null_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Int(0),
            PrimitiveType::Int8 => PrimitiveValue::Int(i8::MIN as i128),
            PrimitiveType::Int16 => PrimitiveValue::Int(i16::MIN as i128),
            PrimitiveType::Int32 => PrimitiveValue::Int(i32::MIN as i128),
            PrimitiveType::Int64 => PrimitiveValue::Int(i64::MIN as i128),
            PrimitiveType::Uint8 => PrimitiveValue::Int(u8::MAX as i128),
            PrimitiveType::Uint16 => PrimitiveValue::Int(u16::MAX as i128),
            PrimitiveType::Uint32 => PrimitiveValue::Int(u32::MAX as i128),
            PrimitiveType::Uint64 => PrimitiveValue::Int(u64::MAX as i128),
            PrimitiveType::Float | PrimitiveType::Double => PrimitiveValue::Float(f64::NAN),
        }
    }

    /// Inclusive range of representable integer values
    fn int_range(self) -> Option<(i128, i128)> {
        match self {
            PrimitiveType::Char | PrimitiveType::Uint8 => Some((0, u8::MAX as i128)),
            PrimitiveType::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            PrimitiveType::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            PrimitiveType::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            PrimitiveType::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            PrimitiveType::Uint16 => Some((0, u16::MAX as i128)),
            PrimitiveType::Uint32 => Some((0, u32::MAX as i128)),
            PrimitiveType::Uint64 => Some((0, u64::MAX as i128)),
            PrimitiveType::Float | PrimitiveType::Double => None,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A literal value interpreted against its primitive type
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// Any integer, including the byte value of a `char`
    Int(i128),
    /// Floating point value
    Float(f64),
    /// Multi-character text, only for `char` arrays
    Text(String),
}

impl PrimitiveValue {
    /// Parses a raw IR literal in the context of its primitive type.
    ///
    /// A single character given for a `char` is its byte value.
    pub fn parse(primitive: PrimitiveType, raw: &str) -> Result<Self> {
        let invalid = || Error::invalid_literal(primitive.name(), raw);
        let trimmed = raw.trim();

        if primitive.is_float() {
            let value = match trimmed {
                "NaN" | "nan" => f64::NAN,
                "Infinity" | "inf" => f64::INFINITY,
                "-Infinity" | "-inf" => f64::NEG_INFINITY,
                other => other.parse::<f64>().map_err(|_| invalid())?,
            };
            return Ok(PrimitiveValue::Float(value));
        }

        if primitive == PrimitiveType::Char {
            let mut chars = raw.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return if c.is_ascii() {
                    Ok(PrimitiveValue::Int(c as i128))
                } else {
                    Err(invalid())
                };
            }
        }

        match trimmed.parse::<i128>() {
            Ok(value) => {
                let (min, max) = primitive.int_range().ok_or_else(invalid)?;
                if value < min || value > max {
                    return Err(invalid());
                }
                Ok(PrimitiveValue::Int(value))
            }
            Err(_) if primitive == PrimitiveType::Char => Ok(PrimitiveValue::Text(raw.to_string())),
            Err(_) => Err(invalid()),
        }
    }

    /// Returns true if this is a floating point NaN
    pub fn is_nan(&self) -> bool {
        matches!(self, PrimitiveValue::Float(v) if v.is_nan())
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Int(v) => write!(f, "{v}"),
            PrimitiveValue::Float(v) if v.is_nan() => f.write_str("NaN"),
            PrimitiveValue::Float(v) => write!(f, "{v:?}"),
            PrimitiveValue::Text(s) => f.write_str(s),
        }
    }
}

/// Whether a field occupies wire bytes and how absence is represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Presence {
    /// Always present
    #[default]
    Required,
    /// Absent when equal to the null sentinel
    Optional,
    /// Fixed literal, never on the wire
    Constant,
}

/// Byte order of multi-byte primitives on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ByteOrder {
    /// Least significant byte first
    #[default]
    LittleEndian,
    /// Most significant byte first
    BigEndian,
}

/// Encoding attributes of a token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    /// Presence of the value
    #[serde(default)]
    pub presence: Presence,
    /// Primitive type, absent on purely structural tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_type: Option<PrimitiveType>,
    /// Explicit minimum value
    #[serde(default, deserialize_with = "literal", skip_serializing_if = "Option::is_none")]
    pub min_value: Option<String>,
    /// Explicit maximum value
    #[serde(default, deserialize_with = "literal", skip_serializing_if = "Option::is_none")]
    pub max_value: Option<String>,
    /// Explicit null sentinel
    #[serde(default, deserialize_with = "literal", skip_serializing_if = "Option::is_none")]
    pub null_value: Option<String>,
    /// Constant value, enum value or choice bit index
    #[serde(default, deserialize_with = "literal", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<String>,
    /// Character encoding of textual data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_encoding: Option<String>,
    /// Semantic type annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
}

impl Encoding {
    /// Null sentinel in effect for the given primitive
    pub fn applicable_null_value(&self, primitive: PrimitiveType) -> Result<PrimitiveValue> {
        match &self.null_value {
            Some(raw) => PrimitiveValue::parse(primitive, raw),
            None => Ok(primitive.null_value()),
        }
    }

    /// Minimum value in effect for the given primitive
    pub fn applicable_min_value(&self, primitive: PrimitiveType) -> Result<PrimitiveValue> {
        match &self.min_value {
            Some(raw) => PrimitiveValue::parse(primitive, raw),
            None => Ok(primitive.min_value()),
        }
    }

    /// Maximum value in effect for the given primitive
    pub fn applicable_max_value(&self, primitive: PrimitiveType) -> Result<PrimitiveValue> {
        match &self.max_value {
            Some(raw) => PrimitiveValue::parse(primitive, raw),
            None => Ok(primitive.max_value()),
        }
    }
}

/// Accepts literals written either as JSON strings or as JSON numbers.
fn literal<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn unset() -> i32 {
    -1
}

fn single() -> usize {
    1
}

/// Atomic IR unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Structural role
    pub signal: Signal,
    /// Name of the element
    pub name: String,
    /// Name of the referenced type for composite members declared by reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_name: Option<String>,
    /// Free text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Schema id, -1 when not applicable
    #[serde(default = "unset")]
    pub id: i32,
    /// Schema version in which the element was introduced
    #[serde(default)]
    pub version: u32,
    /// Byte offset within the enclosing block, -1 when not block resident
    #[serde(default = "unset")]
    pub offset: i32,
    /// Encoded length in bytes, -1 when variable
    #[serde(default = "unset")]
    pub encoded_length: i32,
    /// Number of tokens spanned by this token's subtree, itself included
    #[serde(default = "single")]
    pub component_token_count: usize,
    /// Encoding attributes
    #[serde(default)]
    pub encoding: Encoding,
}

impl Token {
    /// Creates a token with no encoding and unset offsets
    pub fn new(signal: Signal, name: impl Into<String>) -> Self {
        Self {
            signal,
            name: name.into(),
            referenced_name: None,
            description: None,
            id: -1,
            version: 0,
            offset: -1,
            encoded_length: -1,
            component_token_count: 1,
            encoding: Encoding::default(),
        }
    }

    /// Type name to use for code referring to this token's type
    pub fn applicable_type_name(&self) -> &str {
        self.referenced_name.as_deref().unwrap_or(&self.name)
    }

    /// Number of primitive elements encoded by this token
    pub fn array_length(&self) -> usize {
        match self.encoding.primitive_type {
            Some(primitive) if self.encoded_length > 0 => {
                (self.encoded_length as usize / primitive.size()).max(1)
            }
            _ => 1,
        }
    }

    /// Returns true if the token encodes a constant
    pub fn is_constant(&self) -> bool {
        self.encoding.presence == Presence::Constant
    }

    /// Returns true if the token encodes an optional value
    pub fn is_optional(&self) -> bool {
        self.encoding.presence == Presence::Optional
    }

    /// Offset within the enclosing block, clamped to zero
    pub fn block_offset(&self) -> usize {
        self.offset.max(0) as usize
    }

    /// Primitive type or a malformed range error naming the token
    pub fn require_primitive(&self) -> Result<PrimitiveType> {
        self.encoding
            .primitive_type
            .ok_or_else(|| Error::malformed(&self.name, "token carries no primitive type"))
    }
}

/// Primitive types of the standard message header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderStructure {
    /// Type of the block length field
    pub block_length_type: PrimitiveType,
    /// Type of the template id field
    pub template_id_type: PrimitiveType,
    /// Type of the schema id field
    pub schema_id_type: PrimitiveType,
    /// Type of the schema version field
    pub schema_version_type: PrimitiveType,
}

impl Default for HeaderStructure {
    fn default() -> Self {
        Self {
            block_length_type: PrimitiveType::Uint16,
            template_id_type: PrimitiveType::Uint16,
            schema_id_type: PrimitiveType::Uint16,
            schema_version_type: PrimitiveType::Uint16,
        }
    }
}

/// A complete schema IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ir {
    /// Package name
    pub package_name: String,
    /// Optional namespace name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_name: Option<String>,
    /// Numeric schema id
    #[serde(default)]
    pub id: u32,
    /// Schema version
    #[serde(default)]
    pub version: u32,
    /// Optional semantic version string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_version: Option<String>,
    /// Free text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Wire byte order
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// Header field types
    #[serde(default)]
    pub header_structure: HeaderStructure,
    /// Token lists of named types
    #[serde(default)]
    pub types: Vec<Vec<Token>>,
    /// Token lists of messages
    #[serde(default)]
    pub messages: Vec<Vec<Token>>,
}

impl Ir {
    /// Parses an IR document from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses an IR document from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_json(&json)
    }

    /// Serializes the IR as pretty printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Crate level namespace derived from the package and namespace names
    pub fn namespace(&self) -> String {
        let package = to_snake_case(&self.package_name).replace(['.', '-'], "_");
        match &self.namespace_name {
            Some(namespace) if !namespace.eq_ignore_ascii_case(&package) => {
                format!("{namespace}_{package}").to_lowercase()
            }
            _ => package.to_lowercase(),
        }
    }
}
