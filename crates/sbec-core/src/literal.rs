//! Literal rendering for the target syntax.
//!
//! All knowledge of how numbers, strings and primitive type names are spelled
//! in generated source lives behind [`LiteralRenderer`]. Emitters never format
//! a literal themselves.

use crate::error::{Error, Result};
use crate::ir::{PrimitiveType, PrimitiveValue};

/// Character encodings treated as 7-bit ASCII
const ASCII_ENCODINGS: &[&str] = &["US-ASCII", "ASCII"];

/// Character encodings treated as UTF-8
const UTF8_ENCODINGS: &[&str] = &["UTF-8", "UTF8"];

/// How textual data is exposed by generated accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Raw bytes
    Ascii,
    /// Validated text
    Utf8,
}

impl TextEncoding {
    /// Classifies a declared character encoding.
    ///
    /// Returns `Ok(None)` when no encoding is declared.
    pub fn from_declared(member: &str, declared: Option<&str>) -> Result<Option<Self>> {
        let Some(declared) = declared else {
            return Ok(None);
        };
        if ASCII_ENCODINGS.iter().any(|e| e.eq_ignore_ascii_case(declared)) {
            Ok(Some(TextEncoding::Ascii))
        } else if UTF8_ENCODINGS.iter().any(|e| e.eq_ignore_ascii_case(declared)) {
            Ok(Some(TextEncoding::Utf8))
        } else {
            Err(Error::unsupported_encoding(member, declared))
        }
    }
}

/// Renders literals and type names in one target syntax
pub trait LiteralRenderer {
    /// Name of the primitive type in the target syntax
    fn type_name(&self, primitive: PrimitiveType) -> &'static str;

    /// A typed literal of the given value
    fn literal(&self, primitive: PrimitiveType, value: &PrimitiveValue) -> Result<String>;

    /// Boolean expression testing `expr` against the null sentinel
    fn null_check(&self, primitive: PrimitiveType, expr: &str, null: &PrimitiveValue) -> Result<String>;

    /// A byte string literal
    fn byte_string(&self, text: &str) -> String;

    /// A string literal
    fn string(&self, text: &str) -> String;
}

/// Literal rendering for Rust source
#[derive(Debug, Clone, Copy, Default)]
pub struct RustLiterals;

impl LiteralRenderer for RustLiterals {
    fn type_name(&self, primitive: PrimitiveType) -> &'static str {
        match primitive {
            PrimitiveType::Char | PrimitiveType::Uint8 => "u8",
            PrimitiveType::Int8 => "i8",
            PrimitiveType::Int16 => "i16",
            PrimitiveType::Int32 => "i32",
            PrimitiveType::Int64 => "i64",
            PrimitiveType::Uint16 => "u16",
            PrimitiveType::Uint32 => "u32",
            PrimitiveType::Uint64 => "u64",
            PrimitiveType::Float => "f32",
            PrimitiveType::Double => "f64",
        }
    }

    fn literal(&self, primitive: PrimitiveType, value: &PrimitiveValue) -> Result<String> {
        let ty = self.type_name(primitive);
        match value {
            PrimitiveValue::Int(v) if !primitive.is_float() => Ok(format!("{v}_{ty}")),
            PrimitiveValue::Int(v) => Ok(format!("{v}.0_{ty}")),
            PrimitiveValue::Float(v) if primitive.is_float() => Ok(if v.is_nan() {
                format!("{ty}::NAN")
            } else if *v == f64::INFINITY {
                format!("{ty}::INFINITY")
            } else if *v == f64::NEG_INFINITY {
                format!("{ty}::NEG_INFINITY")
            } else {
                format!("{v:?}_{ty}")
            }),
            other => Err(Error::invalid_literal(primitive.name(), other.to_string())),
        }
    }

    fn null_check(&self, primitive: PrimitiveType, expr: &str, null: &PrimitiveValue) -> Result<String> {
        if null.is_nan() {
            Ok(format!("{expr}.is_nan()"))
        } else {
            Ok(format!("{expr} == {}", self.literal(primitive, null)?))
        }
    }

    fn byte_string(&self, text: &str) -> String {
        let escaped: String = text
            .bytes()
            .flat_map(std::ascii::escape_default)
            .map(char::from)
            .collect();
        format!("b\"{escaped}\"")
    }

    fn string(&self, text: &str) -> String {
        format!("{text:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_literals() {
        let r = RustLiterals;
        assert_eq!(r.literal(PrimitiveType::Uint8, &PrimitiveValue::Int(255)).unwrap(), "255_u8");
        assert_eq!(r.literal(PrimitiveType::Char, &PrimitiveValue::Int(65)).unwrap(), "65_u8");
        assert_eq!(
            r.literal(PrimitiveType::Int64, &PrimitiveType::Int64.null_value()).unwrap(),
            "-9223372036854775808_i64"
        );
    }

    #[test]
    fn test_float_literals() {
        let r = RustLiterals;
        assert_eq!(r.literal(PrimitiveType::Float, &PrimitiveValue::Float(f64::NAN)).unwrap(), "f32::NAN");
        assert_eq!(r.literal(PrimitiveType::Double, &PrimitiveValue::Float(1.5)).unwrap(), "1.5_f64");
        assert_eq!(r.literal(PrimitiveType::Float, &PrimitiveValue::Int(2)).unwrap(), "2.0_f32");
        assert_eq!(
            r.literal(PrimitiveType::Double, &PrimitiveValue::Float(f64::NEG_INFINITY)).unwrap(),
            "f64::NEG_INFINITY"
        );
    }

    #[test]
    fn test_null_check() {
        let r = RustLiterals;
        assert_eq!(
            r.null_check(PrimitiveType::Float, "value", &PrimitiveValue::Float(f64::NAN)).unwrap(),
            "value.is_nan()"
        );
        assert_eq!(
            r.null_check(PrimitiveType::Uint16, "value", &PrimitiveValue::Int(65535)).unwrap(),
            "value == 65535_u16"
        );
    }

    #[test]
    fn test_text_literals() {
        let r = RustLiterals;
        assert_eq!(r.byte_string("Petrol"), "b\"Petrol\"");
        assert_eq!(r.byte_string("a\"b"), "b\"a\\\"b\"");
        assert_eq!(r.string("Diesel"), "\"Diesel\"");
        assert!(r.literal(PrimitiveType::Char, &PrimitiveValue::Text("ab".into())).is_err());
    }

    #[test]
    fn test_text_encoding() {
        assert_eq!(TextEncoding::from_declared("fuel", Some("US-ASCII")).unwrap(), Some(TextEncoding::Ascii));
        assert_eq!(TextEncoding::from_declared("name", Some("utf-8")).unwrap(), Some(TextEncoding::Utf8));
        assert_eq!(TextEncoding::from_declared("data", None).unwrap(), None);
        assert!(TextEncoding::from_declared("name", Some("ISO-8859-1")).is_err());
    }
}
