//! Binary layout descriptions and the version gate.
//!
//! Each classified member is described once here: offset, length, kind and
//! the schema version that introduced it. The encode and decode emitters both
//! consume these descriptions, so they cannot disagree on where a value lives.

use crate::classify::{Field, Group, VarData};
use crate::error::{Error, Result};
use crate::ir::{PrimitiveType, PrimitiveValue, Signal, Token};
use crate::literal::{LiteralRenderer, TextEncoding};
use crate::naming::{function_name, struct_name};

/// Visibility of a member to readers declaring an older acting version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionGate {
    since: u32,
}

impl VersionGate {
    /// Gate for a member introduced in `since`
    pub fn new(since: u32) -> Self {
        Self { since }
    }

    /// Version in which the member was introduced
    pub fn since(&self) -> u32 {
        self.since
    }

    /// Returns true if some acting version cannot observe the member
    pub fn is_gated(&self) -> bool {
        self.since > 0
    }

    /// Returns true if a reader at `acting_version` may observe the member
    pub fn is_visible_to(&self, acting_version: u32) -> bool {
        acting_version >= self.since
    }

    /// Condition under which a decoder must return the sentinel
    pub fn hidden_condition(&self) -> Option<String> {
        self.is_gated()
            .then(|| format!("self.acting_version() < {}", self.since))
    }
}

/// Layout of a single primitive value
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarLayout {
    /// Primitive type
    pub primitive: PrimitiveType,
    /// Absent when equal to `null`
    pub optional: bool,
    /// Null sentinel
    pub null: PrimitiveValue,
    /// Minimum value
    pub min: PrimitiveValue,
    /// Maximum value
    pub max: PrimitiveValue,
    /// Declared character encoding
    pub character_encoding: Option<String>,
    /// Declared semantic type
    pub semantic_type: Option<String>,
}

impl ScalarLayout {
    fn from_token(token: &Token) -> Result<Self> {
        let primitive = token.require_primitive()?;
        let encoding = &token.encoding;
        Ok(Self {
            primitive,
            optional: token.is_optional(),
            null: encoding.applicable_null_value(primitive)?,
            min: encoding.applicable_min_value(primitive)?,
            max: encoding.applicable_max_value(primitive)?,
            character_encoding: encoding.character_encoding.clone(),
            semantic_type: encoding.semantic_type.clone(),
        })
    }
}

/// Value of a constant field
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// Numeric literal
    Number {
        /// Primitive type
        primitive: PrimitiveType,
        /// Literal value
        value: PrimitiveValue,
    },
    /// ASCII text exposed as bytes
    Bytes(String),
    /// UTF-8 text exposed as a string
    Text(String),
    /// A fixed enum variant
    Variant {
        /// Generated enum name
        enum_type: String,
        /// Variant name
        variant: String,
    },
}

/// What a field holds
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Single primitive
    Scalar(ScalarLayout),
    /// Fixed length primitive array
    Array {
        /// Element layout
        element: ScalarLayout,
        /// Number of elements
        length: usize,
    },
    /// Literal that never occupies wire bytes
    Constant(ConstantValue),
    /// Enum stored as its primitive
    Enum {
        /// Generated enum name
        type_name: String,
        /// Underlying primitive
        primitive: PrimitiveType,
    },
    /// Bit set stored as its primitive
    BitSet {
        /// Generated bit set name
        type_name: String,
        /// Underlying primitive
        primitive: PrimitiveType,
    },
    /// Nested composite with its own codec
    Composite {
        /// Generated composite name
        type_name: String,
        /// Schema name of the composite type
        schema_name: String,
    },
}

/// Layout of a fixed-offset field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    /// Schema name
    pub name: String,
    /// Generated accessor name
    pub accessor: String,
    /// Offset within the enclosing block
    pub offset: usize,
    /// Bytes occupied within the block
    pub length: usize,
    /// Version gate
    pub gate: VersionGate,
    /// Kind of value
    pub kind: FieldKind,
}

impl FieldLayout {
    /// Expression a gated decoder returns instead of touching the buffer.
    ///
    /// Constants have no sentinel; they are always observable.
    pub fn absent_value(&self, literals: &dyn LiteralRenderer) -> Result<Option<String>> {
        Ok(Some(match &self.kind {
            FieldKind::Scalar(scalar) if scalar.optional => "None".to_string(),
            FieldKind::Scalar(scalar) => literals.literal(scalar.primitive, &scalar.null)?,
            FieldKind::Array { element, length } => {
                format!("[{}; {length}]", literals.literal(element.primitive, &element.null)?)
            }
            FieldKind::Enum { type_name, .. } => format!("{type_name}::NullVal"),
            FieldKind::BitSet { type_name, .. } => format!("{type_name}::default()"),
            FieldKind::Composite { .. } => "Either::Left(self)".to_string(),
            FieldKind::Constant(_) => return Ok(None),
        }))
    }

    /// Offset expression relative to the codec's base offset
    pub fn offset_expr(&self) -> String {
        offset_expr(self.offset)
    }
}

/// `self.offset` plus a fixed displacement
pub fn offset_expr(offset: usize) -> String {
    if offset == 0 {
        "self.offset".to_string()
    } else {
        format!("self.offset + {offset}")
    }
}

/// Describes a classified field
pub fn describe_field(field: &Field<'_>) -> Result<FieldLayout> {
    let type_token = field.type_token;
    let offset = if field.field_token.offset >= 0 {
        field.field_token.block_offset()
    } else {
        type_token.block_offset()
    };

    let kind = match type_token.signal {
        Signal::Encoding if field.is_constant() => {
            FieldKind::Constant(describe_constant(field.name(), field.field_token, type_token)?)
        }
        Signal::Encoding => {
            let element = ScalarLayout::from_token(type_token)?;
            match type_token.array_length() {
                1 => FieldKind::Scalar(element),
                length => FieldKind::Array { element, length },
            }
        }
        Signal::BeginEnum => {
            let enum_type = struct_name(type_token.applicable_type_name());
            if field.is_constant() {
                let raw = const_value(field.field_token, type_token)?;
                let variant = struct_name(raw.rsplit('.').next().unwrap_or(raw));
                FieldKind::Constant(ConstantValue::Variant { enum_type, variant })
            } else {
                FieldKind::Enum {
                    type_name: enum_type,
                    primitive: type_token.require_primitive()?,
                }
            }
        }
        Signal::BeginSet => FieldKind::BitSet {
            type_name: struct_name(type_token.applicable_type_name()),
            primitive: type_token.require_primitive()?,
        },
        Signal::BeginComposite => FieldKind::Composite {
            type_name: struct_name(type_token.applicable_type_name()),
            schema_name: type_token.applicable_type_name().to_string(),
        },
        found => {
            return Err(Error::UnexpectedSignal {
                expected: "ENCODING, BEGIN_ENUM, BEGIN_SET or BEGIN_COMPOSITE",
                found,
                name: type_token.name.clone(),
                index: 0,
            })
        }
    };

    let length = match &kind {
        FieldKind::Constant(_) => 0,
        FieldKind::Scalar(s) => s.primitive.size(),
        FieldKind::Array { element, length } => element.primitive.size() * length,
        FieldKind::Enum { primitive, .. } | FieldKind::BitSet { primitive, .. } => primitive.size(),
        FieldKind::Composite { .. } => type_token.encoded_length.max(0) as usize,
    };

    Ok(FieldLayout {
        name: field.name().to_string(),
        accessor: function_name(field.name()),
        offset,
        length,
        gate: VersionGate::new(field.version()),
        kind,
    })
}

fn const_value<'t>(field_token: &'t Token, type_token: &'t Token) -> Result<&'t str> {
    field_token
        .encoding
        .const_value
        .as_deref()
        .or(type_token.encoding.const_value.as_deref())
        .ok_or_else(|| Error::malformed(&field_token.name, "constant without a value"))
}

fn describe_constant(name: &str, field_token: &Token, type_token: &Token) -> Result<ConstantValue> {
    let primitive = type_token.require_primitive()?;
    let raw = const_value(field_token, type_token)?;
    let declared = type_token.encoding.character_encoding.as_deref();

    match TextEncoding::from_declared(name, declared)? {
        Some(TextEncoding::Ascii) if primitive == PrimitiveType::Char => {
            if !raw.is_ascii() {
                return Err(Error::invalid_literal(primitive.name(), raw));
            }
            Ok(ConstantValue::Bytes(raw.to_string()))
        }
        Some(TextEncoding::Utf8) if primitive == PrimitiveType::Char => {
            Ok(ConstantValue::Text(raw.to_string()))
        }
        _ => Ok(ConstantValue::Number {
            primitive,
            value: PrimitiveValue::parse(primitive, raw)?,
        }),
    }
}

/// Verifies that the non-constant fields of a block never overlap and fit
/// within `block_length` when one is declared.
pub fn check_block(owner: &str, fields: &[FieldLayout], block_length: Option<usize>) -> Result<()> {
    let mut spans: Vec<(usize, usize, &str)> = fields
        .iter()
        .filter(|f| f.length > 0)
        .map(|f| (f.offset, f.offset + f.length, f.name.as_str()))
        .collect();
    spans.sort_by_key(|&(start, end, _)| (start, end));

    for pair in spans.windows(2) {
        let (_, prev_end, prev) = pair[0];
        let (start, _, name) = pair[1];
        if start < prev_end {
            return Err(Error::malformed(
                owner,
                format!("field '{name}' at offset {start} overlaps '{prev}' ending at {prev_end}"),
            ));
        }
    }

    if let (Some(limit), Some(&(_, end, name))) = (block_length, spans.last()) {
        if end > limit {
            return Err(Error::malformed(
                owner,
                format!("field '{name}' ends at {end} past the block length {limit}"),
            ));
        }
    }
    Ok(())
}

/// Layout of a repeating group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupLayout {
    /// Schema name
    pub name: String,
    /// Generated accessor stem
    pub accessor: String,
    /// Generated struct stem
    pub struct_name: String,
    /// Version gate
    pub gate: VersionGate,
    /// Fixed element block length
    pub block_length: usize,
    /// Type of the block length header field
    pub block_length_type: PrimitiveType,
    /// Offset of the block length within the header
    pub block_length_offset: usize,
    /// Type of the repeat count header field
    pub num_in_group_type: PrimitiveType,
    /// Offset of the repeat count within the header
    pub num_in_group_offset: usize,
    /// Size of the header in bytes
    pub header_size: usize,
}

/// Describes a classified group
pub fn describe_group(group: &Group<'_>) -> Result<GroupLayout> {
    let token = group.token;
    if token.encoded_length < 0 {
        return Err(Error::malformed(&token.name, "group has no block length"));
    }
    Ok(GroupLayout {
        name: token.name.clone(),
        accessor: function_name(&token.name),
        struct_name: struct_name(&token.name),
        gate: VersionGate::new(token.version),
        block_length: token.encoded_length as usize,
        block_length_type: group.header.block_length.require_primitive()?,
        block_length_offset: group.header.block_length.block_offset(),
        num_in_group_type: group.header.num_in_group.require_primitive()?,
        num_in_group_offset: group.header.num_in_group.block_offset(),
        header_size: group.header_size()?,
    })
}

/// Layout of a length-prefixed var data member
#[derive(Debug, Clone, PartialEq)]
pub struct VarDataLayout {
    /// Schema name
    pub name: String,
    /// Generated accessor name
    pub accessor: String,
    /// Version gate
    pub gate: VersionGate,
    /// Type of the length prefix
    pub length_type: PrimitiveType,
    /// Declared character encoding, verbatim
    pub character_encoding: Option<String>,
    /// How the payload is exposed
    pub text: Option<TextEncoding>,
}

impl VarDataLayout {
    /// Size of the length prefix in bytes
    pub fn prefix_size(&self) -> usize {
        self.length_type.size()
    }
}

/// Describes a classified var data member
pub fn describe_var_data(var_data: &VarData<'_>) -> Result<VarDataLayout> {
    let token = var_data.token;
    let declared = var_data.data.encoding.character_encoding.clone();
    let text = TextEncoding::from_declared(&token.name, declared.as_deref())?;
    Ok(VarDataLayout {
        name: token.name.clone(),
        accessor: function_name(&token.name),
        gate: VersionGate::new(token.version),
        length_type: var_data.length.require_primitive()?,
        character_encoding: declared,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_message;
    use crate::ir::builder::{
        EncodingDef, EnumDef, FieldDef, GroupDef, MessageDef, SchemaBuilder, SetDef, VarDataDef,
    };
    use crate::ir::Ir;
    use crate::literal::RustLiterals;
    use pretty_assertions::assert_eq;

    fn sample() -> Ir {
        SchemaBuilder::new("test")
            .enumeration(EnumDef::new("Model", PrimitiveType::Char).value("A", "A").value("C", "C"))
            .set(SetDef::new("Extras", PrimitiveType::Uint8).choice("sunRoof", 0))
            .message(
                MessageDef::new("Car", 1)
                    .field(FieldDef::new("serial", 1, PrimitiveType::Uint64))
                    .field(FieldDef::new("numbers", 2, EncodingDef::new("numbers", PrimitiveType::Int32).array(4)))
                    .field(FieldDef::new("code", 3, "Model"))
                    .field(FieldDef::new("discounted", 4, "Model").constant_value("Model.C"))
                    .field(FieldDef::new("extras", 5, "Extras"))
                    .field(FieldDef::new("fuel", 6, EncodingDef::new("fuel", PrimitiveType::Char).array(6).constant("Petrol")))
                    .field(FieldDef::new("rpm", 7, EncodingDef::new("rpm", PrimitiveType::Uint16).constant("9000")))
                    .field(
                        FieldDef::new("rating", 8, EncodingDef::new("rating", PrimitiveType::Float).optional())
                            .since_version(2),
                    )
                    .group(GroupDef::new("figures", 9).since_version(1).field(FieldDef::new("speed", 10, PrimitiveType::Uint16)))
                    .var_data(VarDataDef::utf8("make", 11)),
            )
            .build()
            .unwrap()
    }

    fn layouts(ir: &Ir) -> Vec<FieldLayout> {
        let message = classify_message(&ir.messages[0]).unwrap();
        message.body.fields().map(|f| describe_field(f).unwrap()).collect()
    }

    #[test]
    fn test_field_kinds_and_offsets() {
        let ir = sample();
        let fields = layouts(&ir);
        let summary: Vec<(&str, usize, usize)> = fields
            .iter()
            .map(|f| (f.accessor.as_str(), f.offset, f.length))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("serial", 0, 8),
                ("numbers", 8, 16),
                ("code", 24, 1),
                ("discounted", 25, 0),
                ("extras", 25, 1),
                ("fuel", 26, 0),
                ("rpm", 26, 0),
                ("rating", 26, 4),
            ]
        );

        assert!(matches!(fields[1].kind, FieldKind::Array { length: 4, .. }));
        assert_eq!(
            fields[3].kind,
            FieldKind::Constant(ConstantValue::Variant {
                enum_type: "Model".into(),
                variant: "C".into()
            })
        );
        assert_eq!(fields[5].kind, FieldKind::Constant(ConstantValue::Bytes("Petrol".into())));
        assert_eq!(
            fields[6].kind,
            FieldKind::Constant(ConstantValue::Number {
                primitive: PrimitiveType::Uint16,
                value: PrimitiveValue::Int(9000)
            })
        );
        check_block("Car", &fields, Some(30)).unwrap();
    }

    #[test]
    fn test_absent_values() {
        let ir = sample();
        let fields = layouts(&ir);
        let r = RustLiterals;
        assert_eq!(fields[0].absent_value(&r).unwrap().unwrap(), "18446744073709551615_u64");
        assert_eq!(fields[1].absent_value(&r).unwrap().unwrap(), "[-2147483648_i32; 4]");
        assert_eq!(fields[2].absent_value(&r).unwrap().unwrap(), "Model::NullVal");
        assert_eq!(fields[3].absent_value(&r).unwrap(), None);
        assert_eq!(fields[4].absent_value(&r).unwrap().unwrap(), "Extras::default()");
        assert_eq!(fields[7].absent_value(&r).unwrap().unwrap(), "None");
    }

    #[test]
    fn test_version_gate() {
        let ir = sample();
        let fields = layouts(&ir);
        let gate = fields[7].gate;
        assert!(gate.is_gated());
        assert!(!gate.is_visible_to(1));
        assert!(gate.is_visible_to(2));
        assert_eq!(gate.hidden_condition().unwrap(), "self.acting_version() < 2");
        assert_eq!(fields[0].gate.hidden_condition(), None);
    }

    #[test]
    fn test_overlap_detected() {
        let ir = sample();
        let mut fields = layouts(&ir);
        fields[2].offset = 20;
        let err = check_block("Car", &fields, None).unwrap_err();
        assert!(err.to_string().contains("overlaps"));

        let fields = layouts(&ir);
        assert!(check_block("Car", &fields, Some(28)).is_err());
    }

    #[test]
    fn test_group_and_var_data_layouts() {
        let ir = sample();
        let message = classify_message(&ir.messages[0]).unwrap();
        let group = describe_group(message.body.groups().next().unwrap()).unwrap();
        assert_eq!(group.block_length, 2);
        assert_eq!(group.header_size, 4);
        assert_eq!(group.num_in_group_offset, 2);
        assert_eq!(group.gate.since(), 1);

        let var_data = describe_var_data(message.body.var_data().next().unwrap()).unwrap();
        assert_eq!(var_data.prefix_size(), 2);
        assert_eq!(var_data.text, Some(TextEncoding::Utf8));
    }

    #[test]
    fn test_unsupported_constant_encoding() {
        let ir = SchemaBuilder::new("test")
            .message(MessageDef::new("M", 1).field(FieldDef::new(
                "label",
                1,
                EncodingDef::new("label", PrimitiveType::Char)
                    .array(3)
                    .character_encoding("ISO-8859-1")
                    .constant("abc"),
            )))
            .build()
            .unwrap();
        let message = classify_message(&ir.messages[0]).unwrap();
        let err = describe_field(message.body.fields().next().unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCharacterEncoding { .. }));
    }
}
