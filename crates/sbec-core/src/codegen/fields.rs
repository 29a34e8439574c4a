//! Fixed-offset field accessors.
//!
//! A field is described once by [`FieldLayout`]. The two strategies below turn
//! that description into the encoder and decoder accessor, so both sides read
//! offsets, lengths and sentinels from the same place.

use super::writer::CodeWriter;
use crate::error::Result;
use crate::ir::PrimitiveType;
use crate::layout::{ConstantValue, FieldKind, FieldLayout, ScalarLayout};
use crate::literal::LiteralRenderer;
use tracing::trace;

/// Emits the accessor for one field kind on one side of a codec pair
pub(crate) trait FieldStrategy {
    fn scalar(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, scalar: &ScalarLayout) -> Result<()>;

    fn array(
        &self,
        w: &mut CodeWriter<'_>,
        field: &FieldLayout,
        element: &ScalarLayout,
        length: usize,
    ) -> Result<()>;

    fn constant(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, value: &ConstantValue) -> Result<()>;

    fn enumeration(
        &self,
        w: &mut CodeWriter<'_>,
        field: &FieldLayout,
        type_name: &str,
        primitive: PrimitiveType,
    ) -> Result<()>;

    fn bit_set(
        &self,
        w: &mut CodeWriter<'_>,
        field: &FieldLayout,
        type_name: &str,
        primitive: PrimitiveType,
    ) -> Result<()>;

    fn composite(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, type_name: &str) -> Result<()>;

    /// Whether `field` gets an accessor, and with it a doc block, on this side
    fn has_accessor(&self, _field: &FieldLayout) -> bool {
        true
    }
}

/// Emits the documented accessor of `field` through `strategy`
pub(crate) fn emit_field(
    strategy: &dyn FieldStrategy,
    w: &mut CodeWriter<'_>,
    field: &FieldLayout,
) -> Result<()> {
    trace!(field = %field.name, offset = field.offset, length = field.length, "field accessor");
    w.blank();
    if strategy.has_accessor(field) {
        document(w, field);
    }
    match &field.kind {
        FieldKind::Scalar(scalar) => strategy.scalar(w, field, scalar),
        FieldKind::Array { element, length } => strategy.array(w, field, element, *length),
        FieldKind::Constant(value) => strategy.constant(w, field, value),
        FieldKind::Enum { type_name, primitive } => strategy.enumeration(w, field, type_name, *primitive),
        FieldKind::BitSet { type_name, primitive } => strategy.bit_set(w, field, type_name, *primitive),
        FieldKind::Composite { type_name, .. } => strategy.composite(w, field, type_name),
    }
}

fn document(w: &mut CodeWriter<'_>, field: &FieldLayout) {
    let kind = match &field.kind {
        FieldKind::Scalar(s) if s.optional => "optional primitive",
        FieldKind::Scalar(_) => "primitive",
        FieldKind::Array { .. } => "primitive array",
        FieldKind::Constant(_) => "constant",
        FieldKind::Enum { .. } => "enum",
        FieldKind::BitSet { .. } => "bit set",
        FieldKind::Composite { .. } => "composite",
    };
    w.doc(format!("{kind} field '{}'", field.name));
    let scalar = match &field.kind {
        FieldKind::Scalar(s) => Some(s),
        FieldKind::Array { element, .. } => Some(element),
        _ => None,
    };
    if let Some(s) = scalar {
        w.doc(format!("- min value: {}", s.min));
        w.doc(format!("- max value: {}", s.max));
        w.doc(format!("- null value: {}", s.null));
        if let Some(encoding) = &s.character_encoding {
            w.doc(format!("- characterEncoding: {encoding}"));
        }
        if let Some(semantic) = &s.semantic_type {
            w.doc(format!("- semanticType: {semantic}"));
        }
    }
    w.doc(format!("- encodedOffset: {}", field.offset));
    w.doc(format!("- encodedLength: {}", field.length));
    w.doc(format!("- version: {}", field.gate.since()));
}

/// Step between array elements, folded away for single bytes
fn element_offset(size: usize) -> String {
    if size == 1 {
        "offset + i".to_string()
    } else {
        format!("offset + i * {size}")
    }
}

/// Write side: no version gating, values are taken verbatim
pub(crate) struct EncodeStrategy<'r> {
    pub(crate) literals: &'r dyn LiteralRenderer,
}

impl EncodeStrategy<'_> {
    fn put(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, primitive: PrimitiveType, value_ty: &str, value: &str) {
        let prim = self.literals.type_name(primitive);
        w.writeln("#[inline]");
        w.open(format!("pub fn {}(&mut self, value: {value_ty})", field.accessor));
        w.writeln(format!("let offset = {};", field.offset_expr()));
        w.writeln(format!("self.get_buf_mut().put_{prim}_at(offset, {value});"));
        w.close();
    }
}

impl FieldStrategy for EncodeStrategy<'_> {
    fn has_accessor(&self, field: &FieldLayout) -> bool {
        !matches!(field.kind, FieldKind::Constant(_))
    }

    fn scalar(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, scalar: &ScalarLayout) -> Result<()> {
        let prim = self.literals.type_name(scalar.primitive);
        self.put(w, field, scalar.primitive, prim, "value");
        Ok(())
    }

    fn array(
        &self,
        w: &mut CodeWriter<'_>,
        field: &FieldLayout,
        element: &ScalarLayout,
        length: usize,
    ) -> Result<()> {
        let prim = self.literals.type_name(element.primitive);
        w.writeln("#[inline]");
        w.open(format!("pub fn {}(&mut self, value: [{prim}; {length}])", field.accessor));
        w.writeln(format!("let offset = {};", field.offset_expr()));
        w.writeln("let buf = self.get_buf_mut();");
        w.open("for (i, v) in value.iter().enumerate()");
        w.writeln(format!(
            "buf.put_{prim}_at({}, *v);",
            element_offset(element.primitive.size())
        ));
        w.close();
        w.close();
        Ok(())
    }

    fn constant(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, _value: &ConstantValue) -> Result<()> {
        w.writeln(format!("// skipping CONSTANT {}", field.name));
        Ok(())
    }

    fn enumeration(
        &self,
        w: &mut CodeWriter<'_>,
        field: &FieldLayout,
        type_name: &str,
        primitive: PrimitiveType,
    ) -> Result<()> {
        let prim = self.literals.type_name(primitive);
        self.put(w, field, primitive, type_name, &format!("{prim}::from(value)"));
        Ok(())
    }

    fn bit_set(
        &self,
        w: &mut CodeWriter<'_>,
        field: &FieldLayout,
        type_name: &str,
        primitive: PrimitiveType,
    ) -> Result<()> {
        self.put(w, field, primitive, type_name, "value.0");
        Ok(())
    }

    fn composite(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, type_name: &str) -> Result<()> {
        w.writeln("#[inline]");
        w.open(format!("pub fn {}_encoder(self) -> {type_name}Encoder<Self>", field.accessor));
        w.writeln(format!("let offset = {};", field.offset_expr()));
        w.writeln(format!("{type_name}Encoder::default().wrap(self, offset)"));
        w.close();
        Ok(())
    }
}

/// Read side: every access is preceded by the version gate
pub(crate) struct DecodeStrategy<'r> {
    pub(crate) literals: &'r dyn LiteralRenderer,
}

impl DecodeStrategy<'_> {
    /// Early return of the absent value for readers older than the field
    fn gate(&self, w: &mut CodeWriter<'_>, field: &FieldLayout) -> Result<()> {
        if let (Some(condition), Some(absent)) =
            (field.gate.hidden_condition(), field.absent_value(self.literals)?)
        {
            w.open(format!("if {condition}"));
            w.writeln(format!("return {absent};"));
            w.close();
            w.blank();
        }
        Ok(())
    }

    fn literal_accessor(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, ty: &str, literal: &str) {
        w.writeln("#[inline]");
        w.open(format!("pub fn {}(&self) -> {ty}", field.accessor));
        w.writeln(literal);
        w.close();
    }
}

impl FieldStrategy for DecodeStrategy<'_> {
    fn scalar(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, scalar: &ScalarLayout) -> Result<()> {
        let prim = self.literals.type_name(scalar.primitive);
        let read = format!("self.get_buf().get_{prim}_at({})", field.offset_expr());
        w.writeln("#[inline]");
        if scalar.optional {
            w.open(format!("pub fn {}(&self) -> Option<{prim}>", field.accessor));
            self.gate(w, field)?;
            w.writeln(format!("let value = {read};"));
            let is_null = self.literals.null_check(scalar.primitive, "value", &scalar.null)?;
            w.open(format!("if {is_null}"));
            w.writeln("None");
            w.dedent();
            w.open("} else");
            w.writeln("Some(value)");
            w.close();
        } else {
            w.open(format!("pub fn {}(&self) -> {prim}", field.accessor));
            self.gate(w, field)?;
            w.writeln(read);
        }
        w.close();
        Ok(())
    }

    fn array(
        &self,
        w: &mut CodeWriter<'_>,
        field: &FieldLayout,
        element: &ScalarLayout,
        length: usize,
    ) -> Result<()> {
        let prim = self.literals.type_name(element.primitive);
        w.writeln("#[inline]");
        w.open(format!("pub fn {}(&self) -> [{prim}; {length}]", field.accessor));
        self.gate(w, field)?;
        w.writeln("let buf = self.get_buf();");
        w.writeln(format!("let offset = {};", field.offset_expr()));
        w.writeln(format!(
            "core::array::from_fn(|i| buf.get_{prim}_at({}))",
            element_offset(element.primitive.size())
        ));
        w.close();
        Ok(())
    }

    fn constant(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, value: &ConstantValue) -> Result<()> {
        match value {
            ConstantValue::Number { primitive, value } => {
                let literal = self.literals.literal(*primitive, value)?;
                self.literal_accessor(w, field, self.literals.type_name(*primitive), &literal);
            }
            ConstantValue::Bytes(text) => {
                self.literal_accessor(w, field, "&'static [u8]", &self.literals.byte_string(text));
            }
            ConstantValue::Text(text) => {
                self.literal_accessor(w, field, "&'static str", &self.literals.string(text));
            }
            ConstantValue::Variant { enum_type, variant } => {
                self.literal_accessor(w, field, enum_type, &format!("{enum_type}::{variant}"));
            }
        }
        Ok(())
    }

    fn enumeration(
        &self,
        w: &mut CodeWriter<'_>,
        field: &FieldLayout,
        type_name: &str,
        primitive: PrimitiveType,
    ) -> Result<()> {
        let prim = self.literals.type_name(primitive);
        w.writeln("#[inline]");
        w.open(format!("pub fn {}(&self) -> {type_name}", field.accessor));
        self.gate(w, field)?;
        w.writeln(format!("self.get_buf().get_{prim}_at({}).into()", field.offset_expr()));
        w.close();
        Ok(())
    }

    fn bit_set(
        &self,
        w: &mut CodeWriter<'_>,
        field: &FieldLayout,
        type_name: &str,
        primitive: PrimitiveType,
    ) -> Result<()> {
        let prim = self.literals.type_name(primitive);
        w.writeln("#[inline]");
        w.open(format!("pub fn {}(&self) -> {type_name}", field.accessor));
        self.gate(w, field)?;
        w.writeln(format!(
            "{type_name}::new(self.get_buf().get_{prim}_at({}))",
            field.offset_expr()
        ));
        w.close();
        Ok(())
    }

    fn composite(&self, w: &mut CodeWriter<'_>, field: &FieldLayout, type_name: &str) -> Result<()> {
        let decoder = format!("{type_name}Decoder<Self>");
        w.writeln("#[inline]");
        if field.gate.is_gated() {
            w.open(format!(
                "pub fn {}_decoder(self) -> Either<Self, {decoder}>",
                field.accessor
            ));
            self.gate(w, field)?;
            w.writeln(format!("let offset = {};", field.offset_expr()));
            w.writeln(format!("Either::Right({type_name}Decoder::default().wrap(self, offset))"));
        } else {
            w.open(format!("pub fn {}_decoder(self) -> {decoder}", field.accessor));
            w.writeln(format!("let offset = {};", field.offset_expr()));
            w.writeln(format!("{type_name}Decoder::default().wrap(self, offset)"));
        }
        w.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::GeneratorConfig;
    use crate::ir::PrimitiveValue;
    use crate::layout::VersionGate;
    use crate::literal::RustLiterals;
    use pretty_assertions::assert_eq;

    fn scalar(primitive: PrimitiveType, optional: bool) -> ScalarLayout {
        ScalarLayout {
            primitive,
            optional,
            null: primitive.null_value(),
            min: primitive.min_value(),
            max: primitive.max_value(),
            character_encoding: None,
            semantic_type: None,
        }
    }

    fn field(name: &str, offset: usize, since: u32, kind: FieldKind) -> FieldLayout {
        FieldLayout {
            name: name.to_string(),
            accessor: crate::naming::function_name(name),
            offset,
            length: 0,
            gate: VersionGate::new(since),
            kind,
        }
    }

    fn render(strategy: &dyn FieldStrategy, field: &FieldLayout) -> String {
        render_with(GeneratorConfig::new().emit_docs(false), strategy, field)
    }

    fn render_with(config: GeneratorConfig, strategy: &dyn FieldStrategy, field: &FieldLayout) -> String {
        let mut w = CodeWriter::new(&config);
        emit_field(strategy, &mut w, field).unwrap();
        w.finish()
    }

    const ENCODE: EncodeStrategy<'static> = EncodeStrategy { literals: &RustLiterals };
    const DECODE: DecodeStrategy<'static> = DecodeStrategy { literals: &RustLiterals };

    #[test]
    fn test_scalar_pair() {
        let f = field("modelYear", 8, 0, FieldKind::Scalar(scalar(PrimitiveType::Uint16, false)));
        assert_eq!(
            render(&ENCODE, &f),
            "
#[inline]
pub fn model_year(&mut self, value: u16) {
    let offset = self.offset + 8;
    self.get_buf_mut().put_u16_at(offset, value);
}
"
        );
        assert_eq!(
            render(&DECODE, &f),
            "
#[inline]
pub fn model_year(&self) -> u16 {
    self.get_buf().get_u16_at(self.offset + 8)
}
"
        );
    }

    #[test]
    fn test_optional_float_gated() {
        let f = field("efficiency", 4, 2, FieldKind::Scalar(scalar(PrimitiveType::Float, true)));
        assert_eq!(
            render(&DECODE, &f),
            "
#[inline]
pub fn efficiency(&self) -> Option<f32> {
    if self.acting_version() < 2 {
        return None;
    }

    let value = self.get_buf().get_f32_at(self.offset + 4);
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}
"
        );
    }

    #[test]
    fn test_array_pair() {
        let f = field(
            "someNumbers",
            0,
            1,
            FieldKind::Array {
                element: scalar(PrimitiveType::Uint32, false),
                length: 4,
            },
        );
        let encode = render(&ENCODE, &f);
        assert!(encode.contains("pub fn some_numbers(&mut self, value: [u32; 4]) {"));
        assert!(encode.contains("buf.put_u32_at(offset + i * 4, *v);"));
        let decode = render(&DECODE, &f);
        assert!(decode.contains("return [4294967295_u32; 4];"));
        assert!(decode.contains("core::array::from_fn(|i| buf.get_u32_at(offset + i * 4))"));
    }

    #[test]
    fn test_constants() {
        let f = field(
            "maxRpm",
            2,
            0,
            FieldKind::Constant(ConstantValue::Number {
                primitive: PrimitiveType::Uint16,
                value: PrimitiveValue::Int(9000),
            }),
        );
        assert_eq!(render(&ENCODE, &f), "\n// skipping CONSTANT maxRpm\n");
        assert!(render(&DECODE, &f).contains("pub fn max_rpm(&self) -> u16 {\n    9000_u16\n}"));

        let f = field("fuel", 2, 0, FieldKind::Constant(ConstantValue::Bytes("Petrol".into())));
        assert!(render(&DECODE, &f).contains("pub fn fuel(&self) -> &'static [u8] {\n    b\"Petrol\"\n}"));

        let f = field(
            "discountedModel",
            2,
            0,
            FieldKind::Constant(ConstantValue::Variant {
                enum_type: "Model".into(),
                variant: "C".into(),
            }),
        );
        assert!(render(&DECODE, &f).contains("-> Model {\n    Model::C\n}"));
    }

    #[test]
    fn test_documented_constants() {
        let f = field(
            "ceiling",
            4,
            0,
            FieldKind::Constant(ConstantValue::Number {
                primitive: PrimitiveType::Uint16,
                value: PrimitiveValue::Int(500),
            }),
        );
        let config = GeneratorConfig::new();
        assert_eq!(render_with(config.clone(), &ENCODE, &f), "\n// skipping CONSTANT ceiling\n");

        let decode = render_with(config, &DECODE, &f);
        assert!(decode.starts_with("\n/// constant field 'ceiling'\n"));
        assert!(decode.contains("/// - version: 0\n#[inline]\npub fn ceiling(&self) -> u16 {"));
    }

    #[test]
    fn test_enum_bit_set_and_composite() {
        let e = field(
            "code",
            3,
            0,
            FieldKind::Enum {
                type_name: "Model".into(),
                primitive: PrimitiveType::Char,
            },
        );
        assert!(render(&ENCODE, &e).contains("put_u8_at(offset, u8::from(value));"));
        assert!(render(&DECODE, &e).contains("self.get_buf().get_u8_at(self.offset + 3).into()"));

        let b = field(
            "extras",
            4,
            0,
            FieldKind::BitSet {
                type_name: "OptionalExtras".into(),
                primitive: PrimitiveType::Uint8,
            },
        );
        assert!(render(&ENCODE, &b).contains("put_u8_at(offset, value.0);"));
        assert!(render(&DECODE, &b).contains("OptionalExtras::new(self.get_buf().get_u8_at(self.offset + 4))"));

        let c = field(
            "engine",
            5,
            3,
            FieldKind::Composite {
                type_name: "Engine".into(),
                schema_name: "Engine".into(),
            },
        );
        assert!(render(&ENCODE, &c).contains("pub fn engine_encoder(self) -> EngineEncoder<Self> {"));
        let decode = render(&DECODE, &c);
        assert!(decode.contains("pub fn engine_decoder(self) -> Either<Self, EngineDecoder<Self>> {"));
        assert!(decode.contains("return Either::Left(self);"));
        assert!(decode.contains("Either::Right(EngineDecoder::default().wrap(self, offset))"));
    }
}
