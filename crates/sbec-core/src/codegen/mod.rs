//! Codec generation.
//!
//! [`CodecGenerator`] turns an [`Ir`] into [`CodecUnit`]s: one per named type,
//! one per message and a root unit holding the buffers, codec traits and
//! schema constants.
//!
//! ## Architecture
//!
//! 1. The [`TypeRegistry`] is built once and fixes the emission order of named types
//! 2. Messages are classified into member trees up front
//! 3. Each unit is rendered into an owned buffer by its emitter
//! 4. Finished units are handed to a [`CodecSink`]
//!
//! Field accessors share one layout description per field, rendered by an
//! encode strategy and a decode strategy.

mod bitsets;
mod composites;
mod enums;
mod fields;
mod groups;
mod linkage;
mod messages;
mod support;
mod var_data;
mod writer;

use crate::classify::{classify_message, Message};
use crate::error::Result;
use crate::ir::Ir;
use crate::layout::FieldLayout;
use crate::literal::{LiteralRenderer, RustLiterals};
use crate::naming::{codec_module_name, struct_name, type_module_name};
use crate::output::{CodecSink, CodecUnit, UnitKind};
use crate::registry::{TypeKind, TypeRegistry};
use fields::{emit_field, DecodeStrategy, EncodeStrategy, FieldStrategy};
use support::ModuleEntry;
use tracing::debug;
use writer::CodeWriter;

/// How generated units are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLayout {
    /// One file per unit plus a `lib.rs` declaring them
    #[default]
    ModuleFiles,
    /// A single self-contained file with inline modules, suitable for `include!`
    SingleFile,
}

/// Configuration for codec generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Indentation string (default: 4 spaces)
    pub indent_str: String,
    /// Emit doc comments on generated accessors
    pub emit_docs: bool,
    /// Output layout
    pub layout: OutputLayout,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            indent_str: "    ".to_string(),
            emit_docs: true,
            layout: OutputLayout::default(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets whether to emit doc comments
    pub fn emit_docs(mut self, emit: bool) -> Self {
        self.emit_docs = emit;
        self
    }

    /// Sets the output layout
    pub fn layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// One half of a codec pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Encode,
    Decode,
}

impl Side {
    /// Module holding this side's codecs within a unit
    pub(crate) fn module(self) -> &'static str {
        match self {
            Side::Encode => "encoder",
            Side::Decode => "decoder",
        }
    }

    /// Suffix of generated codec names
    pub(crate) fn codec(self) -> &'static str {
        match self {
            Side::Encode => "Encoder",
            Side::Decode => "Decoder",
        }
    }

    /// Trait giving access to the buffer
    pub(crate) fn buffer_trait(self) -> &'static str {
        match self {
            Side::Encode => "Writer",
            Side::Decode => "Reader",
        }
    }

    /// Trait giving access to the limit
    pub(crate) fn cursor_trait(self) -> &'static str {
        match self {
            Side::Encode => "Encoder",
            Side::Decode => "Decoder",
        }
    }
}

/// Shared, read-only state of one generation run
pub(crate) struct Context<'g, 'ir> {
    pub(crate) ir: &'ir Ir,
    pub(crate) config: &'g GeneratorConfig,
    pub(crate) literals: &'g dyn LiteralRenderer,
    pub(crate) registry: &'g TypeRegistry<'ir>,
}

impl<'g> Context<'g, '_> {
    pub(crate) fn writer(&self) -> CodeWriter<'g> {
        CodeWriter::new(self.config)
    }
}

/// Emits the accessors of `fields` for one side
pub(crate) fn emit_fields(
    ctx: &Context<'_, '_>,
    w: &mut CodeWriter<'_>,
    side: Side,
    fields: &[FieldLayout],
) -> Result<()> {
    let encode = EncodeStrategy { literals: ctx.literals };
    let decode = DecodeStrategy { literals: ctx.literals };
    let strategy: &dyn FieldStrategy = match side {
        Side::Encode => &encode,
        Side::Decode => &decode,
    };
    for field in fields {
        emit_field(strategy, w, field)?;
    }
    Ok(())
}

/// Generates codecs for a schema
#[derive(Debug)]
pub struct CodecGenerator<'ir> {
    ir: &'ir Ir,
    registry: TypeRegistry<'ir>,
    messages: Vec<Message<'ir>>,
    config: GeneratorConfig,
}

impl<'ir> CodecGenerator<'ir> {
    /// Creates a generator, building the type registry and classifying every message.
    ///
    /// Structural defects in the IR are reported here, before anything is rendered.
    pub fn new(ir: &'ir Ir) -> Result<Self> {
        let registry = TypeRegistry::build(ir)?;
        let messages = ir
            .messages
            .iter()
            .map(|tokens| classify_message(tokens))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            package = %ir.package_name,
            types = registry.len(),
            messages = messages.len(),
            "prepared generator"
        );
        Ok(Self {
            ir,
            registry,
            messages,
            config: GeneratorConfig::default(),
        })
    }

    /// Creates a new generator with custom config
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns the type registry
    pub fn registry(&self) -> &TypeRegistry<'ir> {
        &self.registry
    }

    /// Renders every unit.
    ///
    /// Named types come first in dependency order, then messages, then the
    /// root. With [`OutputLayout::SingleFile`] the result is a single root
    /// unit named after the schema namespace.
    pub fn units(&self) -> Result<Vec<CodecUnit>> {
        let ctx = Context {
            ir: self.ir,
            config: &self.config,
            literals: &RustLiterals,
            registry: &self.registry,
        };

        let mut units = Vec::new();
        let mut entries = Vec::new();
        for ty in self.registry.ordered() {
            let (module, kind, source) = match ty.kind {
                TypeKind::Enum => (
                    type_module_name(&ty.name),
                    UnitKind::Enum,
                    enums::render_enum(&ctx, ty)?,
                ),
                TypeKind::BitSet => (
                    type_module_name(&ty.name),
                    UnitKind::BitSet,
                    bitsets::render_bit_set(&ctx, ty)?,
                ),
                TypeKind::Composite => (
                    codec_module_name(&ty.name),
                    UnitKind::Composite,
                    composites::render_composite(&ctx, ty)?,
                ),
            };
            debug!(unit = %module, ?kind, bytes = source.len(), "rendered type unit");
            entries.push(ModuleEntry {
                module: module.clone(),
                kind,
                type_name: struct_name(&ty.name),
            });
            units.push(CodecUnit::new(module, kind, source));
        }

        for message in &self.messages {
            let name = &message.token.name;
            let module = codec_module_name(name);
            let source = messages::render_message(&ctx, message)?;
            debug!(unit = %module, bytes = source.len(), "rendered message unit");
            entries.push(ModuleEntry {
                module: module.clone(),
                kind: UnitKind::Message,
                type_name: struct_name(name),
            });
            units.push(CodecUnit::new(module, UnitKind::Message, source));
        }

        match self.config.layout {
            OutputLayout::ModuleFiles => {
                let root = support::render_root(&ctx, &entries, &[])?;
                units.push(CodecUnit::new("lib", UnitKind::Root, root));
                Ok(units)
            }
            OutputLayout::SingleFile => {
                let root = support::render_root(&ctx, &entries, &units)?;
                Ok(vec![CodecUnit::new(self.ir.namespace(), UnitKind::Root, root)])
            }
        }
    }

    /// Renders every unit, then hands them to `sink` in order.
    ///
    /// Nothing reaches the sink unless the whole schema rendered.
    pub fn generate(&self, sink: &mut dyn CodecSink) -> Result<()> {
        let units = self.units()?;
        for unit in &units {
            sink.write_unit(unit)?;
        }
        sink.finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ir::builder::{
        CompositeDef, EncodingDef, EnumDef, FieldDef, GroupDef, MessageDef, SchemaBuilder, SetDef,
        VarDataDef,
    };
    use crate::ir::{PrimitiveType, Signal};
    use crate::output::{MemorySink, StatsSink};

    /// Runs `f` with a default context over `ir`
    pub(crate) fn with_context<T>(
        ir: &Ir,
        f: impl FnOnce(&Context<'_, '_>) -> Result<T>,
    ) -> Result<T> {
        let registry = TypeRegistry::build(ir)?;
        let config = GeneratorConfig::default();
        let ctx = Context {
            ir,
            config: &config,
            literals: &RustLiterals,
            registry: &registry,
        };
        f(&ctx)
    }

    fn schema() -> Ir {
        SchemaBuilder::new("fleet")
            .id(4)
            .version(1)
            .enumeration(EnumDef::new("Color", PrimitiveType::Uint8).value("Red", "1").value("Blue", "2"))
            .set(SetDef::new("Options", PrimitiveType::Uint8).choice("towBar", 0))
            .composite(
                CompositeDef::new("Point")
                    .member("x", PrimitiveType::Int32)
                    .member("y", PrimitiveType::Int32),
            )
            .message(
                MessageDef::new("Truck", 7)
                    .field(FieldDef::new("color", 1, "Color"))
                    .field(FieldDef::new("options", 2, "Options"))
                    .field(FieldDef::new("position", 3, "Point"))
                    .group(GroupDef::new("stops", 4).field(FieldDef::new("at", 5, "Point")))
                    .var_data(VarDataDef::utf8("driver", 6)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_unit_order() {
        let ir = schema();
        let units = CodecGenerator::new(&ir).unwrap().units().unwrap();
        let modules: Vec<&str> = units.iter().map(|u| u.module.as_str()).collect();
        assert_eq!(
            modules,
            vec!["message_header_codec", "color", "options", "point_codec", "truck_codec", "lib"]
        );
        assert_eq!(units.last().unwrap().kind, UnitKind::Root);
        assert!(units[4].source.contains("pub const SBE_TEMPLATE_ID: u16 = 7;"));
    }

    #[test]
    fn test_root_lists_every_unit() {
        let ir = schema();
        let units = CodecGenerator::new(&ir).unwrap().units().unwrap();
        let root = &units.last().unwrap().source;
        for module in ["message_header_codec", "color", "options", "point_codec", "truck_codec"] {
            assert!(root.contains(&format!("pub mod {module};")), "missing {module}");
        }
        assert!(root.contains("pub use truck_codec::{TruckDecoder, TruckEncoder};"));
        assert!(root.contains("pub use color::*;"));
    }

    #[test]
    fn test_single_file_layout() {
        let ir = schema();
        let generator = CodecGenerator::new(&ir)
            .unwrap()
            .with_config(GeneratorConfig::new().layout(OutputLayout::SingleFile).emit_docs(false));
        let units = generator.units().unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].module, "fleet");
        assert!(units[0].source.contains("pub mod truck_codec {\n    use super::*;\n"));
        assert!(!units[0].source.contains("///"));
    }

    /// Every run of `///` lines must be followed by the item it documents
    fn assert_docs_attach(source: &str) {
        let lines: Vec<&str> = source.lines().map(str::trim).collect();
        for (i, pair) in lines.windows(2).enumerate() {
            if pair[0].starts_with("///") && !pair[1].starts_with("///") {
                let next = pair[1];
                assert!(
                    !next.is_empty() && !next.starts_with("//") && !next.starts_with('}'),
                    "doc comment at line {} documents nothing: {next:?}",
                    i + 1
                );
            }
        }
    }

    #[test]
    fn test_documented_output_keeps_docs_on_items() {
        let ir = SchemaBuilder::new("garage")
            .id(2)
            .version(1)
            .enumeration(EnumDef::new("Fuel", PrimitiveType::Char).value("PETROL", "P").value("DIESEL", "D"))
            .composite(
                CompositeDef::new("Engine")
                    .member("capacity", PrimitiveType::Uint16)
                    .member("maxRpm", EncodingDef::new("maxRpm", PrimitiveType::Uint16).constant("9000")),
            )
            .message(
                MessageDef::new("Bay", 1)
                    .field(FieldDef::new("number", 1, PrimitiveType::Uint32))
                    .field(FieldDef::new("engine", 2, "Engine"))
                    .field(FieldDef::new("ceiling", 3, EncodingDef::new("ceiling", PrimitiveType::Uint16).constant("500")))
                    .field(FieldDef::new("fuel", 4, "Fuel").constant_value("Fuel.DIESEL"))
                    .group(
                        GroupDef::new("visits", 5)
                            .field(FieldDef::new("day", 6, PrimitiveType::Uint16))
                            .field(FieldDef::new("hours", 7, PrimitiveType::Uint16).since_version(1))
                            .var_data(VarDataDef::bytes("note", 8)),
                    ),
            )
            .build()
            .unwrap();

        for layout in [OutputLayout::ModuleFiles, OutputLayout::SingleFile] {
            let generator = CodecGenerator::new(&ir)
                .unwrap()
                .with_config(GeneratorConfig::new().layout(layout));
            for unit in generator.units().unwrap() {
                assert_docs_attach(&unit.source);
            }
        }

        let units = CodecGenerator::new(&ir).unwrap().units().unwrap();
        let bay = units.iter().find(|u| u.module == "bay_codec").unwrap();
        assert!(bay.source.contains("/// constant field 'ceiling'"));
        assert!(bay.source.contains("// skipping CONSTANT fuel\n"));
    }

    #[test]
    fn test_generate_into_sinks() {
        let ir = schema();
        let generator = CodecGenerator::new(&ir).unwrap();

        let mut memory = MemorySink::default();
        generator.generate(&mut memory).unwrap();
        assert_eq!(memory.units().len(), 6);
        assert!(memory.get("lib").unwrap().contains("pub const SCHEMA_ID: u16 = 4;"));

        let mut stats = StatsSink::default();
        generator.generate(&mut stats).unwrap();
        assert_eq!(stats.enum_count, 1);
        assert_eq!(stats.bit_set_count, 1);
        assert_eq!(stats.composite_count, 2);
        assert_eq!(stats.message_count, 1);
        assert_eq!(stats.root_count, 1);
    }

    #[test]
    fn test_failed_definition_writes_nothing() {
        let mut ir = SchemaBuilder::new("broken")
            .message(
                MessageDef::new("Bad", 1).field(FieldDef::new(
                    "label",
                    1,
                    EncodingDef::new("label", PrimitiveType::Char)
                        .array(2)
                        .character_encoding("EBCDIC")
                        .constant("ab"),
                )),
            )
            .message(MessageDef::new("Good", 2).field(FieldDef::new("id", 1, PrimitiveType::Uint32)))
            .build()
            .unwrap();
        ir.messages.swap(0, 1);

        let generator = CodecGenerator::new(&ir).unwrap();
        let mut sink = MemorySink::default();
        let err = generator.generate(&mut sink).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCharacterEncoding { .. }));
        assert!(sink.units().is_empty());
    }

    #[test]
    fn test_structural_errors_surface_on_new() {
        let mut ir = schema();
        let message = &mut ir.messages[0];
        let group = message.iter().position(|t| t.signal == Signal::BeginGroup).unwrap();
        message[group + 1].component_token_count = 5;
        let err = CodecGenerator::new(&ir).unwrap_err();
        assert!(err.is_structural());
    }
}
