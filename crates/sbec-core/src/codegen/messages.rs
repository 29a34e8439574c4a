//! Message units.
//!
//! A message encoder owns the write buffer and the limit of everything
//! written after the fixed block; a message decoder carries the acting block
//! length and version the buffer was written with. Nested codecs reach both
//! through their parent links.

use super::composites::composite_members;
use super::groups::{emit_body, render_groups};
use super::writer::CodeWriter;
use super::{Context, Side};
use crate::classify::Message;
use crate::error::{Error, Result};
use crate::ir::builder::MESSAGE_HEADER;
use crate::layout::FieldKind;
use crate::naming::{codec_module_name, struct_name};
use crate::registry::TypeKind;
use tracing::debug;

/// Returns true if `messageHeader` exists with the four standard members
/// typed as the schema's header structure declares.
fn has_standard_header(ctx: &Context<'_, '_>) -> bool {
    let Some(ty) = ctx.registry.get(MESSAGE_HEADER) else {
        return false;
    };
    if ty.kind != TypeKind::Composite {
        return false;
    }
    let Ok(members) = composite_members(ty) else {
        return false;
    };
    let header = &ctx.ir.header_structure;
    [
        ("blockLength", header.block_length_type),
        ("templateId", header.template_id_type),
        ("schemaId", header.schema_id_type),
        ("version", header.schema_version_type),
    ]
    .iter()
    .all(|(name, primitive)| {
        members.iter().any(|m| {
            m.name == *name
                && !m.gate.is_gated()
                && matches!(&m.kind, FieldKind::Scalar(s) if s.primitive == *primitive && !s.optional)
        })
    })
}

/// Renders a message unit
pub(crate) fn render_message(ctx: &Context<'_, '_>, message: &Message<'_>) -> Result<String> {
    let token = message.token;
    if token.encoded_length < 0 {
        return Err(Error::malformed(&token.name, "message has no block length"));
    }
    let name = struct_name(&token.name);
    let block_length = token.encoded_length as usize;
    let header = &ctx.ir.header_structure;
    let with_header = has_standard_header(ctx);
    debug!(message = %token.name, block_length, with_header, "rendering message");

    let mut w = ctx.writer();
    w.writeln("use super::*;");
    w.blank();
    w.writeln(format!(
        "pub const SBE_BLOCK_LENGTH: {} = {block_length};",
        ctx.literals.type_name(header.block_length_type)
    ));
    w.writeln(format!(
        "pub const SBE_TEMPLATE_ID: {} = {};",
        ctx.literals.type_name(header.template_id_type),
        token.id
    ));
    w.writeln(format!(
        "pub const SBE_SCHEMA_ID: {} = {};",
        ctx.literals.type_name(header.schema_id_type),
        ctx.ir.id
    ));
    w.writeln(format!("pub const SBE_SCHEMA_VERSION: SchemaVersion = {};", ctx.ir.version));
    w.writeln(format!(
        "pub const SBE_SEMANTIC_VERSION: &str = {};",
        ctx.literals.string(ctx.ir.semantic_version.as_deref().unwrap_or(""))
    ));

    for side in [Side::Encode, Side::Decode] {
        w.blank();
        w.open(format!("pub mod {}", side.module()));
        w.writeln("use super::*;");
        w.blank();
        let codec = format!("{name}{}", side.codec());
        if let Some(description) = &token.description {
            w.doc(description);
        }
        match side {
            Side::Encode => render_encoder(&mut w, &codec, with_header),
            Side::Decode => render_decoder(ctx, &mut w, &codec, with_header)?,
        }
        emit_body(ctx, &mut w, side, &token.name, &message.body, block_length, token.version)?;
        w.close();
        render_groups(ctx, &mut w, side, &message.body, token.version)?;
        w.close();
    }

    w.blank();
    w.writeln("pub use decoder::*;");
    w.writeln("pub use encoder::*;");
    Ok(w.finish())
}

/// Emits the encoder struct and trait impls, leaving its inherent impl open
fn render_encoder(w: &mut CodeWriter<'_>, codec: &str, with_header: bool) {
    w.writeln("#[derive(Debug, Default)]");
    w.open(format!("pub struct {codec}<'a>"));
    w.writeln("buf: WriteBuf<'a>,");
    w.writeln("offset: usize,");
    w.writeln("limit: usize,");
    w.close();
    w.blank();

    w.open(format!("impl<'a> Writer<'a> for {codec}<'a>"));
    w.writeln("#[inline]");
    w.open("fn get_buf_mut(&mut self) -> &mut WriteBuf<'a>");
    w.writeln("&mut self.buf");
    w.close();
    w.close();
    w.blank();
    render_limit_impl(w, codec, "Encoder");
    w.blank();

    w.open(format!("impl<'a> {codec}<'a>"));
    w.doc("Wraps `buf` with the block starting at `offset`");
    w.writeln("#[inline]");
    w.open("pub fn wrap(mut self, buf: WriteBuf<'a>, offset: usize) -> Self");
    w.writeln("let limit = offset + SBE_BLOCK_LENGTH as usize;");
    w.writeln("self.buf = buf;");
    w.writeln("self.offset = offset;");
    w.writeln("self.limit = limit;");
    w.writeln("self");
    w.close();
    w.blank();
    render_encoded_length(w);

    if with_header {
        let header = struct_name(MESSAGE_HEADER);
        w.blank();
        w.doc("Wraps a message header at `offset` and fills it in for this message");
        w.writeln("#[inline]");
        w.open(format!("pub fn header(self, offset: usize) -> {header}Encoder<Self>"));
        w.writeln(format!("let mut header = {header}Encoder::default().wrap(self, offset);"));
        w.writeln("header.block_length(SBE_BLOCK_LENGTH);");
        w.writeln("header.template_id(SBE_TEMPLATE_ID);");
        w.writeln("header.schema_id(SBE_SCHEMA_ID);");
        w.writeln("header.version(SBE_SCHEMA_VERSION);");
        w.writeln("header");
        w.close();
    }
}

/// Emits the decoder struct and trait impls, leaving its inherent impl open
fn render_decoder(
    ctx: &Context<'_, '_>,
    w: &mut CodeWriter<'_>,
    codec: &str,
    with_header: bool,
) -> Result<()> {
    let block_ty = ctx.literals.type_name(ctx.ir.header_structure.block_length_type);

    w.writeln("#[derive(Clone, Copy, Debug, Default)]");
    w.open(format!("pub struct {codec}<'a>"));
    w.writeln("buf: ReadBuf<'a>,");
    w.writeln("offset: usize,");
    w.writeln("limit: usize,");
    w.writeln(format!("pub acting_block_length: {block_ty},"));
    w.writeln("pub acting_version: SchemaVersion,");
    w.close();
    w.blank();

    w.open(format!("impl<'a> Reader<'a> for {codec}<'a>"));
    w.writeln("#[inline]");
    w.open("fn get_buf(&self) -> &ReadBuf<'a>");
    w.writeln("&self.buf");
    w.close();
    w.blank();
    w.writeln("#[inline]");
    w.open("fn acting_version(&self) -> SchemaVersion");
    w.writeln("self.acting_version");
    w.close();
    w.close();
    w.blank();
    render_limit_impl(w, codec, "Decoder");
    w.blank();

    w.open(format!("impl<'a> {codec}<'a>"));
    w.doc("Wraps `buf` with the block starting at `offset`, as written by a");
    w.doc("producer at `acting_version` with `acting_block_length` bytes per block");
    w.writeln("#[inline]");
    w.open(format!(
        "pub fn wrap(mut self, buf: ReadBuf<'a>, offset: usize, acting_block_length: {block_ty}, acting_version: SchemaVersion) -> Self"
    ));
    w.writeln("let limit = offset + acting_block_length as usize;");
    w.writeln("self.buf = buf;");
    w.writeln("self.offset = offset;");
    w.writeln("self.limit = limit;");
    w.writeln("self.acting_block_length = acting_block_length;");
    w.writeln("self.acting_version = acting_version;");
    w.writeln("self");
    w.close();
    w.blank();
    render_encoded_length(w);

    if with_header {
        let header = struct_name(MESSAGE_HEADER);
        let module = codec_module_name(MESSAGE_HEADER);
        w.blank();
        w.doc("Wraps the message following a header decoded at `offset`");
        w.writeln("#[inline]");
        w.open(format!(
            "pub fn header(self, mut header: {header}Decoder<ReadBuf<'a>>, offset: usize) -> SbeResult<Self>"
        ));
        w.writeln("debug_assert_eq!(SBE_TEMPLATE_ID, header.template_id());");
        w.writeln("let acting_block_length = header.block_length();");
        w.writeln("let acting_version = header.version();");
        w.blank();
        w.writeln("Ok(self.wrap(");
        w.indent();
        w.writeln("header.parent()?,");
        w.writeln(format!("offset + {module}::ENCODED_LENGTH,"));
        w.writeln("acting_block_length,");
        w.writeln("acting_version,");
        w.dedent();
        w.writeln("))");
        w.close();
    }
    Ok(())
}

fn render_limit_impl(w: &mut CodeWriter<'_>, codec: &str, trait_name: &str) {
    w.open(format!("impl<'a> {trait_name}<'a> for {codec}<'a>"));
    w.writeln("#[inline]");
    w.open("fn get_limit(&self) -> usize");
    w.writeln("self.limit");
    w.close();
    w.blank();
    w.writeln("#[inline]");
    w.open("fn set_limit(&mut self, limit: usize)");
    w.writeln("self.limit = limit;");
    w.close();
    w.close();
}

fn render_encoded_length(w: &mut CodeWriter<'_>) {
    w.doc("Bytes from the start of the block to the current limit");
    w.writeln("#[inline]");
    w.open("pub fn encoded_length(&self) -> usize");
    w.writeln("self.limit - self.offset");
    w.close();
}
