//! Composite units: a value type plus an encoder and decoder that can be
//! re-based inside any enclosing codec.

use super::linkage::{open_inherent, render_default, render_link_impls, render_parent_fn};
use super::writer::CodeWriter;
use super::{emit_fields, Context, Side};
use crate::classify::classify_composite;
use crate::error::Result;
use crate::layout::{check_block, describe_field, FieldKind, FieldLayout, VersionGate};
use crate::naming::struct_name;
use crate::registry::NamedType;
use tracing::debug;

/// Describes the members of a composite run.
///
/// Members are gated only when introduced after the composite itself.
pub(crate) fn composite_members(ty: &NamedType<'_>) -> Result<Vec<FieldLayout>> {
    let begin = &ty.tokens[0];
    let body = classify_composite(ty.tokens)?;
    let mut members = Vec::new();
    for field in body.fields() {
        let mut layout = describe_field(field)?;
        if layout.gate.since() <= begin.version {
            layout.gate = VersionGate::default();
        }
        members.push(layout);
    }
    check_block(&ty.name, &members, Some(begin.encoded_length.max(0) as usize))?;
    Ok(members)
}

/// Renders a composite unit
pub(crate) fn render_composite(ctx: &Context<'_, '_>, ty: &NamedType<'_>) -> Result<String> {
    let begin = &ty.tokens[0];
    let name = struct_name(&ty.name);
    let members = composite_members(ty)?;
    debug!(composite = %ty.name, members = members.len(), "rendering composite");

    let mut w = ctx.writer();
    w.writeln("use super::*;");
    w.blank();
    w.writeln(format!(
        "pub const ENCODED_LENGTH: usize = {};",
        begin.encoded_length.max(0)
    ));
    w.blank();
    render_value(ctx, &mut w, &name, begin.description.as_deref(), &members);

    for side in [Side::Encode, Side::Decode] {
        w.blank();
        w.open(format!("pub mod {}", side.module()));
        w.writeln("use super::*;");
        w.blank();
        render_codec(ctx, &mut w, &name, side, &members)?;
        w.close();
    }
    w.blank();
    w.writeln("pub use decoder::*;");
    w.writeln("pub use encoder::*;");
    Ok(w.finish())
}

fn render_codec(
    ctx: &Context<'_, '_>,
    w: &mut CodeWriter<'_>,
    name: &str,
    side: Side,
    members: &[FieldLayout],
) -> Result<()> {
    let codec = format!("{name}{}", side.codec());
    w.writeln("#[derive(Debug)]");
    w.open(format!("pub struct {codec}<P>"));
    w.writeln("parent: Option<P>,");
    w.writeln("offset: usize,");
    w.close();
    w.blank();
    render_default(w, &codec, &[("offset", "0")]);
    w.blank();
    render_link_impls(w, &codec, side);
    w.blank();

    open_inherent(w, &codec, side.buffer_trait());
    w.writeln("#[inline]");
    w.open("pub fn wrap(mut self, parent: P, offset: usize) -> Self");
    w.writeln("self.parent = Some(parent);");
    w.writeln("self.offset = offset;");
    w.writeln("self");
    w.close();
    w.blank();
    render_parent_fn(w);
    w.blank();
    match side {
        Side::Encode => {
            w.doc("Writes every non-constant member of `value`");
            w.writeln("#[inline]");
            w.open(format!("pub fn set_value(&mut self, value: &{name})"));
            w.writeln("let offset = self.offset;");
            w.writeln("value.encode_at(self.get_buf_mut(), offset);");
            w.close();
        }
        Side::Decode => {
            w.doc("Reads every non-constant member into a value");
            w.writeln("#[inline]");
            w.open(format!("pub fn to_value(&self) -> {name}"));
            w.writeln(format!("{name}::decode_at(self.get_buf(), self.offset)"));
            w.close();
        }
    }
    emit_fields(ctx, w, side, members)?;
    w.close();
    Ok(())
}

fn value_offset(base: usize) -> String {
    if base == 0 {
        "offset".to_string()
    } else {
        format!("offset + {base}")
    }
}

fn render_value(
    ctx: &Context<'_, '_>,
    w: &mut CodeWriter<'_>,
    name: &str,
    description: Option<&str>,
    members: &[FieldLayout],
) {
    let stored: Vec<&FieldLayout> = members
        .iter()
        .filter(|m| !matches!(m.kind, FieldKind::Constant(_)))
        .collect();

    w.doc(description.unwrap_or("Plain value of every non-constant member"));
    w.writeln("#[derive(Clone, Copy, Debug, PartialEq)]");
    w.open(format!("pub struct {name}"));
    for member in &stored {
        let ty = match &member.kind {
            FieldKind::Scalar(s) => ctx.literals.type_name(s.primitive).to_string(),
            FieldKind::Array { element, length } => {
                format!("[{}; {length}]", ctx.literals.type_name(element.primitive))
            }
            FieldKind::Enum { type_name, .. }
            | FieldKind::BitSet { type_name, .. }
            | FieldKind::Composite { type_name, .. } => type_name.clone(),
            FieldKind::Constant(_) => continue,
        };
        w.writeln(format!("pub {}: {ty},", member.accessor));
    }
    w.close();
    w.blank();

    let (buf, offset) = if stored.is_empty() {
        ("_buf", "_offset")
    } else {
        ("buf", "offset")
    };

    w.open(format!("impl {name}"));
    w.writeln("#[inline]");
    w.open(format!("pub fn decode_at({buf}: &ReadBuf<'_>, {offset}: usize) -> Self"));
    w.open("Self");
    for member in &stored {
        let at = value_offset(member.offset);
        let expr = match &member.kind {
            FieldKind::Scalar(s) => format!("buf.get_{}_at({at})", ctx.literals.type_name(s.primitive)),
            FieldKind::Array { element, .. } => {
                let prim = ctx.literals.type_name(element.primitive);
                let size = element.primitive.size();
                let step = if size == 1 { "i".to_string() } else { format!("i * {size}") };
                format!("core::array::from_fn(|i| buf.get_{prim}_at({at} + {step}))")
            }
            FieldKind::Enum { type_name, primitive } => format!(
                "{type_name}::from(buf.get_{}_at({at}))",
                ctx.literals.type_name(*primitive)
            ),
            FieldKind::BitSet { type_name, primitive } => format!(
                "{type_name}::new(buf.get_{}_at({at}))",
                ctx.literals.type_name(*primitive)
            ),
            FieldKind::Composite { type_name, .. } => format!("{type_name}::decode_at(buf, {at})"),
            FieldKind::Constant(_) => continue,
        };
        w.writeln(format!("{}: {expr},", member.accessor));
    }
    w.close();
    w.close();
    w.blank();

    w.writeln("#[inline]");
    w.open(format!("pub fn encode_at(&self, {buf}: &mut WriteBuf<'_>, {offset}: usize)"));
    for member in &stored {
        let at = value_offset(member.offset);
        let field = &member.accessor;
        match &member.kind {
            FieldKind::Scalar(s) => {
                let prim = ctx.literals.type_name(s.primitive);
                w.writeln(format!("buf.put_{prim}_at({at}, self.{field});"));
            }
            FieldKind::Array { element, .. } => {
                let prim = ctx.literals.type_name(element.primitive);
                let size = element.primitive.size();
                let step = if size == 1 { "i".to_string() } else { format!("i * {size}") };
                w.open(format!("for (i, v) in self.{field}.iter().enumerate()"));
                w.writeln(format!("buf.put_{prim}_at({at} + {step}, *v);"));
                w.close();
            }
            FieldKind::Enum { primitive, .. } => {
                let prim = ctx.literals.type_name(*primitive);
                w.writeln(format!("buf.put_{prim}_at({at}, {prim}::from(self.{field}));"));
            }
            FieldKind::BitSet { primitive, .. } => {
                let prim = ctx.literals.type_name(*primitive);
                w.writeln(format!("buf.put_{prim}_at({at}, self.{field}.0);"));
            }
            FieldKind::Composite { .. } => {
                w.writeln(format!("self.{field}.encode_at(buf, {at});"));
            }
            FieldKind::Constant(_) => {}
        }
    }
    w.close();
    w.close();
}
