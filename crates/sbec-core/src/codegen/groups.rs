//! Message and group bodies, and the repeating group codecs.
//!
//! A body is emitted in declaration order: fixed fields, group accessors,
//! then var data. Group codecs are emitted after the codec owning them and
//! recurse into their own bodies, so every nesting level ends up as a flat
//! list of structs in the side module.

use super::linkage::{open_inherent, render_default, render_link_impls, render_parent_fn};
use super::var_data::emit_var_data;
use super::writer::CodeWriter;
use super::{emit_fields, Context, Side};
use crate::classify::{Body, Group};
use crate::error::Result;
use crate::layout::{
    check_block, describe_field, describe_group, describe_var_data, GroupLayout, VersionGate,
};
use tracing::{debug, trace};

/// Drops a gate already implied by the enclosing codec
fn inherit(gate: &mut VersionGate, enclosing: u32) {
    if gate.since() <= enclosing {
        *gate = VersionGate::default();
    }
}

/// `initial_limit` plus a header displacement
fn header_offset(offset: usize) -> String {
    if offset == 0 {
        "initial_limit".to_string()
    } else {
        format!("initial_limit + {offset}")
    }
}

/// Emits the accessors of a message or group body.
///
/// `enclosing` is the version of the owning codec; members introduced no
/// later than it are not gated again.
pub(crate) fn emit_body(
    ctx: &Context<'_, '_>,
    w: &mut CodeWriter<'_>,
    side: Side,
    owner: &str,
    body: &Body<'_>,
    block_length: usize,
    enclosing: u32,
) -> Result<()> {
    let mut fields = Vec::new();
    for field in body.fields() {
        let mut layout = describe_field(field)?;
        inherit(&mut layout.gate, enclosing);
        fields.push(layout);
    }
    check_block(owner, &fields, Some(block_length))?;
    emit_fields(ctx, w, side, &fields)?;

    for group in body.groups() {
        let mut layout = describe_group(group)?;
        inherit(&mut layout.gate, enclosing);
        emit_group_accessor(ctx, w, side, &layout);
    }

    for var_data in body.var_data() {
        let mut layout = describe_var_data(var_data)?;
        inherit(&mut layout.gate, enclosing);
        emit_var_data(ctx, w, side, &layout)?;
    }
    Ok(())
}

/// Emits the codecs of every group in `body`, depth first
pub(crate) fn render_groups(
    ctx: &Context<'_, '_>,
    w: &mut CodeWriter<'_>,
    side: Side,
    body: &Body<'_>,
    enclosing: u32,
) -> Result<()> {
    for group in body.groups() {
        let layout = describe_group(group)?;
        debug!(group = %layout.name, block_length = layout.block_length, ?side, "rendering group codec");
        let inner = enclosing.max(layout.gate.since());
        w.blank();
        match side {
            Side::Encode => render_encoder(ctx, w, group, &layout, inner)?,
            Side::Decode => render_decoder(ctx, w, group, &layout, inner)?,
        }
        render_groups(ctx, w, side, &group.body, inner)?;
    }
    Ok(())
}

/// Emits the accessor that opens a group from its parent codec
fn emit_group_accessor(ctx: &Context<'_, '_>, w: &mut CodeWriter<'_>, side: Side, group: &GroupLayout) {
    trace!(group = %group.name, "group accessor");
    let codec = format!("{}{}", group.struct_name, side.codec());
    w.blank();
    w.doc(format!("group '{}'", group.name));
    w.doc(format!("- blockLength: {}", group.block_length));
    w.doc(format!("- version: {}", group.gate.since()));
    w.writeln("#[inline]");
    match side {
        Side::Encode => {
            let count_ty = ctx.literals.type_name(group.num_in_group_type);
            w.open(format!(
                "pub fn {}_encoder(self, count: {count_ty}) -> {codec}<Self>",
                group.accessor
            ));
            w.writeln(format!("{codec}::default().wrap(self, count)"));
            w.close();
        }
        Side::Decode => {
            w.open(format!("pub fn {}_decoder(self) -> {codec}<Self>", group.accessor));
            if let Some(condition) = group.gate.hidden_condition() {
                w.open(format!("if {condition}"));
                w.writeln(format!("return {codec}::default().wrap_absent(self);"));
                w.close();
                w.blank();
            }
            w.writeln(format!("{codec}::default().wrap(self)"));
            w.close();
        }
    }
}

fn render_encoder(
    ctx: &Context<'_, '_>,
    w: &mut CodeWriter<'_>,
    group: &Group<'_>,
    layout: &GroupLayout,
    inner: u32,
) -> Result<()> {
    let codec = format!("{}Encoder", layout.struct_name);
    let block_ty = ctx.literals.type_name(layout.block_length_type);
    let count_ty = ctx.literals.type_name(layout.num_in_group_type);

    w.doc(format!("Encoder of the '{}' group", layout.name));
    w.writeln("#[derive(Debug)]");
    w.open(format!("pub struct {codec}<P>"));
    w.writeln("parent: Option<P>,");
    w.writeln(format!("count: {count_ty},"));
    w.writeln("index: usize,");
    w.writeln("offset: usize,");
    w.writeln("initial_limit: usize,");
    w.close();
    w.blank();
    render_default(
        w,
        &codec,
        &[
            ("count", "0"),
            ("index", "usize::MAX"),
            ("offset", "usize::MAX"),
            ("initial_limit", "0"),
        ],
    );
    w.blank();
    render_link_impls(w, &codec, Side::Encode);
    w.blank();

    w.open(format!("impl<P> {codec}<P>"));
    w.writeln(format!("pub const BLOCK_LENGTH: {block_ty} = {};", layout.block_length));
    w.writeln(format!("pub const HEADER_SIZE: usize = {};", layout.header_size));
    w.close();
    w.blank();

    open_inherent(w, &codec, "Encoder");
    w.doc("Writes the group header at the parent's limit and moves the limit past it");
    w.writeln("#[inline]");
    w.open(format!("pub fn wrap(mut self, mut parent: P, count: {count_ty}) -> Self"));
    w.writeln("let initial_limit = parent.get_limit();");
    w.writeln("parent.set_limit(initial_limit + Self::HEADER_SIZE);");
    w.writeln(format!(
        "parent.get_buf_mut().put_{block_ty}_at({}, Self::BLOCK_LENGTH);",
        header_offset(layout.block_length_offset)
    ));
    w.writeln(format!(
        "parent.get_buf_mut().put_{count_ty}_at({}, count);",
        header_offset(layout.num_in_group_offset)
    ));
    w.writeln("self.parent = Some(parent);");
    w.writeln("self.count = count;");
    w.writeln("self.index = usize::MAX;");
    w.writeln("self.offset = usize::MAX;");
    w.writeln("self.initial_limit = initial_limit;");
    w.writeln("self");
    w.close();
    w.blank();

    w.writeln("#[inline]");
    w.open(format!("pub fn count(&self) -> {count_ty}"));
    w.writeln("self.count");
    w.close();
    w.blank();

    w.doc("Bytes written for the group so far, header included");
    w.writeln("#[inline]");
    w.open("pub fn encoded_length(&self) -> usize");
    w.writeln("self.get_limit() - self.initial_limit");
    w.close();
    w.blank();

    render_parent_fn(w);
    w.blank();
    render_advance(w, "Self::BLOCK_LENGTH as usize");

    emit_body(ctx, w, Side::Encode, &layout.name, &group.body, layout.block_length, inner)?;
    w.close();
    Ok(())
}

fn render_decoder(
    ctx: &Context<'_, '_>,
    w: &mut CodeWriter<'_>,
    group: &Group<'_>,
    layout: &GroupLayout,
    inner: u32,
) -> Result<()> {
    let codec = format!("{}Decoder", layout.struct_name);
    let block_ty = ctx.literals.type_name(layout.block_length_type);
    let count_ty = ctx.literals.type_name(layout.num_in_group_type);

    w.doc(format!("Decoder of the '{}' group", layout.name));
    w.writeln("#[derive(Debug)]");
    w.open(format!("pub struct {codec}<P>"));
    w.writeln("parent: Option<P>,");
    w.writeln(format!("block_length: {block_ty},"));
    w.writeln(format!("count: {count_ty},"));
    w.writeln("index: usize,");
    w.writeln("offset: usize,");
    w.close();
    w.blank();
    render_default(
        w,
        &codec,
        &[
            ("block_length", "0"),
            ("count", "0"),
            ("index", "usize::MAX"),
            ("offset", "0"),
        ],
    );
    w.blank();
    render_link_impls(w, &codec, Side::Decode);
    w.blank();

    w.open(format!("impl<P> {codec}<P>"));
    w.writeln(format!("pub const HEADER_SIZE: usize = {};", layout.header_size));
    w.close();
    w.blank();

    open_inherent(w, &codec, "Decoder");
    w.doc("Reads the group header at the parent's limit and moves the limit past it");
    w.writeln("#[inline]");
    w.open("pub fn wrap(mut self, mut parent: P) -> Self");
    w.writeln("let initial_limit = parent.get_limit();");
    w.writeln(format!(
        "self.block_length = parent.get_buf().get_{block_ty}_at({});",
        header_offset(layout.block_length_offset)
    ));
    w.writeln(format!(
        "self.count = parent.get_buf().get_{count_ty}_at({});",
        header_offset(layout.num_in_group_offset)
    ));
    w.writeln("parent.set_limit(initial_limit + Self::HEADER_SIZE);");
    w.writeln("self.parent = Some(parent);");
    w.writeln("self.index = usize::MAX;");
    w.writeln("self.offset = 0;");
    w.writeln("self");
    w.close();
    w.blank();

    w.doc("Links a group the acting version does not carry: no header is read");
    w.doc("and iteration yields nothing.");
    w.writeln("#[inline]");
    w.open("pub fn wrap_absent(mut self, parent: P) -> Self");
    w.writeln("self.parent = Some(parent);");
    w.writeln("self.block_length = 0;");
    w.writeln("self.count = 0;");
    w.writeln("self.index = usize::MAX;");
    w.writeln("self.offset = 0;");
    w.writeln("self");
    w.close();
    w.blank();

    w.writeln("#[inline]");
    w.open(format!("pub fn count(&self) -> {count_ty}"));
    w.writeln("self.count");
    w.close();
    w.blank();

    render_parent_fn(w);
    w.blank();
    render_advance(w, "self.block_length as usize");

    emit_body(ctx, w, Side::Decode, &layout.name, &group.body, layout.block_length, inner)?;
    w.close();
    Ok(())
}

/// Emits `advance()`: each element starts at the parent's current limit
fn render_advance(w: &mut CodeWriter<'_>, block_length: &str) {
    w.doc("Moves to the next element and returns its index, or `None` past the last one");
    w.writeln("#[inline]");
    w.open("pub fn advance(&mut self) -> SbeResult<Option<usize>>");
    w.writeln("let index = self.index.wrapping_add(1);");
    w.open("if index >= self.count as usize");
    w.writeln("return Ok(None);");
    w.close();
    w.open("match self.parent.as_mut()");
    w.open("Some(parent) =>");
    w.writeln("self.offset = parent.get_limit();");
    w.writeln(format!("parent.set_limit(self.offset + {block_length});"));
    w.writeln("self.index = index;");
    w.writeln("Ok(Some(index))");
    w.close();
    w.writeln("None => Err(SbeErr::ParentNotSet),");
    w.close();
    w.close();
}
