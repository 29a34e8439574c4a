//! Length-prefixed var data accessors.
//!
//! Var data sits after the fixed block and the groups, so its position is the
//! codec's running limit rather than a fixed offset. Encoders refuse payloads
//! the length prefix cannot describe; decoders of members newer than the
//! acting version return an empty slice.

use super::writer::CodeWriter;
use super::{Context, Side};
use crate::error::Result;
use crate::layout::VarDataLayout;
use crate::literal::TextEncoding;
use tracing::trace;

/// Emits the accessor of a length-prefixed member.
///
/// Both sides start at the current limit and move it past the prefix and
/// the payload.
pub(crate) fn emit_var_data(
    ctx: &Context<'_, '_>,
    w: &mut CodeWriter<'_>,
    side: Side,
    var_data: &VarDataLayout,
) -> Result<()> {
    trace!(var_data = %var_data.name, prefix = var_data.prefix_size(), "var data accessor");
    let prefix_ty = ctx.literals.type_name(var_data.length_type);
    let prefix = var_data.prefix_size();

    w.blank();
    w.doc(format!("var data '{}'", var_data.name));
    if let Some(encoding) = &var_data.character_encoding {
        w.doc(format!("- characterEncoding: {encoding}"));
    }
    w.doc(format!("- lengthPrefix: {prefix_ty}"));
    w.doc(format!("- version: {}", var_data.gate.since()));
    w.writeln("#[inline]");

    match side {
        Side::Encode => {
            let (value_ty, bytes) = match var_data.text {
                Some(TextEncoding::Utf8) => ("&str", "value.as_bytes()"),
                Some(TextEncoding::Ascii) | None => ("&[u8]", "value"),
            };
            w.open(format!(
                "pub fn {}(&mut self, value: {value_ty}) -> SbeResult<()>",
                var_data.accessor
            ));
            w.writeln("let data_length = value.len();");
            w.open(format!("if data_length > {prefix_ty}::MAX as usize"));
            w.writeln(format!(
                "return Err(SbeErr::VarDataTooLong {{ length: data_length, max: {prefix_ty}::MAX as usize }});"
            ));
            w.close();
            w.writeln("let limit = self.get_limit();");
            w.writeln(format!("self.set_limit(limit + {prefix} + data_length);"));
            w.writeln(format!(
                "self.get_buf_mut().put_{prefix_ty}_at(limit, data_length as {prefix_ty});"
            ));
            w.writeln(format!("self.get_buf_mut().put_slice_at(limit + {prefix}, {bytes});"));
            w.writeln("Ok(())");
            w.close();
        }
        Side::Decode => {
            w.open(format!("pub fn {}(&mut self) -> &'a [u8]", var_data.accessor));
            if let Some(condition) = var_data.gate.hidden_condition() {
                w.open(format!("if {condition}"));
                w.writeln("return &[];");
                w.close();
                w.blank();
            }
            w.writeln("let limit = self.get_limit();");
            w.writeln(format!(
                "let data_length = self.get_buf().get_{prefix_ty}_at(limit) as usize;"
            ));
            w.writeln(format!("self.set_limit(limit + {prefix} + data_length);"));
            w.writeln(format!("self.get_buf().get_slice_at(limit + {prefix}, data_length)"));
            w.close();
        }
    }
    Ok(())
}
