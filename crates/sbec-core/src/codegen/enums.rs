//! Enum units.
//!
//! Each enum becomes a `#[repr]` Rust enum over its encoding primitive, with
//! a `NullVal` variant carrying the null value. Conversions from the raw
//! primitive never fail: unknown values map to `NullVal`.

use super::Context;
use crate::error::{Error, Result};
use crate::ir::{PrimitiveValue, Signal};
use crate::naming::struct_name;
use crate::registry::NamedType;
use tracing::trace;

/// Renders an enum unit with a `NullVal` fallback variant
pub(crate) fn render_enum(ctx: &Context<'_, '_>, ty: &NamedType<'_>) -> Result<String> {
    let begin = &ty.tokens[0];
    let primitive = begin.require_primitive()?;
    let prim = ctx.literals.type_name(primitive);
    let name = struct_name(&ty.name);
    let null = begin.encoding.applicable_null_value(primitive)?;
    let null_literal = ctx.literals.literal(primitive, &null)?;

    let mut variants: Vec<(String, String)> = Vec::new();
    for token in ty.tokens.iter().filter(|t| t.signal == Signal::ValidValue) {
        let raw = token
            .encoding
            .const_value
            .as_deref()
            .ok_or_else(|| Error::malformed(&token.name, "valid value without a literal"))?;
        let value = PrimitiveValue::parse(primitive, raw)?;
        if value == null {
            return Err(Error::invalid_literal(
                primitive.name(),
                format!("{raw} (collides with the null value of '{}')", ty.name),
            ));
        }
        let literal = ctx.literals.literal(primitive, &value)?;
        if variants.iter().any(|(_, l)| *l == literal) {
            return Err(Error::invalid_literal(primitive.name(), format!("{raw} (repeated in '{}')", ty.name)));
        }
        trace!(enum_name = %ty.name, variant = %token.name, %literal, "enum variant");
        variants.push((struct_name(&token.name), literal));
    }
    if variants.is_empty() {
        return Err(Error::EmptyEnum { name: ty.name.clone() });
    }

    let mut w = ctx.writer();
    match &begin.description {
        Some(description) => w.doc(description),
        None => w.doc(format!("`{}` encoded as `{prim}`", ty.name)),
    }
    w.writeln("#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]");
    w.writeln(format!("#[repr({prim})]"));
    w.open(format!("pub enum {name}"));
    for (variant, literal) in &variants {
        w.writeln(format!("{variant} = {literal},"));
    }
    w.writeln(format!("NullVal = {null_literal},"));
    w.close();
    w.blank();

    w.open(format!("impl Default for {name}"));
    w.writeln("#[inline]");
    w.open("fn default() -> Self");
    w.writeln(format!("{name}::NullVal"));
    w.close();
    w.close();
    w.blank();

    w.open(format!("impl From<{prim}> for {name}"));
    w.writeln("#[inline]");
    w.open(format!("fn from(v: {prim}) -> Self"));
    w.open("match v");
    for (variant, literal) in &variants {
        w.writeln(format!("{literal} => Self::{variant},"));
    }
    w.writeln("_ => Self::NullVal,");
    w.close();
    w.close();
    w.close();
    w.blank();

    w.open(format!("impl From<{name}> for {prim}"));
    w.writeln("#[inline]");
    w.open(format!("fn from(v: {name}) -> Self"));
    w.open("match v");
    for (variant, literal) in &variants {
        w.writeln(format!("{name}::{variant} => {literal},"));
    }
    w.writeln(format!("{name}::NullVal => {null_literal},"));
    w.close();
    w.close();
    w.close();

    Ok(w.finish())
}
