//! Bit set units.
//!
//! A set is a newtype over its encoding primitive with a getter and a
//! chainable setter per choice, plus a `Debug` listing every choice.

use super::Context;
use crate::error::{Error, Result};
use crate::ir::Signal;
use crate::naming::{function_name, struct_name};
use crate::registry::NamedType;

/// Renders a bit set unit: a primitive newtype with one getter and setter per choice
pub(crate) fn render_bit_set(ctx: &Context<'_, '_>, ty: &NamedType<'_>) -> Result<String> {
    let begin = &ty.tokens[0];
    let primitive = begin.require_primitive()?;
    let prim = ctx.literals.type_name(primitive);
    let name = struct_name(&ty.name);
    let width = primitive.size() * 8;

    let mut choices: Vec<(String, u32)> = Vec::new();
    for token in ty.tokens.iter().filter(|t| t.signal == Signal::Choice) {
        let raw = token
            .encoding
            .const_value
            .as_deref()
            .ok_or_else(|| Error::malformed(&token.name, "choice without a bit index"))?;
        let bit: u32 = raw
            .trim()
            .parse()
            .ok()
            .filter(|&bit| (bit as usize) < width)
            .ok_or_else(|| Error::invalid_literal(primitive.name(), raw))?;
        choices.push((function_name(&token.name), bit));
    }

    let mut w = ctx.writer();
    match &begin.description {
        Some(description) => w.doc(description),
        None => w.doc(format!("`{}` choices packed into a `{prim}`", ty.name)),
    }
    w.writeln("#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]");
    w.writeln(format!("pub struct {name}(pub {prim});"));
    w.blank();

    w.open(format!("impl {name}"));
    w.writeln("#[inline]");
    w.open(format!("pub fn new(value: {prim}) -> Self"));
    w.writeln(format!("{name}(value)"));
    w.close();
    w.blank();
    w.writeln("#[inline]");
    w.open("pub fn clear(&mut self) -> &mut Self");
    w.writeln("self.0 = 0;");
    w.writeln("self");
    w.close();

    for (choice, bit) in &choices {
        w.blank();
        w.writeln("#[inline]");
        w.open(format!("pub fn get_{choice}(&self) -> bool"));
        w.writeln(format!("(self.0 & (1 << {bit})) != 0"));
        w.close();
        w.blank();
        w.writeln("#[inline]");
        w.open(format!("pub fn set_{choice}(&mut self, value: bool) -> &mut Self"));
        w.writeln(format!(
            "self.0 = if value {{ self.0 | (1 << {bit}) }} else {{ self.0 & !(1 << {bit}) }};"
        ));
        w.writeln("self");
        w.close();
    }
    w.close();
    w.blank();

    w.open(format!("impl core::fmt::Debug for {name}"));
    w.writeln("#[inline]");
    w.open("fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result");
    let pattern = choices
        .iter()
        .map(|(choice, bit)| format!("{choice}({bit})={{}}"))
        .collect::<Vec<_>>()
        .join(", ");
    let args: String = choices
        .iter()
        .map(|(choice, _)| format!(", self.get_{choice}()"))
        .collect();
    w.writeln(format!("write!(fmt, \"{name}[{pattern}]\"{args})"));
    w.close();
    w.close();

    Ok(w.finish())
}
