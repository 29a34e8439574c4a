//! Parent links of nested codecs.
//!
//! A nested codec owns its enclosing codec as `parent: Option<P>` for as long
//! as it is in use and forwards buffer and limit access to it. `parent()`
//! hands the enclosing codec back, carrying every limit change made through
//! the nested one. Access after that is a protocol violation and aborts
//! through `parent_missing()`.

use super::writer::CodeWriter;
use super::Side;

/// Emits the buffer and cursor trait impls forwarding to the parent
pub(crate) fn render_link_impls(w: &mut CodeWriter<'_>, codec: &str, side: Side) {
    match side {
        Side::Encode => {
            open_impl(w, "Writer", codec);
            w.writeln("#[inline]");
            w.open("fn get_buf_mut(&mut self) -> &mut WriteBuf<'a>");
            forward(w, "as_mut", "parent.get_buf_mut()");
            w.close();
            w.close();
        }
        Side::Decode => {
            open_impl(w, "Reader", codec);
            w.writeln("#[inline]");
            w.open("fn get_buf(&self) -> &ReadBuf<'a>");
            forward(w, "as_ref", "parent.get_buf()");
            w.close();
            w.blank();
            w.writeln("#[inline]");
            w.open("fn acting_version(&self) -> SchemaVersion");
            forward(w, "as_ref", "parent.acting_version()");
            w.close();
            w.close();
        }
    }
    w.blank();

    open_impl(w, side.cursor_trait(), codec);
    w.writeln("#[inline]");
    w.open("fn get_limit(&self) -> usize");
    forward(w, "as_ref", "parent.get_limit()");
    w.close();
    w.blank();
    w.writeln("#[inline]");
    w.open("fn set_limit(&mut self, limit: usize)");
    forward(w, "as_mut", "parent.set_limit(limit)");
    w.close();
    w.close();
}

fn open_impl(w: &mut CodeWriter<'_>, trait_name: &str, codec: &str) {
    w.writeln(format!("impl<'a, P> {trait_name}<'a> for {codec}<P>"));
    w.writeln("where");
    w.writeln(format!("    P: {trait_name}<'a>,"));
    w.writeln("{");
    w.indent();
}

fn forward(w: &mut CodeWriter<'_>, borrow: &str, call: &str) {
    w.open(format!("match self.parent.{borrow}()"));
    w.writeln(format!("Some(parent) => {call},"));
    w.writeln("None => parent_missing(),");
    w.close();
}

/// Emits a manual `Default` that places no bound on `P`
pub(crate) fn render_default(w: &mut CodeWriter<'_>, codec: &str, fields: &[(&str, &str)]) {
    w.open(format!("impl<P> Default for {codec}<P>"));
    w.writeln("#[inline]");
    w.open("fn default() -> Self");
    w.open("Self");
    w.writeln("parent: None,");
    for (name, value) in fields {
        w.writeln(format!("{name}: {value},"));
    }
    w.close();
    w.close();
    w.close();
}

/// Opens the inherent impl of a nested codec
pub(crate) fn open_inherent(w: &mut CodeWriter<'_>, codec: &str, bound: &str) {
    w.writeln(format!("impl<'a, P> {codec}<P>"));
    w.writeln("where");
    w.writeln(format!("    P: {bound}<'a>,"));
    w.writeln("{");
    w.indent();
}

/// Emits `parent()`, which hands the enclosing codec back
pub(crate) fn render_parent_fn(w: &mut CodeWriter<'_>) {
    w.writeln("#[inline]");
    w.open("pub fn parent(&mut self) -> SbeResult<P>");
    w.writeln("self.parent.take().ok_or(SbeErr::ParentNotSet)");
    w.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::GeneratorConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encoder_links() {
        let config = GeneratorConfig::default();
        let mut w = CodeWriter::new(&config);
        render_link_impls(&mut w, "EngineEncoder", Side::Encode);
        let source = w.finish();
        assert!(source.starts_with(
            "impl<'a, P> Writer<'a> for EngineEncoder<P>\nwhere\n    P: Writer<'a>,\n{\n    #[inline]\n    fn get_buf_mut(&mut self) -> &mut WriteBuf<'a> {\n        match self.parent.as_mut() {\n            Some(parent) => parent.get_buf_mut(),\n            None => parent_missing(),\n        }\n    }\n}\n"
        ));
        assert!(source.contains("impl<'a, P> Encoder<'a> for EngineEncoder<P>\nwhere\n    P: Encoder<'a>,\n{"));
    }

    #[test]
    fn test_decoder_links_forward_acting_version() {
        let config = GeneratorConfig::default();
        let mut w = CodeWriter::new(&config);
        render_link_impls(&mut w, "PartsDecoder", Side::Decode);
        let source = w.finish();
        assert!(source.contains("Some(parent) => parent.acting_version(),"));
        assert!(source.contains("impl<'a, P> Decoder<'a> for PartsDecoder<P>"));
    }

    #[test]
    fn test_default_and_parent() {
        let config = GeneratorConfig::default();
        let mut w = CodeWriter::new(&config);
        render_default(&mut w, "XEncoder", &[("offset", "0")]);
        render_parent_fn(&mut w);
        assert_eq!(
            w.finish(),
            "impl<P> Default for XEncoder<P> {
    #[inline]
    fn default() -> Self {
        Self {
            parent: None,
            offset: 0,
        }
    }
}
#[inline]
pub fn parent(&mut self) -> SbeResult<P> {
    self.parent.take().ok_or(SbeErr::ParentNotSet)
}
"
        );
    }
}
