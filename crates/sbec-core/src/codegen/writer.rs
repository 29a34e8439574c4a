//! Indentation-aware source buffer.

use super::GeneratorConfig;

/// Accumulates generated source one line at a time
#[derive(Debug)]
pub(crate) struct CodeWriter<'c> {
    out: String,
    indent_str: &'c str,
    indent_level: usize,
    emit_docs: bool,
}

impl<'c> CodeWriter<'c> {
    pub(crate) fn new(config: &'c GeneratorConfig) -> Self {
        Self {
            out: String::new(),
            indent_str: &config.indent_str,
            indent_level: 0,
            emit_docs: config.emit_docs,
        }
    }

    pub(crate) fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub(crate) fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Writes one line at the current indentation; empty lines carry no indent
    pub(crate) fn writeln(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if !line.is_empty() {
            for _ in 0..self.indent_level {
                self.out.push_str(self.indent_str);
            }
            self.out.push_str(line);
        }
        self.out.push('\n');
    }

    /// Writes every line of `text`, re-indented to the current level
    pub(crate) fn lines(&mut self, text: &str) {
        for line in text.lines() {
            self.writeln(line);
        }
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Doc comment, one `///` line per line of `text`, dropped when docs are disabled
    pub(crate) fn doc(&mut self, text: impl AsRef<str>) {
        if !self.emit_docs {
            return;
        }
        let text = text.as_ref();
        if text.trim().is_empty() {
            self.writeln("///");
            return;
        }
        for line in text.lines().map(str::trim_end) {
            if line.is_empty() {
                self.writeln("///");
            } else {
                self.writeln(format!("/// {line}"));
            }
        }
    }

    /// Writes `header {` and indents
    pub(crate) fn open(&mut self, header: impl AsRef<str>) {
        self.writeln(format!("{} {{", header.as_ref()));
        self.indent();
    }

    /// Dedents and writes `}`
    pub(crate) fn close(&mut self) {
        self.dedent();
        self.writeln("}");
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_indentation() {
        let config = GeneratorConfig::default();
        let mut w = CodeWriter::new(&config);
        w.open("impl Foo");
        w.doc("Returns one");
        w.open("pub fn one() -> u8");
        w.writeln("1");
        w.close();
        w.blank();
        w.close();
        assert_eq!(
            w.finish(),
            "impl Foo {\n    /// Returns one\n    pub fn one() -> u8 {\n        1\n    }\n\n}\n"
        );
    }

    #[test]
    fn test_docs_can_be_disabled() {
        let config = GeneratorConfig::new().emit_docs(false).indent_str("\t");
        let mut w = CodeWriter::new(&config);
        w.open("mod a");
        w.doc("hidden");
        w.lines("x\n\ny");
        w.close();
        assert_eq!(w.finish(), "mod a {\n\tx\n\n\ty\n}\n");
    }

    #[test]
    fn test_dedent_saturates() {
        let config = GeneratorConfig::default();
        let mut w = CodeWriter::new(&config);
        w.dedent();
        w.writeln("a");
        w.indent();
        w.writeln("b");
        assert_eq!(w.finish(), "a\n    b\n");
    }

    #[test]
    fn test_multi_line_doc() {
        let config = GeneratorConfig::default();
        let mut w = CodeWriter::new(&config);
        w.indent();
        w.doc("Fuel figures\n\nmeasured per cycle  ");
        w.writeln("pub mpg: f32,");
        assert_eq!(
            w.finish(),
            "    /// Fuel figures\n    ///\n    /// measured per cycle\n    pub mpg: f32,\n"
        );
    }
}
