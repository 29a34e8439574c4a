//! Root unit: buffers, codec traits, schema constants and module wiring.

use super::writer::CodeWriter;
use super::{Context, OutputLayout};
use crate::error::Result;
use crate::ir::{ByteOrder, PrimitiveType};
use crate::output::{CodecUnit, UnitKind};

/// A unit listed in the root, with the name its exports derive from
#[derive(Debug, Clone)]
pub(crate) struct ModuleEntry {
    pub(crate) module: String,
    pub(crate) kind: UnitKind,
    pub(crate) type_name: String,
}

impl ModuleEntry {
    fn export(&self) -> Option<String> {
        let module = &self.module;
        let name = &self.type_name;
        match self.kind {
            UnitKind::Enum | UnitKind::BitSet => Some(format!("pub use {module}::*;")),
            UnitKind::Composite => Some(format!(
                "pub use {module}::{{{name}, {name}Decoder, {name}Encoder}};"
            )),
            UnitKind::Message => Some(format!("pub use {module}::{{{name}Decoder, {name}Encoder}};")),
            UnitKind::Root => None,
        }
    }
}

const MODULE_ATTRIBUTES: &str = "\
#![forbid(unsafe_code)]
#![allow(clippy::all)]
#![allow(non_camel_case_types)]";

const ERROR_IMPLS: &str = "\
impl core::fmt::Display for SbeErr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SbeErr::ParentNotSet => f.write_str(\"parent not set\"),
            SbeErr::VarDataTooLong { length, max } => {
                write!(f, \"var data of {length} bytes exceeds the length prefix maximum of {max}\")
            }
        }
    }
}

impl std::error::Error for SbeErr {}

pub type SbeResult<T> = core::result::Result<T, SbeErr>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}";

const PARENT_MISSING: &str = "\
#[cold]
#[track_caller]
pub fn parent_missing() -> ! {
    panic!(\"{}\", SbeErr::ParentNotSet)
}";

/// Emits `SbeErr` with its impls, `Either` and the parent-missing panic
fn render_errors(w: &mut CodeWriter<'_>) {
    w.doc("Failures reported by generated codecs");
    w.writeln("#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]");
    w.open("pub enum SbeErr");
    w.doc("A codec was used after its enclosing codec was taken back");
    w.writeln("ParentNotSet,");
    w.doc("A var data payload is longer than its length prefix can express");
    w.writeln("VarDataTooLong { length: usize, max: usize },");
    w.close();
    w.blank();
    w.lines(ERROR_IMPLS);
    w.blank();
    w.doc("Aborts on access through a codec whose parent link is gone");
    w.lines(PARENT_MISSING);
}

const TRAITS: &str = "\
pub trait Writer<'a>: Sized {
    fn get_buf_mut(&mut self) -> &mut WriteBuf<'a>;
}

pub trait Encoder<'a>: Writer<'a> {
    fn get_limit(&self) -> usize;
    fn set_limit(&mut self, limit: usize);
}

pub trait Reader<'a>: Sized {
    fn get_buf(&self) -> &ReadBuf<'a>;
    fn acting_version(&self) -> SchemaVersion;
}

pub trait Decoder<'a>: Reader<'a> {
    fn get_limit(&self) -> usize;
    fn set_limit(&mut self, limit: usize);
}";

const READ_BUF_HEAD: &str = "\
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadBuf<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> for ReadBuf<'a> {
    #[inline]
    fn get_buf(&self) -> &ReadBuf<'a> {
        self
    }

    #[inline]
    fn acting_version(&self) -> SchemaVersion {
        SCHEMA_VERSION
    }
}";

const READ_BUF_COMMON: &str = "\
#[inline]
pub fn new(data: &'a [u8]) -> Self {
    Self { data }
}

#[inline]
pub fn len(&self) -> usize {
    self.data.len()
}

#[inline]
pub fn is_empty(&self) -> bool {
    self.data.is_empty()
}

#[inline]
fn get_bytes_at<const N: usize>(slice: &[u8], index: usize) -> [u8; N] {
    let mut bytes = [0_u8; N];
    bytes.copy_from_slice(&slice[index..index + N]);
    bytes
}

#[inline]
pub fn get_u8_at(&self, index: usize) -> u8 {
    self.data[index]
}

#[inline]
pub fn get_slice_at(&self, index: usize, len: usize) -> &'a [u8] {
    let data: &'a [u8] = self.data;
    &data[index..index + len]
}";

const WRITE_BUF_HEAD: &str = "\
#[derive(Debug, Default)]
pub struct WriteBuf<'a> {
    data: &'a mut [u8],
}

impl<'a> Writer<'a> for WriteBuf<'a> {
    #[inline]
    fn get_buf_mut(&mut self) -> &mut WriteBuf<'a> {
        self
    }
}";

const WRITE_BUF_COMMON: &str = "\
#[inline]
pub fn new(data: &'a mut [u8]) -> Self {
    Self { data }
}

#[inline]
fn put_bytes_at<const N: usize>(slice: &mut [u8], index: usize, bytes: [u8; N]) {
    slice[index..index + N].copy_from_slice(&bytes);
}

#[inline]
pub fn put_u8_at(&mut self, index: usize, value: u8) {
    self.data[index] = value;
}

#[inline]
pub fn put_slice_at(&mut self, index: usize, src: &[u8]) -> usize {
    let len = src.len();
    self.data[index..index + len].copy_from_slice(src);
    len
}";

/// Distinct target types of the primitives other than `u8`
fn multi_byte_types(ctx: &Context<'_, '_>) -> Vec<&'static str> {
    let mut types: Vec<&'static str> = Vec::new();
    for primitive in PrimitiveType::ALL {
        let name = ctx.literals.type_name(primitive);
        if name != "u8" && !types.contains(&name) {
            types.push(name);
        }
    }
    types
}

/// Renders the root unit.
///
/// `inline` carries the other units for the single file layout; they are
/// nested as inline modules instead of declared as files.
pub(crate) fn render_root(
    ctx: &Context<'_, '_>,
    entries: &[ModuleEntry],
    inline: &[CodecUnit],
) -> Result<String> {
    let ir = ctx.ir;
    let header = &ir.header_structure;
    let version_ty = ctx.literals.type_name(header.schema_version_type);
    let mut w = ctx.writer();

    match ctx.config.layout {
        OutputLayout::ModuleFiles => {
            w.writeln(format!("//! Codecs for the `{}` schema.", ir.package_name));
            w.lines(MODULE_ATTRIBUTES);
            w.blank();
            for entry in entries {
                w.writeln(format!("pub mod {};", entry.module));
            }
        }
        OutputLayout::SingleFile => {
            w.writeln(format!("// Codecs for the `{}` schema.", ir.package_name));
            for unit in inline {
                w.blank();
                w.open(format!("pub mod {}", unit.module));
                w.lines(&unit.source);
                w.close();
            }
        }
    }

    w.blank();
    for export in entries.iter().filter_map(ModuleEntry::export) {
        w.writeln(export);
    }

    w.blank();
    w.writeln(format!(
        "pub const SCHEMA_ID: {} = {};",
        ctx.literals.type_name(header.schema_id_type),
        ir.id
    ));
    w.writeln(format!("pub const SCHEMA_VERSION: SchemaVersion = {};", ir.version));
    w.writeln(format!(
        "pub const SEMANTIC_VERSION: &str = {};",
        ctx.literals.string(ir.semantic_version.as_deref().unwrap_or(""))
    ));

    w.blank();
    w.writeln(format!("pub type SchemaVersion = {version_ty};"));
    w.blank();
    render_errors(&mut w);
    w.blank();
    w.lines(TRAITS);
    w.blank();
    render_read_buf(ctx, &mut w);
    w.blank();
    render_write_buf(ctx, &mut w);

    Ok(w.finish())
}

fn byte_order_suffix(byte_order: ByteOrder) -> &'static str {
    match byte_order {
        ByteOrder::LittleEndian => "le",
        ByteOrder::BigEndian => "be",
    }
}

fn render_read_buf(ctx: &Context<'_, '_>, w: &mut CodeWriter<'_>) {
    let order = byte_order_suffix(ctx.ir.byte_order);
    w.lines(READ_BUF_HEAD);
    w.blank();
    w.open("impl<'a> ReadBuf<'a>");
    w.lines(READ_BUF_COMMON);
    for ty in multi_byte_types(ctx) {
        w.blank();
        w.writeln("#[inline]");
        w.open(format!("pub fn get_{ty}_at(&self, index: usize) -> {ty}"));
        w.writeln(format!("{ty}::from_{order}_bytes(Self::get_bytes_at(self.data, index))"));
        w.close();
    }
    w.close();
}

fn render_write_buf(ctx: &Context<'_, '_>, w: &mut CodeWriter<'_>) {
    let order = byte_order_suffix(ctx.ir.byte_order);
    w.lines(WRITE_BUF_HEAD);
    w.blank();
    w.open("impl<'a> WriteBuf<'a>");
    w.lines(WRITE_BUF_COMMON);
    for ty in multi_byte_types(ctx) {
        w.blank();
        w.writeln("#[inline]");
        w.open(format!("pub fn put_{ty}_at(&mut self, index: usize, value: {ty})"));
        w.writeln(format!("Self::put_bytes_at(self.data, index, value.to_{order}_bytes());"));
        w.close();
    }
    w.close();
}
