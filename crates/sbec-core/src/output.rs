//! Generated units and the sinks receiving them.
//!
//! Every unit is fully rendered into an owned string before it reaches a
//! [`CodecSink`]. A sink therefore never observes half of a definition.

use crate::error::{Error, Result};
use crate::naming::is_module_identifier;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Category of a generated unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Buffers, traits, schema constants and module wiring
    Root,
    /// An enum
    Enum,
    /// A bit set
    BitSet,
    /// A composite value type and its codecs
    Composite,
    /// A message and its group codecs
    Message,
}

/// A rendered unit of generated source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecUnit {
    /// Module name, also the file stem
    pub module: String,
    /// Category
    pub kind: UnitKind,
    /// Rendered source
    pub source: String,
}

impl CodecUnit {
    /// Creates a new unit
    pub fn new(module: impl Into<String>, kind: UnitKind, source: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            kind,
            source: source.into(),
        }
    }

    /// File name of the unit
    pub fn file_name(&self) -> String {
        format!("{}.rs", self.module)
    }
}

/// Receives rendered units.
///
/// Implementations decide where units go: memory, disk, or nowhere.
pub trait CodecSink {
    /// Accepts one fully rendered unit
    fn write_unit(&mut self, unit: &CodecUnit) -> Result<()>;

    /// Called once after the last unit of a schema
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl CodecSink for NullSink {
    fn write_unit(&mut self, _unit: &CodecUnit) -> Result<()> {
        Ok(())
    }
}

/// A sink that counts units per kind
#[derive(Debug, Default, Clone)]
pub struct StatsSink {
    /// Number of root units
    pub root_count: usize,
    /// Number of enum units
    pub enum_count: usize,
    /// Number of bit set units
    pub bit_set_count: usize,
    /// Number of composite units
    pub composite_count: usize,
    /// Number of message units
    pub message_count: usize,
    /// Total bytes of generated source
    pub bytes: usize,
}

impl CodecSink for StatsSink {
    fn write_unit(&mut self, unit: &CodecUnit) -> Result<()> {
        match unit.kind {
            UnitKind::Root => self.root_count += 1,
            UnitKind::Enum => self.enum_count += 1,
            UnitKind::BitSet => self.bit_set_count += 1,
            UnitKind::Composite => self.composite_count += 1,
            UnitKind::Message => self.message_count += 1,
        }
        self.bytes += unit.source.len();
        Ok(())
    }
}

/// A sink that keeps units in memory, keyed by module name
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    units: BTreeMap<String, String>,
}

impl MemorySink {
    /// Returns every collected unit
    pub fn units(&self) -> &BTreeMap<String, String> {
        &self.units
    }

    /// Returns the source of one module
    pub fn get(&self, module: &str) -> Option<&str> {
        self.units.get(module).map(String::as_str)
    }

    /// Consumes the sink, returning the collected units
    pub fn into_units(self) -> BTreeMap<String, String> {
        self.units
    }
}

impl CodecSink for MemorySink {
    fn write_unit(&mut self, unit: &CodecUnit) -> Result<()> {
        self.units.insert(unit.module.clone(), unit.source.clone());
        Ok(())
    }
}

/// A sink writing one file per unit into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    force: bool,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Creates a sink writing into `dir`, created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            force: false,
            written: Vec::new(),
        }
    }

    /// Sets whether existing files are overwritten
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl CodecSink for DirectorySink {
    fn write_unit(&mut self, unit: &CodecUnit) -> Result<()> {
        if !is_module_identifier(&unit.module) {
            return Err(Error::path_traversal(&unit.module));
        }

        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| Error::directory_create(&self.dir, e))?;
            debug!(dir = %self.dir.display(), "created output directory");
        }

        let path = self.dir.join(unit.file_name());
        if path.exists() && !self.force {
            return Err(Error::FileExists { path });
        }

        fs::write(&path, &unit.source).map_err(|e| Error::file_write(&path, e))?;
        trace!(path = %path.display(), bytes = unit.source.len(), "wrote unit");
        self.written.push(path);
        Ok(())
    }
}
