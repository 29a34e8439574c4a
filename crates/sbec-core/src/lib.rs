//! # sbec-core
//!
//! A library for compiling Simple Binary Encoding schema IR into zero-copy
//! Rust encoders and decoders.
//!
//! This crate provides the core functionality for:
//! - Loading the flat token IR of a schema, or building one programmatically
//! - Classifying token ranges into fields, groups and var data
//! - Describing binary layouts and version gates
//! - Emitting codec source for enums, bit sets, composites and messages
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`ir`]: The token IR and its builder
//! - [`classify`]: Token classification into member trees
//! - [`layout`]: Offsets, lengths, sentinels and version gates
//! - [`registry`]: Named types in dependency order
//! - [`codegen`]: Emitters and the [`CodecGenerator`]
//! - [`output`]: Generated units and sinks
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use sbec_core::{CodecGenerator, DirectorySink, Ir};
//!
//! let ir = Ir::from_path("car.json")?;
//! let generator = CodecGenerator::new(&ir)?;
//! generator.generate(&mut DirectorySink::new("generated"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`CodecSink`]: Decide where rendered units go
//! - [`LiteralRenderer`]: The only place literal syntax is spelled out
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod classify;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod layout;
pub mod literal;
pub mod naming;
pub mod output;
pub mod registry;

// Re-export primary types for convenience
pub use codegen::{CodecGenerator, GeneratorConfig, OutputLayout};
pub use error::{Error, Result};
pub use ir::{ByteOrder, Ir, PrimitiveType, Signal, Token};
pub use literal::{LiteralRenderer, RustLiterals};
pub use output::{CodecSink, CodecUnit, DirectorySink, MemorySink, NullSink, StatsSink, UnitKind};
pub use registry::TypeRegistry;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
