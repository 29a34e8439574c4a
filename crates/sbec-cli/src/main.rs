//! sbec - Generate SBE encoders and decoders for Rust from schema IR
//!
//! This tool reads the JSON token IR of one or more schemas and writes
//! zero-copy codec source for every enum, bit set, composite and message.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use sbec_core::{CodecGenerator, CodecSink, CodecUnit, DirectorySink, GeneratorConfig, Ir, OutputLayout};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Generate SBE encoders and decoders for Rust from schema IR
#[derive(Parser, Debug)]
#[command(name = "sbec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output directory; each schema is written to a subdirectory named after its namespace
    #[arg(short, long, default_value = "generated")]
    output: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write one self-contained file per schema instead of one file per unit
    #[arg(long)]
    single_file: bool,

    /// Omit doc comments on generated accessors
    #[arg(long)]
    no_docs: bool,

    /// Dry run - don't write files, just show what would be generated
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,

    /// Only list the files that would be generated
    #[arg(long)]
    list_only: bool,

    /// Conflict resolution strategy for schemas sharing a namespace with different output
    #[arg(long, value_enum, default_value = "hash-suffix")]
    conflict_strategy: ConflictStrategy,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single IR JSON file
    #[arg(short, long)]
    ir: Option<PathBuf>,

    /// Path to a directory searched recursively for IR JSON files
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Strategy for resolving namespace conflicts
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConflictStrategy {
    /// Append a short content hash: namespace_a1b2c3d4
    HashSuffix,
    /// Skip conflicting schemas (keep first occurrence only)
    SkipConflicts,
}

/// Tracks generated schemas for deduplication
#[derive(Default)]
struct SchemaRegistry {
    /// Maps namespace -> (content_hash, output_dir)
    seen: HashMap<String, Vec<(String, PathBuf)>>,
    /// Statistics
    stats: RegistryStats,
}

#[derive(Default)]
struct RegistryStats {
    schemas: usize,
    duplicates_skipped: usize,
    conflicts_renamed: usize,
    units_written: usize,
}

impl SchemaRegistry {
    fn new() -> Self {
        Self::default()
    }

    /// Short hash over every unit (first 8 chars of blake3)
    fn content_hash(units: &[CodecUnit]) -> String {
        let mut hasher = blake3::Hasher::new();
        for unit in units {
            hasher.update(unit.module.as_bytes());
            hasher.update(&[0]);
            hasher.update(unit.source.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex()[..8].to_string()
    }

    /// Register a schema and return its output directory, or `None` to skip it
    fn register(
        &mut self,
        namespace: &str,
        content_hash: &str,
        output_dir: &Path,
        strategy: ConflictStrategy,
    ) -> Option<PathBuf> {
        self.stats.schemas += 1;

        let variants = self.seen.get(namespace).map(Vec::as_slice).unwrap_or_default();
        if variants.iter().any(|(hash, _)| hash == content_hash) {
            debug!("Skipping duplicate schema: {} (hash: {})", namespace, content_hash);
            self.stats.duplicates_skipped += 1;
            return None;
        }

        let dir = if variants.is_empty() {
            output_dir.join(namespace)
        } else {
            match strategy {
                ConflictStrategy::SkipConflicts => {
                    debug!(
                        "Skipping conflict: {} (different content, hash: {})",
                        namespace, content_hash
                    );
                    self.stats.duplicates_skipped += 1;
                    return None;
                }
                ConflictStrategy::HashSuffix => {
                    let renamed = format!("{}_{}", namespace, content_hash);
                    info!("Conflict resolved: {} -> {} (content differs)", namespace, renamed);
                    self.stats.conflicts_renamed += 1;
                    output_dir.join(renamed)
                }
            }
        };

        self.seen
            .entry(namespace.to_string())
            .or_default()
            .push((content_hash.to_string(), dir.clone()));
        Some(dir)
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} schemas, {} duplicates skipped, {} conflicts renamed, {} files written",
            self.stats.schemas,
            self.stats.duplicates_skipped,
            self.stats.conflicts_renamed,
            self.stats.units_written
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    if let Some(ref ir) = cli.input.ir {
        process_single_file(&cli, ir)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory)
    } else {
        bail!("Either --ir or --directory must be specified")
    }
}

fn generator_config(cli: &Cli) -> GeneratorConfig {
    let layout = if cli.single_file {
        OutputLayout::SingleFile
    } else {
        OutputLayout::ModuleFiles
    };
    GeneratorConfig::new().emit_docs(!cli.no_docs).layout(layout)
}

/// Process a single IR file
fn process_single_file(cli: &Cli, file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let mut registry = SchemaRegistry::new();
    process_ir(cli, file, &mut registry)?;

    if !cli.list_only && !cli.dry_run {
        registry.print_summary();
    }
    Ok(())
}

/// Process a directory of IR files recursively
fn process_directory(cli: &Cli, directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut registry = SchemaRegistry::new();
    let mut processed = 0;
    let mut failed = 0;

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !is_ir_file(path) {
            trace!("Skipping: {}", path.display());
            continue;
        }

        debug!("Processing IR: {}", path.display());
        if let Err(e) = process_ir(cli, path, &mut registry) {
            // Log error but continue with other schemas
            warn!("Error processing {}: {:#}", path.display(), e);
            failed += 1;
        }
        processed += 1;
    }

    info!("Processed {} IR files", processed);

    if !cli.list_only && !cli.dry_run {
        registry.print_summary();
    }
    if failed > 0 {
        bail!("{} of {} IR files failed", failed, processed);
    }
    Ok(())
}

/// Returns true for visible `.json` files
fn is_ir_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false);
    let json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    !hidden && json
}

/// Compile one IR file and write its units
fn process_ir(cli: &Cli, path: &Path, registry: &mut SchemaRegistry) -> Result<()> {
    let ir = Ir::from_path(path).with_context(|| format!("Failed to load IR: {}", path.display()))?;
    let namespace = ir.namespace();

    let units = CodecGenerator::new(&ir)
        .and_then(|generator| generator.with_config(generator_config(cli)).units())
        .with_context(|| format!("Failed to generate codecs for {}", path.display()))?;
    debug!("Generated {} unit(s) for {}", units.len(), namespace);

    if cli.list_only {
        for unit in &units {
            println!("{}/{}", namespace, unit.file_name());
        }
        return Ok(());
    }

    let content_hash = SchemaRegistry::content_hash(&units);
    let Some(dir) = registry.register(&namespace, &content_hash, &cli.output, cli.conflict_strategy) else {
        return Ok(());
    };

    if cli.dry_run {
        for unit in &units {
            println!("Would write: {}", dir.join(unit.file_name()).display());
            if cli.verbose > 0 {
                println!("---");
                println!("{}", unit.source);
                println!("---");
            }
        }
        return Ok(());
    }

    let mut sink = DirectorySink::new(&dir).force(cli.force);
    for unit in &units {
        match sink.write_unit(unit) {
            Ok(()) => {
                println!("Wrote {}", dir.join(unit.file_name()).display());
                registry.stats.units_written += 1;
            }
            Err(e) => {
                error!("Failed to write {}: {}", dir.join(unit.file_name()).display(), e);
                return Err(e).context("Use --force to overwrite existing files");
            }
        }
    }
    sink.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbec_core::ir::builder::{FieldDef, MessageDef, SchemaBuilder};
    use sbec_core::{PrimitiveType, UnitKind};
    use std::fs;
    use tempfile::TempDir;

    fn write_ir(dir: &Path, file: &str, package: &str) -> PathBuf {
        let ir = SchemaBuilder::new(package)
            .id(1)
            .message(MessageDef::new("Ping", 1).field(FieldDef::new("seq", 1, PrimitiveType::Uint32)))
            .build()
            .unwrap();
        let path = dir.join(file);
        fs::write(&path, ir.to_json_pretty().unwrap()).unwrap();
        path
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sbec").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_schema_registry_deduplication() {
        let mut registry = SchemaRegistry::new();
        let temp_dir = TempDir::new().unwrap();

        let units = vec![CodecUnit::new("lib", UnitKind::Root, "pub const A: u8 = 1;")];
        let hash = SchemaRegistry::content_hash(&units);

        let first = registry.register("car", &hash, temp_dir.path(), ConflictStrategy::HashSuffix);
        assert!(first.unwrap().ends_with("car"));

        let second = registry.register("car", &hash, temp_dir.path(), ConflictStrategy::HashSuffix);
        assert!(second.is_none());
        assert_eq!(registry.stats.duplicates_skipped, 1);
    }

    #[test]
    fn test_schema_registry_conflicts() {
        let mut registry = SchemaRegistry::new();
        let temp_dir = TempDir::new().unwrap();

        registry.register("car", "aaaaaaaa", temp_dir.path(), ConflictStrategy::HashSuffix);
        let renamed = registry
            .register("car", "bbbbbbbb", temp_dir.path(), ConflictStrategy::HashSuffix)
            .unwrap();
        assert!(renamed.ends_with("car_bbbbbbbb"));
        assert_eq!(registry.stats.conflicts_renamed, 1);

        let skipped = registry.register("car", "cccccccc", temp_dir.path(), ConflictStrategy::SkipConflicts);
        assert!(skipped.is_none());
    }

    #[test]
    fn test_content_hash() {
        let a = vec![CodecUnit::new("lib", UnitKind::Root, "x")];
        let b = vec![CodecUnit::new("lib", UnitKind::Root, "y")];
        assert_eq!(SchemaRegistry::content_hash(&a), SchemaRegistry::content_hash(&a));
        assert_ne!(SchemaRegistry::content_hash(&a), SchemaRegistry::content_hash(&b));
        assert_eq!(SchemaRegistry::content_hash(&a).len(), 8);
    }

    #[test]
    fn test_is_ir_file() {
        assert!(is_ir_file(Path::new("/tmp/car.json")));
        assert!(is_ir_file(Path::new("/tmp/CAR.JSON")));
        assert!(!is_ir_file(Path::new("/tmp/.hidden.json")));
        assert!(!is_ir_file(Path::new("/tmp/car.xml")));
    }

    #[test]
    fn test_process_ir_writes_units() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let ir_path = write_ir(input.path(), "ping.json", "pinger");
        let out = output.path().to_str().unwrap();
        let cli = cli(&["--ir", ir_path.to_str().unwrap(), "--output", out]);

        let mut registry = SchemaRegistry::new();
        process_ir(&cli, &ir_path, &mut registry).unwrap();

        let dir = output.path().join("pinger");
        assert!(dir.join("lib.rs").is_file());
        assert!(dir.join("ping_codec.rs").is_file());
        assert!(dir.join("message_header_codec.rs").is_file());
        assert_eq!(registry.stats.units_written, 3);

        // A second run without --force refuses to overwrite
        let mut registry = SchemaRegistry::new();
        assert!(process_ir(&cli, &ir_path, &mut registry).is_err());
    }

    #[test]
    fn test_process_directory_single_file() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_ir(input.path(), "a.json", "alpha");
        write_ir(input.path(), "b.json", "beta");
        fs::write(input.path().join("notes.txt"), "not ir").unwrap();

        let cli = cli(&[
            "--directory",
            input.path().to_str().unwrap(),
            "--output",
            output.path().to_str().unwrap(),
            "--single-file",
        ]);
        process_directory(&cli, input.path()).unwrap();

        let alpha = fs::read_to_string(output.path().join("alpha").join("alpha.rs")).unwrap();
        assert!(alpha.contains("pub mod ping_codec {"));
        assert!(output.path().join("beta").join("beta.rs").is_file());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let ir_path = write_ir(input.path(), "ping.json", "dry");
        let cli = cli(&[
            "--ir",
            ir_path.to_str().unwrap(),
            "--output",
            output.path().to_str().unwrap(),
            "--dry-run",
        ]);

        let mut registry = SchemaRegistry::new();
        process_ir(&cli, &ir_path, &mut registry).unwrap();
        assert!(!output.path().join("dry").exists());
    }

    #[test]
    fn test_input_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["sbec"]).is_err());
        assert!(Cli::try_parse_from(["sbec", "--ir", "a.json", "--directory", "d"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
