//! tessera - Inspect Protocol Buffer payloads
//!
//! This tool parses encoded protobuf messages without a schema, prints the
//! fields it finds and checks that re-serializing each message reproduces
//! its input byte for byte.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tessera_core::well_known::Empty;
use tessera_core::{Builder, Frozen, Message, ParseConfig, RegistryView, UnknownFieldSet, UnknownValue};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Inspect Protocol Buffer payloads and verify their round-trip
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Maximum nesting depth of groups and messages
    #[arg(long, default_value_t = tessera_core::wire::DEFAULT_RECURSION_LIMIT)]
    recursion_limit: u32,

    /// Maximum payload size in bytes
    #[arg(long, default_value_t = tessera_core::merge::DEFAULT_SIZE_LIMIT)]
    size_limit: usize,

    /// Exit with an error if any payload fails to parse or round-trip
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single encoded message
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of encoded messages
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Output format for inspected payloads
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One line per payload
    Summary,
    /// The decoded field tree
    Fields,
}

/// Outcome of inspecting one payload
#[derive(Debug, Clone, PartialEq, Eq)]
struct Inspection {
    hash: String,
    size: usize,
    fields: usize,
    round_trip: bool,
}

/// Tracks seen payloads for deduplication
#[derive(Default)]
struct PayloadLog {
    /// Maps content hash -> first path it was seen at
    seen: HashMap<String, PathBuf>,
    stats: LogStats,
}

#[derive(Default)]
struct LogStats {
    total_found: usize,
    duplicates_skipped: usize,
    round_trips: usize,
    mismatches: usize,
    failures: usize,
}

impl PayloadLog {
    fn new() -> Self {
        Self::default()
    }

    /// Compute a short hash of the content (first 8 chars of blake3)
    fn content_hash(content: &[u8]) -> String {
        let hash = blake3::hash(content);
        hash.to_hex()[..8].to_string()
    }

    /// Records a payload; returns false if identical content was already seen
    fn register(&mut self, path: &Path, content_hash: &str) -> bool {
        self.stats.total_found += 1;
        if let Some(first) = self.seen.get(content_hash) {
            debug!(
                "Skipping duplicate: {} (same content as {})",
                path.display(),
                first.display()
            );
            self.stats.duplicates_skipped += 1;
            return false;
        }
        self.seen.insert(content_hash.to_string(), path.to_path_buf());
        true
    }

    fn record(&mut self, inspection: &Inspection) {
        if inspection.round_trip {
            self.stats.round_trips += 1;
        } else {
            self.stats.mismatches += 1;
        }
    }

    fn is_clean(&self) -> bool {
        self.stats.mismatches == 0 && self.stats.failures == 0
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} found, {} duplicates skipped, {} round-tripped, {} mismatched, {} failed",
            self.stats.total_found,
            self.stats.duplicates_skipped,
            self.stats.round_trips,
            self.stats.mismatches,
            self.stats.failures
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

    let mut log = PayloadLog::new();
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, file, &mut log)?;
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory, &mut log)?;
    } else {
        bail!("Either --file or --directory must be specified")
    }

    log.print_summary();
    if cli.strict && !log.is_clean() {
        bail!(
            "{} payload(s) failed to parse, {} did not round-trip",
            log.stats.failures,
            log.stats.mismatches
        );
    }
    Ok(())
}

fn parse_config(cli: &Cli) -> ParseConfig {
    ParseConfig::new()
        .recursion_limit(cli.recursion_limit)
        .size_limit(cli.size_limit)
}

/// Process a single payload file
fn process_single_file(cli: &Cli, file: &Path, log: &mut PayloadLog) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    process_payload(cli, file, log)
}

/// Process a directory of payloads recursively
fn process_directory(cli: &Cli, directory: &Path, log: &mut PayloadLog) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut payloads_processed = 0;

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        if !is_likely_payload(path) {
            trace!("Skipping non-payload: {}", path.display());
            continue;
        }

        debug!("Processing payload: {}", path.display());
        if let Err(e) = process_payload(cli, path, log) {
            warn!("Error processing {}: {:#}", path.display(), e);
        }
        payloads_processed += 1;
    }

    info!("Processed {} payloads", payloads_processed);
    Ok(())
}

/// Heuristic to skip files that are obviously not encoded messages
fn is_likely_payload(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let skip_extensions = [
            "txt", "md", "json", "yaml", "yml", "xml", "html", "toml", "ini", "cfg", "conf", "log",
            "csv", "proto", "rs", "sh",
        ];
        if skip_extensions.contains(&ext.to_lowercase().as_str()) {
            return false;
        }
    }
    true
}

/// Parse one payload, print it and record the outcome
fn process_payload(cli: &Cli, path: &Path, log: &mut PayloadLog) -> Result<()> {
    trace!("Reading {}", path.display());
    let data =
        fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let content_hash = PayloadLog::content_hash(&data);
    if !log.register(path, &content_hash) {
        return Ok(());
    }

    let (message, inspection) = match inspect(&data, &parse_config(cli)) {
        Ok(result) => result,
        Err(e) => {
            log.stats.failures += 1;
            return Err(e).with_context(|| format!("Failed to parse payload: {}", path.display()));
        }
    };
    log.record(&inspection);

    let status = if inspection.round_trip { "ok" } else { "MISMATCH" };
    println!(
        "{}: {} field(s), {} bytes, {}, round-trip {}",
        path.display(),
        inspection.fields,
        inspection.size,
        inspection.hash,
        status
    );

    if let OutputFormat::Fields = cli.format {
        let mut tree = String::new();
        render_fields(message.unknown_fields(), 1, cli.recursion_limit, &mut tree)?;
        print!("{}", tree);
    }

    Ok(())
}

/// Parses `data` schema-less and re-encodes it
fn inspect(data: &[u8], config: &ParseConfig) -> Result<(Frozen<Empty>, Inspection)> {
    let mut builder = Builder::<Empty>::new();
    builder.merge_from_slice(data, RegistryView::empty(), config)?;
    let message = builder.build()?;

    let encoded = message.encode_to_vec();
    if encoded.len() != message.encoded_len() {
        bail!(
            "Encoded {} bytes but computed a size of {}",
            encoded.len(),
            message.encoded_len()
        );
    }

    let inspection = Inspection {
        hash: PayloadLog::content_hash(data),
        size: data.len(),
        fields: message.unknown_fields().len(),
        round_trip: encoded == data,
    };
    Ok((message, inspection))
}

/// Writes one line per field, descending into groups
fn render_fields(
    fields: &UnknownFieldSet,
    depth: usize,
    recursion_limit: u32,
    out: &mut String,
) -> Result<()> {
    let indent = "  ".repeat(depth);
    for field in fields.iter() {
        let value = field
            .value_with_limit(recursion_limit)
            .with_context(|| format!("Failed to decode field {}", field.number()))?;
        match value {
            UnknownValue::Varint(v) => writeln!(out, "{}{}: varint {}", indent, field.number(), v)?,
            UnknownValue::Fixed64(v) => {
                writeln!(out, "{}{}: fixed64 {:#018x}", indent, field.number(), v)?
            }
            UnknownValue::Fixed32(v) => {
                writeln!(out, "{}{}: fixed32 {:#010x}", indent, field.number(), v)?
            }
            UnknownValue::LengthDelimited(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) if !text.chars().any(char::is_control) => writeln!(
                    out,
                    "{}{}: bytes[{}] {:?}",
                    indent,
                    field.number(),
                    bytes.len(),
                    text
                )?,
                _ => writeln!(out, "{}{}: bytes[{}]", indent, field.number(), bytes.len())?,
            },
            UnknownValue::Group(group) => {
                writeln!(out, "{}{}: group", indent, field.number())?;
                render_fields(&group, depth + 1, recursion_limit, out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tessera_core::wire::DEFAULT_RECURSION_LIMIT;

    // 1: 150, 2: "hi", 3: group { 1: 7 }, 4: fixed32 1
    const SAMPLE: &[u8] = &[
        0x08, 0x96, 0x01, 0x12, 0x02, b'h', b'i', 0x1B, 0x08, 0x07, 0x1C, 0x25, 0x01, 0x00, 0x00,
        0x00,
    ];

    #[test]
    fn test_inspect_round_trip() {
        let (message, inspection) = inspect(SAMPLE, &ParseConfig::default()).unwrap();
        assert!(inspection.round_trip);
        assert_eq!(inspection.fields, 4);
        assert_eq!(inspection.size, SAMPLE.len());
        assert_eq!(message.encoded_len(), SAMPLE.len());
    }

    #[test]
    fn test_inspect_rejects_truncated_input() {
        assert!(inspect(&SAMPLE[..5], &ParseConfig::default()).is_err());
    }

    #[test]
    fn test_inspect_honors_recursion_limit() {
        let config = ParseConfig::new().recursion_limit(0);
        assert!(inspect(SAMPLE, &config).is_err());
    }

    #[test]
    fn test_render_fields() {
        let (message, _) = inspect(SAMPLE, &ParseConfig::default()).unwrap();
        let mut tree = String::new();
        render_fields(message.unknown_fields(), 0, DEFAULT_RECURSION_LIMIT, &mut tree).unwrap();
        assert_eq!(
            tree,
            "1: varint 150\n2: bytes[2] \"hi\"\n3: group\n  1: varint 7\n4: fixed32 0x00000001\n"
        );
    }

    #[test]
    fn test_render_fields_past_default_depth() {
        let mut data = vec![0x0B; 150];
        data.extend(std::iter::repeat(0x0C).take(150));
        let config = ParseConfig::new().recursion_limit(500);
        let (message, inspection) = inspect(&data, &config).unwrap();
        assert!(inspection.round_trip);

        let mut tree = String::new();
        let shallow = render_fields(message.unknown_fields(), 0, DEFAULT_RECURSION_LIMIT, &mut tree);
        assert!(shallow.is_err());

        tree.clear();
        render_fields(message.unknown_fields(), 0, 500, &mut tree).unwrap();
        assert_eq!(tree.lines().count(), 150);
        assert_eq!(tree.lines().last().map(str::trim), Some("1: group"));
    }

    #[test]
    fn test_payload_log_deduplication() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = PayloadLog::new();
        let hash = PayloadLog::content_hash(SAMPLE);

        assert!(log.register(&temp_dir.path().join("a.bin"), &hash));
        assert!(!log.register(&temp_dir.path().join("b.bin"), &hash));
        assert_eq!(log.stats.duplicates_skipped, 1);
        assert_eq!(log.stats.total_found, 2);
    }

    #[test]
    fn test_content_hash() {
        let hash1 = PayloadLog::content_hash(b"hello");
        let hash2 = PayloadLog::content_hash(b"hello");
        let hash3 = PayloadLog::content_hash(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 8);
    }

    #[test]
    fn test_process_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("one.bin"), SAMPLE).unwrap();
        fs::write(temp_dir.path().join("copy.bin"), SAMPLE).unwrap();
        fs::write(temp_dir.path().join("broken.bin"), &SAMPLE[..5]).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"not a payload").unwrap();
        fs::write(temp_dir.path().join(".hidden"), SAMPLE).unwrap();

        let cli = Cli::parse_from([
            "tessera",
            "--directory",
            temp_dir.path().to_str().unwrap(),
        ]);
        let mut log = PayloadLog::new();
        process_directory(&cli, temp_dir.path(), &mut log).unwrap();

        assert_eq!(log.stats.total_found, 3);
        assert_eq!(log.stats.duplicates_skipped, 1);
        assert_eq!(log.stats.round_trips, 1);
        assert_eq!(log.stats.failures, 1);
        assert!(!log.is_clean());
    }

    #[test]
    fn test_is_likely_payload() {
        assert!(!is_likely_payload(Path::new("/tmp/test.txt")));
        assert!(!is_likely_payload(Path::new("/tmp/test.proto")));
        assert!(is_likely_payload(Path::new("/tmp/test.bin")));
        assert!(is_likely_payload(Path::new("/tmp/payload")));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
