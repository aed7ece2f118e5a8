//! incrar Binary
//!
//! Writes increments to stdout and inspects increments read from stdin.
//! Logs go to stderr; stdout is the tar transport.

use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use incrar::manifest::{ManifestEntry, TextManifest};
use incrar::page::Crc32Verifier;
use incrar::{Config, DiscardPayload, FileInfo, IncrementArchiver, IncrementDecoder, NewFilePolicy};
use tracing_subscriber::{fmt, EnvFilter};

/// incrar
#[derive(Parser, Debug)]
#[command(name = "incrar")]
#[command(about = "Page-granularity incremental backups over tar")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write an increment of the given data files to stdout
    Create {
        /// Directory holding the per-file sidecars
        #[arg(short, long, default_value = "./incr")]
        incr_dir: PathBuf,

        /// Page size of the data files
        #[arg(short, long, default_value = "4096")]
        page_size: usize,

        /// Fail instead of warning when a file appears mid backup
        #[arg(long)]
        strict_new_files: bool,

        /// Bypass the page cache when reading data files (Linux)
        #[arg(long)]
        direct_io: bool,

        /// Data files to include
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Decode an increment from stdin and log what it contains
    Inspect {
        /// Directory manifest file names resolve against
        #[arg(short, long, default_value = ".")]
        data_dest_dir: PathBuf,

        /// Reject tar headers with a bad checksum
        #[arg(long)]
        verify_header_checksum: bool,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,incrar=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("incrar v{}", incrar::VERSION);

    let result = match args.command {
        Commands::Create {
            incr_dir,
            page_size,
            strict_new_files,
            direct_io,
            files,
        } => {
            let policy = if strict_new_files {
                NewFilePolicy::Fail
            } else {
                NewFilePolicy::Warn
            };
            let config = Config::builder()
                .incr_dir(incr_dir)
                .default_page_size(page_size)
                .new_file_policy(policy)
                .direct_io(direct_io)
                .build();
            create(config, &files)
        }
        Commands::Inspect {
            data_dest_dir,
            verify_header_checksum,
        } => {
            let config = Config::builder()
                .data_dest_dir(data_dest_dir)
                .verify_header_checksum(verify_header_checksum)
                .build();
            inspect(&config)
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn create(config: Config, paths: &[PathBuf]) -> incrar::Result<()> {
    let page_size = config.default_page_size;
    let files = paths
        .iter()
        .map(|path| -> incrar::Result<FileInfo> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    incrar::IncrError::Config(format!("{} has no file name", path.display()))
                })?;
            Ok(FileInfo::new(name, path.clone(), page_size))
        })
        .collect::<incrar::Result<Vec<_>>>()?;

    let archiver = IncrementArchiver::new(config, Crc32Verifier::new())?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = archiver.write_increment(&files, &mut out)?;
    out.flush()?;

    tracing::info!(
        "{} new, {} updated, {} unchanged, {} deleted, {} bytes",
        summary.new_files.len(),
        summary.updated_files.len(),
        summary.unchanged_files.len(),
        summary.deleted_files.len(),
        summary.archive_bytes
    );
    Ok(())
}

fn inspect(config: &Config) -> incrar::Result<()> {
    let stdin = io::stdin();
    let mut decoder =
        IncrementDecoder::new(TextManifest::from_config(config), DiscardPayload).with_config(config);
    let report = decoder.decode(BufReader::new(stdin.lock()))?;

    for entry in &report.entries {
        tracing::info!(
            "entry {} ({:?}): {} bytes, {} blocks",
            entry.name,
            entry.kind,
            entry.size,
            entry.blocks
        );
    }
    for manifest in &report.manifests {
        for option in &manifest.options {
            tracing::info!("option {}", option);
        }
        for entry in manifest.entries() {
            match entry {
                ManifestEntry::New(info) => tracing::info!("new {}", info.filepath().display()),
                ManifestEntry::Updated(info, pages) => {
                    tracing::info!("updated {}: pages {:?}", info.filepath().display(), pages)
                }
                ManifestEntry::Deleted(name) => tracing::info!("deleted {}", name),
            }
        }
    }
    Ok(())
}
