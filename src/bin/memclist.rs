//! memclist harness
//!
//! Pushes synthetic band lists through memory files and the page queue, the
//! way a banding printer driver would.
//!
//! # Examples
//!
//! ```bash
//! # Four 8 MiB pages, compressed once they pass 2 MB
//! memclist bench --pages 4 --page-mib 8 --threshold 2000000
//!
//! # Show the effective configuration
//! MEMCLIST_MEMFILE__ALGORITHM=zstd memclist config
//! ```

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use memclist::memfile::{CompressionAlgorithm, MemFileStats};
use memclist::{logging, MemFile, PageAction, PageQueue, PageQueueEntry, PageRenderer, Settings};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

/// Paged in-memory band lists and render page queue
#[derive(Parser, Debug)]
#[command(name = "memclist")]
#[command(version = memclist::VERSION)]
#[command(about = "Paged in-memory band lists and render page queue", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML settings file
    #[arg(long, global = true, env = "MEMCLIST_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the settings file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write pages into memory files and render them on a second thread
    Bench(BenchArgs),

    /// Print the effective configuration
    Config,

    /// Show version information
    Version,
}

#[derive(Args, Debug)]
struct BenchArgs {
    /// Number of pages
    #[arg(long, default_value_t = 4)]
    pages: u32,

    /// Band list size per page (MiB)
    #[arg(long, default_value_t = 8)]
    page_mib: usize,

    /// Compression algorithm (none, zlib, zstd)
    #[arg(long)]
    algorithm: Option<String>,

    /// Compression threshold (bytes)
    #[arg(long)]
    threshold: Option<usize>,

    /// Bytes of future writes to reserve memory for
    #[arg(long, default_value_t = 1 << 20)]
    reserve: usize,
}

/// A finished page travelling to the renderer
struct Page {
    number: u32,
    file: MemFile,
    checksum: u64,
}

/// Reads every band list back and checks it
#[derive(Default)]
struct VerifyingRenderer {
    pages: u32,
    bytes: u64,
    mismatches: u32,
}

impl PageRenderer<Page> for VerifyingRenderer {
    fn render(&mut self, entry: &mut PageQueueEntry<Page>) -> memclist::error::Result<()> {
        let Some(page) = entry.page_info_mut() else {
            return Ok(());
        };
        let mut hasher = DefaultHasher::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = page.file.read(&mut buf);
            if n == 0 {
                break;
            }
            hasher.write(&buf[..n]);
            self.bytes += n as u64;
        }
        if let Some(err) = page.file.error() {
            return Err(err.clone());
        }
        if hasher.finish() != page.checksum {
            warn!(page = page.number, "band list checksum mismatch");
            self.mismatches += 1;
        }
        self.pages += 1;
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    if cli.no_color {
        settings.logging.ansi = false;
    }

    match cli.command {
        Commands::Bench(args) => {
            logging::init(&settings.logging)?;
            bench(settings, args)
        }
        Commands::Config => {
            print!("{}", settings.to_toml_string()?);
            Ok(())
        }
        Commands::Version => {
            println!("memclist {}", memclist::VERSION);
            Ok(())
        }
    }
}

fn bench(mut settings: Settings, args: BenchArgs) -> anyhow::Result<()> {
    if let Some(name) = &args.algorithm {
        settings.memfile.algorithm = match name.as_str() {
            "none" => CompressionAlgorithm::None,
            "zlib" => CompressionAlgorithm::Zlib,
            "zstd" => CompressionAlgorithm::Zstd,
            other => bail!("unknown compression algorithm {other:?}"),
        };
    }
    if let Some(threshold) = args.threshold {
        settings.memfile.compression_threshold = threshold;
    }
    settings.memfile.validate()?;

    info!(
        version = memclist::VERSION,
        pages = args.pages,
        page_mib = args.page_mib,
        algorithm = %settings.memfile.algorithm,
        threshold = settings.memfile.compression_threshold,
        "bench starting"
    );

    let queue = Arc::new(PageQueue::<Page>::new(memclist::memfile::HeapAllocator::shared())?);
    let renderer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut renderer = VerifyingRenderer::default();
            let result = queue.serve(&mut renderer);
            (result, renderer)
        })
    };

    let started = Instant::now();
    let page_bytes = args.page_mib * 1024 * 1024;
    for number in 0..args.pages {
        let (file, checksum) = write_page(&settings, number, page_bytes, args.reserve)?;
        log_stats(number, &file.stats());
        queue.add_page(
            PageAction::FullPage,
            Some(Page {
                number,
                file,
                checksum,
            }),
            1,
        )?;
    }
    queue.add_page(PageAction::Terminate, None, 0)?;

    let (result, renderer) = renderer
        .join()
        .map_err(|_| anyhow::anyhow!("renderer thread panicked"))?;
    let rendered = result?;
    let elapsed = started.elapsed();

    info!(
        rendered,
        bytes = renderer.bytes,
        mismatches = renderer.mismatches,
        elapsed_ms = elapsed.as_millis() as u64,
        "bench finished"
    );
    if renderer.mismatches > 0 {
        bail!("{} pages failed verification", renderer.mismatches);
    }
    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "{} pages, {} MiB rendered in {:.2?}",
        renderer.pages,
        renderer.bytes / (1024 * 1024),
        elapsed
    )?;
    Ok(())
}

/// Write one page's synthetic band list; returns the file and its checksum
fn write_page(
    settings: &Settings,
    number: u32,
    page_bytes: usize,
    reserve: usize,
) -> anyhow::Result<(MemFile, u64)> {
    let mut file = MemFile::open("w+", settings.memfile.clone())?;
    file.set_memory_warning(reserve)?;

    let mut hasher = DefaultHasher::new();
    let mut band = 0u32;
    let mut written = 0;
    while written < page_bytes {
        let command = format!(
            "page {number} band {band}: fill_rect 0 {} 4960 {}; copy_mono {:08x}\n",
            band * 8,
            8 + band % 5,
            band.wrapping_mul(2_654_435_761)
        );
        let bytes = &command.as_bytes()[..command.len().min(page_bytes - written)];
        if file.write(bytes) != bytes.len() {
            let code = file.ferror_code();
            bail!("page {number}: write failed with code {code}: {:?}", file.error());
        }
        hasher.write(bytes);
        written += bytes.len();
        band += 1;
    }
    if file.is_low_memory() {
        warn!(page = number, "page written on reserve memory");
    }
    file.rewind(false)?;
    Ok((file, hasher.finish()))
}

fn log_stats(page: u32, stats: &MemFileStats) {
    info!(
        page,
        length = stats.length,
        total_space = stats.total_space,
        logical_blocks = stats.logical_blocks,
        physical_blocks = stats.physical_blocks,
        chain_blocks = stats.chain_blocks,
        compressing = stats.compressing,
        "page written"
    );
}
