// memclist - paged in-memory band-list files and the render page queue
// Keeps a whole page's command stream in bounded RAM and hands pages to a renderer

#![warn(rust_2018_idioms)]

pub mod config;
pub mod logging;
pub mod memfile;
pub mod pagequeue;

// Re-exports for convenience
pub use config::{MemFileConfig, Settings};
pub use memfile::{MemFile, SeekMode};
pub use pagequeue::{PageAction, PageQueue, PageQueueEntry, PageRenderer};

/// memclist error types
pub mod error {
    use thiserror::Error;

    /// Returned by `ferror_code` when a write only succeeded by spending reserve memory.
    pub const LOW_MEMORY_ADVISORY: i32 = 1;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        /// Allocation failed and no reserve memory covered it.
        #[error("VMerror: {0}")]
        VmError(String),

        /// An internal invariant was violated; the operation cannot continue.
        #[error("Fatal: {0}")]
        Fatal(String),

        #[error("Invalid file access: {0}")]
        InvalidFileAccess(String),

        #[error("Range check: position {position} outside 0..={length}")]
        RangeCheck { position: i64, length: u64 },

        #[error("Compression error: {0}")]
        Compression(String),

        #[error("Configuration error: {0}")]
        Config(String),
    }

    impl Error {
        /// Numeric code reported through `MemFile::ferror_code`.
        pub fn code(&self) -> i32 {
            match self {
                Error::VmError(_) => -25,
                Error::Fatal(_) => -100,
                Error::InvalidFileAccess(_) => -7,
                Error::RangeCheck { .. } => -15,
                Error::Compression(_) => -12,
                Error::Config(_) => -13,
            }
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
