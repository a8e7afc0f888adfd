//! Archive Codec
//!
//! Moves documentation sources between ZIP payloads and directory trees:
//! - `unzip`: uploaded bytes into a job's input directory, with path
//!   containment and symlink rejection
//! - `zip`: a directory of rendered PDFs into a single archive placed inside
//!   that same directory
//!
//! Both operations are blocking. Async callers run them through
//! `tokio::task::spawn_blocking`.

mod codec;
mod error;

pub use codec::{unzip, zip, ZIP_EXTENSION};
pub use error::{ArchiveError, Result};
