//! Working Directory Module
//!
//! Per-request filesystem sandboxes and the per-process application
//! directory that parents them.
//!
//! ```text
//! <app dir>/<request id><random>/
//!   .dirty       present while input is being mutated
//!   file.lock    present while the owning job is alive
//!   input/
//!   output/
//!   tmp/
//! ```

mod application;
mod error;
mod working_directory;

pub use application::{ApplicationDirectory, RecoveryReport};
pub use error::{Result, WorkdirError};
pub use working_directory::{WorkingDirectory, DIRTY_MARKER, LOCK_MARKER};
