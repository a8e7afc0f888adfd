//! DITA PDF Server Library
//!
//! Turns an uploaded ZIP of DITA sources into PDFs by driving an external
//! DITA toolkit, one isolated working directory per request.
//!
//! # Modules
//!
//! - `archive`: ZIP extraction and packing
//! - `manifest`: `manifest.xml` parsing and the processability check
//! - `workdir`: per-request sandboxes and the application directory
//! - `render`: renderer command line and process driver
//! - `job`: the per-request pipeline and its entry point
//! - `routes`: HTTP surface

pub mod archive;
pub mod config;
pub mod job;
pub mod manifest;
pub mod render;
pub mod routes;
pub mod state;
pub mod workdir;
