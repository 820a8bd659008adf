//! # statelab
//!
//! Command-line front end for the statelab document engine: loads and
//! saves documents, runs intent scripts, converts between formats and
//! lists platform catalogues.
//!
//! All editing semantics live in `statelab-core`; this crate only adds
//! file I/O, configuration and presentation.

pub mod cli;
pub mod config;
