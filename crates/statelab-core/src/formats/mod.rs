//! # Document Formats
//!
//! - [`plain`]: JSON reflection of the elements, used for save/open.
//! - [`interchange`]: flattened JSON for exchange, import and clipboard.
//! - [`persistence`]: binary snapshot (header + postcard) for autosave.
//!
//! All formats are pure transformations. File I/O lives in the app layer.

pub mod interchange;
pub mod persistence;
pub mod plain;
