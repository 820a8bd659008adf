//! # Engine Primitives
//!
//! Hardcoded constants for the statelab engine: identifier prefixes,
//! format headers and input limits.

/// Prefix of engine-allocated state identifiers.
pub const STATE_ID_PREFIX: &str = "state";

/// Prefix of engine-allocated transition identifiers.
pub const TRANSITION_ID_PREFIX: &str = "transition";

/// Prefix of engine-allocated note identifiers.
pub const NOTE_ID_PREFIX: &str = "note";

/// Zero padding of the numeric part of allocated identifiers.
///
/// Padding keeps identifier order equal to creation order, which the
/// auto-parenting tie-break relies on.
pub const ID_PADDING: usize = 6;

/// Identifier of the platform catalogue compiled into the engine.
pub const BUILTIN_PLATFORM: &str = "generic";

/// Magic bytes for the binary snapshot header.
///
/// - File Header = Magic Bytes ("STLB") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"STLB";

/// Current binary snapshot format version.
pub const FORMAT_VERSION: u8 = 1;

/// Format tag written into interchange documents.
pub const INTERCHANGE_FORMAT: &str = "statelab-interchange";

/// Current interchange format version.
pub const INTERCHANGE_VERSION: u32 = 1;

/// Deepest nesting level a state may sit at (roots are level 0).
///
/// Linking, creating and loading all reject documents that would exceed it.
pub const MAX_NESTING_DEPTH: usize = 1024;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of a document text accepted by the loader (64 MB).
pub const MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

/// Maximum size of a clipboard fragment accepted by paste (4 MB).
pub const MAX_FRAGMENT_SIZE: usize = 4 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"STLB");
    }

    #[test]
    fn padded_ids_sort_in_creation_order() {
        let a = format!("{STATE_ID_PREFIX}-{:0width$}", 9, width = ID_PADDING);
        let b = format!("{STATE_ID_PREFIX}-{:0width$}", 10, width = ID_PADDING);
        assert!(a < b);
    }
}
