//! Path-scheme and encoding limits.
//!
//! Mirrors the role of a path scheme (§6.1 of the design): a small bundle
//! of numeric constraints that ingestion enforces before a path is ever
//! handed to the key codec.

/// Numeric constraints on paths and key parts.
///
/// After construction these are treated as frozen for the lifetime of a
/// store, the same way the key-validation limits are frozen per-store in
/// the teacher's codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of components a path may have.
    pub max_component_count: usize,
    /// Maximum length in bytes of a single path component.
    pub max_component_length: usize,
    /// Maximum total length in bytes of all components combined.
    pub max_path_length: usize,
    /// Maximum length in bytes of a single key part's payload, applied by
    /// the key codec independently of path limits (guards text/byte-string
    /// key parts used outside of paths, e.g. namespace/subspace encodings).
    pub max_key_part_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_component_count: 16,
            max_component_length: 256,
            max_path_length: 2048,
            max_key_part_bytes: 4096,
        }
    }
}

impl Limits {
    /// Relaxed limits used by tests that need large synthetic paths.
    pub fn for_testing() -> Self {
        Limits {
            max_component_count: 64,
            max_component_length: 1024,
            max_path_length: 16 * 1024,
            max_key_part_bytes: 16 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_internally_consistent() {
        let limits = Limits::default();
        assert!(limits.max_component_length <= limits.max_path_length);
    }

    #[test]
    fn for_testing_is_looser_than_default() {
        let default = Limits::default();
        let testing = Limits::for_testing();
        assert!(testing.max_component_count >= default.max_component_count);
        assert!(testing.max_path_length >= default.max_path_length);
    }
}
