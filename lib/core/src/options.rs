use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_BUFFER_SIZE: u64 = 64 * 1024 * 1024;

/// Options applied when a collection is created or opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOptions {
    /// Reject every mutation with `PermissionDenied`.
    pub read_only: bool,
    /// Storage access mode hint.
    pub enable_mmap: bool,
    /// Bytes of buffered writes held in memory before they reach the log file.
    pub max_buffer_size: u64,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            enable_mmap: true,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

/// Worker parallelism for index builds. 0 lets the engine choose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndexOptions {
    pub concurrency: u32,
}

/// Worker parallelism for optimize. 0 lets the engine choose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeOptions {
    pub concurrency: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub doc_count: u64,
    pub memory_usage: u64,
    pub json_details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_defaults() {
        let options = CollectionOptions::default();
        assert!(!options.read_only);
        assert!(options.enable_mmap);
        assert_eq!(options.max_buffer_size, 64 * 1024 * 1024);
        assert_eq!(CreateIndexOptions::default().concurrency, 0);
        assert_eq!(OptimizeOptions::default().concurrency, 0);
    }
}
