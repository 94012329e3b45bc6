// Constants for the machine

/// Prefix of synthetic names given to computed temporaries
pub const TEMP_PREFIX: &str = "$tmp";

/// Prefix of synthetic names given to dynamically allocated blocks.
/// A variable is on the heap exactly when its name carries this prefix.
pub const HEAP_PREFIX: &str = "$heap";

/// Longest identifier accepted from source text
pub const MAX_IDENTIFIER_LEN: usize = 32;

/// Deepest pointer indirection the one-byte type tag can hold
pub const MAX_INDIRECTION: u8 = 3;

/// Attempts made by the scattered allocator before giving up
pub const SCATTER_ATTEMPTS: usize = 100;

/// Stream descriptors registered on every reset, with their values
pub const STREAM_DESCRIPTORS: [(&str, i128); 3] = [("stdin", 0), ("stdout", 1), ("stderr", 2)];

/// Snapshot name recorded right after a reset
pub const RESET_SNAPSHOT: &str = "<reset>";
