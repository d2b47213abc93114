pub mod relocate;
pub mod symbol;
pub mod thread_local_storage;

/// Container format identifier reported for this OS personality.
pub const BINARY_HEADER_NAME: &str = "ELF";
