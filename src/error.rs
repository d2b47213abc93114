use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("read from unmapped address {addr:#x}")]
    Unmapped { addr: u64 },
    #[error("unsupported word size of {0} bytes")]
    WordSize(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("register `{0}` does not exist on this architecture")]
    UnknownRegister(String),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// A syscall could not be routed to an ABI. Fatal to the syscall, not the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyscallError {
    #[error("unknown syscall jumpkind {jumpkind} on {arch}")]
    UnknownTrap { arch: &'static str, jumpkind: String },
    #[error("{arch} declares no syscall ABI")]
    NoAbi { arch: &'static str },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("hook target {addr:#x} is outside every extern and loader-owned region")]
    UnownedHookTarget { addr: u64 },
    #[error("the linux personality has not been configured for this project")]
    NotConfigured,
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Bridging to a live twin process failed. Segment-relative accesses are not
/// trustworthy after this, so it always reaches the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("code injection into the concrete target failed: {0}")]
    Injection(String),
    #[error("reading {len} bytes at {addr:#x} from the concrete target failed: {reason}")]
    Read { addr: u64, len: usize, reason: String },
    #[error("concrete target returned {got} bytes for a {expected}-byte word at {addr:#x}")]
    ShortRead { addr: u64, expected: usize, got: usize },
    #[error("segment synchronization is not defined for {0}")]
    Unsupported(&'static str),
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Syscall(#[from] SyscallError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
