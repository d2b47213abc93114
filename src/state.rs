use rustc_hash::FxHashMap;

use crate::{
    arch::Arch,
    error::{MemoryError, StateError},
    memory::{encode_word, SparseMemory},
    posix::{LibcState, PosixState},
    syscall::JumpKind,
};

/// Register values keyed by the architecture's register names. Registers
/// never written read as zero.
#[derive(Clone, Debug, Default)]
pub struct RegisterFile {
    values: FxHashMap<&'static str, u64>,
}

impl RegisterFile {
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

#[derive(Clone, Debug)]
pub struct History {
    /// How control reached the current block.
    pub jumpkind: JumpKind,
}

impl Default for History {
    fn default() -> Self {
        Self {
            jumpkind: JumpKind::Boring,
        }
    }
}

/// An emulated process: registers, memory and the plugins the startup
/// path fills in.
#[derive(Clone)]
pub struct ProcessState {
    pub arch: Arch,
    pub regs: RegisterFile,
    pub memory: SparseMemory,
    pub posix: PosixState,
    pub libc: LibcState,
    pub history: History,
}

impl ProcessState {
    pub fn new(arch: Arch, memory: SparseMemory) -> Self {
        Self {
            arch,
            regs: RegisterFile::default(),
            memory,
            posix: PosixState::default(),
            libc: LibcState::default(),
            history: History::default(),
        }
    }

    /// Stores `value` truncated to the register's width.
    pub fn store_register(&mut self, name: &str, value: u64) -> Result<(), StateError> {
        let info = self
            .arch
            .register(name)
            .ok_or_else(|| StateError::UnknownRegister(name.to_owned()))?;
        let value = match info.size {
            size if size >= 8 => value,
            size => value & ((1u64 << (size * 8)) - 1),
        };
        self.regs.values.insert(info.name, value);
        Ok(())
    }

    pub fn load_register(&self, name: &str) -> Result<u64, StateError> {
        let info = self
            .arch
            .register(name)
            .ok_or_else(|| StateError::UnknownRegister(name.to_owned()))?;
        Ok(self.regs.get(info.name))
    }

    pub fn sp(&self) -> u64 {
        self.regs.get(self.arch.sp_name())
    }

    pub fn set_sp(&mut self, value: u64) -> Result<(), StateError> {
        self.store_register(self.arch.sp_name(), value)
    }

    pub fn ip(&self) -> u64 {
        self.regs.get(self.arch.ip_name())
    }

    pub fn set_ip(&mut self, value: u64) -> Result<(), StateError> {
        self.store_register(self.arch.ip_name(), value)
    }

    /// Stores a pointer-sized word in the architecture's byte order.
    pub fn store_word(&mut self, addr: u64, value: u64) -> Result<(), MemoryError> {
        let bytes = encode_word(value, self.arch.bytes(), self.arch.endness())?;
        self.store_bytes(addr, &bytes);
        Ok(())
    }

    /// Stores `bytes` at `addr`, wrapping to address zero past the top of
    /// the architecture's address space.
    pub fn store_bytes(&mut self, addr: u64, bytes: &[u8]) {
        let (addr, head) = self.split_at_wrap(addr, bytes.len() as u64);
        let (head, tail) = bytes.split_at(head as usize);
        self.memory.store(addr, head);
        self.memory.store(0, tail);
    }

    /// Fills `len` bytes at `addr` with `value`, wrapping like [`Self::store_bytes`].
    pub fn fill_bytes(&mut self, addr: u64, len: u64, value: u8) {
        let (addr, head) = self.split_at_wrap(addr, len);
        self.memory.fill(addr, head, value);
        self.memory.fill(0, len - head, value);
    }

    /// Masks `addr` and returns how many of `len` bytes fit below the wrap.
    fn split_at_wrap(&self, addr: u64, len: u64) -> (u64, u64) {
        let mask = self.arch.address_mask();
        let addr = addr & mask;
        (addr, len.min((mask - addr).saturating_add(1)))
    }

    pub fn load_word(&self, addr: u64) -> Result<u64, MemoryError> {
        self.memory
            .unpack_word(addr, self.arch.bytes(), self.arch.endness())
    }

    /// Decrements the stack pointer by one word and stores `value` there.
    pub fn stack_push(&mut self, value: u64) -> Result<(), StateError> {
        let sp = self.sp().wrapping_sub(self.arch.bytes() as u64) & self.arch.address_mask();
        self.store_word(sp, value)?;
        self.set_sp(sp)
    }
}
