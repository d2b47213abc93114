use smallvec::SmallVec;

use crate::{error::MemoryError, state::ProcessState};

/// Alignment of the first pointer slot, as the kernel leaves it.
pub const TABLE_ALIGN: u64 = 0x10;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Entry {
    /// A pointer slot aimed at NUL-terminated bytes in the string area.
    String(SmallVec<[u8; 32]>),
    Pointer(u64),
}

/// Pointer slots followed by the strings they point at, laid out as one
/// contiguous block ending below a given address.
///
/// ```text
/// start ->  | ptr | ptr | ... | ptr | str\0 | str\0 | ... |  <- end
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: Vec<Entry>,
    string_len: u64,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every argument followed by the argv terminator.
    pub fn append_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        for arg in args {
            self.add_string(arg.as_ref());
        }
        self.add_null();
    }

    /// Adds `key=value` for every variable followed by the envp terminator.
    pub fn append_env<I, K, V>(&mut self, env: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        for (key, value) in env {
            let entry = super::environment_variables::encode_env_entry(key.as_ref(), value.as_ref());
            self.add_string(&entry);
        }
        self.add_null();
    }

    /// Adds a pointer slot to a copy of `bytes` plus a terminating NUL.
    pub fn add_string(&mut self, bytes: &[u8]) {
        let mut owned = SmallVec::with_capacity(bytes.len() + 1);
        owned.extend_from_slice(bytes);
        owned.push(0);
        self.string_len += owned.len() as u64;
        self.entries.push(Entry::String(owned));
    }

    pub fn add_pointer(&mut self, value: u64) {
        self.entries.push(Entry::Pointer(value));
    }

    pub fn add_null(&mut self) {
        self.add_pointer(0);
    }

    pub fn pointer_count(&self) -> usize {
        self.entries.len()
    }

    /// Bytes the table occupies before alignment.
    pub fn size(&self, word_size: usize) -> u64 {
        self.entries.len() as u64 * word_size as u64 + self.string_len
    }

    /// Writes the table so it ends at or below `end_addr` and returns the
    /// address of the first pointer slot. Addresses wrap at the
    /// architecture's pointer width.
    pub fn dump(&self, state: &mut ProcessState, end_addr: u64) -> Result<u64, MemoryError> {
        let word = state.arch.bytes() as u64;
        let mask = state.arch.address_mask();
        let start = end_addr.wrapping_sub(self.size(word as usize)) & !(TABLE_ALIGN - 1) & mask;

        let mut ptr_cursor = start;
        let mut str_cursor = start.wrapping_add(self.entries.len() as u64 * word) & mask;
        for entry in &self.entries {
            match entry {
                Entry::String(bytes) => {
                    state.store_word(ptr_cursor, str_cursor)?;
                    state.store_bytes(str_cursor, bytes);
                    str_cursor = str_cursor.wrapping_add(bytes.len() as u64) & mask;
                }
                Entry::Pointer(value) => state.store_word(ptr_cursor, *value)?,
            }
            ptr_cursor = ptr_cursor.wrapping_add(word) & mask;
        }
        Ok(start)
    }
}
