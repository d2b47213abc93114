use smallvec::SmallVec;

use crate::{arch::Endianness, error::MemoryError, memory::SparseMemory};

/// Longest string read back from a startup image.
pub const MAX_STRING_LEN: usize = 0x1000;

/// `KEY=VALUE`, the form envp entries take.
pub fn encode_env_entry(key: &[u8], value: &[u8]) -> SmallVec<[u8; 64]> {
    let mut entry = SmallVec::with_capacity(key.len() + value.len() + 1);
    entry.extend_from_slice(key);
    entry.push(b'=');
    entry.extend_from_slice(value);
    entry
}

/// Splits an envp entry on its first `=`. Entries without one have an empty value.
pub fn split_env_entry(entry: &[u8]) -> (&[u8], &[u8]) {
    match memchr::memchr(b'=', entry) {
        Some(split_at) => (&entry[..split_at], &entry[split_at + 1..]),
        None => (entry, &entry[entry.len()..]),
    }
}

/// Reads a NULL-terminated vector of string pointers, as argv and envp are
/// laid out on the initial stack.
pub fn read_pointer_vector(
    memory: &SparseMemory,
    mut addr: u64,
    word_size: usize,
    endness: Endianness,
) -> Result<Vec<Vec<u8>>, MemoryError> {
    let mut strings = Vec::new();
    loop {
        let pointer = memory.unpack_word(addr, word_size, endness)?;
        if pointer == 0 {
            return Ok(strings);
        }
        strings.push(memory.load_c_string(pointer, MAX_STRING_LEN)?);
        addr = addr.wrapping_add(word_size as u64);
    }
}

/// Reads envp back as `(key, value)` pairs.
pub fn environment_variables(
    memory: &SparseMemory,
    envp: u64,
    word_size: usize,
    endness: Endianness,
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, MemoryError> {
    Ok(read_pointer_vector(memory, envp, word_size, endness)?
        .iter()
        .map(|entry| {
            let (key, value) = split_env_entry(entry);
            (key.to_vec(), value.to_vec())
        })
        .collect())
}
