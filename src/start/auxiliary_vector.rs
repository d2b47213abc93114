use crate::{arch::Endianness, error::MemoryError, memory::SparseMemory};

pub const AT_NULL: u64 = 0;
pub const AT_PAGE_SIZE: u64 = 6;
pub const AT_RANDOM: u64 = 25;

/// Size of the `AT_RANDOM` payload.
pub const AT_RANDOM_LEN: usize = 16;

/// An item in the auxiliary vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuxiliaryVectorItem {
    pub a_type: u64,
    pub a_val: u64,
}

/// Walks an `AT_NULL` terminated auxiliary vector in emulated memory.
///
/// The vector starts one word after the envp terminator:
///
/// ```text
/// | argc | argv... | null | envp... | null | auxv... | AT_NULL | 0 |
/// ```
pub struct AuxvIter<'a> {
    memory: &'a SparseMemory,
    cursor: u64,
    word_size: usize,
    endness: Endianness,
    done: bool,
}

impl<'a> AuxvIter<'a> {
    pub fn new(memory: &'a SparseMemory, auxv: u64, word_size: usize, endness: Endianness) -> Self {
        Self {
            memory,
            cursor: auxv,
            word_size,
            endness,
            done: false,
        }
    }

    fn read_item(&self) -> Result<AuxiliaryVectorItem, MemoryError> {
        let a_type = self
            .memory
            .unpack_word(self.cursor, self.word_size, self.endness)?;
        let a_val = self.memory.unpack_word(
            self.cursor + self.word_size as u64,
            self.word_size,
            self.endness,
        )?;
        Ok(AuxiliaryVectorItem { a_type, a_val })
    }
}

impl Iterator for AuxvIter<'_> {
    type Item = Result<AuxiliaryVectorItem, MemoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_item() {
            Ok(item) if item.a_type == AT_NULL => {
                self.done = true;
                None
            }
            Ok(item) => {
                self.cursor += 2 * self.word_size as u64;
                Some(Ok(item))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
