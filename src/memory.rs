use memchr::memchr;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    arch::Endianness,
    error::MemoryError,
    page_size::{get_page_offset, get_page_start, PAGE_SIZE},
};

type Page = Box<[u8; PAGE_SIZE as usize]>;

/// Byte-addressable guest memory backed by lazily allocated pages.
///
/// Writes map pages on demand and zero-fill them. Reads from a page that was
/// never written fail with [`MemoryError::Unmapped`], which is how a missing
/// GOT slot or a bogus thread pointer surfaces.
#[derive(Clone, Default)]
pub struct SparseMemory {
    pages: FxHashMap<u64, Page>,
}

impl SparseMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mapped(&self, addr: u64) -> bool {
        self.pages.contains_key(&get_page_start(addr))
    }

    /// Maps `[addr, addr + len)` without touching existing contents.
    pub fn map(&mut self, addr: u64, len: u64) {
        let mut page = get_page_start(addr);
        let end = addr.saturating_add(len);
        while page < end {
            self.pages
                .entry(page)
                .or_insert_with(|| Box::new([0; PAGE_SIZE as usize]));
            page = page.wrapping_add(PAGE_SIZE);
            if page == 0 {
                break;
            }
        }
    }

    pub fn store(&mut self, addr: u64, bytes: &[u8]) {
        let mut cursor = addr;
        let mut rest = bytes;
        while !rest.is_empty() {
            let offset = get_page_offset(cursor);
            let chunk = rest.len().min(PAGE_SIZE as usize - offset);
            let page = self
                .pages
                .entry(get_page_start(cursor))
                .or_insert_with(|| Box::new([0; PAGE_SIZE as usize]));
            page[offset..offset + chunk].copy_from_slice(&rest[..chunk]);
            rest = &rest[chunk..];
            cursor = cursor.wrapping_add(chunk as u64);
        }
    }

    pub fn fill(&mut self, addr: u64, len: u64, value: u8) {
        // Page-sized chunks keep this cheap for large scratch regions.
        let chunk = [value; PAGE_SIZE as usize];
        let mut cursor = addr;
        let mut remaining = len;
        while remaining != 0 {
            let step = remaining.min(PAGE_SIZE - get_page_offset(cursor) as u64);
            self.store(cursor, &chunk[..step as usize]);
            cursor = cursor.wrapping_add(step);
            remaining -= step;
        }
    }

    pub fn read_into(&self, addr: u64, buf: &mut [u8]) -> Result<(), MemoryError> {
        let mut cursor = addr;
        let mut filled = 0;
        while filled < buf.len() {
            let offset = get_page_offset(cursor);
            let chunk = (buf.len() - filled).min(PAGE_SIZE as usize - offset);
            let page = self
                .pages
                .get(&get_page_start(cursor))
                .ok_or(MemoryError::Unmapped { addr: cursor })?;
            buf[filled..filled + chunk].copy_from_slice(&page[offset..offset + chunk]);
            filled += chunk;
            cursor = cursor.wrapping_add(chunk as u64);
        }
        Ok(())
    }

    pub fn load(&self, addr: u64, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0; len];
        self.read_into(addr, &mut buf)?;
        Ok(buf)
    }

    /// Reads a NUL-terminated string, stopping after `max_len` bytes.
    pub fn load_c_string(&self, addr: u64, max_len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut out = Vec::new();
        let mut cursor = addr;
        while out.len() < max_len {
            let offset = get_page_offset(cursor);
            let page = self
                .pages
                .get(&get_page_start(cursor))
                .ok_or(MemoryError::Unmapped { addr: cursor })?;
            let window = &page[offset..(offset + max_len - out.len()).min(PAGE_SIZE as usize)];
            match memchr(0, window) {
                Some(nul) => {
                    out.extend_from_slice(&window[..nul]);
                    return Ok(out);
                }
                None => out.extend_from_slice(window),
            }
            cursor = cursor.wrapping_add(window.len() as u64);
        }
        Ok(out)
    }

    pub fn pack_word(
        &mut self,
        addr: u64,
        value: u64,
        width: usize,
        endness: Endianness,
    ) -> Result<(), MemoryError> {
        let bytes = encode_word(value, width, endness)?;
        self.store(addr, &bytes);
        Ok(())
    }

    pub fn unpack_word(
        &self,
        addr: u64,
        width: usize,
        endness: Endianness,
    ) -> Result<u64, MemoryError> {
        let mut buf = [0u8; 8];
        let slot = buf
            .get_mut(..width)
            .filter(|_| matches!(width, 1 | 2 | 4 | 8))
            .ok_or(MemoryError::WordSize(width))?;
        self.read_into(addr, slot)?;
        decode_word(slot, endness)
    }
}

pub fn encode_word(
    value: u64,
    width: usize,
    endness: Endianness,
) -> Result<SmallVec<[u8; 8]>, MemoryError> {
    if !matches!(width, 1 | 2 | 4 | 8) {
        return Err(MemoryError::WordSize(width));
    }
    let bytes: SmallVec<[u8; 8]> = match endness {
        Endianness::Little => value.to_le_bytes()[..width].iter().copied().collect(),
        Endianness::Big => value.to_be_bytes()[8 - width..].iter().copied().collect(),
    };
    Ok(bytes)
}

pub fn decode_word(bytes: &[u8], endness: Endianness) -> Result<u64, MemoryError> {
    if !matches!(bytes.len(), 1 | 2 | 4 | 8) {
        return Err(MemoryError::WordSize(bytes.len()));
    }
    let value = bytes.iter().fold(0u64, |acc, &byte| (acc << 8) | byte as u64);
    Ok(match endness {
        Endianness::Big => value,
        Endianness::Little => {
            value.swap_bytes() >> (64 - 8 * bytes.len() as u32)
        }
    })
}
