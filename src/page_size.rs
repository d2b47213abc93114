/// Granularity of the sparse memory image. Matches the guest page size on
/// every supported architecture.
pub const PAGE_SIZE: u64 = 0x1000;

#[inline(always)]
pub const fn get_page_start(address: u64) -> u64 {
    address & !(PAGE_SIZE - 1)
}

#[inline(always)]
pub const fn get_page_offset(address: u64) -> usize {
    (address & (PAGE_SIZE - 1)) as usize
}

