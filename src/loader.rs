use rustc_hash::FxHashMap;
use smartstring::alias::String as SmartString;

use crate::{
    arch::{Arch, Endianness},
    elf::thread_local_storage::TlsDescriptor,
    error::MemoryError,
    memory::SparseMemory,
    shared_object::SharedObject,
};

/// The binary loader and its memory image, as seen by the OS personality.
///
/// Implementations own symbol resolution, relocation and the layout of the
/// address space. This layer only reads that state and carves synthetic
/// addresses out of the extern region.
pub trait Loader {
    /// Reserves `size` bytes in the extern region. Allocations are monotonic
    /// and never overlap.
    fn allocate_extern(&mut self, size: u64) -> u64;

    /// Stable extern address standing in for an unresolved function symbol.
    fn pseudo_addr(&mut self, name: &str) -> u64;

    /// Whether `addr` lies in the extern region or in a loaded object.
    fn owns(&self, addr: u64) -> bool;

    fn pack_word(&mut self, addr: u64, value: u64) -> Result<(), MemoryError>;

    fn unpack_word(&self, addr: u64) -> Result<u64, MemoryError>;

    fn objects(&self) -> &[SharedObject];

    fn main_object(&self) -> &SharedObject;

    /// The dynamic loader (`ld-linux*.so`) object, when one was mapped.
    fn linux_loader_object(&self) -> Option<&SharedObject>;

    fn tls(&self) -> Option<TlsDescriptor>;

    /// Snapshot of the memory image a fresh process state starts from.
    fn memory_image(&self) -> SparseMemory;

    fn find_object(&self, name: &str) -> Option<&SharedObject> {
        self.objects().iter().find(|object| object.name.as_str() == name)
    }
}

/// Bump allocator over the reserved extern region.
#[derive(Clone, Debug)]
pub struct ExternArena {
    base: u64,
    cursor: u64,
    align: u64,
    pseudo: FxHashMap<SmartString, u64>,
}

impl ExternArena {
    pub fn new(base: u64, align: u64) -> Self {
        Self {
            base,
            cursor: base,
            align: align.max(1),
            pseudo: FxHashMap::default(),
        }
    }

    pub fn allocate(&mut self, size: u64) -> u64 {
        let addr = self.cursor;
        let size = size.max(1);
        self.cursor = (addr + size + self.align - 1) / self.align * self.align;
        addr
    }

    pub fn pseudo_addr(&mut self, name: &str) -> u64 {
        if let Some(addr) = self.pseudo.get(name) {
            return *addr;
        }
        let addr = self.allocate(self.align);
        self.pseudo.insert(name.into(), addr);
        addr
    }

    pub fn contains(&self, addr: u64) -> bool {
        (self.base..self.cursor).contains(&addr)
    }
}

/// Default extern region base, well above typical PIE and shared-library mappings.
pub const EXTERN_BASE_64: u64 = 0x50_0000_0000;
pub const EXTERN_BASE_32: u64 = 0x0900_0000;

/// In-memory [`Loader`] for hosts that resolve objects themselves and for tests.
#[derive(Clone)]
pub struct LoadedImage {
    word_size: usize,
    endness: Endianness,
    memory: SparseMemory,
    objects: Vec<SharedObject>,
    main_index: usize,
    ld_index: Option<usize>,
    tls: Option<TlsDescriptor>,
    externs: ExternArena,
}

impl LoadedImage {
    /// `main` becomes the first object.
    pub fn new(arch: &Arch, main: SharedObject) -> Self {
        let extern_base = if arch.bits() == 64 {
            EXTERN_BASE_64
        } else {
            EXTERN_BASE_32
        };
        Self {
            word_size: arch.bytes(),
            endness: arch.endness(),
            memory: SparseMemory::new(),
            objects: vec![main],
            main_index: 0,
            ld_index: None,
            tls: None,
            externs: ExternArena::new(extern_base, arch.bytes() as u64),
        }
    }

    pub fn add_object(&mut self, object: SharedObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn add_linux_loader(&mut self, object: SharedObject) -> usize {
        let index = self.add_object(object);
        self.ld_index = Some(index);
        index
    }

    pub fn set_tls(&mut self, tls: TlsDescriptor) {
        self.tls = Some(tls);
    }

    pub fn main_object_mut(&mut self) -> &mut SharedObject {
        &mut self.objects[self.main_index]
    }

    pub fn memory(&self) -> &SparseMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut SparseMemory {
        &mut self.memory
    }
}

impl Loader for LoadedImage {
    fn allocate_extern(&mut self, size: u64) -> u64 {
        let addr = self.externs.allocate(size);
        self.memory.map(addr, size);
        addr
    }

    fn pseudo_addr(&mut self, name: &str) -> u64 {
        let addr = self.externs.pseudo_addr(name);
        self.memory.map(addr, self.word_size as u64);
        addr
    }

    fn owns(&self, addr: u64) -> bool {
        self.externs.contains(addr) || self.objects.iter().any(|obj| obj.contains_addr(addr))
    }

    fn pack_word(&mut self, addr: u64, value: u64) -> Result<(), MemoryError> {
        self.memory
            .pack_word(addr, value, self.word_size, self.endness)
    }

    fn unpack_word(&self, addr: u64) -> Result<u64, MemoryError> {
        self.memory.unpack_word(addr, self.word_size, self.endness)
    }

    fn objects(&self) -> &[SharedObject] {
        &self.objects
    }

    fn main_object(&self) -> &SharedObject {
        &self.objects[self.main_index]
    }

    fn linux_loader_object(&self) -> Option<&SharedObject> {
        self.ld_index.map(|index| &self.objects[index])
    }

    fn tls(&self) -> Option<TlsDescriptor> {
        self.tls
    }

    fn memory_image(&self) -> SparseMemory {
        self.memory.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchId;

    #[test]
    fn test_extern_allocations_never_overlap() {
        let mut arena = ExternArena::new(0x1000, 8);
        let a = arena.allocate(1);
        let b = arena.allocate(0x18);
        let c = arena.allocate(8);
        assert_eq!(a, 0x1000);
        assert_eq!(b, 0x1008);
        assert_eq!(c, 0x1020);
        assert!(arena.contains(c));
        assert!(!arena.contains(0x1028));
    }

    #[test]
    fn test_pseudo_addr_is_stable() {
        let mut arena = ExternArena::new(0x1000, 8);
        let puts = arena.pseudo_addr("puts");
        let exit = arena.pseudo_addr("exit");
        assert_ne!(puts, exit);
        assert_eq!(arena.pseudo_addr("puts"), puts);
    }

    #[test]
    fn test_image_word_access_uses_arch_endianness() {
        let arch = Arch::new(ArchId::Ppc32);
        let mut image = LoadedImage::new(&arch, SharedObject::new("main", 0x1000_0000, 0x1001_0000));
        image.pack_word(0x1000_0100, 0xdead_beef).unwrap();
        assert_eq!(
            image.memory().load(0x1000_0100, 4).unwrap(),
            [0xde, 0xad, 0xbe, 0xef]
        );
        assert_eq!(image.unpack_word(0x1000_0100).unwrap(), 0xdead_beef);
        assert!(image.owns(0x1000_0100));
        assert!(!image.owns(EXTERN_BASE_32));
        let ext = image.allocate_extern(4);
        assert!(image.owns(ext));
    }
}
