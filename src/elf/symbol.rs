use smartstring::alias::String as SmartString;

// Symbol types from the low nibble of `st_info`.
pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;
pub const STT_SECTION: u8 = 3;
pub const STT_FILE: u8 = 4;
pub const STT_TLS: u8 = 6;
pub const STT_GNU_IFUNC: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolType {
    NoType,
    Object,
    Function,
    Section,
    File,
    Tls,
    /// Resolved by calling the symbol's code once to obtain the real address.
    GnuIfunc,
    Other(u8),
}

impl SymbolType {
    #[inline(always)]
    pub fn from_st_info(st_info: u8) -> Self {
        match st_info & 0xf {
            STT_NOTYPE => SymbolType::NoType,
            STT_OBJECT => SymbolType::Object,
            STT_FUNC => SymbolType::Function,
            STT_SECTION => SymbolType::Section,
            STT_FILE => SymbolType::File,
            STT_TLS => SymbolType::Tls,
            STT_GNU_IFUNC => SymbolType::GnuIfunc,
            other => SymbolType::Other(other),
        }
    }
}

/// A symbol as the loader resolved it: name, rebased address and type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: SmartString,
    pub rebased_addr: u64,
    pub size: u64,
    pub kind: SymbolType,
}

impl Symbol {
    pub fn new(name: &str, rebased_addr: u64, kind: SymbolType) -> Self {
        Self {
            name: name.into(),
            rebased_addr,
            size: 0,
            kind,
        }
    }

    #[inline(always)]
    pub fn is_ifunc(&self) -> bool {
        self.kind == SymbolType::GnuIfunc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_st_info_decoding_ignores_binding() {
        // STB_GLOBAL << 4 | STT_GNU_IFUNC
        assert_eq!(SymbolType::from_st_info(0x1a), SymbolType::GnuIfunc);
        assert_eq!(SymbolType::from_st_info(0x12), SymbolType::Function);
        assert_eq!(SymbolType::from_st_info(0x0d), SymbolType::Other(13));
    }
}
