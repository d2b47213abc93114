/// Builds a `&'static [RegisterInfo]` where every register shares one width.
///
/// ```ignore
/// register_table!(8; "rax", "rbx", "rip")
/// ```
macro_rules! register_table {
    ($size:expr; $($name:literal),+ $(,)?) => {
        &[$($crate::arch::RegisterInfo { name: $name, size: $size }),+]
    };
}

pub(crate) use register_table;

/// Joins several register tables with possibly different widths.
macro_rules! register_tables {
    ($($size:expr => [$($name:literal),+ $(,)?]),+ $(,)?) => {
        &[$($($crate::arch::RegisterInfo { name: $name, size: $size }),+),+]
    };
}

pub(crate) use register_tables;
