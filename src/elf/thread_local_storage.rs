//! Offsets into glibc's `tcbhead_t`, relative to the thread pointer.

/// x86_64: `stack_guard`, read by `-fstack-protector` prologues via `fs:0x28`.
pub const X86_64_STACK_GUARD_OFFSET: u64 = 0x28;
/// x86_64: `pointer_guard`, used by `PTR_MANGLE`.
pub const X86_64_POINTER_GUARD_OFFSET: u64 = 0x30;
/// i386: `sysinfo`, the address `call *%gs:0x10` jumps through to enter the kernel.
pub const X86_SYSINFO_OFFSET: u64 = 0x10;

/// "_CANARY_" spelled out in the hex digits.
pub const STACK_GUARD_MAGIC: u64 = 0x5f43_414e_4152_595f;
/// "PTRGUARD" spelled out in the hex digits.
pub const POINTER_GUARD_MAGIC: u64 = 0x5054_5247_5541_5244;

/// ARM's `__kuser_get_tls` helper in the kernel-provided vector page.
pub const ARM_KUSER_GET_TLS: u64 = 0xffff_0fe0;

/// Thread-pointer values for the primary thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlsDescriptor {
    /// Address of the TCB the loader set up.
    pub thread_pointer: u64,
    /// Value user code observes in the thread register. Differs from
    /// `thread_pointer` on variant-I architectures that bias the register.
    pub user_thread_pointer: u64,
}

impl TlsDescriptor {
    pub fn new(thread_pointer: u64) -> Self {
        Self {
            thread_pointer,
            user_thread_pointer: thread_pointer,
        }
    }
}
