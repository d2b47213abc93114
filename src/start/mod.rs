use std::borrow::Cow;

use auxiliary_vector::{AT_RANDOM, AT_RANDOM_LEN};
use log::{debug, warn};
use smallvec::SmallVec;

use crate::{
    arch::EntryValue,
    error::StateError,
    state::ProcessState,
};

pub mod auxiliary_vector;
pub mod environment_variables;
pub mod string_table;

use string_table::StringTable;

/// Gap left between the incoming stack pointer and the end of the table.
const TABLE_END_GAP: u64 = 16;

/// What process startup needs beyond the argument lists.
#[derive(Clone, Debug)]
pub struct StartupImage<'a> {
    pub args: &'a [Vec<u8>],
    pub env: &'a [(Vec<u8>, Vec<u8>)],
    /// Stored in place of `args.len()` when set.
    pub argc: Option<u64>,
    pub random: [u8; AT_RANDOM_LEN],
    /// Bytes zeroed below the incoming stack pointer before the table is written.
    pub scratch: u64,
}

/// Values entry registers may be derived from besides the stack layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryContext {
    /// Initial TOC, only known for PPC64 ELFv1 main objects.
    pub toc: Option<u64>,
    pub thread_pointer: Option<u64>,
}

/// Where the startup image landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackLayout {
    pub sp: u64,
    pub argc: u64,
    pub argv: u64,
    pub envp: u64,
    pub auxv: u64,
}

/// Lays out argc, argv, envp and auxv below the state's stack pointer the
/// way `execve` does, and records them in the posix plugin.
pub fn build_initial_stack(
    state: &mut ProcessState,
    image: &StartupImage<'_>,
) -> Result<StackLayout, StateError> {
    let word = state.arch.bytes() as u64;
    let argc = image.argc.unwrap_or(image.args.len() as u64);

    let mut table = StringTable::new();
    table.append_args(image.args);
    table.append_env(image.env.iter().map(|(key, value)| (key, value)));
    table.add_pointer(AT_RANDOM);
    table.add_string(&image.random);
    table.add_null();
    table.add_null();

    let mask = state.arch.address_mask();
    let sp = state.sp();
    state.fill_bytes(sp.wrapping_sub(image.scratch), image.scratch, 0);
    let argv = table.dump(state, sp.wrapping_sub(TABLE_END_GAP))?;
    let envp = argv.wrapping_add((image.args.len() as u64 + 1) * word) & mask;
    let auxv = argv.wrapping_add((image.args.len() as u64 + image.env.len() as u64 + 2) * word)
        & mask;

    let new_sp = argv.wrapping_sub(word) & mask;
    state.store_word(new_sp, argc)?;
    state.set_sp(new_sp)?;
    for _ in 0..state.arch.profile().reserved_stack_words {
        state.stack_push(0)?;
    }

    state.posix.argc = argc;
    state.posix.argv = argv;
    state.posix.environ = envp;
    state.posix.auxv = auxv;
    debug!(
        "startup stack: argc {} argv {:#x} envp {:#x} auxv {:#x}",
        argc, argv, envp, auxv
    );

    Ok(StackLayout {
        sp: state.sp(),
        argc,
        argv,
        envp,
        auxv,
    })
}

/// Stores every entry register the architecture declares.
///
/// Unknown indicators are logged and leave their register untouched.
pub fn set_entry_register_values(
    state: &mut ProcessState,
    ctx: &EntryContext,
) -> Result<(), StateError> {
    let stores: SmallVec<[(Cow<'static, str>, u64); 8]> = state
        .arch
        .entry_register_values()
        .iter()
        .filter_map(|(reg, value)| {
            let value = match value {
                EntryValue::Literal(value) => Some(*value),
                EntryValue::Indicator(indicator) => resolve_indicator(state, ctx, indicator),
            };
            value.map(|value| (reg.clone(), value))
        })
        .collect();

    for (reg, value) in stores {
        state.store_register(&reg, value)?;
    }
    Ok(())
}

fn resolve_indicator(state: &ProcessState, ctx: &EntryContext, indicator: &str) -> Option<u64> {
    match indicator {
        "argc" => Some(state.posix.argc),
        "argv" => Some(state.posix.argv),
        "envp" => Some(state.posix.environ),
        "auxv" => Some(state.posix.auxv),
        // No loader-registered exit routine is modeled.
        "ld_destructor" => Some(0),
        "toc" => ctx.toc,
        "thread_pointer" => {
            if ctx.thread_pointer.is_none() {
                debug!("no thread pointer for the entry state");
            }
            ctx.thread_pointer
        }
        other => {
            warn!("unknown entry register value indicator {:?}", other);
            None
        }
    }
}
