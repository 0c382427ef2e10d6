//! Fixed-width integer extensions: `%[i8]` through `%[usize]`.
//!
//! Each consumes one integer argument, narrows it to the named width the
//! way an `as` cast does, and renders it in decimal.

use textfmt_core::Result;

use crate::registry::{ExtensionRegistry, write_i64, write_u64};

/// Names registered by [`register_builtins`].
pub const BUILTIN_EXTENSIONS: [&str; 10] = [
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize",
];

macro_rules! register_fixed {
    ($registry:expr; signed: $($st:ident),*; unsigned: $($ut:ident),*) => {{
        $(
            $registry.register(stringify!($st), |call, dst| {
                let value = call.next_i64()? as $st;
                Ok(write_i64(dst, value as i64))
            })?;
        )*
        $(
            $registry.register(stringify!($ut), |call, dst| {
                let value = call.next_u64()? as $ut;
                Ok(write_u64(dst, value as u64))
            })?;
        )*
    }};
}

/// Register the fixed-width integer extensions with `registry`.
pub fn register_builtins(registry: &ExtensionRegistry) -> Result<()> {
    register_fixed!(registry;
        signed: i8, i16, i32, i64, isize;
        unsigned: u8, u16, u32, u64, usize);
    Ok(())
}
