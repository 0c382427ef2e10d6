//! Bounded `%`-directive text formatting.
//!
//! Templates use printf-style directives (`%d`, `%-8s`, `%.2f`, `%p`, ...)
//! plus `%[name]` extensions that call back into registered Rust code.
//! Output always goes to a caller-sized buffer: it is truncated to fit,
//! NUL-terminated, and the full length is reported so the caller can retry
//! with a larger buffer.
//!
//! ```
//! use textfmt::{Formatter, args};
//!
//! let formatter = Formatter::new();
//! let mut buf = [0u8; 16];
//! let rendered = formatter.format(&mut buf, "%d apples", &args![5]).unwrap();
//! assert_eq!(&buf[..rendered.written], b"5 apples");
//!
//! let mut small = [0u8; 3];
//! let rendered = formatter.format(&mut small, "%d apples", &args![5]).unwrap();
//! assert_eq!(rendered.written, 2);
//! assert_eq!(rendered.required, 8);
//! assert!(rendered.is_truncated());
//! ```
//!
//! # Modules
//!
//! - [`template`] - the directive grammar
//! - [`engine`] - [`Formatter`] and the global formatter
//! - [`registry`] - extension registration and lookup
//! - [`builtins`] - `%[i8]` ... `%[usize]`
//! - [`bound`] - [`BoundFormatString`], templates bound to live values
//! - [`scratch`] - slot-indexed growable render buffers
//! - `codec` - text encoding conversion (feature `codec`)

pub mod bound;
pub mod builtins;
pub mod engine;
pub mod registry;
pub mod scratch;
pub mod template;

#[cfg(feature = "codec")]
pub use textfmt_codec as codec;

pub use bound::{BoundBuilder, BoundFormatString, MAX_BOUND_ARGS};
pub use engine::Formatter;
pub use registry::{ExtensionCall, ExtensionFn, ExtensionRegistry, MAX_EXTENSIONS, write_bounded};
pub use scratch::{
    ScratchConfig, ScratchPool, ScratchSlot, ScratchText, release_thread_scratch, try_with_scratch,
    with_scratch,
};
pub use textfmt_core::{
    Address, ArgLock, ArgSource, Capture, FormatArg, FormatError, Rendered, Result, TextError,
    clear_last_error, last_error,
};

/// Build a `[FormatArg; N]` from values convertible with `FormatArg::from`.
#[macro_export]
macro_rules! args {
    () => {
        []
    };
    ($($arg:expr),+ $(,)?) => {
        [$($crate::FormatArg::from($arg)),+]
    };
}

/// Render with the global formatter. See [`Formatter::format`].
pub fn format(dst: &mut [u8], template: &str, args: &[FormatArg<'_>]) -> Result<Rendered> {
    Formatter::with_global(|formatter| formatter.format(dst, template, args))
}

/// Render with the global formatter into a new `String`.
pub fn format_to_string(template: &str, args: &[FormatArg<'_>]) -> Result<String> {
    Formatter::with_global(|formatter| formatter.format_to_string(template, args))
}

/// Register an extension with the global formatter.
pub fn register_extension<F>(name: &str, callback: F) -> Result<()>
where
    F: Fn(&mut ExtensionCall<'_>, &mut [u8]) -> Result<usize> + Send + Sync + 'static,
{
    Formatter::with_global(|formatter| formatter.register_extension(name, callback))
}

/// Unregister an extension from the global formatter.
pub fn unregister_extension(name: &str) -> bool {
    Formatter::with_global(|formatter| formatter.unregister_extension(name))
}

pub mod prelude {
    pub use crate::args;
    pub use crate::bound::BoundFormatString;
    pub use crate::engine::Formatter;
    pub use crate::registry::{ExtensionCall, write_bounded};
    pub use crate::scratch::{ScratchPool, ScratchSlot, with_scratch};
    pub use textfmt_core::{Address, FormatArg, FormatError, Rendered, Result};
}
