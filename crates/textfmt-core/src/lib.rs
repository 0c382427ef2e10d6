//! Core types for textfmt.
//!
//! - [`error`] - error types, the per-thread last-error string, [`fatal`]
//! - [`int_fmt`] - integer to decimal conversion with `strlcpy`/`strlcat` semantics
//! - [`arg`] - the argument model: [`FormatArg`], [`ArgSource`], [`Capture`], [`ArgLock`]
//! - [`writer`] - [`BoundedWriter`] and [`Rendered`]
//! - [`sync`] - the registry lock shim selected by the `threads` feature

pub mod arg;
pub mod error;
pub mod int_fmt;
pub mod sync;
pub mod writer;

pub use arg::{Address, ArgLock, ArgSource, Capture, FormatArg, SliceArgs, with_next_arg};
pub use error::{
    CodecError, FormatError, Result, TextError, clear_last_error, fatal, last_error, record,
};
pub use writer::{BoundedWriter, Rendered, content};
