//! Unified error types for textfmt.
//!
//! Errors fall into four groups:
//!
//! ```text
//! fatal          capacity ceilings, scratch exhaustion  -> fatal() aborts
//! recoverable    FormatError / CodecError               -> Result + last_error()
//! silent         destination too small while rendering  -> Rendered::is_truncated()
//! reported       codec export out of room               -> CodecError::Overflow
//! ```
//!
//! Formatter truncation and codec overflow are kept as two separate policies.
//! The formatter never fails because a buffer is small, the codec always does.

use std::cell::RefCell;
use std::fmt;

use thiserror::Error;

// ============================================================================
// Format Errors
// ============================================================================

/// Errors raised while rendering or building format strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// A directive needed an argument but the list was exhausted.
    #[error("directive {directive:?} needs argument {index}, but none was supplied")]
    MissingArgument { index: usize, directive: char },

    /// The argument kind cannot feed the directive.
    #[error("argument {index} is {found}, which directive {directive:?} cannot render")]
    ArgumentMismatch {
        index: usize,
        directive: char,
        found: &'static str,
    },

    /// A bound format string received a different number of arguments than
    /// its template consumes.
    #[error("template consumes {expected} arguments, {supplied} supplied")]
    ArgumentCount { expected: usize, supplied: usize },

    /// Extension names must be non-empty and may not contain `]`.
    #[error("invalid extension name {0:?}")]
    InvalidExtensionName(String),

    /// The delegated printf-style formatter rejected a specifier.
    #[error("cannot format {specifier:?}: {message}")]
    Platform { specifier: String, message: String },

    /// A fallible allocation failed.
    #[error("out of memory allocating {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The calling thread's scratch pool is already borrowed further up the stack.
    #[error("scratch pool is already in use on this thread")]
    ScratchBusy,

    /// Rendered output is not valid UTF-8 and cannot be returned as `&str`.
    #[error("rendered output is not valid UTF-8")]
    InvalidUtf8,
}

// ============================================================================
// Codec Errors
// ============================================================================

/// Errors raised by the encoding codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The encoding name is not known (or support was not compiled in).
    #[error("no such encoding: {0}")]
    UnknownEncoding(String),

    /// The input is not a valid byte sequence in the encoding.
    #[error("malformed input at byte {offset}")]
    Malformed { offset: usize },

    /// A code unit cannot be expressed in the target encoding.
    #[error("code unit {unit:#x} at index {index} cannot be encoded")]
    Unrepresentable { index: usize, unit: u32 },

    /// The destination buffer is too small.
    #[error("destination overflow: {needed} bytes needed, capacity {capacity}")]
    Overflow { needed: usize, capacity: usize },

    /// A fallible allocation failed.
    #[error("out of memory allocating {requested} bytes")]
    OutOfMemory { requested: usize },
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Either kind of textfmt error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result alias for formatting operations.
pub type Result<T, E = FormatError> = std::result::Result<T, E>;

// ============================================================================
// Last-error string
// ============================================================================

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record `err` as the calling thread's last error and hand it back.
///
/// Used at the points where a recoverable failure leaves the library, so
/// call sites that only check for a sentinel can still fetch a message.
pub fn record<E: fmt::Display>(err: E) -> E {
    let message = err.to_string();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
    err
}

/// The message of the last recoverable failure on this thread.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Forget the last error on this thread.
pub fn clear_last_error() {
    LAST_ERROR.with(|slot| slot.borrow_mut().take());
}

/// Terminate the process after reporting `message`.
///
/// Reserved for broken invariants that callers are not expected to handle:
/// capacity ceilings and exhausted memory on infallible paths.
#[cold]
pub fn fatal(message: fmt::Arguments<'_>) -> ! {
    log::error!("fatal: {message}");
    eprintln!("textfmt: fatal: {message}");
    std::process::abort()
}
