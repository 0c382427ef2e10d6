//! Argument model shared by the live and bound renderers.
//!
//! Live rendering takes a slice of [`FormatArg`] values. Bound rendering
//! reads [`Capture`] references, each optionally guarded by an [`ArgLock`].
//! Both feed the engine through the [`ArgSource`] cursor.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{
    AtomicBool, AtomicI8, AtomicI16, AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU16,
    AtomicU32, AtomicU64, AtomicUsize, Ordering,
};
use std::sync::{Mutex, PoisonError, RwLock};

/// One formatting argument.
#[derive(Clone, Copy)]
pub enum FormatArg<'a> {
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(&'a str),
    /// An address, rendered by `%p`.
    Pointer(usize),
    /// An opaque object for extension callbacks to downcast.
    Object(&'a dyn Any),
}

impl FormatArg<'_> {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FormatArg::Int(_) => "int",
            FormatArg::UInt(_) => "uint",
            FormatArg::Float(_) => "float",
            FormatArg::Char(_) => "char",
            FormatArg::Str(_) => "str",
            FormatArg::Pointer(_) => "pointer",
            FormatArg::Object(_) => "object",
        }
    }

    /// The value as a signed integer, reinterpreting unsigned bits like a C cast.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FormatArg::Int(v) => Some(v),
            FormatArg::UInt(v) => Some(v as i64),
            FormatArg::Char(c) => Some(i64::from(u32::from(c))),
            _ => None,
        }
    }

    /// The value as an unsigned integer, reinterpreting signed bits like a C cast.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            FormatArg::Int(v) => Some(v as u64),
            FormatArg::UInt(v) => Some(v),
            FormatArg::Char(c) => Some(u64::from(u32::from(c))),
            FormatArg::Pointer(p) => Some(p as u64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FormatArg::Float(v) => Some(v),
            FormatArg::Int(v) => Some(v as f64),
            FormatArg::UInt(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match *self {
            FormatArg::Char(c) => Some(c),
            FormatArg::Int(v) => u32::try_from(v).ok().and_then(char::from_u32),
            FormatArg::UInt(v) => u32::try_from(v).ok().and_then(char::from_u32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FormatArg::Str(s) => Some(*s),
            _ => None,
        }
    }

    /// Downcast an `Object` argument.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            FormatArg::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for FormatArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatArg::Int(v) => f.debug_tuple("Int").field(v).finish(),
            FormatArg::UInt(v) => f.debug_tuple("UInt").field(v).finish(),
            FormatArg::Float(v) => f.debug_tuple("Float").field(v).finish(),
            FormatArg::Char(v) => f.debug_tuple("Char").field(v).finish(),
            FormatArg::Str(v) => f.debug_tuple("Str").field(v).finish(),
            FormatArg::Pointer(v) => write!(f, "Pointer({v:#x})"),
            FormatArg::Object(_) => f.write_str("Object(..)"),
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident as $wide:ty: $($t:ty),*) => {
        $(
            impl From<$t> for FormatArg<'_> {
                #[inline]
                fn from(v: $t) -> Self {
                    FormatArg::$variant(v as $wide)
                }
            }
        )*
    };
}

impl_from_int!(Int as i64: i8, i16, i32, i64, isize);
impl_from_int!(UInt as u64: u8, u16, u32, u64, usize);

impl From<f32> for FormatArg<'_> {
    fn from(v: f32) -> Self {
        FormatArg::Float(f64::from(v))
    }
}

impl From<f64> for FormatArg<'_> {
    fn from(v: f64) -> Self {
        FormatArg::Float(v)
    }
}

impl From<char> for FormatArg<'_> {
    fn from(v: char) -> Self {
        FormatArg::Char(v)
    }
}

impl From<bool> for FormatArg<'_> {
    fn from(v: bool) -> Self {
        FormatArg::Str(if v { "true" } else { "false" })
    }
}

impl<'a> From<&'a str> for FormatArg<'a> {
    fn from(v: &'a str) -> Self {
        FormatArg::Str(v)
    }
}

impl<'a> From<&'a String> for FormatArg<'a> {
    fn from(v: &'a String) -> Self {
        FormatArg::Str(v.as_str())
    }
}

impl From<Address> for FormatArg<'_> {
    fn from(v: Address) -> Self {
        FormatArg::Pointer(v.0)
    }
}

/// A numeric address rendered by `%p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub usize);

impl Address {
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Address((value as *const T).cast::<()>() as usize)
    }
}

// ============================================================================
// Argument cursor
// ============================================================================

/// Sequential access to formatting arguments.
///
/// `next_arg` hands the next argument to `visit` exactly once (`None` once
/// the arguments run out) and advances the cursor. Sources that guard their
/// values keep the guard alive only for the duration of `visit`.
pub trait ArgSource {
    fn next_arg(&mut self, visit: &mut dyn FnMut(Option<FormatArg<'_>>));

    /// Index of the argument the next call to `next_arg` yields.
    fn position(&self) -> usize;
}

/// [`ArgSource`] over a slice of arguments.
#[derive(Debug)]
pub struct SliceArgs<'s, 'a> {
    args: &'s [FormatArg<'a>],
    next: usize,
}

impl<'s, 'a> SliceArgs<'s, 'a> {
    pub fn new(args: &'s [FormatArg<'a>]) -> Self {
        Self { args, next: 0 }
    }

    /// Arguments not yet consumed.
    pub fn remaining(&self) -> usize {
        self.args.len().saturating_sub(self.next)
    }
}

impl ArgSource for SliceArgs<'_, '_> {
    fn next_arg(&mut self, visit: &mut dyn FnMut(Option<FormatArg<'_>>)) {
        let arg = self.args.get(self.next).copied();
        if arg.is_some() {
            self.next += 1;
        }
        visit(arg);
    }

    fn position(&self) -> usize {
        self.next
    }
}

/// Run `f` on the next argument of `source`, returning its result.
pub fn with_next_arg<R>(
    source: &mut dyn ArgSource,
    f: impl FnOnce(Option<FormatArg<'_>>) -> R,
) -> R {
    let mut f = Some(f);
    let mut out = None;
    source.next_arg(&mut |arg| {
        if let Some(f) = f.take() {
            out = Some(f(arg));
        }
    });
    match (out, f) {
        (Some(result), _) => result,
        // The source never called back; treat it as exhausted.
        (None, Some(f)) => f(None),
        (None, None) => unreachable!("argument visitor ran without producing a result"),
    }
}

// ============================================================================
// Captured values and locks
// ============================================================================

/// A value a bound format string can read at render time.
pub trait Capture {
    fn capture(&self) -> FormatArg<'_>;
}

macro_rules! impl_capture_copy {
    ($($t:ty),*) => {
        $(
            impl Capture for $t {
                #[inline]
                fn capture(&self) -> FormatArg<'_> {
                    FormatArg::from(*self)
                }
            }
        )*
    };
}

impl_capture_copy!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, char, bool, Address);

impl Capture for &str {
    fn capture(&self) -> FormatArg<'_> {
        FormatArg::Str(*self)
    }
}

impl Capture for String {
    fn capture(&self) -> FormatArg<'_> {
        FormatArg::Str(self.as_str())
    }
}

macro_rules! impl_capture_atomic {
    ($($t:ty),*) => {
        $(
            impl Capture for $t {
                #[inline]
                fn capture(&self) -> FormatArg<'_> {
                    FormatArg::from(self.load(Ordering::Acquire))
                }
            }
        )*
    };
}

impl_capture_atomic!(
    AtomicBool,
    AtomicI8,
    AtomicI16,
    AtomicI32,
    AtomicI64,
    AtomicIsize,
    AtomicU8,
    AtomicU16,
    AtomicU32,
    AtomicU64,
    AtomicUsize
);

/// A lock that must be held while a captured value is read.
pub trait ArgLock {
    /// Run `f` with the lock held.
    fn with_held(&self, f: &mut dyn FnMut());
}

impl<T: ?Sized> ArgLock for Mutex<T> {
    fn with_held(&self, f: &mut dyn FnMut()) {
        let _guard = self.lock().unwrap_or_else(PoisonError::into_inner);
        f();
    }
}

impl<T: ?Sized> ArgLock for RwLock<T> {
    fn with_held(&self, f: &mut dyn FnMut()) {
        let _guard = self.read().unwrap_or_else(PoisonError::into_inner);
        f();
    }
}
