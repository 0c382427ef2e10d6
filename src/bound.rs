//! Bound format strings.
//!
//! A [`BoundFormatString`] pairs a template with references to the values
//! its directives render. Nothing is read when it is built; every render
//! reads the referenced values as they are at that moment, so one bound
//! string can be rendered again and again as the data behind it changes.
//!
//! Each captured value may name a lock that is held while that value's
//! directive renders:
//!
//! ```
//! use std::sync::Mutex;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use textfmt::{BoundFormatString, Formatter};
//!
//! let hits = AtomicU32::new(1);
//! let state = Mutex::new(());
//! let label = BoundFormatString::builder("hits: %u")
//!     .guarded_by(&state)
//!     .arg(&hits)
//!     .build()
//!     .unwrap();
//!
//! let formatter = Formatter::new();
//! assert_eq!(label.render_to_string(&formatter).unwrap(), "hits: 1");
//! hits.store(2, Ordering::Release);
//! assert_eq!(label.render_to_string(&formatter).unwrap(), "hits: 2");
//! ```

use std::cell::Cell;
use std::fmt;
use std::mem::size_of;

use textfmt_core::{
    ArgLock, ArgSource, Capture, FormatArg, FormatError, Rendered, Result, fatal, record,
};

use crate::engine::Formatter;
use crate::template::count_arguments;

/// Upper bound on the arguments of one bound format string.
pub const MAX_BOUND_ARGS: usize = 32;

#[derive(Clone, Copy)]
struct Slot<'a> {
    value: &'a (dyn Capture + Sync),
    lock: Option<&'a (dyn ArgLock + Sync)>,
}

/// A template bound to live values.
///
/// The render cursor lives in the object, so a bound string is not `Sync`;
/// render it from one thread at a time.
pub struct BoundFormatString<'a> {
    template: String,
    slots: Vec<Slot<'a>>,
    cursor: Cell<usize>,
}

impl<'a> BoundFormatString<'a> {
    /// Start binding `template`. Supply one argument per directive, in
    /// template order; `%[name]` extensions take one each.
    pub fn builder<'t>(template: &'t str) -> BoundBuilder<'t, 'a> {
        BoundBuilder {
            template,
            slots: [None; MAX_BOUND_ARGS],
            len: 0,
            guard: None,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of bound arguments.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Render into `dst`. See [`Formatter::format`].
    pub fn render(&self, formatter: &Formatter, dst: &mut [u8]) -> Result<Rendered> {
        formatter.format_bound(dst, self)
    }

    /// Render into a new `String` sized to fit.
    pub fn render_to_string(&self, formatter: &Formatter) -> Result<String> {
        let mut buf = vec![0u8; self.template.len() + 1];
        loop {
            let rendered = formatter.format_bound(&mut buf, self)?;
            if !rendered.is_truncated() {
                buf.truncate(rendered.written);
                return String::from_utf8(buf).map_err(|_| record(FormatError::InvalidUtf8));
            }
            buf.resize(rendered.capacity_needed(), 0);
        }
    }

    /// An argument source positioned at the first slot.
    pub(crate) fn args(&self) -> BoundArgs<'_, 'a> {
        self.cursor.set(0);
        BoundArgs { bound: self }
    }
}

impl fmt::Debug for BoundFormatString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundFormatString")
            .field("template", &self.template)
            .field("args", &self.slots.len())
            .finish()
    }
}

pub(crate) struct BoundArgs<'b, 'a> {
    bound: &'b BoundFormatString<'a>,
}

impl ArgSource for BoundArgs<'_, '_> {
    fn next_arg(&mut self, visit: &mut dyn FnMut(Option<FormatArg<'_>>)) {
        let index = self.bound.cursor.get();
        let Some(slot) = self.bound.slots.get(index).copied() else {
            return visit(None);
        };
        self.bound.cursor.set(index + 1);
        match slot.lock {
            Some(lock) => lock.with_held(&mut || visit(Some(slot.value.capture()))),
            None => visit(Some(slot.value.capture())),
        }
    }

    fn position(&self) -> usize {
        self.bound.cursor.get()
    }
}

/// Collects the arguments of a [`BoundFormatString`].
///
/// Arguments take the lock set by the most recent [`Self::guarded_by`]
/// unless given one explicitly with [`Self::arg_locked`]. Supplying more
/// than [`MAX_BOUND_ARGS`] arguments is fatal.
pub struct BoundBuilder<'t, 'a> {
    template: &'t str,
    slots: [Option<Slot<'a>>; MAX_BOUND_ARGS],
    len: usize,
    guard: Option<&'a (dyn ArgLock + Sync)>,
}

impl<'t, 'a> BoundBuilder<'t, 'a> {
    /// Bind the next argument under the current guard.
    pub fn arg<T: Capture + Sync>(self, value: &'a T) -> Self {
        let lock = self.guard;
        self.push(value, lock)
    }

    /// Bind the next argument under `lock`, leaving the current guard as is.
    pub fn arg_locked<T, L>(self, value: &'a T, lock: &'a L) -> Self
    where
        T: Capture + Sync,
        L: ArgLock + Sync,
    {
        self.push(value, Some(lock))
    }

    /// Hold `lock` while rendering each argument bound after this call.
    pub fn guarded_by<L: ArgLock + Sync>(mut self, lock: &'a L) -> Self {
        self.guard = Some(lock);
        self
    }

    /// Bind later arguments without a lock.
    pub fn unguarded(mut self) -> Self {
        self.guard = None;
        self
    }

    fn push(mut self, value: &'a (dyn Capture + Sync), lock: Option<&'a (dyn ArgLock + Sync)>) -> Self {
        if self.len == MAX_BOUND_ARGS {
            fatal(format_args!(
                "bound format string {:?}: more than {MAX_BOUND_ARGS} arguments",
                self.template
            ));
        }
        self.slots[self.len] = Some(Slot { value, lock });
        self.len += 1;
        self
    }

    /// Check the arguments against the template and build.
    ///
    /// # Errors
    ///
    /// [`FormatError::ArgumentCount`] when the number of arguments differs
    /// from the number of directives, [`FormatError::OutOfMemory`] when the
    /// copy of the template cannot be allocated.
    pub fn build(self) -> Result<BoundFormatString<'a>> {
        let expected = count_arguments(self.template);
        if expected > MAX_BOUND_ARGS {
            fatal(format_args!(
                "bound format string {:?}: {expected} directives, at most {MAX_BOUND_ARGS}",
                self.template
            ));
        }
        if expected != self.len {
            return Err(record(FormatError::ArgumentCount {
                expected,
                supplied: self.len,
            }));
        }

        let mut template = String::new();
        template
            .try_reserve_exact(self.template.len())
            .map_err(|_| {
                record(FormatError::OutOfMemory {
                    requested: self.template.len(),
                })
            })?;
        template.push_str(self.template);

        let mut slots = Vec::new();
        slots.try_reserve_exact(self.len).map_err(|_| {
            record(FormatError::OutOfMemory {
                requested: self.len * size_of::<Slot<'_>>(),
            })
        })?;
        slots.extend(self.slots.iter().flatten().copied());

        log::trace!("bound {} arguments to {:?}", slots.len(), template);
        Ok(BoundFormatString {
            template,
            slots,
            cursor: Cell::new(0),
        })
    }
}
