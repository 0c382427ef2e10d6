//! Scratch buffers.
//!
//! A [`ScratchPool`] owns one growable buffer per [`ScratchSlot`] and renders
//! templates into them, growing a buffer until the output fits. The text it
//! hands back borrows its slot, so it stays valid until that slot is
//! rendered into again.
//!
//! Each thread also has its own pool, reached through [`with_scratch`] and
//! [`try_with_scratch`] and freed with [`release_thread_scratch`].

use std::cell::{Ref, RefCell};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use textfmt_core::{FormatArg, FormatError, Result, fatal, record};

use crate::engine::Formatter;

/// Number of scratch slots per pool.
pub const SLOT_COUNT: usize = 8;

/// Independent scratch buffers. Rendering into one slot leaves the text in
/// the others intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ScratchSlot {
    Label = 0,
    Caption = 1,
    Tooltip = 2,
    Status = 3,
    Title = 4,
    Log = 5,
    Clipboard = 6,
    Temp = 7,
}

impl ScratchSlot {
    pub const ALL: [ScratchSlot; SLOT_COUNT] = [
        ScratchSlot::Label,
        ScratchSlot::Caption,
        ScratchSlot::Tooltip,
        ScratchSlot::Status,
        ScratchSlot::Title,
        ScratchSlot::Log,
        ScratchSlot::Clipboard,
        ScratchSlot::Temp,
    ];

    #[inline]
    fn index(self) -> usize {
        usize::from(u8::from(self))
    }
}

/// Buffer sizing for a [`ScratchPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchConfig {
    /// Capacity of a slot's first buffer.
    pub initial_capacity: usize,
    /// Extra room added past the required length when a buffer grows.
    pub grow_increment: usize,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            grow_increment: 64,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Growth {
    Fatal,
    Fallible,
}

/// Rendered text borrowed from one scratch slot.
pub type ScratchText<'p> = Ref<'p, str>;

/// Per-slot growable render buffers.
///
/// Each slot is borrowed on its own: text from one slot stays readable while
/// other slots are rendered. Rendering into a slot whose text is still held
/// fails with [`FormatError::ScratchBusy`].
#[derive(Debug, Default)]
pub struct ScratchPool {
    config: ScratchConfig,
    slots: [RefCell<Vec<u8>>; SLOT_COUNT],
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScratchConfig) -> Self {
        Self {
            config,
            slots: Default::default(),
        }
    }

    pub fn config(&self) -> ScratchConfig {
        self.config
    }

    /// Current buffer size of `slot`, terminator included.
    pub fn capacity(&self, slot: ScratchSlot) -> Result<usize> {
        self.slots[slot.index()]
            .try_borrow()
            .map(|buf| buf.len())
            .map_err(|_| record(FormatError::ScratchBusy))
    }

    /// Render `template` into `slot`, growing it as needed.
    ///
    /// Running out of memory while growing is fatal; see
    /// [`Self::try_render`] for the recoverable form.
    pub fn render(
        &self,
        formatter: &Formatter,
        slot: ScratchSlot,
        template: &str,
        args: &[FormatArg<'_>],
    ) -> Result<ScratchText<'_>> {
        self.render_with(formatter, slot, template, args, Growth::Fatal)
    }

    /// [`Self::render`], reporting allocation failure as
    /// [`FormatError::OutOfMemory`].
    pub fn try_render(
        &self,
        formatter: &Formatter,
        slot: ScratchSlot,
        template: &str,
        args: &[FormatArg<'_>],
    ) -> Result<ScratchText<'_>> {
        self.render_with(formatter, slot, template, args, Growth::Fallible)
    }

    fn render_with(
        &self,
        formatter: &Formatter,
        slot: ScratchSlot,
        template: &str,
        args: &[FormatArg<'_>],
        growth: Growth,
    ) -> Result<ScratchText<'_>> {
        let cell = &self.slots[slot.index()];
        let written = {
            let mut buf = cell
                .try_borrow_mut()
                .map_err(|_| record(FormatError::ScratchBusy))?;
            if buf.is_empty() {
                grow(&mut buf, self.config.initial_capacity.max(1), slot, growth)?;
            }
            loop {
                let rendered = formatter.format(&mut buf, template, args)?;
                if rendered.required < buf.len() {
                    break rendered.written;
                }
                let target = rendered
                    .required
                    .saturating_add(self.config.grow_increment.max(1));
                log::trace!("scratch slot {slot:?} growing to {target} bytes");
                grow(&mut buf, target, slot, growth)?;
            }
        };
        let buf = cell
            .try_borrow()
            .map_err(|_| record(FormatError::ScratchBusy))?;
        Ref::filter_map(buf, |buf| std::str::from_utf8(&buf[..written]).ok())
            .map_err(|_| record(FormatError::InvalidUtf8))
    }

    /// Free the buffer of one slot.
    pub fn release_slot(&self, slot: ScratchSlot) -> Result<()> {
        let mut buf = self.slots[slot.index()]
            .try_borrow_mut()
            .map_err(|_| record(FormatError::ScratchBusy))?;
        *buf = Vec::new();
        Ok(())
    }

    /// Free every buffer. The pool stays usable. Nothing is freed while any
    /// slot's text is still held.
    pub fn release(&self) -> Result<()> {
        let mut bufs = self
            .slots
            .iter()
            .map(RefCell::try_borrow_mut)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| record(FormatError::ScratchBusy))?;
        for buf in &mut bufs {
            **buf = Vec::new();
        }
        Ok(())
    }
}

fn grow(buf: &mut Vec<u8>, len: usize, slot: ScratchSlot, growth: Growth) -> Result<()> {
    let additional = len.saturating_sub(buf.len());
    if buf.try_reserve_exact(additional).is_err() {
        if growth == Growth::Fallible {
            return Err(record(FormatError::OutOfMemory { requested: len }));
        }
        fatal(format_args!(
            "scratch slot {slot:?}: cannot grow buffer to {len} bytes"
        ));
    }
    buf.resize(len, 0);
    Ok(())
}

// ============================================================================
// Per-thread pool
// ============================================================================

thread_local! {
    static THREAD_POOL: ScratchPool = ScratchPool::new();
}

/// Render into this thread's `slot` with the global formatter and pass the
/// text to `f`.
///
/// `f` may render into other slots; rendering into `slot` again from `f`
/// fails with [`FormatError::ScratchBusy`].
pub fn with_scratch<R>(
    slot: ScratchSlot,
    template: &str,
    args: &[FormatArg<'_>],
    f: impl FnOnce(&str) -> R,
) -> Result<R> {
    THREAD_POOL.with(|pool| {
        Formatter::with_global(|formatter| {
            let text = pool.render(formatter, slot, template, args)?;
            Ok(f(&text))
        })
    })
}

/// [`with_scratch`] with recoverable allocation failure.
pub fn try_with_scratch<R>(
    slot: ScratchSlot,
    template: &str,
    args: &[FormatArg<'_>],
    f: impl FnOnce(&str) -> R,
) -> Result<R> {
    THREAD_POOL.with(|pool| {
        Formatter::with_global(|formatter| {
            let text = pool.try_render(formatter, slot, template, args)?;
            Ok(f(&text))
        })
    })
}

/// Capacity of this thread's `slot`.
pub fn thread_scratch_capacity(slot: ScratchSlot) -> Result<usize> {
    THREAD_POOL.with(|pool| pool.capacity(slot))
}

/// Free this thread's scratch buffers.
pub fn release_thread_scratch() -> Result<()> {
    THREAD_POOL.with(ScratchPool::release)
}
