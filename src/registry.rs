//! Extension registry.
//!
//! Extensions are named render callbacks reached from templates through
//! `%[name params]`. A directive's bracket body is matched against the
//! registered names by prefix; the longest name that prefixes the body
//! wins, and among equal names the earliest registration wins. Whatever
//! follows the name is handed to the callback as its parameters.

use std::fmt;
use std::sync::Arc;

use textfmt_core::sync::Lock;
use textfmt_core::{ArgSource, FormatArg, FormatError, Result, fatal, int_fmt, record, with_next_arg};

/// Upper bound on simultaneously registered extensions.
pub const MAX_EXTENSIONS: usize = 64;

/// Signature of an extension callback.
///
/// The callback writes into `dst`, the unused tail of the destination with
/// the terminator slot included, NUL-terminating whatever it stores, and
/// returns the length its full output would have had. [`write_bounded`]
/// implements that contract for a ready-made byte string.
pub type ExtensionFn = dyn Fn(&mut ExtensionCall<'_>, &mut [u8]) -> Result<usize> + Send + Sync;

struct Extension {
    name: String,
    callback: Arc<ExtensionFn>,
}

/// The context an extension callback runs in.
pub struct ExtensionCall<'c> {
    name: &'c str,
    params: &'c str,
    directive: char,
    args: &'c mut dyn ArgSource,
}

impl<'c> ExtensionCall<'c> {
    pub(crate) fn new(name: &'c str, params: &'c str, args: &'c mut dyn ArgSource) -> Self {
        Self {
            name,
            params,
            directive: '[',
            args,
        }
    }

    /// The registered name that matched.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Bracket text after the name, unparsed.
    pub fn params(&self) -> &str {
        self.params
    }

    /// Position of the next argument.
    pub fn position(&self) -> usize {
        self.args.position()
    }

    /// Consume the next argument and pass it to `f`.
    pub fn with_next<R>(&mut self, f: impl FnOnce(Option<FormatArg<'_>>) -> R) -> R {
        with_next_arg(&mut *self.args, f)
    }

    fn next_as<T>(&mut self, convert: impl FnOnce(&FormatArg<'_>) -> Option<T>) -> Result<T> {
        let index = self.args.position();
        let directive = self.directive;
        self.with_next(|arg| match arg {
            None => Err(FormatError::MissingArgument { index, directive }),
            Some(arg) => convert(&arg).ok_or(FormatError::ArgumentMismatch {
                index,
                directive,
                found: arg.kind(),
            }),
        })
    }

    /// Consume the next argument as a signed integer.
    pub fn next_i64(&mut self) -> Result<i64> {
        self.next_as(|arg| arg.as_i64())
    }

    /// Consume the next argument as an unsigned integer.
    pub fn next_u64(&mut self) -> Result<u64> {
        self.next_as(|arg| arg.as_u64())
    }

    pub fn next_f64(&mut self) -> Result<f64> {
        self.next_as(|arg| arg.as_f64())
    }

    /// Consume the next argument as a string and pass it to `f`.
    pub fn next_str<R>(&mut self, f: impl FnOnce(&str) -> R) -> Result<R> {
        let index = self.args.position();
        let directive = self.directive;
        self.with_next(|arg| match arg {
            None => Err(FormatError::MissingArgument { index, directive }),
            Some(arg) => match arg.as_str() {
                Some(s) => Ok(f(s)),
                None => Err(FormatError::ArgumentMismatch {
                    index,
                    directive,
                    found: arg.kind(),
                }),
            },
        })
    }

    /// Consume the next argument as a `T` object and pass it to `f`.
    pub fn next_object<T: 'static, R>(&mut self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let index = self.args.position();
        let directive = self.directive;
        self.with_next(|arg| match arg {
            None => Err(FormatError::MissingArgument { index, directive }),
            Some(arg) => match arg.downcast_ref::<T>() {
                Some(value) => Ok(f(value)),
                None => Err(FormatError::ArgumentMismatch {
                    index,
                    directive,
                    found: arg.kind(),
                }),
            },
        })
    }
}

/// Copy `text` into `dst` the way an extension callback must: truncated to
/// leave room for a NUL, always terminated when `dst` is not empty. Returns
/// `text.len()`.
pub fn write_bounded(dst: &mut [u8], text: &[u8]) -> usize {
    if let Some(max) = dst.len().checked_sub(1) {
        let n = text.len().min(max);
        dst[..n].copy_from_slice(&text[..n]);
        dst[n] = 0;
    }
    text.len()
}

/// [`write_bounded`] for a decimal integer.
pub fn write_i64(dst: &mut [u8], value: i64) -> usize {
    int_fmt::copy_i64(dst, value)
}

/// [`write_bounded`] for an unsigned decimal integer.
pub fn write_u64(dst: &mut [u8], value: u64) -> usize {
    int_fmt::copy_u64(dst, value)
}

/// Named render callbacks, safe to share between threads with the
/// `threads` feature.
pub struct ExtensionRegistry {
    entries: Lock<Vec<Extension>>,
}

impl ExtensionRegistry {
    pub const fn new() -> Self {
        Self {
            entries: Lock::new(Vec::new()),
        }
    }

    /// Register `callback` under `name`.
    ///
    /// Names must be non-empty and free of `]`. Registering a name twice
    /// keeps both entries; lookups find the earlier one. Exceeding
    /// [`MAX_EXTENSIONS`] is fatal.
    pub fn register<F>(&self, name: &str, callback: F) -> Result<()>
    where
        F: Fn(&mut ExtensionCall<'_>, &mut [u8]) -> Result<usize> + Send + Sync + 'static,
    {
        if name.is_empty() || name.contains(']') {
            return Err(record(FormatError::InvalidExtensionName(name.to_owned())));
        }
        let callback: Arc<ExtensionFn> = Arc::new(callback);
        self.entries.with(|entries| {
            if entries.len() >= MAX_EXTENSIONS {
                fatal(format_args!(
                    "extension registry full ({MAX_EXTENSIONS} entries) registering {name:?}"
                ));
            }
            entries.push(Extension {
                name: name.to_owned(),
                callback,
            });
        });
        log::debug!("registered format extension {name:?}");
        Ok(())
    }

    /// Remove the earliest entry registered under exactly `name`.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.entries.with(|entries| {
            entries
                .iter()
                .position(|e| e.name == name)
                .map(|index| entries.remove(index))
        });
        match removed {
            Some(_) => {
                log::debug!("unregistered format extension {name:?}");
                true
            }
            None => false,
        }
    }

    /// Find the extension for a directive body. Returns the matched name's
    /// length and the callback; the lock is released before returning.
    pub fn resolve(&self, body: &str) -> Option<(usize, Arc<ExtensionFn>)> {
        self.entries.with(|entries| {
            let mut best: Option<&Extension> = None;
            for entry in entries.iter() {
                if body.starts_with(entry.name.as_str())
                    && best.is_none_or(|b| entry.name.len() > b.name.len())
                {
                    best = Some(entry);
                }
            }
            best.map(|e| (e.name.len(), Arc::clone(&e.callback)))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.with(|entries| entries.iter().any(|e| e.name == name))
    }

    pub fn len(&self) -> usize {
        self.entries.with(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .with(|entries| entries.iter().map(|e| e.name.clone()).collect())
    }

    /// Remove every extension.
    pub fn clear(&self) {
        self.entries.with(Vec::clear);
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textfmt_core::SliceArgs;

    fn noop(_: &mut ExtensionCall<'_>, _: &mut [u8]) -> Result<usize> {
        Ok(0)
    }

    fn matched(registry: &ExtensionRegistry, body: &str) -> Option<usize> {
        registry.resolve(body).map(|(len, _)| len)
    }

    #[test]
    fn longest_prefix_wins_in_either_order() {
        let forward = ExtensionRegistry::new();
        forward.register("u8", noop).unwrap();
        forward.register("u88", noop).unwrap();

        let reverse = ExtensionRegistry::new();
        reverse.register("u88", noop).unwrap();
        reverse.register("u8", noop).unwrap();

        for registry in [&forward, &reverse] {
            assert_eq!(matched(registry, "u8"), Some(2));
            assert_eq!(matched(registry, "u88"), Some(3));
            assert_eq!(matched(registry, "u8 width=3"), Some(2));
            assert_eq!(matched(registry, "u9"), None);
        }
    }

    #[test]
    fn duplicate_names_resolve_to_first() {
        let registry = ExtensionRegistry::new();
        registry.register("tag", |_, dst| Ok(write_bounded(dst, b"first"))).unwrap();
        registry.register("tag", |_, dst| Ok(write_bounded(dst, b"second"))).unwrap();
        assert_eq!(registry.len(), 2);

        let (_, callback) = registry.resolve("tag").unwrap();
        let mut args = SliceArgs::new(&[]);
        let mut call = ExtensionCall::new("tag", "", &mut args);
        let mut buf = [0u8; 16];
        assert_eq!(callback(&mut call, &mut buf).unwrap(), 5);
        assert_eq!(textfmt_core::content(&buf), b"first");

        assert!(registry.unregister("tag"));
        let (_, callback) = registry.resolve("tag").unwrap();
        let mut call = ExtensionCall::new("tag", "", &mut args);
        assert_eq!(callback(&mut call, &mut buf).unwrap(), 6);
    }

    #[test]
    fn unregister_unknown_is_false() {
        let registry = ExtensionRegistry::new();
        assert!(!registry.unregister("nope"));
        registry.register("x", noop).unwrap();
        assert!(registry.unregister("x"));
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_bad_names() {
        let registry = ExtensionRegistry::new();
        assert!(matches!(
            registry.register("", noop),
            Err(FormatError::InvalidExtensionName(_))
        ));
        assert!(matches!(
            registry.register("a]b", noop),
            Err(FormatError::InvalidExtensionName(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn call_reads_arguments() {
        let args = [FormatArg::Int(-1), FormatArg::Str("s")];
        let mut source = SliceArgs::new(&args);
        let mut call = ExtensionCall::new("n", "p", &mut source);
        assert_eq!(call.name(), "n");
        assert_eq!(call.params(), "p");
        assert_eq!(call.next_i64().unwrap(), -1);
        assert_eq!(call.position(), 1);
        assert!(matches!(
            call.next_i64(),
            Err(FormatError::ArgumentMismatch { index: 1, .. })
        ));
        assert!(matches!(
            call.next_u64(),
            Err(FormatError::MissingArgument { index: 2, .. })
        ));
    }

    #[test]
    fn write_bounded_truncates_and_terminates() {
        let mut buf = [0xffu8; 4];
        assert_eq!(write_bounded(&mut buf, b"hello"), 5);
        assert_eq!(&buf, b"hel\0");
        assert_eq!(write_bounded(&mut [], b"hello"), 5);
    }
}
