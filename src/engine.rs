//! The formatter.
//!
//! [`Formatter`] walks a template, copying literal text and rendering each
//! directive into a [`BoundedWriter`]. Plain `%d %i %u %s %c` are rendered
//! here; directives with flags, width or precision, and the radix and
//! floating-point conversions, go through `sprintf`. Extensions are looked up
//! in the formatter's [`ExtensionRegistry`].
//!
//! Rendering keeps counting after the destination fills, so
//! [`Rendered::required`] is always the length of the complete output.

#[cfg(feature = "threads")]
use std::sync::OnceLock;

use textfmt_core::{
    ArgSource, BoundedWriter, FormatArg, FormatError, Rendered, Result, SliceArgs, fatal,
    int_fmt, record, with_next_arg,
};

use crate::bound::BoundFormatString;
use crate::builtins::register_builtins;
use crate::registry::{ExtensionCall, ExtensionRegistry};
use crate::template::{Conversion, Directive, Flags, Piece, Pieces};

/// Largest width or precision a directive may request.
pub const MAX_FIELD: usize = 65_535;

/// Renders templates against arguments.
#[derive(Debug)]
pub struct Formatter {
    extensions: ExtensionRegistry,
}

impl Formatter {
    /// A formatter with the fixed-width integer extensions registered.
    pub fn new() -> Self {
        let formatter = Self::empty();
        if let Err(err) = register_builtins(&formatter.extensions) {
            fatal(format_args!("registering built-in extensions: {err}"));
        }
        formatter
    }

    /// A formatter with no extensions.
    pub const fn empty() -> Self {
        Self {
            extensions: ExtensionRegistry::new(),
        }
    }

    /// The process-wide formatter, created on first use with the built-in
    /// extensions.
    #[cfg(feature = "threads")]
    pub fn global() -> &'static Formatter {
        static GLOBAL: OnceLock<Formatter> = OnceLock::new();
        GLOBAL.get_or_init(Formatter::new)
    }

    /// Run `f` with the global formatter.
    #[cfg(feature = "threads")]
    pub fn with_global<R>(f: impl FnOnce(&Formatter) -> R) -> R {
        f(Self::global())
    }

    /// Run `f` with this thread's formatter, created on first use with the
    /// built-in extensions and dropped when the thread exits.
    #[cfg(not(feature = "threads"))]
    pub fn with_global<R>(f: impl FnOnce(&Formatter) -> R) -> R {
        thread_local! {
            static GLOBAL: Formatter = Formatter::new();
        }
        GLOBAL.with(f)
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// See [`ExtensionRegistry::register`].
    pub fn register_extension<F>(&self, name: &str, callback: F) -> Result<()>
    where
        F: Fn(&mut ExtensionCall<'_>, &mut [u8]) -> Result<usize> + Send + Sync + 'static,
    {
        self.extensions.register(name, callback)
    }

    /// See [`ExtensionRegistry::unregister`].
    pub fn unregister_extension(&self, name: &str) -> bool {
        self.extensions.unregister(name)
    }

    /// Render `template` into `dst`.
    ///
    /// At most `dst.len() - 1` bytes of output are stored, followed by a NUL
    /// when `dst` is not empty. On error `dst` holds the output up to the
    /// failing directive, terminated.
    pub fn format(&self, dst: &mut [u8], template: &str, args: &[FormatArg<'_>]) -> Result<Rendered> {
        self.format_from(dst, template, &mut SliceArgs::new(args))
    }

    /// [`Self::format`] with arguments read from any [`ArgSource`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn format_from(
        &self,
        dst: &mut [u8],
        template: &str,
        args: &mut dyn ArgSource,
    ) -> Result<Rendered> {
        let mut out = BoundedWriter::new(dst);
        let result = self.render(&mut out, template, args);
        let rendered = out.finish();
        if rendered.is_truncated() {
            log::trace!(
                "output truncated to {} of {} bytes",
                rendered.written,
                rendered.required
            );
        }
        result.map(|()| rendered).map_err(record)
    }

    /// Render a bound format string, reading each captured value now.
    pub fn format_bound(&self, dst: &mut [u8], bound: &BoundFormatString<'_>) -> Result<Rendered> {
        self.format_from(dst, bound.template(), &mut bound.args())
    }

    /// Render into a new `String` sized to fit.
    pub fn format_to_string(&self, template: &str, args: &[FormatArg<'_>]) -> Result<String> {
        let mut buf = vec![0u8; template.len() + 1];
        loop {
            let rendered = self.format(&mut buf, template, args)?;
            if !rendered.is_truncated() {
                buf.truncate(rendered.written);
                return String::from_utf8(buf).map_err(|_| record(FormatError::InvalidUtf8));
            }
            buf.resize(rendered.capacity_needed(), 0);
        }
    }

    fn render(
        &self,
        out: &mut BoundedWriter<'_>,
        template: &str,
        args: &mut dyn ArgSource,
    ) -> Result<()> {
        for piece in Pieces::new(template) {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Percent => out.push_byte(b'%'),
                Piece::Verbatim(text) => {
                    log::debug!("unknown directive {text:?} copied verbatim");
                    out.push_str(text);
                }
                Piece::Directive(d) if d.conversion == Conversion::Extension => {
                    self.extension(out, &d, args)?;
                }
                Piece::Directive(d) => {
                    let index = args.position();
                    with_next_arg(args, |arg| match arg {
                        Some(arg) => directive(out, &d, index, arg),
                        None => Err(FormatError::MissingArgument {
                            index,
                            directive: d.letter,
                        }),
                    })?;
                }
            }
        }
        Ok(())
    }

    fn extension(
        &self,
        out: &mut BoundedWriter<'_>,
        d: &Directive<'_>,
        args: &mut dyn ArgSource,
    ) -> Result<()> {
        let body = d.extension_body();
        let Some((name_len, callback)) = self.extensions.resolve(body) else {
            // The directive still owns one argument slot; skip it so later
            // directives read their own values.
            log::debug!("no extension matches {:?}", d.text);
            with_next_arg(args, |_| ());
            return Ok(());
        };
        let (name, params) = body.split_at(name_len);
        let mut call = ExtensionCall::new(name, params, args);
        let required = callback(&mut call, out.spare())?;
        out.advance(required);
        Ok(())
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

fn directive(
    out: &mut BoundedWriter<'_>,
    d: &Directive<'_>,
    index: usize,
    arg: FormatArg<'_>,
) -> Result<()> {
    let mismatch = || FormatError::ArgumentMismatch {
        index,
        directive: d.letter,
        found: arg.kind(),
    };

    if d.is_plain() {
        match d.conversion {
            Conversion::Signed => {
                let mut digits = [0u8; int_fmt::MAX_DECIMAL_LEN + 1];
                let n = int_fmt::copy_i64(&mut digits, arg.as_i64().ok_or_else(mismatch)?);
                out.push_bytes(&digits[..n]);
                return Ok(());
            }
            Conversion::Unsigned => {
                let mut digits = [0u8; int_fmt::MAX_DECIMAL_LEN + 1];
                let n = int_fmt::copy_u64(&mut digits, arg.as_u64().ok_or_else(mismatch)?);
                out.push_bytes(&digits[..n]);
                return Ok(());
            }
            Conversion::Str => {
                out.push_str(arg.as_str().ok_or_else(mismatch)?);
                return Ok(());
            }
            Conversion::Char => {
                out.push_char(arg.as_char().ok_or_else(mismatch)?);
                return Ok(());
            }
            _ => {}
        }
    }

    if d.width.is_some_and(|w| w > MAX_FIELD) || d.precision.is_some_and(|p| p > MAX_FIELD) {
        return Err(FormatError::Platform {
            specifier: d.text.to_owned(),
            message: format!("field width or precision above {MAX_FIELD}"),
        });
    }

    match d.conversion {
        Conversion::Signed => {
            let value = arg.as_i64().ok_or_else(mismatch)?;
            match d.precision {
                Some(precision) => {
                    integer(out, d, precision, value < 0, value.unsigned_abs());
                    Ok(())
                }
                None => delegate(out, d, &value),
            }
        }
        Conversion::Unsigned | Conversion::Octal | Conversion::Hex | Conversion::HexUpper => {
            let value = arg.as_u64().ok_or_else(mismatch)?;
            match d.precision {
                Some(precision) => {
                    integer(out, d, precision, false, value);
                    Ok(())
                }
                None => delegate(out, d, &value),
            }
        }
        Conversion::Char => delegate(out, d, &arg.as_char().ok_or_else(mismatch)?),
        Conversion::Str => {
            string(out, d, arg.as_str().ok_or_else(mismatch)?);
            Ok(())
        }
        #[cfg(feature = "float")]
        Conversion::Float => {
            let value = arg.as_f64().ok_or_else(mismatch)?;
            if matches!(d.letter, 'g' | 'G') && !d.flags.contains(Flags::ALTERNATE) {
                general_float(out, d, value)
            } else {
                delegate(out, d, &value)
            }
        }
        Conversion::Pointer => {
            pointer(out, d, arg.as_u64().ok_or_else(mismatch)?);
            Ok(())
        }
        // Routed to the registry before arguments are read.
        Conversion::Extension => Ok(()),
    }
}

/// Hand one directive to `sprintf` and copy its output.
fn delegate(out: &mut BoundedWriter<'_>, d: &Directive<'_>, value: &dyn sprintf::Printf) -> Result<()> {
    let spec = d.printf_spec();
    match sprintf::vsprintf(&spec, &[value]) {
        Ok(text) => {
            out.push_str(&text);
            Ok(())
        }
        Err(err) => Err(FormatError::Platform {
            specifier: d.text.to_owned(),
            message: format!("{err:?}"),
        }),
    }
}

/// `%s` with flags, width or precision. Precision and width count
/// characters rather than bytes, so multi-byte text is never split.
fn string(out: &mut BoundedWriter<'_>, d: &Directive<'_>, text: &str) {
    let text = match d.precision.and_then(|p| text.char_indices().nth(p)) {
        Some((end, _)) => &text[..end],
        None => text,
    };
    let fill = d.width.unwrap_or(0).saturating_sub(text.chars().count());
    let left = d.flags.contains(Flags::LEFT);
    if !left {
        (0..fill).for_each(|_| out.push_byte(b' '));
    }
    out.push_str(text);
    if left {
        (0..fill).for_each(|_| out.push_byte(b' '));
    }
}

/// Integer conversions with a precision. The digits are zero-filled to the
/// precision and the result is space padded to the width; `0` is ignored.
fn integer(
    out: &mut BoundedWriter<'_>,
    d: &Directive<'_>,
    precision: usize,
    negative: bool,
    magnitude: u64,
) {
    let alternate = d.flags.contains(Flags::ALTERNATE);
    let mut digits = match d.conversion {
        Conversion::Octal => format!("{magnitude:o}"),
        Conversion::Hex => format!("{magnitude:x}"),
        Conversion::HexUpper => format!("{magnitude:X}"),
        _ => magnitude.to_string(),
    };
    if precision == 0 && magnitude == 0 {
        digits.clear();
    }
    let mut min_digits = precision;
    if alternate && d.conversion == Conversion::Octal && !digits.starts_with('0') {
        min_digits = min_digits.max(digits.len() + 1);
    }
    let prefix = match d.conversion {
        Conversion::Signed if negative => "-",
        Conversion::Signed if d.flags.contains(Flags::PLUS) => "+",
        Conversion::Signed if d.flags.contains(Flags::SPACE) => " ",
        Conversion::Hex if alternate && magnitude != 0 => "0x",
        Conversion::HexUpper if alternate && magnitude != 0 => "0X",
        _ => "",
    };
    let zeros = min_digits.saturating_sub(digits.len());
    let fill = d
        .width
        .unwrap_or(0)
        .saturating_sub(prefix.len() + zeros + digits.len());
    let left = d.flags.contains(Flags::LEFT);
    if !left {
        (0..fill).for_each(|_| out.push_byte(b' '));
    }
    out.push_str(prefix);
    (0..zeros).for_each(|_| out.push_byte(b'0'));
    out.push_str(&digits);
    if left {
        (0..fill).for_each(|_| out.push_byte(b' '));
    }
}

/// `%g`/`%G` without `#`. `sprintf` keeps a bare decimal point (`1.e-10`),
/// so the number is rendered unpadded, the point dropped, then padded here.
#[cfg(feature = "float")]
fn general_float(out: &mut BoundedWriter<'_>, d: &Directive<'_>, value: f64) -> Result<()> {
    let mut spec = String::from("%");
    for (flag, c) in [(Flags::PLUS, '+'), (Flags::SPACE, ' ')] {
        if d.flags.contains(flag) {
            spec.push(c);
        }
    }
    if let Some(precision) = d.precision {
        spec.push('.');
        spec.push_str(&precision.to_string());
    }
    spec.push(d.letter);
    let arg: &dyn sprintf::Printf = &value;
    let mut text =
        sprintf::vsprintf(&spec, &[arg]).map_err(|err| FormatError::Platform {
            specifier: d.text.to_owned(),
            message: format!("{err:?}"),
        })?;
    if let Some(point) = text.find('.') {
        let rest = &text[point + 1..];
        if rest.is_empty() || rest.starts_with(['e', 'E']) {
            text.remove(point);
        }
    }

    let fill = d.width.unwrap_or(0).saturating_sub(text.len());
    if d.flags.contains(Flags::LEFT) {
        out.push_str(&text);
        (0..fill).for_each(|_| out.push_byte(b' '));
    } else if d.flags.contains(Flags::ZERO_PAD) && value.is_finite() {
        let sign = if text.starts_with(['+', '-', ' ']) { 1 } else { 0 };
        out.push_str(&text[..sign]);
        (0..fill).for_each(|_| out.push_byte(b'0'));
        out.push_str(&text[sign..]);
    } else {
        (0..fill).for_each(|_| out.push_byte(b' '));
        out.push_str(&text);
    }
    Ok(())
}

/// `%p`: `0x`-prefixed lowercase hex, `(nil)` for zero, space padded.
fn pointer(out: &mut BoundedWriter<'_>, d: &Directive<'_>, address: u64) {
    let text = if address == 0 {
        String::from("(nil)")
    } else {
        format!("{address:#x}")
    };
    let fill = d.width.unwrap_or(0).saturating_sub(text.len());
    let left = d.flags.contains(Flags::LEFT);
    if !left {
        (0..fill).for_each(|_| out.push_byte(b' '));
    }
    out.push_str(&text);
    if left {
        (0..fill).for_each(|_| out.push_byte(b' '));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use textfmt_core::{Address, content};

    fn render(template: &str, args: &[FormatArg<'_>]) -> String {
        Formatter::new().format_to_string(template, args).unwrap()
    }

    #[test]
    fn fast_path_conversions() {
        assert_eq!(render("%d|%i|%u", &args![-12, 7, 3u8]), "-12|7|3");
        assert_eq!(render("%s and %c", &args!["cats", 'é']), "cats and é");
        assert_eq!(render("%lld %hhu %zu", &args![-1i64, 255u8, 9usize]), "-1 255 9");
    }

    #[test]
    fn delegated_conversions() {
        assert_eq!(render("[%5d]", &args![42]), "[   42]");
        assert_eq!(render("[%-5d]", &args![42]), "[42   ]");
        assert_eq!(render("[%05d]", &args![42]), "[00042]");
        assert_eq!(render("%+d", &args![3]), "+3");
        assert_eq!(render("%x %X %o", &args![255, 255, 8]), "ff FF 10");
        assert_eq!(render("%#x", &args![255]), "0xff");
        assert_eq!(render("[%.2s]", &args!["abcdef"]), "[ab]");
    }

    #[test]
    fn integer_precision_matches_printf() {
        for (template, value, expected) in [
            ("%.3d", 7i64, "007"),
            ("%8.3d", -7, "    -007"),
            ("%-8.3d|", -7, "-007    |"),
            ("%+.2d", 5, "+05"),
            ("% .2d", 5, " 05"),
            ("%08.3d", 7, "     007"),
            ("%.0d", 0, ""),
            ("%5.0d|", 0, "     |"),
            ("%.5x", 255, "000ff"),
            ("%#.5x", 255, "0x000ff"),
            ("%#.3X", 0, "000"),
            ("%.4o", 8, "0010"),
            ("%#.0o", 0, "0"),
            ("%#.1o", 8, "010"),
            ("%.3u", 42, "042"),
            ("%.3i", -1, "-001"),
        ] {
            assert_eq!(render(template, &args![value]), expected, "{template}");
        }
    }

    #[test]
    fn string_precision_counts_characters() {
        assert_eq!(render("[%.1s]", &args!["éa"]), "[é]");
        assert_eq!(render("[%.2s]", &args!["héllo"]), "[hé]");
        assert_eq!(render("[%.0s]", &args!["abc"]), "[]");
        assert_eq!(render("[%4s]", &args!["é"]), "[   é]");
        assert_eq!(render("[%-4.2s]", &args!["abc"]), "[ab  ]");
    }

    #[cfg(feature = "float")]
    #[test]
    fn general_float_drops_bare_point() {
        for (template, value, expected) in [
            ("%g", 1e-10, "1e-10"),
            ("%G", 1e-10, "1E-10"),
            ("[%8g]", 1e-10, "[   1e-10]"),
            ("[%-8G]", 1e-10, "[1E-10   ]"),
            ("%09g", 1e-10, "00001e-10"),
        ] {
            assert_eq!(render(template, &args![value]), expected, "{template}");
        }
    }

    #[cfg(feature = "float")]
    #[test]
    fn floats() {
        assert_eq!(render("%.2f", &args![3.14159]), "3.14");
        assert_eq!(render("%f", &args![1.5]), "1.500000");
        assert_eq!(render("%.1f", &args![2]), "2.0");
    }

    #[test]
    fn percent_and_unknown() {
        assert_eq!(render("100%%", &[]), "100%");
        assert_eq!(render("%y%", &[]), "%y%");
    }

    #[test]
    fn pointers() {
        assert_eq!(render("%p", &args![Address(0xbeef)]), "0xbeef");
        assert_eq!(render("%p", &args![Address(0)]), "(nil)");
        assert_eq!(render("[%8p]", &args![Address(0x10)]), "[    0x10]");
        assert_eq!(render("[%-6p]", &args![Address(0)]), "[(nil) ]");
    }

    #[test]
    fn missing_argument_is_an_error() {
        let mut buf = [0u8; 32];
        let err = Formatter::new()
            .format(&mut buf, "a=%d b=%d", &args![1])
            .unwrap_err();
        assert_eq!(
            err,
            FormatError::MissingArgument {
                index: 1,
                directive: 'd'
            }
        );
        assert_eq!(content(&buf), b"a=1 b=");
        assert!(textfmt_core::last_error().is_some());
    }

    #[test]
    fn mismatched_argument_is_an_error() {
        let mut buf = [0u8; 8];
        let err = Formatter::new()
            .format(&mut buf, "%d", &args!["x"])
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::ArgumentMismatch {
                index: 0,
                directive: 'd',
                found: "str"
            }
        ));
    }

    #[test]
    fn oversized_width_is_rejected() {
        let mut buf = [0u8; 8];
        let err = Formatter::new()
            .format(&mut buf, "%99999d", &args![1])
            .unwrap_err();
        assert!(matches!(err, FormatError::Platform { .. }));
    }

    #[test]
    fn truncation_reports_full_length() {
        let mut buf = [0xaau8; 6];
        let rendered = Formatter::new()
            .format(&mut buf, "%s-%d", &args!["hello", 12345])
            .unwrap();
        assert_eq!(rendered.written, 5);
        assert_eq!(rendered.required, 11);
        assert_eq!(&buf, b"hello\0");
    }

    #[test]
    fn empty_destination_only_counts() {
        let rendered = Formatter::new().format(&mut [], "%d", &args![123]).unwrap();
        assert_eq!(rendered, Rendered { written: 0, required: 3 });
    }

    #[test]
    fn extension_writes_through_spare() {
        let formatter = Formatter::empty();
        formatter
            .register_extension("hex", |call, dst| {
                let v = call.next_u64()?;
                Ok(crate::registry::write_bounded(dst, format!("{v:x}").as_bytes()))
            })
            .unwrap();
        assert_eq!(
            formatter.format_to_string("<%[hex]>", &args![255]).unwrap(),
            "<ff>"
        );
        // Unmatched extensions render nothing but still take their argument.
        assert_eq!(
            formatter.format_to_string("<%[nope]%d>", &args![5, 7]).unwrap(),
            "<7>"
        );
        assert_eq!(formatter.format_to_string("<%[nope]>", &[]).unwrap(), "<>");
    }

    #[test]
    fn global_formatter_has_builtins_on_every_thread() {
        let here = Formatter::with_global(|f| f.format_to_string("%[u8]", &args![300]));
        let there = std::thread::spawn(|| {
            Formatter::with_global(|f| f.format_to_string("%[u8]", &args![301]))
        })
        .join()
        .unwrap();
        assert_eq!(here.unwrap(), "44");
        assert_eq!(there.unwrap(), "45");
    }

    #[test]
    fn builtins_narrow() {
        assert_eq!(render("%[u8] %[i8]", &args![300, 200]), "44 -56");
        assert_eq!(render("%[u16]", &args![-1]), "65535");
        assert_eq!(render("%[i64]", &args![u64::MAX]), "-1");
    }
}
