//! Template grammar.
//!
//! A template is literal text with `%` directives:
//!
//! ```text
//! %%                     literal percent
//! %[flags][width][.precision][length]conversion
//! %[name params]         extension, dispatched through the registry
//!
//! flags       # 0 - + space '
//! length      hh h l ll j z t L q    (accepted, ignored: arguments are 64-bit)
//! conversion  d i u o x X c s p      and f F e E g G with the `float` feature
//! ```
//!
//! [`Pieces`] walks a template left to right and yields [`Piece`]s. It never
//! fails: an unknown conversion becomes [`Piece::Verbatim`], which renders
//! the directive text unchanged and consumes no argument.

use bitflags::bitflags;

bitflags! {
    /// printf flag characters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// `#`
        const ALTERNATE = 1 << 0;
        /// `0`
        const ZERO_PAD = 1 << 1;
        /// `-`
        const LEFT = 1 << 2;
        /// `+`
        const PLUS = 1 << 3;
        /// ` `
        const SPACE = 1 << 4;
        /// `'` (thousands grouping; accepted and ignored)
        const GROUPING = 1 << 5;
    }
}

impl Flags {
    fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            b'#' => Flags::ALTERNATE,
            b'0' => Flags::ZERO_PAD,
            b'-' => Flags::LEFT,
            b'+' => Flags::PLUS,
            b' ' => Flags::SPACE,
            b'\'' => Flags::GROUPING,
            _ => return None,
        })
    }
}

/// Length modifier. Parsed for compatibility only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Length {
    #[default]
    None,
    /// `hh`
    Char,
    /// `h`
    Short,
    /// `l`
    Long,
    /// `ll` or `q`
    LongLong,
    /// `j`
    Max,
    /// `z`
    Size,
    /// `t`
    PtrDiff,
    /// `L`
    LongDouble,
}

/// What a directive renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `d`, `i`
    Signed,
    /// `u`
    Unsigned,
    /// `o`
    Octal,
    /// `x`
    Hex,
    /// `X`
    HexUpper,
    /// `c`
    Char,
    /// `s`
    Str,
    /// `p`
    Pointer,
    /// `f F e E g G`
    #[cfg(feature = "float")]
    Float,
    /// `[name...]`
    Extension,
}

impl Conversion {
    fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            b'd' | b'i' => Conversion::Signed,
            b'u' => Conversion::Unsigned,
            b'o' => Conversion::Octal,
            b'x' => Conversion::Hex,
            b'X' => Conversion::HexUpper,
            b'c' => Conversion::Char,
            b's' => Conversion::Str,
            b'p' => Conversion::Pointer,
            #[cfg(feature = "float")]
            b'f' | b'F' | b'e' | b'E' | b'g' | b'G' => Conversion::Float,
            b'[' => Conversion::Extension,
            _ => return None,
        })
    }
}

/// One parsed `%` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive<'t> {
    /// The full directive text, `%` included.
    pub text: &'t str,
    pub flags: Flags,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub length: Length,
    pub conversion: Conversion,
    /// The conversion character as written (`[` for extensions).
    pub letter: char,
    /// Extension body: the text between `[` and `]`.
    body: &'t str,
}

impl<'t> Directive<'t> {
    /// No flags, width or precision. Length modifiers do not count.
    pub fn is_plain(&self) -> bool {
        self.flags.is_empty() && self.width.is_none() && self.precision.is_none()
    }

    /// For `%[name params]`, the text `name params`.
    pub fn extension_body(&self) -> &'t str {
        self.body
    }

    /// The directive rewritten for the printf-style formatter: flags other
    /// than grouping, width, precision, and the conversion letter. Length
    /// modifiers are dropped and `i`/`u` are spelled `d`.
    pub fn printf_spec(&self) -> String {
        let mut spec = String::with_capacity(self.text.len());
        spec.push('%');
        for (flag, c) in [
            (Flags::ALTERNATE, '#'),
            (Flags::ZERO_PAD, '0'),
            (Flags::LEFT, '-'),
            (Flags::PLUS, '+'),
            (Flags::SPACE, ' '),
        ] {
            if self.flags.contains(flag) {
                spec.push(c);
            }
        }
        if let Some(width) = self.width {
            spec.push_str(&width.to_string());
        }
        if let Some(precision) = self.precision {
            spec.push('.');
            spec.push_str(&precision.to_string());
        }
        spec.push(match self.letter {
            'i' | 'u' => 'd',
            other => other,
        });
        spec
    }
}

/// A template fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'t> {
    /// Text copied unchanged.
    Literal(&'t str),
    /// `%%`
    Percent,
    /// A directive the grammar does not know, or a trailing lone `%`;
    /// copied unchanged, consumes no argument.
    Verbatim(&'t str),
    Directive(Directive<'t>),
}

impl Piece<'_> {
    /// Whether rendering this piece reads an argument.
    pub fn takes_argument(&self) -> bool {
        matches!(self, Piece::Directive(_))
    }
}

/// Iterator over the pieces of a template.
pub struct Pieces<'t> {
    template: &'t str,
    pos: usize,
}

impl<'t> Pieces<'t> {
    pub fn new(template: &'t str) -> Self {
        Self { template, pos: 0 }
    }

    #[inline]
    fn peek(&self, at: usize) -> Option<u8> {
        self.template.as_bytes().get(at).copied()
    }

    fn digits(&self, at: &mut usize) -> Option<usize> {
        let start = *at;
        let mut value: usize = 0;
        while let Some(b) = self.peek(*at).filter(u8::is_ascii_digit) {
            value = value.saturating_mul(10).saturating_add(usize::from(b - b'0'));
            *at += 1;
        }
        (*at > start).then_some(value)
    }

    /// Parse the directive starting at `self.pos` (which holds `%`).
    fn directive(&mut self) -> Piece<'t> {
        let template = self.template;
        let start = self.pos;
        let mut at = start + 1;

        match self.peek(at) {
            None => {
                self.pos = at;
                return Piece::Verbatim(&template[start..at]);
            }
            Some(b'%') => {
                self.pos = at + 1;
                return Piece::Percent;
            }
            _ => {}
        }

        let mut flags = Flags::empty();
        while let Some(flag) = self.peek(at).and_then(Flags::from_byte) {
            flags |= flag;
            at += 1;
        }
        let width = self.digits(&mut at);
        let precision = if self.peek(at) == Some(b'.') {
            at += 1;
            Some(self.digits(&mut at).unwrap_or(0))
        } else {
            None
        };
        let length = self.length(&mut at);

        let Some(letter) = self.peek(at) else {
            self.pos = at;
            return Piece::Verbatim(&template[start..at]);
        };
        let Some(conversion) = Conversion::from_byte(letter) else {
            // Keep a multi-byte character whole.
            let end = at + template[at..].chars().next().map_or(1, char::len_utf8);
            self.pos = end;
            return Piece::Verbatim(&template[start..end]);
        };
        at += 1;

        let mut body = "";
        if conversion == Conversion::Extension {
            let rest = &template[at..];
            match rest.find(']') {
                Some(close) => {
                    body = &rest[..close];
                    at += close + 1;
                }
                None => {
                    body = rest;
                    at = template.len();
                }
            }
        }

        self.pos = at;
        Piece::Directive(Directive {
            text: &template[start..at],
            flags,
            width,
            precision,
            length,
            conversion,
            letter: char::from(letter),
            body,
        })
    }

    fn length(&self, at: &mut usize) -> Length {
        let (length, len) = match (self.peek(*at), self.peek(*at + 1)) {
            (Some(b'h'), Some(b'h')) => (Length::Char, 2),
            (Some(b'h'), _) => (Length::Short, 1),
            (Some(b'l'), Some(b'l')) => (Length::LongLong, 2),
            (Some(b'l'), _) => (Length::Long, 1),
            (Some(b'q'), _) => (Length::LongLong, 1),
            (Some(b'j'), _) => (Length::Max, 1),
            (Some(b'z'), _) => (Length::Size, 1),
            (Some(b't'), _) => (Length::PtrDiff, 1),
            (Some(b'L'), _) => (Length::LongDouble, 1),
            _ => (Length::None, 0),
        };
        *at += len;
        length
    }
}

impl<'t> Iterator for Pieces<'t> {
    type Item = Piece<'t>;

    fn next(&mut self) -> Option<Piece<'t>> {
        let rest = self.template.get(self.pos..).filter(|r| !r.is_empty())?;
        match rest.find('%') {
            Some(0) => Some(self.directive()),
            Some(n) => {
                self.pos += n;
                Some(Piece::Literal(&rest[..n]))
            }
            None => {
                self.pos = self.template.len();
                Some(Piece::Literal(rest))
            }
        }
    }
}

/// Number of arguments rendering `template` reads.
pub fn count_arguments(template: &str) -> usize {
    Pieces::new(template).filter(Piece::takes_argument).count()
}
