//! End-to-end rendering through the public API.

use textfmt::{FormatArg, FormatError, Formatter, Rendered, args};

fn formatter() -> Formatter {
    Formatter::new()
}

#[test]
fn renders_into_a_roomy_buffer() {
    let mut buf = [0u8; 16];
    let rendered = formatter()
        .format(&mut buf, "%d apples", &args![5])
        .unwrap();
    assert_eq!(rendered, Rendered { written: 8, required: 8 });
    assert_eq!(&buf[..9], b"5 apples\0");
}

#[test]
fn truncates_to_capacity_and_reports_full_length() {
    let mut buf = [0xffu8; 3];
    let rendered = formatter()
        .format(&mut buf, "%d apples", &args![5])
        .unwrap();
    assert_eq!(rendered.written, 2);
    assert_eq!(rendered.required, 8);
    assert_eq!(rendered.capacity_needed(), 9);
    // Byte-granular: the stored text is a prefix of the full output.
    assert_eq!(&buf, b"5 \0");
}

#[test]
fn retry_with_reported_size_fits() {
    let f = formatter();
    let template = "%s has %u items (%s)";
    let args = args!["inventory", 1234u32, "full"];

    let mut small = [0u8; 4];
    let first = f.format(&mut small, template, &args).unwrap();
    let mut exact = vec![0u8; first.capacity_needed()];
    let second = f.format(&mut exact, template, &args).unwrap();

    assert!(!second.is_truncated());
    assert_eq!(second.required, first.required);
    assert_eq!(
        std::str::from_utf8(&exact[..second.written]).unwrap(),
        "inventory has 1234 items (full)"
    );
}

#[test]
fn zero_capacity_writes_nothing() {
    let mut buf: [u8; 0] = [];
    let rendered = formatter().format(&mut buf, "abc%d", &args![42]).unwrap();
    assert_eq!(rendered, Rendered { written: 0, required: 5 });
}

#[test]
fn capacity_one_holds_only_the_terminator() {
    let mut buf = [0xffu8; 1];
    let rendered = formatter().format(&mut buf, "abc", &[]).unwrap();
    assert_eq!(rendered.written, 0);
    assert_eq!(buf, [0]);
}

#[test]
fn mixed_directives() {
    let text = formatter()
        .format_to_string(
            "%-6s|%6s|%c%c|%i%%",
            &args!["left", "right", 'o', 'k', 99],
        )
        .unwrap();
    assert_eq!(text, "left  | right|ok|99%");
}

#[cfg(feature = "float")]
#[test]
fn float_precision() {
    let text = formatter()
        .format_to_string("%.3f|%8.2f|%-6.1f|", &args![2.0f64 / 3.0, 3.14159, 2.5f32])
        .unwrap();
    assert_eq!(text, "0.667|    3.14|2.5   |");
}

#[test]
fn unknown_directive_is_copied_and_takes_no_argument() {
    let text = formatter()
        .format_to_string("%w then %d", &args![3])
        .unwrap();
    assert_eq!(text, "%w then 3");
}

#[test]
fn errors_are_recorded_for_the_thread() {
    textfmt::clear_last_error();
    let mut buf = [0u8; 8];
    let err = formatter().format(&mut buf, "%s", &[]).unwrap_err();
    assert_eq!(
        err,
        FormatError::MissingArgument {
            index: 0,
            directive: 's'
        }
    );
    assert_eq!(textfmt::last_error(), Some(err.to_string()));
}

#[test]
fn objects_need_an_extension() {
    #[derive(Debug)]
    struct Point;
    let point = Point;
    let mut buf = [0u8; 8];
    let err = formatter()
        .format(&mut buf, "%d", &[FormatArg::Object(&point)])
        .unwrap_err();
    assert!(matches!(err, FormatError::ArgumentMismatch { found: "object", .. }));
}

#[test]
fn global_formatter_has_builtins() {
    assert_eq!(textfmt::format_to_string("%[u8]", &args![257]).unwrap(), "1");
    let mut buf = [0u8; 4];
    let rendered = textfmt::format(&mut buf, "%[i16]", &args![40000]).unwrap();
    assert_eq!(rendered.required, 6);
    assert_eq!(&buf, b"-25\0");
}

#[cfg(feature = "codec")]
#[test]
fn formatted_text_round_trips_through_a_codec() {
    use textfmt::codec::{Encoding, import_str};

    let text = formatter().format_to_string("h%cllo", &args!['é']).unwrap();
    let units = import_str("UTF-8", &text).unwrap();
    assert_eq!(units.len(), 5);
    assert_eq!(Encoding::Utf8.export_to_vec(units.units()).unwrap(), text.as_bytes());
}

/// Legacy callers read the stored byte count while newer ones expect the
/// `snprintf` total. Both are reported and they disagree once output is cut.
#[test]
fn stored_and_required_counts_diverge_on_truncation() {
    let mut buf = [0u8; 3];
    let rendered = formatter()
        .format(&mut buf, "%d apples", &args![5])
        .unwrap();
    assert_ne!(rendered.written, rendered.required);

    let mut roomy = [0u8; 64];
    let rendered = formatter()
        .format(&mut roomy, "%d apples", &args![5])
        .unwrap();
    assert_eq!(rendered.written, rendered.required);
}
