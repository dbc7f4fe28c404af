//! Lexical conversions between `f64` and the `xs:double` text form.

/// Parses an `xs:double` literal.
///
/// Accepts decimal and exponent notation plus the special forms `NaN`, `INF`,
/// `+INF` and `-INF`. Rust-only spellings such as `inf` or `infinity` are
/// rejected so that everything accepted here also validates against the
/// schema type.
pub fn parse_double(text: &str) -> Option<f64> {
    match text {
        "NaN" => return Some(f64::NAN),
        "INF" | "+INF" => return Some(f64::INFINITY),
        "-INF" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    let lexical_ok = !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && text.bytes().any(|b| b.is_ascii_digit());
    if !lexical_ok {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Formats a value for a `<result>` element.
///
/// Finite values use plain decimal notation and keep a trailing `.0` when
/// integral; non-finite values use the `xs:double` spellings.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF".to_owned() } else { "-INF".to_owned() };
    }
    let mut text = value.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}
