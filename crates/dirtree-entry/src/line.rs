//! LDIF attribute-line encoding.
//!
//! A value is written as `name: value` unless it would not survive a plain
//! text line, in which case it is written as `name:: <base64>`. A value
//! needs base64 when it:
//! - starts with NUL, LF, CR, space, `:` or `<`
//! - ends with a space
//! - contains NUL, LF, CR or any byte above 127

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Returns `true` if `value` must be written in base64 form.
pub fn needs_base64(value: &[u8]) -> bool {
    let Some((&first, _)) = value.split_first() else {
        return false;
    };
    if matches!(first, 0 | b'\n' | b'\r' | b' ' | b':' | b'<') {
        return true;
    }
    if value.last() == Some(&b' ') {
        return true;
    }
    value
        .iter()
        .any(|&b| b == 0 || b == b'\n' || b == b'\r' || b > 127)
}

/// Append one `name: value` line, including the newline, to `out`.
pub fn write_line(out: &mut String, name: &str, value: &[u8]) {
    out.push_str(name);
    if needs_base64(value) {
        out.push_str(":: ");
        out.push_str(&STANDARD.encode(value));
    } else {
        out.push_str(": ");
        // needs_base64 rejected every non-ASCII byte, so this is valid UTF-8.
        out.push_str(&String::from_utf8_lossy(value));
    }
    out.push('\n');
}

/// Format one `name: value` line, including the newline.
///
/// ```
/// use dirtree_entry::line::format_line;
///
/// assert_eq!(format_line("cn", b"foo"), "cn: foo\n");
/// assert_eq!(format_line("cn", b" foo"), "cn:: IGZvbw==\n");
/// ```
pub fn format_line(name: &str, value: &[u8]) -> String {
    let mut out = String::new();
    write_line(&mut out, name, value);
    out
}
