//! SQL literal rendering for result-set values.

use rusqlite::types::ValueRef;
use std::fmt::Write;

/// Append a floating-point value so it reads back as a REAL: shortest
/// round-trip form, with a forced `.0` when the digits alone would parse as
/// an integer.
fn push_float(out: &mut String, r: f64) {
    let start = out.len();
    let _ = write!(out, "{r}");
    if !out[start..].contains(['.', 'e', 'E', 'i', 'N']) {
        out.push_str(".0");
    }
}

/// Append `v` to `out` as an SQL literal.
///
/// Text is single-quoted with internal quotes doubled; blobs become lowercase
/// `x'..'` hex, except that a zero-length blob renders as NULL (the engine
/// reports it with a null pointer).
pub fn push_value(out: &mut String, v: ValueRef<'_>) {
    match v {
        ValueRef::Null => out.push_str("NULL"),
        ValueRef::Integer(i) => {
            let _ = write!(out, "{i}");
        }
        ValueRef::Real(r) => push_float(out, r),
        ValueRef::Text(t) => {
            let text = String::from_utf8_lossy(t);
            out.push('\'');
            for c in text.chars() {
                if c == '\'' {
                    out.push('\'');
                }
                out.push(c);
            }
            out.push('\'');
        }
        ValueRef::Blob(b) => push_blob(out, b),
    }
}

/// Append a blob as a lowercase `x'..'` hex literal (NULL when empty).
pub fn push_blob(out: &mut String, b: &[u8]) {
    if b.is_empty() {
        out.push_str("NULL");
        return;
    }
    out.push_str("x'");
    for byte in b {
        let _ = write!(out, "{byte:02x}");
    }
    out.push('\'');
}

/// Render `v` as a standalone SQL literal string.
pub fn sql_literal(v: ValueRef<'_>) -> String {
    let mut s = String::new();
    push_value(&mut s, v);
    s
}
