//! # RFC 8785 JSON Canonicalization Scheme (JCS)
//!
//! Signed results must hash to the same bytes on every machine that
//! re-serializes them. This module implements JCS and defines the fixed
//! signing form of an [`AggregatedResult`]:
//!
//! 1. Serialize the result to JSON.
//! 2. Remove the top-level `signature` member.
//! 3. Canonicalize per RFC 8785, UTF-8 encode.
//!
//! ## RFC 8785 Summary
//!
//! 1. **Object Keys**: Sorted by UTF-16 code units
//! 2. **Numbers**: ECMAScript shortest round-trip form
//! 3. **Strings**: Minimal escaping
//! 4. **Whitespace**: None
//! 5. **Arrays**: Original order
//!
//! ## References
//!
//! - **RFC 8785** - "JSON Canonicalization Scheme (JCS)"
//!   <https://www.rfc-editor.org/rfc/rfc8785>
//! - **ECMA-262** - Number::toString, section 6.1.6.1.20
//!
//! ## Example
//!
//! ```rust
//! use tribunal_registry::canonicalize::canonicalize;
//! use serde_json::json;
//!
//! let canon = canonicalize(&json!({"b": 1, "a": [true, null]}));
//! assert_eq!(canon, r#"{"a":[true,null],"b":1}"#);
//! ```

use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};
use tribunal_council::AggregatedResult;

use crate::models::Result;

/// Member excluded from the signing form.
pub const SIGNATURE_FIELD: &str = "signature";

/// Canonicalizes a JSON value according to RFC 8785.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// The exact bytes a result signature covers.
///
/// Any attached signature is ignored, so signing and verifying see the
/// same input.
pub fn canonical_bytes(result: &AggregatedResult) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(result)?;
    if let Value::Object(map) = &mut value {
        map.remove(SIGNATURE_FIELD);
    }
    Ok(canonicalize(&value).into_bytes())
}

/// Lowercase hex SHA-256 of [`canonical_bytes`], for logs and audit trails.
pub fn canonical_digest(result: &AggregatedResult) -> Result<String> {
    let bytes = canonical_bytes(result)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&canonicalize_number(n)),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(map, out),
    }
}

fn canonicalize_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => format_float(f),
        None => n.to_string(),
    }
}

/// ECMAScript `Number.prototype.toString` for finite doubles.
///
/// Rust's `Display` and `LowerExp` both emit the shortest round-trip
/// digits; only the switch to exponent form and its sign differ.
fn format_float(f: f64) -> String {
    if !f.is_finite() {
        return "null".to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    let abs = f.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", f);
    }
    let exp = format!("{:e}", f);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
        _ => exp,
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_object(map: &Map<String, Value>, out: &mut String) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_utf16(a, b));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(key, out);
        out.push(':');
        write_value(value, out);
    }
    out.push('}');
}

/// Orders keys by UTF-16 code units (RFC 8785 section 3.2.3).
fn compare_utf16(a: &str, b: &str) -> std::cmp::Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
