//! Serialization, hashing and number-base conversions.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use crate::value::{Value, format_number};
use crate::vm::{VmError, VmResult};

use super::{Context, Params};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
/// Fractional digits emitted by `to_base` before giving up.
const FRACTION_DIGITS: usize = 10;
const EPSILON: f64 = 1e-7;

/// `json_encode(value, pretty?)`. Object keys come out sorted.
pub fn json_encode(p: &Params) -> Value {
    let json = p.get(0).to_json();
    let text = if p.flag(1) { serde_json::to_string_pretty(&json) } else { serde_json::to_string(&json) };
    Value::String(text.unwrap_or_default())
}

pub fn json_decode(ctx: &Context, p: &Params) -> VmResult<Value> {
    let Value::String(text) = p.get(0) else {
        return Err(VmError::Raised("Input to json_decode is not a string".into()));
    };
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from)
        .map_err(|e| VmError::Raised(format!("JSON parse error at line {}: {e}", ctx.line)))
}

pub fn json_valid(p: &Params) -> Value {
    let valid = match p.get(0) {
        Value::String(text) => serde_json::from_str::<serde_json::Value>(text).is_ok(),
        _ => false,
    };
    Value::Bool(valid)
}

pub fn b64_encode(p: &Params) -> Value {
    Value::String(STANDARD.encode(p.text(0)))
}

/// Decoded bytes as text. Invalid UTF-8 sequences become U+FFFD.
pub fn b64_decode(ctx: &mut Context, p: &Params) -> Value {
    match STANDARD.decode(p.text(0)) {
        Ok(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            ctx.warn(format!("Invalid base64 input ({e}). Returning an empty string."));
            Value::String(String::new())
        }
    }
}

/// Lowercase SHA-256 hex digest of the string form.
pub fn hash(p: &Params) -> Value {
    let digest = Sha256::digest(p.text(0).as_bytes());
    Value::String(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// `hex(n, width)`: zero-padded lowercase hexadecimal of the integer part.
pub fn hex(ctx: &mut Context, p: &Params) -> Value {
    let n = p.num(0) as i64;
    let width = ctx.width("hex", p.num(1));
    Value::String(format!("{n:0width$x}"))
}

/// Big-endian split of an integer into `count` bytes.
pub fn bytes(p: &Params) -> Value {
    let n = p.num(0) as i64;
    let count = p.num(1).clamp(0.0, 8.0) as u32;
    Value::Array((0..count).rev().map(|i| Value::from((n >> (i * 8)) & 0xff)).collect())
}

/// Inverse of [`bytes`]. Accepts one array param or the bytes as params.
pub fn from_bytes(p: &Params) -> Value {
    let list = match p.get(0) {
        Value::Array(items) => items.clone(),
        _ => p.as_slice().to_vec(),
    };
    let n = list.iter().fold(0i64, |acc, b| acc.wrapping_mul(256).wrapping_add((b.to_number() as i64) % 256));
    Value::from(n)
}

pub fn to_base(ctx: &mut Context, p: &Params) -> Value {
    let number = p.num(0);
    let base = p.num(1) as i64;
    if !(2..=36).contains(&base) {
        ctx.warn("Base must be between 2 and 36.");
        return Value::String(String::new());
    }
    let width = ctx.width("to_base", p.num(2));
    let text = if base == 10 { format_number(number) } else { digits_in_base(number, base as u32) };
    Value::String(format!("{text:0>width$}"))
}

fn digits_in_base(number: f64, base: u32) -> String {
    let magnitude = number.abs();
    let mut integer = magnitude.trunc() as u64;
    let mut fraction = magnitude.fract();
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(integer % u64::from(base)) as usize]);
        integer /= u64::from(base);
        if integer == 0 {
            break;
        }
    }
    out.reverse();
    if fraction > EPSILON {
        out.push(b'.');
        for _ in 0..FRACTION_DIGITS {
            fraction *= f64::from(base);
            out.push(DIGITS[fraction.floor() as usize % 36]);
            fraction = fraction.fract();
            if fraction < EPSILON {
                break;
            }
        }
    }
    let text = String::from_utf8_lossy(&out).into_owned();
    if number < 0.0 { format!("-{text}") } else { text }
}

pub fn from_base(ctx: &mut Context, p: &Params) -> Value {
    let text = p.text(0);
    let base = p.num(1) as i64;
    if !(2..=36).contains(&base) {
        ctx.warn("In from_base(), base must be between 2 and 36.");
        return Value::from(0.0);
    }
    let base = base as u32;
    let (negative, body) = match text.trim().strip_prefix('-') {
        Some(rest) => (true, rest.to_string()),
        None => (false, text.trim().to_string()),
    };
    let (int_text, frac_text) = body.split_once('.').unwrap_or((body.as_str(), ""));
    let digit = |c: char| f64::from(c.to_digit(36).unwrap_or(0));

    let integer = int_text.chars().fold(0.0, |acc, c| acc * f64::from(base) + digit(c));
    let mut place = f64::from(base);
    let mut fraction = 0.0;
    for c in frac_text.chars() {
        fraction += digit(c) / place;
        place *= f64::from(base);
    }
    let n = integer + fraction;
    Value::from(if negative { -n } else { n })
}
