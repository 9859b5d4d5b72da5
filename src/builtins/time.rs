//! Clock and calendar helpers. Epoch conversions use the local time zone.

use chrono::{DateTime, Datelike, Local, LocalResult, TimeZone, Timelike};

use crate::value::{Object, Value, format_number};

use super::{Context, Params};

/// Splits seconds since midnight into `[hour, min, sec, milli]`.
pub fn clocktime(p: &Params) -> Value {
    let timestamp = p.num(0);
    let seconds = timestamp as i64;
    Value::Array(vec![
        Value::from(seconds / 3600),
        Value::from(seconds / 60 % 60),
        Value::from(seconds % 60),
        Value::from((timestamp - timestamp.floor()) * 1000.0),
    ])
}

fn iso_time(hour: i64, min: i64, sec: f64) -> String {
    let mut out = format!("{hour:02}:{min:02}:{:02}", sec as i64);
    let frac = sec.fract();
    if frac > 1e-6 {
        let digits = format_number((frac * 1e6).round() / 1e6);
        out.push('.');
        out.push_str(digits.trim_start_matches('0').trim_start_matches('.'));
    }
    out
}

/// `time(seconds)` or `time([hour, min, sec, milli?])` as `HH:MM:SS[.frac]`.
pub fn time(ctx: &mut Context, p: &Params) -> Value {
    let text = match p.get(0) {
        Value::Array(parts) if parts.len() >= 3 => {
            let milli = parts.get(3).map_or(0.0, |m| m.to_number() / 1000.0);
            iso_time(parts[0].to_number() as i64, parts[1].to_number() as i64, parts[2].to_number() + milli)
        }
        Value::Array(_) => {
            ctx.warn("Time array must have 4 elements: [hour, min, sec, milli].");
            "00:00:00".to_string()
        }
        other => {
            let t = other.to_number();
            let hour = (t / 3600.0) as i64;
            let min = ((t - hour as f64 * 3600.0) / 60.0) as i64;
            iso_time(hour, min, t - hour as f64 * 3600.0 - min as f64 * 60.0)
        }
    };
    Value::String(text)
}

/// `date([day, month, year])` as `YYYY-MM-DD`.
pub fn date(ctx: &mut Context, p: &Params) -> Value {
    let text = match p.get(0) {
        Value::Array(parts) if parts.len() >= 3 => {
            let field = |i: usize| parts[i].to_number() as i64;
            format!("{:04}-{:02}-{:02}", field(2), field(1), field(0))
        }
        Value::Array(_) => {
            ctx.warn("Date array must have 3 elements: [day, month, year].");
            "0000-00-00".to_string()
        }
        _ => {
            ctx.warn("Date requires an array [day, month, year].");
            "0000-00-00".to_string()
        }
    };
    Value::String(text)
}

/// `[hour, min, sec, milli]` back to seconds since midnight.
pub fn timestamp(p: &Params) -> Value {
    let Value::Array(parts) = p.get(0) else {
        return Value::from(0.0);
    };
    let part = |i: usize| parts.get(i).map_or(0.0, Value::to_number);
    Value::from(part(0) * 3600.0 + part(1) * 60.0 + part(2) + part(3) / 1000.0)
}

pub fn epochnow() -> Value {
    Value::from(Local::now().timestamp())
}

fn local(ts: i64) -> Option<DateTime<Local>> {
    match Local.timestamp_opt(ts, 0) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(t, _) => Some(t),
        LocalResult::None => None,
    }
}

/// `{date: [day, month, year], time: [hour, min, sec]}` for an epoch.
pub fn fromepoch(p: &Params) -> Value {
    let Some(t) = local(p.num(0) as i64) else {
        return Value::Null;
    };
    let mut out = Object::new();
    out.insert(
        "date".into(),
        Value::Array(vec![Value::from(f64::from(t.day())), Value::from(f64::from(t.month())), Value::from(f64::from(t.year()))]),
    );
    out.insert(
        "time".into(),
        Value::Array(vec![Value::from(f64::from(t.hour())), Value::from(f64::from(t.minute())), Value::from(f64::from(t.second()))]),
    );
    Value::Object(out)
}

/// Inverse of [`fromepoch`]. Missing fields default to 1970-01-01 00:00:00;
/// a date that does not exist yields Null.
pub fn toepoch(p: &Params) -> Value {
    let fields = p.get(0).to_object();
    let date = fields.get("date").map(Value::to_array).unwrap_or_default();
    let time = fields.get("time").map(Value::to_array).unwrap_or_default();
    let at = |parts: &[Value], i: usize, default: f64| parts.get(i).map_or(default, Value::to_number);

    let year = at(&date, 2, 1970.0) as i32;
    let month = at(&date, 1, 1.0).max(0.0) as u32;
    let day = at(&date, 0, 1.0).max(0.0) as u32;
    let hour = at(&time, 0, 0.0).max(0.0) as u32;
    let minute = at(&time, 1, 0.0).max(0.0) as u32;
    let second = at(&time, 2, 0.0).max(0.0) as u32;

    match Local.with_ymd_and_hms(year, month, day, hour, minute, second) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Value::from(t.timestamp()),
        LocalResult::None => Value::Null,
    }
}
