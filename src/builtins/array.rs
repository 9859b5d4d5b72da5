//! List and object manipulation. Positions are 1-based; negative positions
//! count back from the end.

use std::cmp::Ordering;

use crate::value::{Object, Value};
use crate::vm::variables::zero_based;

use super::{Context, Params};

/// Resolves a 1-based position into `0..limit`, warning with `action` when
/// it is zero or out of range.
fn slot(ctx: &mut Context, raw: &Value, len: usize, limit: usize, action: &str) -> Option<usize> {
    if raw.to_number() as i64 == 0 {
        ctx.warn(format!("Array indexes start at 1, not 0. {action}() will have no effect."));
        return None;
    }
    match zero_based(raw, len) {
        Some(i) if i < limit => Some(i),
        _ => {
            ctx.warn(format!("Array index out of bounds. {action}() will have no effect."));
            None
        }
    }
}

/// `append`/`merge`: the first list followed by the elements of the second.
pub fn append(p: &Params) -> Value {
    let mut list = p.array(0);
    list.extend(p.array(1));
    Value::Array(list)
}

pub fn update(ctx: &mut Context, p: &Params) -> Value {
    let mut list = p.array(0);
    if let Some(i) = slot(ctx, p.get(1), list.len(), list.len(), "update") {
        list[i] = p.get(2).clone();
    }
    Value::Array(list)
}

/// Inserts before the given position; one past the end appends.
pub fn insert(ctx: &mut Context, p: &Params) -> Value {
    let mut list = p.array(0);
    if let Some(i) = slot(ctx, p.get(1), list.len(), list.len() + 1, "insert") {
        list.insert(i, p.get(2).clone());
    }
    Value::Array(list)
}

pub fn delete(ctx: &mut Context, p: &Params) -> Value {
    let mut list = p.array(0);
    if let Some(i) = slot(ctx, p.get(1), list.len(), list.len(), "delete") {
        list.remove(i);
    }
    Value::Array(list)
}

/// `splice(list, start, end, replacement)`: replaces `list[start..=end]`.
pub fn splice(ctx: &mut Context, p: &Params) -> Value {
    let list = p.array(0);
    let start = p.num(1) as i64;
    let end = p.num(2) as i64;
    let replacement = p.array(3);
    if start == 0 || end == 0 {
        ctx.warn("Array indexes start at 1, not 0.");
    }
    let len = list.len() as i64;
    let from = match start {
        s if s > 0 => s - 1,
        s if s < 0 => len + s,
        _ => 0,
    };
    let from = from.clamp(0, len) as usize;
    let to = if end >= 0 { end } else { len + end + 1 };
    let to = to.clamp(from as i64, len) as usize;

    let mut out = Vec::with_capacity(list.len() + replacement.len());
    out.extend_from_slice(&list[..from]);
    out.extend(replacement);
    out.extend_from_slice(&list[to..]);
    Value::Array(out)
}

/// Position of the first occurrence (element or substring), or 0.
pub fn index(p: &Params) -> Value {
    let pos = match p.get(0) {
        Value::Array(items) => items.iter().position(|v| v == p.get(1)),
        other => {
            let text = other.to_string();
            text.find(&p.text(1)).map(|byte| text[..byte].chars().count())
        }
    };
    Value::from(pos.map_or(0, |i| i + 1))
}

/// `find(data, value, nth)`: position of the nth occurrence, or 0.
pub fn find(p: &Params) -> Value {
    let nth = (p.num(2) as i64).max(1) as usize;
    let pos = match p.get(0) {
        Value::Array(items) => {
            let needle = p.get(1);
            items.iter().enumerate().filter(|(_, v)| *v == needle).nth(nth - 1).map(|(i, _)| i)
        }
        other => {
            let text = other.to_string();
            let needle = p.text(1);
            if needle.is_empty() {
                None
            } else {
                text.match_indices(&needle).nth(nth - 1).map(|(byte, _)| text[..byte].chars().count())
            }
        }
    };
    Value::from(pos.map_or(0, |i| i + 1))
}

pub fn count(ctx: &mut Context, p: &Params) -> Value {
    let n = match p.get(0) {
        Value::Array(items) => items.iter().filter(|v| *v == p.get(1)).count(),
        Value::String(text) => {
            let needle = p.text(1);
            if needle.is_empty() { 0 } else { text.matches(&needle).count() }
        }
        _ => {
            ctx.warn("Count requires an array or a string and a value. Result may be unexpected.");
            0
        }
    };
    Value::from(n)
}

pub fn reverse(p: &Params) -> Value {
    match p.get(0) {
        Value::String(s) => Value::String(s.chars().rev().collect()),
        other => Value::Array(other.to_array().into_iter().rev().collect()),
    }
}

/// Sort order: numbers and booleans by value, then strings, then every
/// other value in its original position relative to its peers.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    fn class(v: &Value) -> u8 {
        match v {
            Value::Bool(_) | Value::Number(_) => 0,
            Value::String(_) => 1,
            _ => 2,
        }
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ if class(a) == 0 && class(b) == 0 => a.to_number().total_cmp(&b.to_number()),
        _ => class(a).cmp(&class(b)),
    }
}

/// Stable ascending sort. Mixed types group as numbers, strings, then the rest.
pub fn sort(p: &Params) -> Value {
    let mut list = p.array(0);
    list.sort_by(sort_order);
    Value::Array(list)
}

pub fn sorted(p: &Params) -> Value {
    let Value::Array(items) = p.get(0) else {
        return Value::Bool(false);
    };
    Value::Bool(items.windows(2).all(|w| sort_order(&w[0], &w[1]) != Ordering::Greater))
}

/// Folds a flat `[k, v, k, v, ...]` list into an object.
pub fn object(p: &Params) -> Value {
    let Value::Array(items) = p.get(0) else {
        return Value::Object(Object::new());
    };
    let map = items
        .chunks(2)
        .map(|pair| (pair[0].to_string(), pair.get(1).cloned().unwrap_or_default()))
        .collect();
    Value::Object(map)
}

/// Flattens an object into `[k, v, k, v, ...]`.
pub fn array(p: &Params) -> Value {
    match p.get(0) {
        Value::Object(_) => Value::Array(p.get(0).to_array()),
        _ => Value::Array(Vec::new()),
    }
}

pub fn keys(p: &Params) -> Value {
    let keys = match p.get(0) {
        Value::Array(items) => (1..=items.len()).map(Value::from).collect(),
        Value::Object(map) => map.keys().map(|k| Value::from(k.as_str())).collect(),
        _ => Vec::new(),
    };
    Value::Array(keys)
}

pub fn values(p: &Params) -> Value {
    match p.get(0) {
        Value::Array(items) => Value::Array(items.clone()),
        Value::Object(map) => Value::Array(map.values().cloned().collect()),
        _ => Value::Array(Vec::new()),
    }
}

pub fn pairs(p: &Params) -> Value {
    let pairs = match p.get(0) {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| Value::Array(vec![Value::from(i + 1), v.clone()]))
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Value::Array(vec![Value::from(k.as_str()), v.clone()]))
            .collect(),
        _ => Vec::new(),
    };
    Value::Array(pairs)
}

pub fn interleave(ctx: &mut Context, p: &Params) -> Value {
    match (p.get(0), p.get(1)) {
        (Value::Array(a), Value::Array(b)) => {
            let mut out = Vec::with_capacity(a.len() + b.len());
            for i in 0..a.len().max(b.len()) {
                out.extend(a.get(i).cloned());
                out.extend(b.get(i).cloned());
            }
            Value::Array(out)
        }
        (a, b) => {
            ctx.warn("Interleave requires two arrays. Result may be unexpected.");
            match (a, b) {
                (Value::Array(_), _) => a.clone(),
                (_, Value::Array(_)) => b.clone(),
                _ => Value::Array(Vec::new()),
            }
        }
    }
}

/// Removes duplicates, keeping first occurrences in order.
pub fn unique(p: &Params) -> Value {
    let mut out: Vec<Value> = Vec::new();
    for v in p.array(0) {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    Value::Array(out)
}

fn flatten_into(items: Vec<Value>, out: &mut Vec<Value>) {
    for v in items {
        match v {
            Value::Array(inner) => flatten_into(inner, out),
            Value::Object(_) => flatten_into(v.to_array(), out),
            Value::Null => {}
            scalar => out.push(scalar),
        }
    }
}

pub fn flatten(p: &Params) -> Value {
    let mut out = Vec::new();
    flatten_into(p.array(0), &mut out);
    Value::Array(out)
}

/// Groups into arrays of `size`; the final chunk may be shorter.
pub fn chunk(ctx: &mut Context, p: &Params) -> Value {
    let Value::Array(items) = p.get(0) else {
        ctx.warn("chunk() first argument is not an array! Coercing to an empty array.");
        return Value::Array(Vec::new());
    };
    let size = p.num(1) as i64;
    if size < 1 {
        return Value::Array(Vec::new());
    }
    Value::Array(items.chunks(size as usize).map(|c| Value::Array(c.to_vec())).collect())
}

#[cfg(test)]
mod tests {
    use super::super::Builtin;
    use super::super::testing::*;
    use super::*;

    fn n(x: f64) -> Value {
        Value::from(x)
    }

    #[test]
    fn splice_replaces_inclusive_range() {
        let mut h = Harness::new();
        let list = arr(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            h.call(Builtin::Splice, vec![list.clone(), n(2.0), n(4.0), arr(&[9.0, 9.0])]).unwrap(),
            arr(&[1.0, 9.0, 9.0, 5.0])
        );
        assert_eq!(
            h.call(Builtin::Splice, vec![list.clone(), n(-2.0), n(-1.0), arr(&[0.0])]).unwrap(),
            arr(&[1.0, 2.0, 3.0, 0.0])
        );
        assert_eq!(h.warnings(), 0);
        assert_eq!(
            h.call(Builtin::Splice, vec![list, n(0.0), n(1.0), Value::Null]).unwrap(),
            arr(&[2.0, 3.0, 4.0, 5.0])
        );
        assert_eq!(h.warnings(), 1);
    }

    #[test]
    fn update_insert_delete() {
        let mut h = Harness::new();
        let list = arr(&[1.0, 2.0, 3.0]);
        assert_eq!(h.call(Builtin::Update, vec![list.clone(), n(-1.0), n(9.0)]).unwrap(), arr(&[1.0, 2.0, 9.0]));
        assert_eq!(h.call(Builtin::Insert, vec![list.clone(), n(1.0), n(0.0)]).unwrap(), arr(&[0.0, 1.0, 2.0, 3.0]));
        assert_eq!(h.call(Builtin::Insert, vec![list.clone(), n(4.0), n(4.0)]).unwrap(), arr(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(h.call(Builtin::Delete, vec![list.clone(), n(2.0)]).unwrap(), arr(&[1.0, 3.0]));
        assert_eq!(h.warnings(), 0);
        assert_eq!(h.call(Builtin::Update, vec![list.clone(), n(0.0), n(9.0)]).unwrap(), list);
        assert_eq!(h.call(Builtin::Delete, vec![list.clone(), n(7.0)]).unwrap(), list);
        assert_eq!(h.warnings(), 2);
        assert!(h.diagnostics.collected()[0].message.contains("update()"));
    }

    #[test]
    fn searching() {
        let mut h = Harness::new();
        let list = arr(&[5.0, 6.0, 5.0]);
        assert_eq!(h.call(Builtin::Index, vec![list.clone(), n(6.0)]).unwrap(), n(2.0));
        assert_eq!(h.call(Builtin::Index, vec![Value::from("hello"), Value::from("l")]).unwrap(), n(3.0));
        assert_eq!(h.call(Builtin::Index, vec![list.clone(), n(7.0)]).unwrap(), n(0.0));
        assert_eq!(h.call(Builtin::Find, vec![list.clone(), n(5.0), n(2.0)]).unwrap(), n(3.0));
        assert_eq!(h.call(Builtin::Find, vec![list.clone(), n(5.0), n(3.0)]).unwrap(), n(0.0));
        assert_eq!(h.call(Builtin::Find, vec![Value::from("abab"), Value::from("b"), n(2.0)]).unwrap(), n(4.0));
        assert_eq!(h.call(Builtin::Count, vec![list, n(5.0)]).unwrap(), n(2.0));
        assert_eq!(h.call(Builtin::Count, vec![Value::from("aaa"), Value::from("aa")]).unwrap(), n(1.0));
        assert_eq!(h.warnings(), 0);
        assert_eq!(h.call(Builtin::Count, vec![n(1.0), n(1.0)]).unwrap(), n(0.0));
        assert_eq!(h.warnings(), 1);
    }

    #[test]
    fn ordering() {
        let mut h = Harness::new();
        assert_eq!(h.call(Builtin::Sort, vec![arr(&[3.0, 1.0, 2.0])]).unwrap(), arr(&[1.0, 2.0, 3.0]));
        assert_eq!(h.call(Builtin::Sorted, vec![arr(&[1.0, 1.0, 2.0])]).unwrap(), Value::Bool(true));
        assert_eq!(h.call(Builtin::Sorted, vec![arr(&[2.0, 1.0])]).unwrap(), Value::Bool(false));
        assert_eq!(h.call(Builtin::Sorted, vec![n(1.0)]).unwrap(), Value::Bool(false));
        assert_eq!(h.call(Builtin::Reverse, vec![Value::from("abc")]).unwrap(), Value::from("cba"));
        assert_eq!(h.call(Builtin::Reverse, vec![arr(&[1.0, 2.0])]).unwrap(), arr(&[2.0, 1.0]));
    }

    #[test]
    fn mixed_types_sort_into_groups() {
        let mut h = Harness::new();
        let mixed = Value::Array(vec![
            n(3.0),
            Value::from("10"),
            Value::Null,
            Value::Array(vec![]),
            n(1.0),
            Value::from("2"),
        ]);
        let expected = Value::Array(vec![
            n(1.0),
            n(3.0),
            Value::from("10"),
            Value::from("2"),
            Value::Null,
            Value::Array(vec![]),
        ]);
        let sorted = h.call(Builtin::Sort, vec![mixed]).unwrap();
        assert_eq!(sorted, expected);
        assert_eq!(h.call(Builtin::Sorted, vec![sorted]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn random_mixed_arrays_sort() {
        let mut h = Harness::new();
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            let items: Vec<Value> = (0..rng.usize(20..=80))
                .map(|_| match rng.u8(0..4) {
                    0 => Value::Null,
                    1 => n(f64::from(rng.u8(0..20))),
                    2 => Value::from(rng.u8(0..20).to_string()),
                    _ => Value::Array(vec![]),
                })
                .collect();
            let len = items.len();
            let Value::Array(out) = h.call(Builtin::Sort, vec![Value::Array(items)]).unwrap() else {
                panic!("expected array");
            };
            assert_eq!(out.len(), len);
        }
    }

    #[test]
    fn object_conversions() {
        let mut h = Harness::new();
        let flat = Value::Array(vec![Value::from("a"), n(1.0), Value::from("b")]);
        let obj = h.call(Builtin::Object, vec![flat]).unwrap();
        assert_eq!(obj.to_string(), "a 1 b ");
        assert_eq!(h.call(Builtin::Keys, vec![obj.clone()]).unwrap(), strs(&["a", "b"]));
        assert_eq!(h.call(Builtin::Values, vec![obj.clone()]).unwrap(), Value::Array(vec![n(1.0), Value::Null]));
        assert_eq!(
            h.call(Builtin::Array, vec![obj.clone()]).unwrap(),
            Value::Array(vec![Value::from("a"), n(1.0), Value::from("b"), Value::Null])
        );
        assert_eq!(h.call(Builtin::Keys, vec![arr(&[7.0, 8.0])]).unwrap(), arr(&[1.0, 2.0]));
        assert_eq!(
            h.call(Builtin::Pairs, vec![arr(&[7.0])]).unwrap(),
            Value::Array(vec![arr(&[1.0, 7.0])])
        );
    }

    #[test]
    fn list_shaping() {
        let mut h = Harness::new();
        assert_eq!(
            h.call(Builtin::Interleave, vec![arr(&[1.0, 3.0, 5.0]), arr(&[2.0])]).unwrap(),
            arr(&[1.0, 2.0, 3.0, 5.0])
        );
        assert_eq!(h.call(Builtin::Unique, vec![arr(&[1.0, 2.0, 1.0, 3.0])]).unwrap(), arr(&[1.0, 2.0, 3.0]));
        let nested = Value::Array(vec![n(1.0), Value::Array(vec![n(2.0), arr(&[3.0])])]);
        assert_eq!(h.call(Builtin::Flatten, vec![nested]).unwrap(), arr(&[1.0, 2.0, 3.0]));
        assert_eq!(
            h.call(Builtin::Chunk, vec![arr(&[1.0, 2.0, 3.0]), n(2.0)]).unwrap(),
            Value::Array(vec![arr(&[1.0, 2.0]), arr(&[3.0])])
        );
        assert_eq!(h.call(Builtin::Append, vec![arr(&[1.0]), n(2.0)]).unwrap(), arr(&[1.0, 2.0]));
        assert_eq!(h.call(Builtin::Merge, vec![arr(&[1.0]), arr(&[2.0, 3.0])]).unwrap(), arr(&[1.0, 2.0, 3.0]));
        assert_eq!(h.warnings(), 0);
        assert_eq!(h.call(Builtin::Chunk, vec![n(1.0), n(2.0)]).unwrap(), Value::Array(vec![]));
        assert_eq!(h.call(Builtin::Interleave, vec![n(1.0), arr(&[2.0])]).unwrap(), arr(&[2.0]));
        assert_eq!(h.warnings(), 2);
    }
}
