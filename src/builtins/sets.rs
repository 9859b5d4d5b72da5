//! Set operations over arrays, compared by structural equality. Results keep
//! first-seen order.

use crate::value::Value;

use super::{Context, Params};

/// Both operands as arrays, or the value to return after warning.
fn operands<'p>(
    ctx: &mut Context,
    p: &'p Params,
    name: &str,
    fallback: impl FnOnce(&Value, &Value) -> Value,
) -> Result<(&'p [Value], &'p [Value]), Value> {
    match (p.get(0), p.get(1)) {
        (Value::Array(a), Value::Array(b)) => Ok((a, b)),
        (a, b) => {
            ctx.warn(format!("{name} requires two arrays. Result may be unexpected."));
            Err(fallback(a, b))
        }
    }
}

/// Whichever operand is an array, preferring the first.
fn either(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Array(_), _) => a.clone(),
        (_, Value::Array(_)) => b.clone(),
        _ => Value::Array(Vec::new()),
    }
}

fn first(a: &Value, _: &Value) -> Value {
    match a {
        Value::Array(_) => a.clone(),
        _ => Value::Array(Vec::new()),
    }
}

fn push_unique(out: &mut Vec<Value>, v: &Value) {
    if !out.contains(v) {
        out.push(v.clone());
    }
}

pub fn union(ctx: &mut Context, p: &Params) -> Value {
    match operands(ctx, p, "Union", either) {
        Ok((a, b)) => {
            let mut out = Vec::new();
            a.iter().chain(b).for_each(|v| push_unique(&mut out, v));
            Value::Array(out)
        }
        Err(fallback) => fallback,
    }
}

pub fn intersection(ctx: &mut Context, p: &Params) -> Value {
    match operands(ctx, p, "Intersection", |_, _| Value::Array(Vec::new())) {
        Ok((a, b)) => {
            let mut out = Vec::new();
            a.iter().filter(|v| b.contains(v)).for_each(|v| push_unique(&mut out, v));
            Value::Array(out)
        }
        Err(fallback) => fallback,
    }
}

pub fn difference(ctx: &mut Context, p: &Params) -> Value {
    match operands(ctx, p, "Difference", first) {
        Ok((a, b)) => Value::Array(a.iter().filter(|v| !b.contains(v)).cloned().collect()),
        Err(fallback) => fallback,
    }
}

pub fn symmetric_difference(ctx: &mut Context, p: &Params) -> Value {
    match operands(ctx, p, "Symmetric difference", either) {
        Ok((a, b)) => {
            let left = a.iter().filter(|v| !b.contains(v));
            let right = b.iter().filter(|v| !a.contains(v));
            Value::Array(left.chain(right).cloned().collect())
        }
        Err(fallback) => fallback,
    }
}

pub fn is_disjoint(ctx: &mut Context, p: &Params) -> Value {
    match operands(ctx, p, "Is disjoint", |_, _| Value::Bool(false)) {
        Ok((a, b)) => Value::Bool(!a.iter().any(|v| b.contains(v))),
        Err(fallback) => fallback,
    }
}

fn subset(a: &[Value], b: &[Value]) -> bool {
    a.iter().all(|v| b.contains(v)) && a.len() <= b.len()
}

pub fn is_subset(ctx: &mut Context, p: &Params) -> Value {
    match operands(ctx, p, "Is subset", |_, _| Value::Bool(false)) {
        Ok((a, b)) => Value::Bool(subset(a, b)),
        Err(fallback) => fallback,
    }
}

pub fn is_superset(ctx: &mut Context, p: &Params) -> Value {
    match operands(ctx, p, "Is superset", |_, _| Value::Bool(false)) {
        Ok((a, b)) => Value::Bool(subset(b, a)),
        Err(fallback) => fallback,
    }
}
