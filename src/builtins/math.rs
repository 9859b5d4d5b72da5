use crate::value::Value;

use super::Params;

pub fn unary(p: &Params, f: fn(f64) -> f64) -> Value {
    Value::from(f(p.num(0)))
}

/// Numbers from the params, with array params flattened one level.
fn numbers(p: &Params) -> Vec<f64> {
    let mut out = Vec::with_capacity(p.len());
    for v in p.as_slice() {
        match v {
            Value::Array(items) => out.extend(items.iter().map(Value::to_number)),
            other => out.push(other.to_number()),
        }
    }
    out
}

pub fn fold(p: &Params, init: f64, f: fn(f64, f64) -> f64) -> Value {
    Value::from(numbers(p).into_iter().fold(init, f))
}

/// `min`/`max`: Null when there is nothing to compare.
pub fn extreme(p: &Params, pick: fn(f64, f64) -> f64) -> Value {
    numbers(p).into_iter().reduce(pick).map(Value::from).unwrap_or_default()
}

/// Euclidean distance over the shared dimensions of two points.
pub fn dist(p: &Params) -> Value {
    let a = p.array(0);
    let b = p.array(1);
    let total: f64 = a
        .iter()
        .zip(&b)
        .map(|(x, y)| {
            let d = x.to_number() - y.to_number();
            d * d
        })
        .sum();
    Value::from(total.sqrt())
}

/// `lerp(ratio, a, b)`, element-wise when either side is an array.
pub fn lerp(p: &Params) -> Value {
    let ratio = p.num(0);
    let mix = |start: f64, stop: f64| start + ratio * (stop - start);
    let (a, b) = (p.get(1), p.get(2));
    if matches!(a, Value::Array(_)) || matches!(b, Value::Array(_)) {
        let pairs = a.to_array().into_iter().zip(b.to_array());
        return Value::Array(pairs.map(|(x, y)| Value::from(mix(x.to_number(), y.to_number()))).collect());
    }
    Value::from(mix(a.to_number(), b.to_number()))
}

pub fn smoothstep(p: &Params) -> Value {
    let (x, min, max) = (p.num(0), p.num(1), p.num(2));
    let range = max - min;
    let t = (x.max(min).min(max) - min) / range;
    Value::from(t * t * (3.0 - 2.0 * t) * range + min)
}

pub fn modf(p: &Params) -> Value {
    let n = p.num(0);
    Value::Array(vec![Value::from(n.trunc()), Value::from(n.fract())])
}

/// Natural log, or log in the given base.
pub fn log(p: &Params) -> Value {
    let n = p.num(0);
    if p.get(1).is_null() {
        return Value::from(n.ln());
    }
    Value::from(n.ln() / p.num(1).ln())
}

pub fn normalize(p: &Params) -> Value {
    let vector: Vec<f64> = p.array(0).iter().map(Value::to_number).collect();
    let length = vector.iter().map(|n| n * n).sum::<f64>().sqrt();
    Value::Array(vector.into_iter().map(|n| Value::from(n / length)).collect())
}
