//! Builtins drawing from the VM's single RNG stream.

use crate::value::Value;

use super::{Context, Params};

/// Uniform integer in the inclusive range between the two params.
pub fn random_int(ctx: &mut Context, p: &Params) -> Value {
    let a = p.num(0) as i64;
    let b = p.num(1) as i64;
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Value::from(ctx.rng.i64(lo..=hi))
}

pub fn random_float(ctx: &mut Context, p: &Params) -> Value {
    let (lo, hi) = (p.num(0), p.num(1));
    Value::from(lo + ctx.rng.f64() * (hi - lo))
}

pub fn random_element(ctx: &mut Context, p: &Params) -> Value {
    let list = p.array(0);
    if list.is_empty() {
        return Value::Null;
    }
    list[ctx.rng.usize(..list.len())].clone()
}

/// `random_elements(list, n)`: up to `n` distinct positions, drawn without
/// replacement.
pub fn random_elements(ctx: &mut Context, p: &Params) -> Value {
    let mut pool = p.array(0);
    if pool.is_empty() {
        return Value::Null;
    }
    let count = (p.num(1).max(0.0) as usize).min(pool.len());
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let i = ctx.rng.usize(..pool.len());
        out.push(pool.remove(i));
    }
    Value::Array(out)
}

/// `random_weighted(list, weights)`: picks an element with probability
/// proportional to its weight.
pub fn random_weighted(ctx: &mut Context, p: &Params) -> Value {
    let list = p.array(0);
    let weights: Vec<f64> = p.array(1).iter().map(Value::to_number).collect();
    let Some(last) = list.last() else {
        return Value::Null;
    };
    let total: f64 = weights.iter().sum();
    let r = ctx.rng.f64() * total;
    let mut cumulative = 0.0;
    for (item, w) in list.iter().zip(&weights) {
        cumulative += w;
        if r < cumulative {
            return item.clone();
        }
    }
    last.clone()
}

/// Random version-4 UUID string, drawn from the seeded stream.
pub fn uuid(ctx: &mut Context) -> Value {
    let mut bytes = [0u8; 16];
    bytes.iter_mut().for_each(|b| *b = ctx.rng.u8(..));
    Value::String(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
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
    fn ints_stay_in_inclusive_range() {
        let mut h = Harness::new();
        for _ in 0..200 {
            let v = h.call(Builtin::RandomInt, vec![n(5.0), n(1.0)]).unwrap().to_number();
            assert!((1.0..=5.0).contains(&v) && v.fract() == 0.0, "{v}");
        }
        let f = h.call(Builtin::RandomFloat, vec![n(2.0), n(3.0)]).unwrap().to_number();
        assert!((2.0..3.0).contains(&f));
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Harness::new();
        let mut b = Harness::new();
        for _ in 0..10 {
            assert_eq!(
                a.call(Builtin::RandomInt, vec![n(0.0), n(1000.0)]).unwrap(),
                b.call(Builtin::RandomInt, vec![n(0.0), n(1000.0)]).unwrap()
            );
        }
    }

    #[test]
    fn element_selection() {
        let mut h = Harness::new();
        let list = arr(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.call(Builtin::RandomElement, vec![arr(&[])]).unwrap(), Value::Null);
        let picked = h.call(Builtin::RandomElement, vec![list.clone()]).unwrap();
        assert!(list.to_array().contains(&picked));

        let Value::Array(many) = h.call(Builtin::RandomElements, vec![list.clone(), n(10.0)]).unwrap() else {
            panic!("expected array");
        };
        assert_eq!(many.len(), 4);
        let mut sorted: Vec<f64> = many.iter().map(Value::to_number).collect();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(sorted, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn zero_weights_never_win() {
        let mut h = Harness::new();
        for _ in 0..50 {
            let v = h
                .call(Builtin::RandomWeighted, vec![Value::Array(vec![Value::from("a"), Value::from("b")]), arr(&[0.0, 1.0])])
                .unwrap();
            assert_eq!(v, Value::from("b"));
        }
    }

    #[test]
    fn uuid_shape() {
        let mut h = Harness::new();
        let id = h.call(Builtin::Uuid, vec![]).unwrap().to_string();
        let groups: Vec<&str> = id.split('-').collect();
        assert_eq!(groups.iter().map(|g| g.len()).collect::<Vec<_>>(), vec![8, 4, 4, 4, 12]);
        assert!(groups[2].starts_with('4'));
        assert!(matches!(groups[3].chars().next(), Some('8' | '9' | 'a' | 'b')));
        assert_eq!(uuid::Uuid::parse_str(&id).ok().map(|u| u.get_version_num()), Some(4));
    }

    #[test]
    fn seeded_uuids_repeat() {
        let mut a = Harness::new();
        let mut b = Harness::new();
        let first = a.call(Builtin::Uuid, vec![]).unwrap();
        assert_eq!(first, b.call(Builtin::Uuid, vec![]).unwrap());
        assert_ne!(first, a.call(Builtin::Uuid, vec![]).unwrap());
    }
}
