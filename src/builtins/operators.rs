//! Positional builtins: control flow, arithmetic, comparison, boolean and
//! bitwise operators. Operands are popped right-hand side first.

use std::cmp::Ordering;

use crate::value::{Value, compare};
use crate::vm::VmResult;

use super::{Builtin, Context, pattern};

/// Largest range `arrayslice` will materialise.
pub const MAX_SLICE: i64 = 32768;

/// Runs `builtin` if it is an operator. Returns `false` for builtins that
/// take a params array instead.
pub(super) fn call(builtin: Builtin, ctx: &mut Context) -> VmResult<bool> {
    use Builtin::*;
    match builtin {
        Jump => {
            let target = if ctx.arg != 0 { ctx.arg } else { ctx.stack.pop().to_number() as i64 };
            ctx.jump = Some(resume_at(target));
        }
        JumpIfNil => {
            if ctx.stack.peek().is_null() {
                ctx.jump = Some(resume_at(ctx.arg));
            }
        }
        JumpIfFalse => {
            if !ctx.stack.peek().to_bool() {
                ctx.jump = Some(resume_at(ctx.arg));
            }
        }
        Explode => {
            for item in ctx.stack.pop().into_array() {
                ctx.stack.push(item);
            }
        }
        Implode => {
            let items: Vec<Value> = (0..ctx.arg.max(0)).map(|_| ctx.stack.pop()).collect();
            ctx.stack.push(items);
        }
        SuperImplode => {
            let mut items = Vec::new();
            for _ in 0..ctx.arg.max(0) {
                match ctx.stack.pop() {
                    Value::Array(sub) => items.extend(sub.into_iter().rev()),
                    other => items.push(other),
                }
            }
            items.reverse();
            ctx.stack.push(items);
        }
        Length => {
            let n = match ctx.stack.pop() {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                _ => 0,
            };
            ctx.stack.push(n);
        }
        BoolNot => {
            let v = ctx.stack.pop().to_bool();
            ctx.stack.push(!v);
        }
        VarExists => {
            let name = ctx.stack.pop().to_string();
            let exists = ctx.variables.has(&name);
            ctx.stack.push(exists);
        }
        BitwiseNot => {
            let n = ctx.stack.pop().to_number() as i64;
            ctx.stack.push(!n);
        }
        ArrayIndex => {
            let index = ctx.stack.pop();
            let data = ctx.stack.pop();
            let result = array_index(ctx, &data, &index);
            ctx.stack.push(result);
        }
        ArraySlice => {
            let end = ctx.stack.pop().to_number() as i64;
            let start = ctx.stack.pop().to_number() as i64;
            let result = array_slice(ctx, start, end);
            ctx.stack.push(result);
        }
        Add | Sub | Mul | Div | Rem | Concat | BoolAnd | BoolOr | BoolXor | InArray | StrLike | Equal
        | NotEqual | Greater | GreaterEqual | Less | LessEqual | BitwiseAnd | BitwiseOr | BitwiseXor => {
            let b = ctx.stack.pop();
            let a = ctx.stack.pop();
            ctx.stack.push(binary(builtin, a, b));
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Jump operands store `target - 1`.
fn resume_at(operand: i64) -> usize {
    usize::try_from(operand.saturating_add(1)).unwrap_or(0)
}

fn binary(builtin: Builtin, a: Value, b: Value) -> Value {
    use Builtin::*;
    match builtin {
        Add => Value::from(a.to_number() + b.to_number()),
        Sub => Value::from(a.to_number() - b.to_number()),
        Mul => Value::from(a.to_number() * b.to_number()),
        Div => Value::from(a.to_number() / b.to_number()),
        Rem => {
            let (x, y) = (a.to_number() as i64, b.to_number() as i64);
            Value::from(if y == 0 { 0 } else { x.wrapping_rem(y) })
        }
        Concat => Value::String(format!("{a}{b}")),
        BoolAnd => Value::Bool(a.to_bool() && b.to_bool()),
        BoolOr => Value::Bool(a.to_bool() || b.to_bool()),
        BoolXor => Value::Bool(a.to_bool() != b.to_bool()),
        InArray => Value::Bool(contains(&b, &a)),
        StrLike => Value::Bool(!pattern::lua_match(&a.to_string(), &b.to_string()).is_empty()),
        Equal => Value::Bool(a == b),
        NotEqual => Value::Bool(a != b),
        Greater => Value::Bool(compare(a, b) == Some(Ordering::Greater)),
        GreaterEqual => Value::Bool(matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal))),
        Less => Value::Bool(compare(a, b) == Some(Ordering::Less)),
        LessEqual => Value::Bool(matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal))),
        BitwiseAnd => Value::from((a.to_number() as i64) & (b.to_number() as i64)),
        BitwiseOr => Value::from((a.to_number() as i64) | (b.to_number() as i64)),
        BitwiseXor => Value::from((a.to_number() as i64) ^ (b.to_number() as i64)),
        _ => Value::Null,
    }
}

/// Membership: array element, object key, or substring.
fn contains(data: &Value, needle: &Value) -> bool {
    match data {
        Value::Array(items) => items.contains(needle),
        Value::Object(map) => map.contains_key(&needle.to_string()),
        Value::String(s) => s.contains(&needle.to_string()),
        _ => false,
    }
}

// ── Indexing ────────────────────────────────────────────────────────

fn position(ctx: &mut Context, index: &Value, len: usize, warn_out_of_bounds: bool) -> Option<usize> {
    let Value::Number(n) = index else {
        ctx.warn("Array index must be a number");
        return None;
    };
    let mut i = *n as i64;
    if i < 0 {
        i += len as i64;
        i += 1;
    }
    if i > 0 && i <= len as i64 {
        return Some(i as usize - 1);
    }
    if *n as i64 == 0 {
        ctx.warn("Array indexes start at 1, not 0. Returning null.");
    } else if warn_out_of_bounds {
        ctx.warn("Array index out of bounds. Returning null.");
    }
    None
}

fn element(ctx: &mut Context, data: &Value, index: &Value) -> Value {
    match data {
        Value::Array(items) => match position(ctx, index, items.len(), true) {
            Some(i) => items[i].clone(),
            None => Value::Null,
        },
        Value::Object(map) => map.get(&index.to_string()).cloned().unwrap_or_default(),
        Value::String(s) => {
            let len = s.chars().count();
            let c = position(ctx, index, len, false).and_then(|i| s.chars().nth(i));
            Value::String(c.map(String::from).unwrap_or_default())
        }
        _ => Value::Null,
    }
}

pub(super) fn array_index(ctx: &mut Context, data: &Value, index: &Value) -> Value {
    let Value::Array(indices) = index else {
        return element(ctx, data, index);
    };
    if matches!(data, Value::String(_)) {
        let text: String = indices.iter().map(|i| element(ctx, data, i).to_string()).collect();
        return Value::String(text);
    }
    Value::Array(indices.iter().map(|i| element(ctx, data, i)).collect())
}

pub(super) fn array_slice(ctx: &mut Context, start: i64, mut end: i64) -> Value {
    let length = end.saturating_sub(start).saturating_add(1);
    if length > MAX_SLICE {
        ctx.warn(format!(
            "Attempted to create an array with {length} elements (max is {MAX_SLICE}). Array truncated."
        ));
        end = start.saturating_add(MAX_SLICE - 1);
    }
    if length <= 0 {
        return Value::Array(Vec::new());
    }
    Value::Array((start..=end).map(Value::from).collect())
}
