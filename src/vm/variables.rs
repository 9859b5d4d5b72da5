use std::collections::HashMap;

use crate::value::Value;

/// Name resolving to the current subroutine's params (or process argv).
pub const ARGS: &str = "@";
/// Name resolving to a snapshot object of every variable.
pub const VARS: &str = "_VARS";
/// Name resolving to the engine version string.
pub const VERSION: &str = "_VERSION";

/// Why an `insert_into` request was ignored. Reported as a warning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    #[error("Attempted to insert into non-existent variable '{0}'. Ignoring!")]
    Missing(String),
    #[error("Attempted to insert into non-iterable variable '{0}'. Ignoring!")]
    NotIterable(String),
    #[error("Attempted to append to non-array variable '{0}'. Ignoring!")]
    AppendToObject(String),
    #[error("Array indexes start at 1, not 0. Insert into '{0}' ignored!")]
    ZeroIndex(String),
    #[error("Index out of bounds while inserting into '{0}'. Ignoring!")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Default)]
pub struct Variables {
    store: HashMap<String, Value>,
    version: String,
    argv: Value,
}

impl Variables {
    pub fn new(version: impl Into<String>, argv: Vec<String>) -> Self {
        Variables {
            store: HashMap::new(),
            version: version.into(),
            argv: Value::Array(argv.into_iter().map(Value::String).collect()),
        }
    }

    /// Reads a variable, resolving the reserved names first. `params` is the
    /// innermost subroutine frame's captured params, if any.
    pub fn get(&self, name: &str, params: Option<&Value>) -> Value {
        match name {
            ARGS => params.unwrap_or(&self.argv).clone(),
            VARS => self.snapshot(),
            VERSION => Value::String(self.version.clone()),
            _ => self.store.get(name).cloned().unwrap_or_default(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.store.insert(name.into(), value);
    }

    pub fn delete(&mut self, name: &str) {
        self.store.remove(name);
    }

    pub fn has(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    pub fn snapshot(&self) -> Value {
        Value::Object(self.store.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Mutates a nested element of `name` in place. A Null `path` appends.
    /// Unresolvable paths are silent no-ops.
    pub fn insert_into(&mut self, name: &str, path: &Value, value: Value) -> Result<(), InsertError> {
        let target = self.store.get(name).ok_or_else(|| InsertError::Missing(name.to_string()))?;
        if !matches!(target, Value::Array(_) | Value::Object(_) | Value::String(_)) {
            return Err(InsertError::NotIterable(name.to_string()));
        }

        if path.is_null() {
            return match self.store.get_mut(name) {
                Some(Value::Array(items)) => {
                    items.push(value);
                    Ok(())
                }
                Some(Value::String(s)) => {
                    s.push_str(&value.to_string());
                    Ok(())
                }
                _ => Err(InsertError::AppendToObject(name.to_string())),
            };
        }

        let segments = path.to_array();
        if segments.is_empty() {
            return Ok(());
        }
        let cursor = match resolve(target, &segments) {
            Ok(cursor) => cursor,
            Err(Miss::ZeroIndex) => return Err(InsertError::ZeroIndex(name.to_string())),
            Err(Miss::Unresolved) => return Err(InsertError::OutOfRange(name.to_string())),
        };
        if let Some(old) = self.store.remove(name) {
            self.store.insert(name.to_string(), rebuild(old, &cursor, value));
        }
        Ok(())
    }
}

// ── Path resolution ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Index(usize),
    Append,
    Key(String),
    Char(usize),
}

enum Miss {
    ZeroIndex,
    Unresolved,
}

/// 1-based index with negatives counting from the end, converted to 0-based.
pub(crate) fn zero_based(raw: &Value, len: usize) -> Option<usize> {
    let i = raw.to_number() as i64;
    let idx = if i < 0 { len as i64 + i } else { i - 1 };
    usize::try_from(idx).ok()
}

fn positional(seg: &Value, len: usize) -> Result<usize, Miss> {
    if seg.to_number() as i64 == 0 {
        return Err(Miss::ZeroIndex);
    }
    zero_based(seg, len).ok_or(Miss::Unresolved)
}

fn resolve(root: &Value, segments: &[Value]) -> Result<Vec<Slot>, Miss> {
    let mut cursor = Vec::with_capacity(segments.len());
    let mut node = root;
    let last = segments.len() - 1;
    for (depth, seg) in segments.iter().enumerate() {
        let is_last = depth == last;
        match node {
            Value::Array(items) => {
                let i = positional(seg, items.len())?;
                if i < items.len() {
                    cursor.push(Slot::Index(i));
                    node = &items[i];
                } else if is_last && i == items.len() {
                    cursor.push(Slot::Append);
                } else {
                    return Err(Miss::Unresolved);
                }
            }
            Value::Object(map) => {
                let key = seg.to_string();
                if !is_last {
                    node = map.get(&key).ok_or(Miss::Unresolved)?;
                }
                cursor.push(Slot::Key(key));
            }
            Value::String(s) if is_last => {
                let len = s.chars().count();
                let i = positional(seg, len)?;
                if i >= len {
                    return Err(Miss::Unresolved);
                }
                cursor.push(Slot::Char(i));
            }
            _ => return Err(Miss::Unresolved),
        }
    }
    Ok(cursor)
}

fn rebuild(node: Value, cursor: &[Slot], value: Value) -> Value {
    let Some((slot, rest)) = cursor.split_first() else {
        return value;
    };
    match (node, slot) {
        (Value::Array(mut items), Slot::Index(i)) => {
            let child = std::mem::take(&mut items[*i]);
            items[*i] = rebuild(child, rest, value);
            Value::Array(items)
        }
        (Value::Array(mut items), Slot::Append) => {
            items.push(value);
            Value::Array(items)
        }
        (Value::Object(mut map), Slot::Key(key)) => {
            let child = map.remove(key).unwrap_or_default();
            map.insert(key.clone(), rebuild(child, rest, value));
            Value::Object(map)
        }
        (Value::String(s), Slot::Char(i)) => {
            let Some(replacement) = value.to_string().chars().next() else {
                return Value::String(s);
            };
            Value::String(
                s.chars()
                    .enumerate()
                    .map(|(j, c)| if j == *i { replacement } else { c })
                    .collect(),
            )
        }
        (node, _) => node,
    }
}
