//! File system and environment builtins. All of them are refused in
//! sandboxed mode before they get here. Failures are reported through the
//! result (`false` or Null), never raised.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::value::{Object, Value};

use super::Params;

pub fn env_get(p: &Params) -> Value {
    std::env::var(p.text(0)).map(Value::String).unwrap_or_default()
}

pub fn file_exists(p: &Params) -> Value {
    Value::Bool(Path::new(&p.text(0)).exists())
}

pub fn file_read(p: &Params) -> Value {
    fs::read(p.text(0))
        .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        .unwrap_or_default()
}

/// `file_write(path, text)` / `file_append(path, text)`.
pub fn file_write(p: &Params, append: bool) -> Value {
    use std::io::Write;
    let file = fs::OpenOptions::new().create(true).write(true).append(append).truncate(!append).open(p.text(0));
    Value::Bool(file.and_then(|mut f| f.write_all(p.text(1).as_bytes())).is_ok())
}

pub fn file_delete(p: &Params) -> Value {
    Value::Bool(fs::remove_file(p.text(0)).is_ok())
}

/// Destination check shared by copy and move: refuses to clobber unless the
/// third param is truthy.
fn may_write(p: &Params) -> bool {
    p.flag(2) || !Path::new(&p.text(1)).exists()
}

pub fn file_copy(p: &Params) -> Value {
    Value::Bool(may_write(p) && fs::copy(p.text(0), p.text(1)).is_ok())
}

pub fn file_move(p: &Params) -> Value {
    Value::Bool(may_write(p) && fs::rename(p.text(0), p.text(1)).is_ok())
}

fn kind(meta: &fs::Metadata) -> &'static str {
    if meta.is_file() {
        "file"
    } else if meta.is_dir() {
        "directory"
    } else {
        "other"
    }
}

pub fn file_type(p: &Params) -> Value {
    fs::metadata(p.text(0)).map(|m| Value::from(kind(&m))).unwrap_or_default()
}

pub fn file_stat(p: &Params) -> Value {
    let Ok(meta) = fs::metadata(p.text(0)) else {
        return Value::Null;
    };
    let mut out = Object::new();
    out.insert("mode".into(), Value::from(kind(&meta)));
    out.insert("size".into(), Value::from(meta.len() as f64));
    stat_details(&meta, &mut out);
    Value::Object(out)
}

#[cfg(unix)]
fn stat_details(meta: &fs::Metadata, out: &mut Object) {
    use std::os::unix::fs::MetadataExt;

    let mode = meta.mode();
    let permissions: String = (0..9)
        .map(|bit| {
            if mode & (0o400 >> bit) == 0 {
                '-'
            } else {
                ['r', 'w', 'x'][bit % 3]
            }
        })
        .collect();
    let fields = [
        ("gid", f64::from(meta.gid())),
        ("uid", f64::from(meta.uid())),
        ("dev", meta.dev() as f64),
        ("blksize", meta.blksize() as f64),
        ("rdev", meta.rdev() as f64),
        ("access", meta.atime() as f64),
        ("nlink", meta.nlink() as f64),
        ("change", meta.ctime() as f64),
        ("modification", meta.mtime() as f64),
        ("blocks", meta.blocks() as f64),
        ("ino", meta.ino() as f64),
    ];
    for (key, value) in fields {
        out.insert(key.into(), Value::from(value));
    }
    out.insert("permissions".into(), Value::String(permissions));
}

#[cfg(not(unix))]
fn stat_details(meta: &fs::Metadata, out: &mut Object) {
    let since_epoch = |t: std::io::Result<std::time::SystemTime>| {
        t.ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(Value::Null, |d| Value::from(d.as_secs() as f64))
    };
    out.insert("access".into(), since_epoch(meta.accessed()));
    out.insert("modification".into(), since_epoch(meta.modified()));
    let permissions = if meta.permissions().readonly() { "r--r--r--" } else { "rw-rw-rw-" };
    out.insert("permissions".into(), Value::from(permissions));
}

// ── Globbing ────────────────────────────────────────────────────────

fn has_wildcard(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

/// Shell wildcard component (`*`, `?`, `[...]`) as an anchored regex.
fn component_regex(component: &str) -> Option<Regex> {
    let mut re = String::from("^");
    let mut in_class = false;
    for c in component.chars() {
        match c {
            '*' if !in_class => re.push_str(".*"),
            '?' if !in_class => re.push('.'),
            '[' if !in_class => {
                in_class = true;
                re.push('[');
            }
            '!' if in_class && re.ends_with('[') => re.push('^'),
            ']' if in_class => {
                in_class = false;
                re.push(']');
            }
            other if in_class => re.push(other),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

fn expand_home(pattern: &str) -> String {
    match (pattern.strip_prefix('~'), std::env::var("HOME")) {
        (Some(rest), Ok(home)) if rest.is_empty() || rest.starts_with('/') => format!("{home}{rest}"),
        _ => pattern.to_string(),
    }
}

/// Sorted paths matching a wildcard pattern. Hidden entries only match a
/// component that itself starts with a dot.
pub fn glob_paths(pattern: &str) -> Vec<String> {
    let pattern = expand_home(pattern);
    let absolute = pattern.starts_with('/');
    let mut candidates = vec![if absolute { PathBuf::from("/") } else { PathBuf::new() }];

    for component in pattern.split('/').filter(|c| !c.is_empty()) {
        if !has_wildcard(component) {
            candidates.iter_mut().for_each(|c| c.push(component));
            continue;
        }
        let Some(re) = component_regex(component) else {
            return Vec::new();
        };
        let mut next = Vec::new();
        for dir in &candidates {
            let listing = if dir.as_os_str().is_empty() { Path::new(".") } else { dir.as_path() };
            let Ok(entries) = fs::read_dir(listing) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') && !component.starts_with('.') {
                    continue;
                }
                if re.is_match(&name) {
                    next.push(dir.join(&name));
                }
            }
        }
        candidates = next;
    }

    let mut out: Vec<String> = candidates
        .into_iter()
        .filter(|p| !p.as_os_str().is_empty() && p.exists())
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    out.sort();
    out
}

pub fn file_glob(p: &Params) -> Value {
    Value::Array(glob_paths(&p.text(0)).into_iter().map(Value::String).collect())
}

// ── Directories ─────────────────────────────────────────────────────

pub fn dir_create(p: &Params) -> Value {
    let path = p.text(0);
    let result = if p.flag(1) { fs::create_dir_all(path) } else { fs::create_dir(path) };
    Value::Bool(result.is_ok())
}

pub fn dir_delete(p: &Params) -> Value {
    let path = p.text(0);
    let result = if p.flag(1) { fs::remove_dir_all(path) } else { fs::remove_dir(path) };
    Value::Bool(result.is_ok())
}

/// Sorted entry names, or Null if the directory cannot be read.
pub fn dir_list(p: &Params) -> Value {
    let Ok(entries) = fs::read_dir(p.text(0)) else {
        return Value::Null;
    };
    let mut names: Vec<String> =
        entries.flatten().map(|e| e.file_name().to_string_lossy().into_owned()).collect();
    names.sort();
    Value::Array(names.into_iter().map(Value::String).collect())
}
