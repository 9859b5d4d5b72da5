use crate::value::Value;

use super::{Context, Params, pattern};

/// Levenshtein distance between two strings, by characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(substitution);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

pub fn word_diff(p: &Params) -> Value {
    Value::from(levenshtein(&p.text(0), &p.text(1)))
}

pub fn split(p: &Params) -> Value {
    let text = p.text(0);
    let delimiter = p.text(1);
    if delimiter.is_empty() {
        return Value::Array(text.chars().map(|c| Value::String(c.to_string())).collect());
    }
    Value::Array(text.split(delimiter.as_str()).map(Value::from).collect())
}

pub fn join(p: &Params) -> Value {
    let parts: Vec<String> = p.array(0).iter().map(Value::to_string).collect();
    Value::String(parts.join(&p.text(1)))
}

pub fn camel(p: &Params) -> Value {
    let text = p.text(0);
    let mut chars = text.chars();
    let out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    Value::String(out)
}

pub fn replace(p: &Params) -> Value {
    let text = p.text(0);
    let search = p.text(1);
    if search.is_empty() {
        return Value::String(text);
    }
    Value::String(text.replace(&search, &p.text(2)))
}

/// `lpad`/`rpad(text, pad, width)`: pads with the first character of `pad`.
pub fn pad(ctx: &mut Context, p: &Params, left: bool) -> Value {
    let text = p.text(0);
    let fill = p.text(1).chars().next().unwrap_or(' ');
    let width = ctx.width(if left { "lpad" } else { "rpad" }, p.num(2));
    let len = text.chars().count();
    if len >= width {
        return Value::String(text);
    }
    let padding: String = std::iter::repeat_n(fill, width - len).collect();
    Value::String(if left { padding + &text } else { text + &padding })
}

/// Keeps only the characters that match `pattern`.
pub fn filter(p: &Params) -> Value {
    let Some(re) = pattern::compile(&p.text(1)) else {
        return Value::String(String::new());
    };
    let kept: String = p
        .text(0)
        .chars()
        .filter(|c| {
            let mut buf = [0u8; 4];
            re.is_match(c.encode_utf8(&mut buf))
        })
        .collect();
    Value::String(kept)
}

pub fn matches(p: &Params) -> Value {
    Value::Array(pattern::lua_match(&p.text(0), &p.text(1)).into_iter().map(Value::String).collect())
}

pub fn first_match(p: &Params) -> Value {
    match pattern::lua_match(&p.text(0), &p.text(1)).into_iter().next() {
        Some(m) => Value::String(m),
        None => Value::Null,
    }
}

/// Character with the given code point.
pub fn ascii(p: &Params) -> Value {
    let c = char::from_u32(p.num(0).max(0.0) as u32).unwrap_or('\u{FFFD}');
    Value::String(c.to_string())
}

/// Code point of the first character, or Null for the empty string.
pub fn char_code(p: &Params) -> Value {
    match p.text(0).chars().next() {
        Some(c) => Value::from(f64::from(u32::from(c))),
        None => Value::Null,
    }
}

pub fn numeric_string(p: &Params) -> Value {
    let text = p.text(0);
    let trimmed = text.trim();
    Value::Bool(!trimmed.is_empty() && trimmed.parse::<f64>().is_ok_and(f64::is_finite))
}

pub fn trim(p: &Params) -> Value {
    let text = p.text(0);
    let chars = p.text(1);
    if chars.is_empty() {
        return Value::from(text.trim());
    }
    Value::from(text.trim_matches(|c: char| chars.contains(c)))
}

/// Substitutes each argument (arrays flattened one level) into every `*`.
pub fn glob(p: &Params) -> Value {
    let template = p.text(0);
    let mut out = Vec::new();
    for arg in p.as_slice().iter().skip(1) {
        match arg {
            Value::Array(items) => {
                out.extend(items.iter().map(|v| Value::String(template.replace('*', &v.to_string()))));
            }
            other => out.push(Value::String(template.replace('*', &other.to_string()))),
        }
    }
    Value::Array(out)
}

#[cfg(test)]
mod tests {
    use super::super::{Builtin, MAX_WIDTH};
    use super::super::testing::*;
    use super::*;

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn levenshtein_distance() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn split_and_join() {
        let mut h = Harness::new();
        assert_eq!(h.call(Builtin::Split, vec![s("a,b,,c"), s(",")]).unwrap(), strs(&["a", "b", "", "c"]));
        assert_eq!(h.call(Builtin::Split, vec![s("ab"), s("")]).unwrap(), strs(&["a", "b"]));
        assert_eq!(h.call(Builtin::Join, vec![arr(&[1.0, 2.0]), s("-")]).unwrap(), s("1-2"));
    }

    #[test]
    fn case_and_replace() {
        let mut h = Harness::new();
        assert_eq!(h.call(Builtin::Camel, vec![s("hELLO")]).unwrap(), s("Hello"));
        assert_eq!(h.call(Builtin::Camel, vec![s("")]).unwrap(), s(""));
        assert_eq!(h.call(Builtin::Replace, vec![s("a-b-c"), s("-"), s("+")]).unwrap(), s("a+b+c"));
        assert_eq!(h.call(Builtin::Replace, vec![s("abc"), s(""), s("x")]).unwrap(), s("abc"));
    }

    #[test]
    fn padding() {
        let mut h = Harness::new();
        assert_eq!(h.call(Builtin::Lpad, vec![s("7"), s("0"), Value::from(3.0)]).unwrap(), s("007"));
        assert_eq!(h.call(Builtin::Rpad, vec![s("ab"), s(".."), Value::from(4.0)]).unwrap(), s("ab.."));
        assert_eq!(h.call(Builtin::Lpad, vec![s("long"), s("0"), Value::from(2.0)]).unwrap(), s("long"));
        assert_eq!(h.warnings(), 0);

        let huge = h.call(Builtin::Lpad, vec![s("x"), s("-"), Value::from(1e12)]).unwrap().to_string();
        assert_eq!(huge.chars().count(), MAX_WIDTH);
        assert!(huge.ends_with("-x"));
        let right = h.call(Builtin::Rpad, vec![s("x"), s("-"), Value::from(MAX_WIDTH as f64 + 1.0)]).unwrap();
        assert_eq!(right.to_string().chars().count(), MAX_WIDTH);
        assert_eq!(h.warnings(), 2);
    }

    #[test]
    fn pattern_builtins() {
        let mut h = Harness::new();
        assert_eq!(h.call(Builtin::Filter, vec![s("a1b2c3"), s("%d")]).unwrap(), s("123"));
        assert_eq!(
            h.call(Builtin::Matches, vec![s("v=12"), s("(%a)=(%d+)")]).unwrap(),
            strs(&["v=12", "v", "12"])
        );
        assert_eq!(h.call(Builtin::Match, vec![s("abc"), s("%d+")]).unwrap(), Value::Null);
        assert_eq!(h.call(Builtin::Match, vec![s("42"), s("%d+")]).unwrap(), s("42"));
    }

    #[test]
    fn character_codes() {
        let mut h = Harness::new();
        assert_eq!(h.call(Builtin::Ascii, vec![Value::from(65.0)]).unwrap(), s("A"));
        assert_eq!(h.call(Builtin::Char, vec![s("a")]).unwrap(), Value::from(97.0));
        assert_eq!(h.call(Builtin::Char, vec![s("")]).unwrap(), Value::Null);
    }

    #[test]
    fn trimming() {
        let mut h = Harness::new();
        assert_eq!(h.call(Builtin::Trim, vec![s("  hi \n")]).unwrap(), s("hi"));
        assert_eq!(h.call(Builtin::Trim, vec![s("--hi-+"), s("-+")]).unwrap(), s("hi"));
    }

    #[test]
    fn glob_expands_each_argument() {
        let mut h = Harness::new();
        assert_eq!(
            h.call(Builtin::Glob, vec![s("f*.txt"), s("a"), strs(&["b", "c"])]).unwrap(),
            strs(&["fa.txt", "fb.txt", "fc.txt"])
        );
    }

    #[test]
    fn prefixes_and_numbers() {
        let mut h = Harness::new();
        assert_eq!(h.call(Builtin::BeginsWith, vec![s("hello"), s("he")]).unwrap(), Value::Bool(true));
        assert_eq!(h.call(Builtin::EndsWith, vec![s("hello"), s("x")]).unwrap(), Value::Bool(false));
        assert_eq!(h.call(Builtin::NumericString, vec![s(" 3.5 ")]).unwrap(), Value::Bool(true));
        assert_eq!(h.call(Builtin::NumericString, vec![s("3x")]).unwrap(), Value::Bool(false));
        assert_eq!(h.call(Builtin::WordDiff, vec![s("abc"), s("abd")]).unwrap(), Value::from(1.0));
    }
}
