//! Cleanup of completion text that is meant to be JSON but often isn't.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::iter::Peekable;
use std::str::Chars;

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```[a-z]*").unwrap());
static QUOTED_STRING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).unwrap());

/// Scalar keys recovered by [`manual_extract`].
pub const SCALAR_KEYS: &[&str] = &[
    "title",
    "description",
    "prepTime",
    "cookTime",
    "totalTime",
    "servings",
    "calories",
    "protein",
    "carbs",
    "fat",
    "difficulty",
];

/// Array keys recovered by [`manual_extract`].
pub const ARRAY_KEYS: &[&str] = &["ingredients", "instructions"];

pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE_RE.replace_all(text, "").trim().to_string()
}

/// The span from the first `open` to the last `close`, dropping whatever
/// prose or noise surrounds the payload.
pub fn isolate(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Deterministic fixes for the usual ways generated JSON goes wrong:
/// trailing, leading or doubled commas, bare keys, single-quoted strings and
/// raw newlines. String contents are copied through untouched.
pub fn repair_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut chars = text.chars().peekable();
    let mut pending_comma = false;
    // Last structural character written outside a string
    let mut last = '\0';

    while let Some(c) = chars.next() {
        match c {
            ',' => {
                if !matches!(last, '[' | '{' | '\0') {
                    pending_comma = true;
                }
            }
            '\n' | '\r' => out.push(' '),
            c if c.is_whitespace() => out.push(c),
            '}' | ']' => {
                pending_comma = false;
                out.push(c);
                last = c;
            }
            c => {
                if pending_comma {
                    out.push(',');
                    pending_comma = false;
                    last = ',';
                }
                match c {
                    '"' | '\'' => {
                        copy_string(&mut chars, &mut out, c);
                        last = '"';
                    }
                    c if c.is_ascii_alphabetic() || c == '_' => {
                        let mut word = String::from(c);
                        while let Some(&next) = chars.peek() {
                            if !(next.is_ascii_alphanumeric() || next == '_') {
                                break;
                            }
                            word.push(next);
                            chars.next();
                        }
                        if matches!(last, '{' | ',') && next_significant(&chars) == Some(':') {
                            out.push('"');
                            out.push_str(&word);
                            out.push('"');
                            last = '"';
                        } else {
                            out.push_str(&word);
                            last = 'a';
                        }
                    }
                    c => {
                        out.push(c);
                        last = c;
                    }
                }
            }
        }
    }
    out.trim().to_string()
}

fn next_significant(chars: &Peekable<Chars<'_>>) -> Option<char> {
    chars.clone().find(|c| !c.is_whitespace())
}

/// Copies a string opened by `quote` as a double-quoted JSON string. A
/// single quote only closes its string when structure follows it, so
/// apostrophes inside `'Mom's stew'` survive.
fn copy_string(chars: &mut Peekable<Chars<'_>>, out: &mut String, quote: char) {
    out.push('"');
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(escaped) => {
                    out.push('\\');
                    out.push(escaped);
                }
                None => break,
            },
            c if c == quote
                && (quote == '"'
                    || matches!(next_significant(chars), None | Some(',' | '}' | ']' | ':'))) =>
            {
                out.push('"');
                return;
            }
            '"' => out.push_str("\\\""),
            '\n' | '\r' => out.push(' '),
            c => out.push(c),
        }
    }
}

/// Parses `text` as-is first and only repairs it when that fails, so
/// valid JSON is never rewritten.
pub fn parse_lenient(text: &str) -> Option<Value> {
    serde_json::from_str(text)
        .or_else(|_| serde_json::from_str(&repair_json(text)))
        .ok()
}

/// Parses a completion that should hold a JSON object.
pub fn parse_object(completion: &str) -> Option<Map<String, Value>> {
    let stripped = strip_code_fences(completion);
    match parse_lenient(isolate(&stripped, '{', '}')?)? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Parses a completion that should hold a JSON array.
pub fn parse_array(completion: &str) -> Option<Vec<Value>> {
    let stripped = strip_code_fences(completion);
    match parse_lenient(isolate(&stripped, '[', ']')?)? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.replace("\\\"", "\""))
}

/// Field-by-field regex recovery for text no repair could make parse.
///
/// Returns `None` when not even a title is present.
pub fn manual_extract(text: &str) -> Option<Map<String, Value>> {
    let mut fields = Map::new();

    for key in SCALAR_KEYS {
        let pattern = Regex::new(&format!(
            r#""{key}"\s*:\s*(?:"((?:[^"\\]|\\.)*)"|(\d+(?:\.\d+)?))"#
        ))
        .ok()?;
        if let Some(captures) = pattern.captures(text) {
            let value = captures
                .get(1)
                .map(|m| unescape(m.as_str()))
                .or_else(|| captures.get(2).map(|m| m.as_str().to_string()));
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                fields.insert(key.to_string(), Value::String(value));
            }
        }
    }

    for key in ARRAY_KEYS {
        let pattern = Regex::new(&format!(r#"(?s)"{key}"\s*:\s*\[(.*?)\]"#)).ok()?;
        if let Some(captures) = pattern.captures(text) {
            let items: Vec<Value> = QUOTED_STRING_RE
                .captures_iter(&captures[1])
                .map(|item| unescape(&item[1]))
                .filter(|item| !item.trim().is_empty())
                .map(Value::String)
                .collect();
            fields.insert(key.to_string(), Value::Array(items));
        }
    }

    fields.contains_key("title").then_some(fields)
}
