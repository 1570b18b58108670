//! Query string to JSON conversion.

use serde_json::{Map, Number, Value};
use url::form_urlencoded;

use crate::http::request::Request;

/// Converts `a=1&b=two;flag` into `{"a": 1, "b": "two", "flag": ""}`.
///
/// Pairs are split on `&` or `;`, `+` decodes to a space and `%XX` escapes
/// are decoded. Numeric values become numbers and `true`/`false` become
/// booleans; everything else stays a string. A later duplicate key wins.
pub fn query_to_json(query: &str) -> Value {
    let mut object = Map::new();

    for segment in query.split(';') {
        for (key, value) in form_urlencoded::parse(segment.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            object.insert(key.into_owned(), typed_value(&value));
        }
    }

    Value::Object(object)
}

fn typed_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => number(raw)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
    }
}

/// Digits with at most one leading `-` and one `.`.
fn number(raw: &str) -> Option<Number> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.bytes().any(|b| b.is_ascii_digit())
        || !digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        || digits.bytes().filter(|&b| b == b'.').count() > 1
    {
        return None;
    }

    if digits.contains('.') {
        raw.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        raw.parse::<i64>()
            .map(Number::from)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64))
    }
}

impl Request {
    /// The query component as a JSON object; empty when there is no query.
    pub fn query_json(&self) -> Value {
        match self.query() {
            Some(query) => query_to_json(&String::from_utf8_lossy(query)),
            None => Value::Object(Map::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn types_values() {
        assert_eq!(
            query_to_json("a=1&b=two&c=-2.5&d=true&e=false"),
            json!({"a": 1, "b": "two", "c": -2.5, "d": true, "e": false})
        );
    }

    #[test]
    fn decodes_and_splits_on_semicolons() {
        assert_eq!(
            query_to_json("name=hello+world;path=%2Fa%2Fb&flag"),
            json!({"name": "hello world", "path": "/a/b", "flag": ""})
        );
    }

    #[test]
    fn lone_sign_or_dots_stay_strings() {
        assert_eq!(
            query_to_json("a=-&b=1.2.3&c=."),
            json!({"a": "-", "b": "1.2.3", "c": "."})
        );
    }

    #[test]
    fn empty_query_is_empty_object() {
        assert_eq!(query_to_json(""), json!({}));
    }
}
