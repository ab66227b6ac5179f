//! Parameter extraction for skill functions.
//!
//! Parameters arrive as a JSON object, either from a workflow definition
//! (typed JSON values) or from the command line (everything is a string), so
//! numeric and boolean getters accept both forms.

use serde_json::Value;

use crate::error::{Result, SkillError};

/// Named parameters passed to a skill function.
pub type Params = serde_json::Map<String, Value>;

/// Typed getters over [`Params`].
pub trait ParamExt {
    /// A required string. `null` counts as missing.
    fn required_str(&self, name: &str, hint: &str) -> Result<&str>;

    /// An optional string; non-string values are rejected.
    fn optional_str(&self, name: &str) -> Result<Option<&str>>;

    /// An optional non-negative integer.
    fn optional_u64(&self, name: &str) -> Result<Option<u64>>;

    /// An optional float.
    fn optional_f64(&self, name: &str) -> Result<Option<f64>>;

    /// An optional boolean.
    fn optional_bool(&self, name: &str) -> Result<Option<bool>>;

    /// An optional list of strings. A single comma-separated string is split.
    fn optional_str_list(&self, name: &str) -> Result<Option<Vec<String>>>;
}

fn present<'a>(params: &'a Params, name: &str) -> Option<&'a Value> {
    params.get(name).filter(|v| !v.is_null())
}

impl ParamExt for Params {
    fn required_str(&self, name: &str, hint: &str) -> Result<&str> {
        match present(self, name) {
            None => Err(SkillError::missing(name, hint)),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(SkillError::invalid(
                name,
                format!("expected a string, got {}", other),
            )),
        }
    }

    fn optional_str(&self, name: &str) -> Result<Option<&str>> {
        match present(self, name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(SkillError::invalid(
                name,
                format!("expected a string, got {}", other),
            )),
        }
    }

    fn optional_u64(&self, name: &str) -> Result<Option<u64>> {
        let Some(value) = present(self, name) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.map(Some).ok_or_else(|| {
            SkillError::invalid(name, format!("expected a non-negative integer, got {}", value))
        })
    }

    fn optional_f64(&self, name: &str) -> Result<Option<f64>> {
        let Some(value) = present(self, name) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| SkillError::invalid(name, format!("expected a number, got {}", value)))
    }

    fn optional_bool(&self, name: &str) -> Result<Option<bool>> {
        let Some(value) = present(self, name) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| SkillError::invalid(name, format!("expected a boolean, got {}", value)))
    }

    fn optional_str_list(&self, name: &str) -> Result<Option<Vec<String>>> {
        match present(self, name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(String::from).ok_or_else(|| {
                        SkillError::invalid(name, format!("expected strings, got {}", item))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(other) => Err(SkillError::invalid(
                name,
                format!("expected a list of strings, got {}", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_str() {
        let p = params(json!({"context": "hello", "nothing": null, "num": 3}));
        assert_eq!(p.required_str("context", "text").unwrap(), "hello");

        let err = p.required_str("nothing", "text").unwrap_err();
        assert!(matches!(err, SkillError::MissingParameter { .. }));
        let err = p.required_str("absent", "text").unwrap_err();
        assert!(matches!(err, SkillError::MissingParameter { .. }));
        let err = p.required_str("num", "text").unwrap_err();
        assert!(matches!(err, SkillError::InvalidParameter { .. }));
    }

    #[test]
    fn test_numbers_accept_strings() {
        let p = params(json!({"a": 5, "b": "7", "c": "x", "d": -1, "f": "0.25"}));
        assert_eq!(p.optional_u64("a").unwrap(), Some(5));
        assert_eq!(p.optional_u64("b").unwrap(), Some(7));
        assert_eq!(p.optional_u64("missing").unwrap(), None);
        assert!(p.optional_u64("c").is_err());
        assert!(p.optional_u64("d").is_err());
        assert_eq!(p.optional_f64("f").unwrap(), Some(0.25));
    }

    #[test]
    fn test_bool_and_lists() {
        let p = params(json!({
            "flag": "true",
            "types": "cites, uses",
            "arr": ["a", "b"],
            "bad": [1],
        }));
        assert_eq!(p.optional_bool("flag").unwrap(), Some(true));
        assert_eq!(
            p.optional_str_list("types").unwrap().unwrap(),
            vec!["cites", "uses"]
        );
        assert_eq!(p.optional_str_list("arr").unwrap().unwrap(), vec!["a", "b"]);
        assert!(p.optional_str_list("bad").is_err());
    }
}
