//! CLI command handlers.

pub mod config;
pub mod knowledge;
pub mod memory;
pub mod skill;
pub mod verify;
pub mod workflow;

use anyhow::{Result, bail};
use console::{Style, style};
use serde::Serialize;
use serde_json::Value;
use skein_config::LoadedConfig;
use skein_skills::Params;

use crate::app::AppContext;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration and where it came from.
    pub loaded: LoadedConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    pub fn app(&self) -> Result<AppContext> {
        AppContext::build(&self.loaded.config)
    }
}

/// Parse a `key=value` argument. Values that parse as JSON keep their type;
/// anything else is taken as a string.
pub fn parse_param(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{arg}'"))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in '{arg}'"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

pub fn params_from(pairs: Vec<(String, Value)>) -> Params {
    pairs.into_iter().collect()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_header(title: &str) {
    println!("{}", style(title).bold());
    println!("{}", Style::new().dim().apply_to("─".repeat(50)));
}

/// Render a skill or step result: strings raw, everything else as JSON.
pub fn render_value(value: &Value) -> Result<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other)?,
    })
}

pub fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let cut: String = single_line.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

pub fn not_found(what: &str, key: &str) -> Result<()> {
    bail!("{what} not found: {key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_param_types() {
        assert_eq!(parse_param("n=5").unwrap(), ("n".into(), json!(5)));
        assert_eq!(parse_param("flag=true").unwrap(), ("flag".into(), json!(true)));
        assert_eq!(
            parse_param("context=hello world").unwrap(),
            ("context".into(), json!("hello world"))
        );
        assert_eq!(parse_param("eq=a=b").unwrap(), ("eq".into(), json!("a=b")));
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line one\nline two", 8), "line on…");
    }
}
