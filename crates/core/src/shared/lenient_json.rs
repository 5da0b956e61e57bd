use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LenientDecodeError {
    #[error("response was empty")]
    Empty,
    #[error("no JSON {0} found in response")]
    NoJson(&'static str),
    #[error("malformed JSON: {0}")]
    Malformed(String),
}

/// Which top-level JSON shape the caller expects to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

impl JsonShape {
    fn name(self) -> &'static str {
        match self {
            JsonShape::Array => "array",
            JsonShape::Object => "object",
        }
    }

    fn span_pattern(self) -> &'static Regex {
        static ARRAY: OnceLock<Regex> = OnceLock::new();
        static OBJECT: OnceLock<Regex> = OnceLock::new();
        match self {
            JsonShape::Array => ARRAY.get_or_init(|| compile(r"(?s)\[.*\]")),
            JsonShape::Object => OBJECT.get_or_init(|| compile(r"(?s)\{.*\}")),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => unreachable!("static pattern {pattern} failed to compile: {e}"),
    }
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| compile(r"(?s)```[a-zA-Z]*\s*(.*?)```"))
}

/// Recovers a JSON value from free-form model output.
///
/// Strips markdown code fences, tries a direct parse, then falls back to
/// the outermost `[...]` or `{...}` span depending on `shape`.
pub fn decode<T: DeserializeOwned>(raw: &str, shape: JsonShape) -> Result<T, LenientDecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LenientDecodeError::Empty);
    }

    let unfenced = code_fence()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);

    let direct_error = match serde_json::from_str::<T>(unfenced) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let span = shape
        .span_pattern()
        .find(unfenced)
        .ok_or(LenientDecodeError::NoJson(shape.name()))?;

    serde_json::from_str::<T>(span.as_str()).map_err(|span_error| {
        log::debug!("direct parse failed ({direct_error}), span parse failed ({span_error})");
        LenientDecodeError::Malformed(span_error.to_string())
    })
}

pub fn decode_array<T: DeserializeOwned>(raw: &str) -> Result<T, LenientDecodeError> {
    decode(raw, JsonShape::Array)
}

pub fn decode_object<T: DeserializeOwned>(raw: &str) -> Result<T, LenientDecodeError> {
    decode(raw, JsonShape::Object)
}

/// Reads the first present key of `names` from a JSON object as a number.
///
/// Models often quote numbers or switch between camelCase and snake_case,
/// so both spellings and numeric strings are accepted.
pub fn number_field(object: &serde_json::Value, names: &[&str]) -> Option<f64> {
    names
        .iter()
        .find_map(|name| object.get(*name))
        .and_then(|value| match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite())
}
