//! Field declaration grammar
//!
//! ```text
//! string [:an] [:auto[N]] [:min[M]] [:max[M]]    modifiers in any order
//! ref=<table>
//! array:<declaration>                           recursive
//! ```
//!
//! Keywords are case-insensitive. Every modifier may appear at most once and
//! nothing may remain after the recognized modifiers.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::types::{FieldType, StringRules};
use crate::errors::ArgsError;

fn modifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i):(?:(an)|auto\[(\d+)\]|min\[(\d+)\]|max\[(\d+)\])")
            .expect("modifier pattern is a valid regex")
    })
}

/// Strips an ASCII prefix, ignoring case
fn strip_keyword<'a>(decl: &'a str, keyword: &str) -> Option<&'a str> {
    let head = decl.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword).then(|| &decl[keyword.len()..])
}

/// Parses one field declaration into its type descriptor
pub fn parse_field(decl: &str) -> Result<FieldType, ArgsError> {
    if let Some(modifiers) = strip_keyword(decl, "string") {
        return parse_string(decl, modifiers);
    }

    if let Some(table) = strip_keyword(decl, "ref=") {
        if table.is_empty() {
            return Err(ArgsError::malformed_schema(format!(
                "invalid field \"{}\": ref= needs a table name",
                decl
            )));
        }
        return Ok(FieldType::reference(table));
    }

    if let Some(inner) = strip_keyword(decl, "array:") {
        if inner.is_empty() {
            return Err(ArgsError::malformed_schema(format!(
                "invalid field \"{}\": array: needs an element type",
                decl
            )));
        }
        return Ok(FieldType::array_of(parse_field(inner)?));
    }

    Err(ArgsError::malformed_schema(format!("invalid field \"{}\"", decl)))
}

fn parse_length(decl: &str, digits: &str) -> Result<usize, ArgsError> {
    digits.parse().map_err(|_| {
        ArgsError::malformed_schema(format!("invalid length \"{}\" in \"{}\"", digits, decl))
    })
}

fn set_once(slot: &mut Option<usize>, value: usize, decl: &str, name: &str) -> Result<(), ArgsError> {
    if slot.replace(value).is_some() {
        return Err(ArgsError::malformed_schema(format!(
            "modifier :{} repeats in \"{}\"",
            name, decl
        )));
    }
    Ok(())
}

fn parse_string(decl: &str, mut rest: &str) -> Result<FieldType, ArgsError> {
    let mut alphanumeric = false;
    let mut auto = None;
    let mut min = None;
    let mut max = None;

    while !rest.is_empty() {
        let caps: Captures<'_> = modifier_pattern().captures(rest).ok_or_else(|| {
            ArgsError::malformed_schema(format!("invalid field declaration \"{}\"", decl))
        })?;

        if caps.get(1).is_some() {
            if alphanumeric {
                return Err(ArgsError::malformed_schema(format!(
                    "modifier :an repeats in \"{}\"",
                    decl
                )));
            }
            alphanumeric = true;
        } else if let Some(n) = caps.get(2) {
            set_once(&mut auto, parse_length(decl, n.as_str())?, decl, "auto")?;
        } else if let Some(n) = caps.get(3) {
            set_once(&mut min, parse_length(decl, n.as_str())?, decl, "min")?;
        } else if let Some(n) = caps.get(4) {
            set_once(&mut max, parse_length(decl, n.as_str())?, decl, "max")?;
        }

        rest = &rest[caps[0].len()..];
    }

    StringRules::new(alphanumeric, auto, min, max)
        .map(FieldType::String)
        .map_err(|e| ArgsError::malformed_schema(format!("{} in \"{}\"", e.message(), decl)))
}
