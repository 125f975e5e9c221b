//! DSL parser for reducer descriptions.
//!
//! Reducer format (CMS Pipelines style):
//! ```text
//! REDUCE COUNT
//! | SUM bytes_sent, request_time
//! | AVG request_time
//! ?
//! ```
//!
//! - `REDUCE` optionally starts the description
//! - `| <reducer>` continues with another reducer; stages may also be joined
//!   with `|` on a single line (`COUNT | SUM bytes`)
//! - `?` on its own line (or at the end of a line) marks the end
//! - Lines starting with `#` are comments
//!
//! A single stage describes that reducer. Two or more stages describe a
//! chain: every entry is fed to each stage and the result lists one
//! reduction per stage.
//!
//! Supported reducers:
//! - `READALL` - Hand the entry stream back unread
//! - `COUNT` - Count entries
//! - `SUM f1, f2, ...` - Sum numeric values per field
//! - `AVG f1, f2, ...` - Average numeric values per field
//!
//! Field names are separated by commas or whitespace. A name containing
//! either can be quoted with `"` or `'`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReduceError;

/// Declarative description of a reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReducerSpec {
    /// READALL
    ReadAll,
    /// COUNT
    Count,
    /// SUM f1, f2, ...
    Sum { fields: Vec<String> },
    /// AVG f1, f2, ...
    Avg { fields: Vec<String> },
    /// r1 | r2 | ...
    Chain { reducers: Vec<ReducerSpec> },
}

impl ReducerSpec {
    /// Get the reducer name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ReducerSpec::ReadAll => "READALL",
            ReducerSpec::Count => "COUNT",
            ReducerSpec::Sum { .. } => "SUM",
            ReducerSpec::Avg { .. } => "AVG",
            ReducerSpec::Chain { .. } => "CHAIN",
        }
    }
}

impl FromStr for ReducerSpec {
    type Err = ReduceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_reducer(text)
    }
}

/// Parse DSL text into a single reducer description.
///
/// More than one stage yields `ReducerSpec::Chain`.
pub fn parse_reducer(text: &str) -> Result<ReducerSpec, ReduceError> {
    let mut stages = parse_stages(text)?;
    match stages.len() {
        0 => Err(ReduceError::Parse("Reducer description is empty".to_string())),
        1 => Ok(stages.remove(0)),
        _ => Ok(ReducerSpec::Chain { reducers: stages }),
    }
}

/// Parse DSL text into its stages, in order.
pub fn parse_stages(text: &str) -> Result<Vec<ReducerSpec>, ReduceError> {
    let mut stages = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = if line.eq_ignore_ascii_case("REDUCE") {
            continue;
        } else if line
            .get(..7)
            .is_some_and(|head| head.eq_ignore_ascii_case("REDUCE "))
        {
            line[7..].trim()
        } else {
            line
        };

        let line = line.trim_end_matches('?').trim();

        let at_line = |e: String| ReduceError::Parse(format!("Line {}: {}", line_num + 1, e));
        for stage in split_stages(line).map_err(at_line)? {
            let stage = stage.trim();
            if stage.is_empty() {
                continue;
            }
            stages.push(parse_stage(stage).map_err(at_line)?);
        }
    }

    Ok(stages)
}

/// Split a line on `|` outside of quotes.
fn split_stages(line: &str) -> Result<Vec<&str>, String> {
    let mut stages = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (idx, c) in line.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '|') => {
                stages.push(&line[start..idx]);
                start = idx + 1;
            }
            (None, _) => {}
        }
    }

    if let Some(q) = quote {
        return Err(format!("Unclosed delimiter '{}'", q));
    }
    stages.push(&line[start..]);
    Ok(stages)
}

/// Parse a single stage.
fn parse_stage(stage: &str) -> Result<ReducerSpec, String> {
    let (keyword, rest) = match stage.find(char::is_whitespace) {
        Some(idx) => (&stage[..idx], stage[idx..].trim()),
        None => (stage, ""),
    };

    match keyword.to_uppercase().as_str() {
        "READALL" => no_arguments(ReducerSpec::ReadAll, rest),
        "COUNT" => no_arguments(ReducerSpec::Count, rest),
        "SUM" => Ok(ReducerSpec::Sum {
            fields: parse_fields("SUM", rest)?,
        }),
        "AVG" => Ok(ReducerSpec::Avg {
            fields: parse_fields("AVG", rest)?,
        }),
        _ => Err(format!("Unknown reducer: {}", keyword)),
    }
}

fn no_arguments(spec: ReducerSpec, rest: &str) -> Result<ReducerSpec, String> {
    if rest.is_empty() {
        Ok(spec)
    } else {
        Err(format!("{} takes no arguments", spec.name()))
    }
}

fn is_separator(c: char) -> bool {
    c == ',' || c.is_whitespace()
}

/// Parse a field list: names separated by commas or whitespace, optionally
/// quoted.
fn parse_fields(keyword: &str, rest: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut remaining = rest.trim_start_matches(is_separator);

    while !remaining.is_empty() {
        let (field, after) = match remaining.chars().next() {
            Some(delim @ ('"' | '\'')) => parse_delimited_string(remaining, delim)?,
            _ => {
                let end = remaining.find(is_separator).unwrap_or(remaining.len());
                (remaining[..end].to_string(), &remaining[end..])
            }
        };

        if field.is_empty() {
            return Err(format!("{} has an empty field name", keyword));
        }
        fields.push(field);
        remaining = after.trim_start_matches(is_separator);
    }

    if fields.is_empty() {
        return Err(format!("{} requires at least one field", keyword));
    }
    Ok(fields)
}

/// Parse a string wrapped in `delim`, returning it and the rest of the input.
fn parse_delimited_string(s: &str, delim: char) -> Result<(String, &str), String> {
    let after_delim = &s[delim.len_utf8()..];
    match after_delim.find(delim) {
        Some(end) => Ok((
            after_delim[..end].to_string(),
            &after_delim[end + delim.len_utf8()..],
        )),
        None => Err(format!("Unclosed delimiter '{}'", delim)),
    }
}
