//! Value sources and their merge order
//!
//! Overrides come from six kinds of inputs, applied lowest to highest:
//!
//! | Kind          | Flag            | Payload                        |
//! |---------------|-----------------|--------------------------------|
//! | `File`        | `-f/--values`   | path to a YAML file            |
//! | `Set`         | `--set`         | `a.b=1,c=true` (typed)         |
//! | `SetString`   | `--set-string`  | `a.b=1` (always strings)       |
//! | `SetFile`     | `--set-file`    | `key=path` (file content)      |
//! | `SetJson`     | `--set-json`    | `key={"json":true}`            |
//! | `SetLiteral`  | `--set-literal` | `key=value` (taken verbatim)   |
//!
//! Within one kind, sources apply in the order they were given.

use serde_json::Value as JsonValue;
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::values::{PathSegment, Values, parse_key_path};

/// Kind of a value source, ordered by precedence (lowest first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueSourceKind {
    File,
    Set,
    SetString,
    SetFile,
    SetJson,
    SetLiteral,
}

impl ValueSourceKind {
    /// All kinds, lowest precedence first
    pub const ALL: [ValueSourceKind; 6] = [
        Self::File,
        Self::Set,
        Self::SetString,
        Self::SetFile,
        Self::SetJson,
        Self::SetLiteral,
    ];

    /// Long command-line flag for this kind, without dashes
    pub fn flag(self) -> &'static str {
        match self {
            Self::File => "values",
            Self::Set => "set",
            Self::SetString => "set-string",
            Self::SetFile => "set-file",
            Self::SetJson => "set-json",
            Self::SetLiteral => "set-literal",
        }
    }
}

impl fmt::Display for ValueSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}", self.flag())
    }
}

/// A single override input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSource {
    pub kind: ValueSourceKind,
    pub payload: String,
}

impl ValueSource {
    pub fn new(kind: ValueSourceKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Parse this source into a values tree
    pub fn load(&self) -> Result<Values> {
        match self.kind {
            ValueSourceKind::File => load_values_file(&self.payload),
            ValueSourceKind::Set => parse_assignments(self, ScalarMode::Typed),
            ValueSourceKind::SetString => parse_assignments(self, ScalarMode::String),
            ValueSourceKind::SetFile => parse_assignments(self, ScalarMode::FileContent),
            ValueSourceKind::SetJson => parse_json_assignment(self),
            ValueSourceKind::SetLiteral => parse_literal_assignment(self),
        }
    }

    fn error(&self, message: impl Into<String>) -> CoreError {
        CoreError::ValueParse {
            flag: self.kind.flag().to_string(),
            input: self.payload.clone(),
            message: message.into(),
        }
    }
}

/// The full set of overrides for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueSourceSet {
    sources: Vec<ValueSource>,
}

impl ValueSourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source of the given kind
    pub fn push(&mut self, kind: ValueSourceKind, payload: impl Into<String>) {
        self.sources.push(ValueSource::new(kind, payload));
    }

    /// Builder form of [`push`](Self::push) for several payloads of one kind
    pub fn with<I, S>(mut self, kind: ValueSourceKind, payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for payload in payloads {
            self.push(kind, payload);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Sources in the order they were given
    pub fn iter(&self) -> impl Iterator<Item = &ValueSource> {
        self.sources.iter()
    }

    /// Sources in application order: by kind precedence, then insertion order
    pub fn ordered(&self) -> Vec<&ValueSource> {
        let mut ordered: Vec<&ValueSource> = self.sources.iter().collect();
        ordered.sort_by_key(|source| source.kind);
        ordered
    }
}

/// Where the effective values came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuesOrigin {
    /// Merged from the supplied sources
    Overrides,
    /// The sources produced nothing, so the installed release values are reused
    CurrentRelease,
}

/// The values handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveValues {
    pub values: Values,
    pub origin: ValuesOrigin,
}

/// Merges value sources and applies the installed-values fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueResolver;

impl ValueResolver {
    pub fn new() -> Self {
        Self
    }

    /// Merge all sources in precedence order
    pub fn merge(&self, sources: &ValueSourceSet) -> Result<Values> {
        let mut merged = Values::new();
        for source in sources.ordered() {
            debug!(kind = %source.kind, payload = %source.payload, "applying value source");
            let values = source.load()?;
            merged.merge(&values);
        }
        Ok(merged)
    }

    /// Merge all sources, or take `current` wholesale if the merge is empty
    ///
    /// The fallback is all-or-nothing: a non-empty merge never inherits any
    /// key from `current`.
    pub fn resolve(&self, sources: &ValueSourceSet, current: &Values) -> Result<EffectiveValues> {
        let merged = self.merge(sources)?;

        if merged.is_empty() {
            debug!("no overrides supplied, reusing values of the installed release");
            return Ok(EffectiveValues {
                values: current.clone(),
                origin: ValuesOrigin::CurrentRelease,
            });
        }

        Ok(EffectiveValues {
            values: merged,
            origin: ValuesOrigin::Overrides,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarMode {
    Typed,
    String,
    FileContent,
}

fn load_values_file(path: &str) -> Result<Values> {
    let fail = |message: String| CoreError::ValueParse {
        flag: ValueSourceKind::File.flag().to_string(),
        input: path.to_string(),
        message,
    };

    let content = std::fs::read_to_string(Path::new(path)).map_err(|e| fail(e.to_string()))?;
    let values = Values::from_yaml(&content).map_err(|e| fail(e.to_string()))?;

    match values.inner() {
        JsonValue::Object(_) => Ok(values),
        _ => Err(fail("top level must be a mapping".to_string())),
    }
}

/// `a.b=1,c[0]=x,list={a,b}` style input
fn parse_assignments(source: &ValueSource, mode: ScalarMode) -> Result<Values> {
    let mut values = Values::new();

    for assignment in split_unescaped(&source.payload, ',', true) {
        if assignment.is_empty() {
            continue;
        }

        let (key, raw) = split_key_value(assignment)
            .ok_or_else(|| source.error(format!("key '{}' has no value", assignment)))?;
        let path = key_path(source, key)?;

        let value = if mode != ScalarMode::FileContent && is_list_literal(raw) {
            let inner = &raw[1..raw.len() - 1];
            let items = if inner.is_empty() {
                Vec::new()
            } else {
                split_unescaped(inner, ',', false)
                    .into_iter()
                    .map(|item| scalar(&unescape(item), mode))
                    .collect()
            };
            JsonValue::Array(items)
        } else if mode == ScalarMode::FileContent {
            let file = unescape(raw);
            let content = std::fs::read_to_string(&file)
                .map_err(|e| source.error(format!("cannot read '{}': {}", file, e)))?;
            JsonValue::String(content)
        } else {
            scalar(&unescape(raw), mode)
        };

        values.set_path(&path, value);
    }

    Ok(values)
}

/// `key=<json>`; the value is everything after the first unescaped `=`
fn parse_json_assignment(source: &ValueSource) -> Result<Values> {
    let (key, raw) = split_key_value(&source.payload)
        .ok_or_else(|| source.error("expected key=<json>"))?;
    let path = key_path(source, key)?;

    let value: JsonValue = serde_json::from_str(raw)
        .map_err(|e| source.error(format!("invalid JSON value: {}", e)))?;

    let mut values = Values::new();
    values.set_path(&path, value);
    Ok(values)
}

/// `key=value`; the value is kept byte for byte, commas and escapes included
fn parse_literal_assignment(source: &ValueSource) -> Result<Values> {
    let (key, raw) = split_key_value(&source.payload)
        .ok_or_else(|| source.error("expected key=value"))?;
    let path = key_path(source, key)?;

    let mut values = Values::new();
    values.set_path(&path, JsonValue::String(raw.to_string()));
    Ok(values)
}

fn key_path(source: &ValueSource, key: &str) -> Result<Vec<PathSegment>> {
    parse_key_path(key).map_err(|e| match e {
        CoreError::InvalidKeyPath { path, message } => {
            source.error(format!("invalid key '{}': {}", path, message))
        }
        other => other,
    })
}

/// Helm-compatible scalar typing for `--set`
///
/// `true`/`false` (any case) become booleans, `null` becomes null and
/// integers without a leading zero become int64. Everything else is a string.
fn scalar(raw: &str, mode: ScalarMode) -> JsonValue {
    if mode != ScalarMode::Typed {
        return JsonValue::String(raw.to_string());
    }

    if raw.eq_ignore_ascii_case("true") {
        return JsonValue::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return JsonValue::Bool(false);
    }
    if raw.eq_ignore_ascii_case("null") {
        return JsonValue::Null;
    }
    if raw == "0" {
        return JsonValue::from(0);
    }
    if !raw.is_empty() && !raw.starts_with('0') {
        if let Ok(number) = raw.parse::<i64>() {
            return JsonValue::from(number);
        }
    }

    JsonValue::String(raw.to_string())
}

fn is_list_literal(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with('{') && raw.ends_with('}')
}

/// Split on `separator` outside of escapes (and outside `{...}` when `braces`)
///
/// Escape sequences are kept intact for later processing.
fn split_unescaped(input: &str, separator: char, braces: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut escaped = false;

    for (pos, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' if braces => depth += 1,
            '}' if braces => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&input[start..pos]);
                start = pos + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Split at the first unescaped `=`
fn split_key_value(assignment: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (pos, c) in assignment.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' => return Some((&assignment[..pos], &assignment[pos + 1..])),
            _ => {}
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}
