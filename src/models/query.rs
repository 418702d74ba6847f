//! Relay queries and the cache key policy
//!
//! A [`Query`] is the logical request behind one relay call. Its cache key is
//! `kind|check_type|object_id|host_name`: absent optionals render as `-`,
//! present ones as `=value`, and `\` / `|` inside values are escaped with a
//! backslash. The encoding is reversible, which lets the node owning a key
//! rebuild the upstream request from the key alone.

use std::fmt;

use crate::error::{RelayError, Result};

/// Object collections that can be listed or fetched by name
pub const OBJECT_TYPES: &[&str] = &["hosts", "services", "hostgroups", "servicegroups"];

/// Object types accepted by the state and result endpoints
pub const STATE_OBJECT_TYPES: &[&str] = &["host", "service"];

const SEPARATOR: char = '|';
const ESCAPE: char = '\\';

// == Query Kind ==
/// Relay endpoint family a query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// `/icinga/{check-type}[/{object-id}]`
    Objects,
    /// `/icinga/dynamic_text/{host-name}`
    DynamicText,
    /// `/icinga/check_state`
    CheckState,
    /// `/icinga/check_result`
    CheckResult,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Objects => "objects",
            QueryKind::DynamicText => "dynamic_text",
            QueryKind::CheckState => "check_state",
            QueryKind::CheckResult => "check_result",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "objects" => Some(QueryKind::Objects),
            "dynamic_text" => Some(QueryKind::DynamicText),
            "check_state" => Some(QueryKind::CheckState),
            "check_result" => Some(QueryKind::CheckResult),
            _ => None,
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Query ==
/// Logical upstream query derived from one relay request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub kind: QueryKind,
    /// Object collection (`hosts`, `services`, ...) or state object type
    pub check_type: String,
    /// Object name, or the Icinga filter for state/result queries
    pub object_id: Option<String>,
    /// Host whose variables are relayed as dynamic text
    pub host_name: Option<String>,
}

impl Query {
    /// `/icinga/{check-type}` and `/icinga/{check-type}/{object-id}`
    pub fn objects(check_type: impl Into<String>, object_id: Option<String>) -> Result<Self> {
        let check_type = check_type.into();
        if !OBJECT_TYPES.contains(&check_type.as_str()) {
            return Err(RelayError::ParameterInvalid(format!(
                "unknown check type '{}', expected one of {}",
                check_type,
                OBJECT_TYPES.join(", ")
            )));
        }
        if object_id.as_deref().is_some_and(str::is_empty) {
            return Err(RelayError::ParameterInvalid("object id is empty".to_string()));
        }

        Ok(Self {
            kind: QueryKind::Objects,
            check_type,
            object_id,
            host_name: None,
        })
    }

    /// `/icinga/dynamic_text/{host-name}`
    pub fn dynamic_text(host_name: impl Into<String>) -> Result<Self> {
        let host_name = host_name.into();
        if host_name.trim().is_empty() {
            return Err(RelayError::ParameterInvalid("host name is empty".to_string()));
        }

        Ok(Self {
            kind: QueryKind::DynamicText,
            check_type: "hosts".to_string(),
            object_id: None,
            host_name: Some(host_name),
        })
    }

    /// `/icinga/check_state?object_type=..&filter=..`
    pub fn check_state(object_type: &str, filter: &str) -> Result<Self> {
        Self::filtered(QueryKind::CheckState, object_type, filter)
    }

    /// `/icinga/check_result?object_type=..&filter=..`
    pub fn check_result(object_type: &str, filter: &str) -> Result<Self> {
        Self::filtered(QueryKind::CheckResult, object_type, filter)
    }

    fn filtered(kind: QueryKind, object_type: &str, filter: &str) -> Result<Self> {
        if !STATE_OBJECT_TYPES.contains(&object_type) {
            return Err(RelayError::ParameterInvalid(format!(
                "unknown object_type '{}', expected host or service",
                object_type
            )));
        }
        if filter.trim().is_empty() {
            return Err(RelayError::ParameterInvalid("filter is empty".to_string()));
        }

        Ok(Self {
            kind,
            check_type: object_type.to_string(),
            object_id: Some(filter.to_string()),
            host_name: None,
        })
    }

    // == Key Policy ==
    /// Derives the cache key for this query. Pure and injective.
    pub fn derive_key(&self) -> String {
        let mut key = String::with_capacity(
            self.check_type.len()
                + self.object_id.as_ref().map_or(0, String::len)
                + self.host_name.as_ref().map_or(0, String::len)
                + 24,
        );

        key.push_str(self.kind.as_str());
        key.push(SEPARATOR);
        push_escaped(&mut key, &self.check_type);
        key.push(SEPARATOR);
        push_optional(&mut key, self.object_id.as_deref());
        key.push(SEPARATOR);
        push_optional(&mut key, self.host_name.as_deref());

        key
    }

    /// Rebuilds the query a key was derived from.
    ///
    /// Returns `None` for strings [`Query::derive_key`] cannot produce.
    pub fn from_key(key: &str) -> Option<Self> {
        let fields = split_escaped(key)?;
        let [kind, check_type, object_id, host_name]: [String; 4] = fields.try_into().ok()?;

        Some(Self {
            kind: QueryKind::parse(&kind)?,
            check_type,
            object_id: parse_optional(&object_id)?,
            host_name: parse_optional(&host_name)?,
        })
    }
}

/// Free-function form of [`Query::derive_key`].
pub fn derive_key(query: &Query) -> String {
    query.derive_key()
}

fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

fn push_optional(out: &mut String, value: Option<&str>) {
    match value {
        Some(v) => {
            out.push('=');
            push_escaped(out, v);
        }
        None => out.push('-'),
    }
}

fn parse_optional(field: &str) -> Option<Option<String>> {
    match field.strip_prefix('=') {
        Some(value) => Some(Some(value.to_string())),
        None if field == "-" => Some(None),
        None => None,
    }
}

/// Splits on unescaped separators and removes the escapes.
fn split_escaped(key: &str) -> Option<Vec<String>> {
    let mut fields = Vec::with_capacity(4);
    let mut current = String::new();
    let mut chars = key.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => current.push(chars.next()?),
            SEPARATOR => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    Some(fields)
}
