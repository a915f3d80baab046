//! Origin Matcher.
//!
//! Decides whether a discovered origin is one the caller trusts. The
//! pattern shape is decided once at the API boundary (`OriginPattern`), so
//! matching never probes types at runtime.
//!
//! Matching is case-sensitive and has no side effects.

use crate::error::SendError;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Pattern that matches any origin.
pub const WILDCARD: &str = "*";

/// Acceptable origin(s) for a target endpoint.
#[derive(Debug, Clone)]
pub enum OriginPattern {
    /// Any origin.
    Wildcard,
    /// Exactly one origin string.
    Exact(String),
    /// Any of an ordered set of origin strings. `*` inside the set matches anything.
    Set(Vec<String>),
    /// A regular expression over the origin string.
    Pattern(Regex),
}

impl OriginPattern {
    /// Exact origin; `"*"` maps to [`OriginPattern::Wildcard`].
    pub fn exact(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        if origin == WILDCARD {
            OriginPattern::Wildcard
        } else {
            OriginPattern::Exact(origin)
        }
    }

    pub fn set<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OriginPattern::Set(origins.into_iter().map(Into::into).collect())
    }

    /// Regular expression over the whole origin string (unanchored unless
    /// the expression anchors itself).
    pub fn regex(expr: &str) -> Result<Self, SendError> {
        Regex::new(expr)
            .map(OriginPattern::Pattern)
            .map_err(|e| SendError::invalid(format!("invalid origin regex {expr:?}: {e}")))
    }

    /// Scheme/host glob such as `https://*.example.com`.
    ///
    /// `*` matches any run of characters other than `/`; the glob is anchored
    /// at both ends.
    pub fn glob(glob: &str) -> Result<Self, SendError> {
        if glob.is_empty() {
            return Err(SendError::invalid("origin glob cannot be empty"));
        }
        let body = glob
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("[^/]*");
        Self::regex(&format!("^{body}$"))
    }

    /// Parse the untyped `origin` option: a string, an array of strings,
    /// `{"regex": "..."}` or `{"glob": "..."}`.
    pub fn from_json(value: &Value) -> Result<Self, SendError> {
        let pattern = match value {
            Value::String(origin) => Self::exact(origin.as_str()),
            Value::Array(items) => {
                let origins = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_owned).ok_or_else(|| {
                            SendError::invalid("Expected origin array to contain only strings")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                OriginPattern::Set(origins)
            }
            Value::Object(map) if map.len() == 1 => match map.iter().next() {
                Some((key, Value::String(expr))) if key == "regex" => Self::regex(expr)?,
                Some((key, Value::String(glob))) if key == "glob" => Self::glob(glob)?,
                _ => return Err(unrecognized_shape()),
            },
            _ => return Err(unrecognized_shape()),
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Reject patterns that can never be satisfied.
    pub fn validate(&self) -> Result<(), SendError> {
        match self {
            OriginPattern::Exact(origin) if origin.is_empty() => {
                Err(SendError::invalid("origin cannot be empty"))
            }
            OriginPattern::Set(origins) if origins.is_empty() => {
                Err(SendError::invalid("origin set cannot be empty"))
            }
            OriginPattern::Set(origins) if origins.iter().any(String::is_empty) => {
                Err(SendError::invalid("origin set cannot contain empty origins"))
            }
            _ => Ok(()),
        }
    }

    /// Whether `origin` is acceptable under this pattern.
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            OriginPattern::Wildcard => true,
            OriginPattern::Exact(expected) => expected == origin,
            OriginPattern::Set(origins) => origins
                .iter()
                .any(|candidate| candidate == WILDCARD || candidate == origin),
            OriginPattern::Pattern(regex) => regex.is_match(origin),
        }
    }

    /// Concrete string usable as a transmit origin without discovery.
    pub fn as_concrete(&self) -> Option<&str> {
        match self {
            OriginPattern::Wildcard => Some(WILDCARD),
            OriginPattern::Exact(origin) => Some(origin),
            OriginPattern::Set(_) | OriginPattern::Pattern(_) => None,
        }
    }

    /// True for sets and regexes: the real origin must be discovered first.
    pub fn is_ambiguous(&self) -> bool {
        self.as_concrete().is_none()
    }
}

impl Default for OriginPattern {
    fn default() -> Self {
        OriginPattern::Wildcard
    }
}

impl PartialEq for OriginPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OriginPattern::Wildcard, OriginPattern::Wildcard) => true,
            (OriginPattern::Exact(a), OriginPattern::Exact(b)) => a == b,
            (OriginPattern::Set(a), OriginPattern::Set(b)) => a == b,
            (OriginPattern::Pattern(a), OriginPattern::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for OriginPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginPattern::Wildcard => f.write_str(WILDCARD),
            OriginPattern::Exact(origin) => f.write_str(origin),
            OriginPattern::Set(origins) => write!(f, "[{}]", origins.join(", ")),
            OriginPattern::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl From<&str> for OriginPattern {
    fn from(origin: &str) -> Self {
        Self::exact(origin)
    }
}

impl From<Vec<String>> for OriginPattern {
    fn from(origins: Vec<String>) -> Self {
        OriginPattern::Set(origins)
    }
}

impl From<Regex> for OriginPattern {
    fn from(regex: Regex) -> Self {
        OriginPattern::Pattern(regex)
    }
}

fn unrecognized_shape() -> SendError {
    SendError::invalid("Expected origin to be a string, array, or regex")
}
