//! Function-name matchers for runtime entry points that are safe to ignore.

use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A compiled regular expression matched against a frame's function name.
///
/// Serialises as the plain pattern string so it can be written directly in
/// the YAML project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionPattern {
    regex: Regex,
}

impl FunctionPattern {
    /// Compile a pattern.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        Regex::new(pattern)
            .map(|regex| Self { regex })
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Whether `function` matches this pattern.
    pub fn is_match(&self, function: &str) -> bool {
        self.regex.is_match(function)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl PartialEq for FunctionPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for FunctionPattern {}

impl fmt::Display for FunctionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for FunctionPattern {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<FunctionPattern> for String {
    fn from(value: FunctionPattern) -> Self {
        value.regex.as_str().to_string()
    }
}

/// Compile a list of pattern strings, failing on the first invalid one.
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<FunctionPattern>, ConfigError> {
    patterns
        .iter()
        .map(|p| FunctionPattern::new(p.as_ref()))
        .collect()
}
