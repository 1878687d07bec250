use regex::Regex;

use crate::error::BenchError;

/// Pattern that selects every benchmark.
const UNRESTRICTED: &str = ".";

/// A benchmark name filter, passed verbatim to the harness and matched
/// locally against cached names.
#[derive(Debug, Clone)]
pub struct BenchFilter {
    pattern: String,
    regex: Regex,
}

impl BenchFilter {
    /// Validate `pattern`; an empty pattern means "everything".
    pub fn new(pattern: &str) -> Result<Self, BenchError> {
        let pattern = if pattern.is_empty() {
            UNRESTRICTED
        } else {
            pattern
        };
        let regex = Regex::new(pattern).map_err(|e| {
            BenchError::invalid_argument(format!("invalid benchmark pattern '{pattern}': {e}"))
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn all() -> Self {
        Self::new(UNRESTRICTED).expect("'.' is a valid pattern")
    }

    /// A filter that matches exactly the given names and nothing else.
    pub fn exact<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, BenchError> {
        let alternatives: Vec<_> = names.into_iter().map(regex::escape).collect();
        Self::new(&format!("^({})$", alternatives.join("|")))
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// True for the pattern that runs the whole package. Only a run with this
    /// filter may mark a cache as complete.
    pub fn is_unrestricted(&self) -> bool {
        self.pattern == UNRESTRICTED
    }
}

impl std::fmt::Display for BenchFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}
