//! Named extraction strategies over free-text tool output.
//!
//! A strategy is a pure `text -> Extraction` function. Callers keep an
//! ordered list and take the first [`Extraction::Found`]; supporting a new
//! output phrasing means adding a strategy, not editing control flow.

use regex::{Regex, RegexBuilder};

/// Result of running one strategy against a text.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Found(f64),
    NotFound,
    /// The pattern matched but the captured text is not a finite number.
    Malformed(String),
}

/// A case-insensitive pattern whose first capture group holds the value.
#[derive(Debug, Clone)]
pub struct Strategy {
    name: &'static str,
    pattern: Regex,
}

impl Strategy {
    pub fn new(name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { name, pattern })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn extract(&self, text: &str) -> Extraction {
        let Some(captures) = self.pattern.captures(text) else {
            return Extraction::NotFound;
        };
        let Some(raw) = captures.get(1) else {
            return Extraction::NotFound;
        };
        match raw.as_str().parse::<f64>() {
            Ok(value) if value.is_finite() => Extraction::Found(value),
            _ => Extraction::Malformed(raw.as_str().to_string()),
        }
    }
}

/// Outcome of an ordered strategy chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainResult {
    /// Winning strategy name and its value.
    pub found: Option<(&'static str, f64)>,
    /// Strategies that matched but captured unparsable text.
    pub malformed: Vec<(&'static str, String)>,
}

/// Try each strategy in order; the first `Found` wins, `Malformed` falls through.
pub fn first_found(strategies: &[Strategy], text: &str) -> ChainResult {
    let mut malformed = Vec::new();
    for strategy in strategies {
        match strategy.extract(text) {
            Extraction::Found(value) => {
                return ChainResult { found: Some((strategy.name(), value)), malformed };
            }
            Extraction::Malformed(raw) => malformed.push((strategy.name(), raw)),
            Extraction::NotFound => {}
        }
    }
    ChainResult { found: None, malformed }
}
