//! Topic patterns for routing rules.
//!
//! `*` matches any sequence of characters; every other character, regex
//! metacharacters included, matches itself. Patterns are anchored at both
//! ends and compared case-insensitively.

use regex::{Regex, RegexBuilder};

/// A routing pattern compiled once at configuration load.
#[derive(Debug, Clone)]
pub struct TopicPattern {
    source: String,
    regex: Regex,
}

impl TopicPattern {
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = RegexBuilder::new(&format!("^{}$", body))
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, topic: &str) -> bool {
        self.regex.is_match(topic)
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
