//! Fingerprint matching over raw payload bytes
//!
//! Each category owns an ordered list of named rules. A payload hits a
//! category on the first rule that matches; later rules of that category are
//! not evaluated. Categories are independent of each other, and disabled
//! categories are never compiled.

mod rules;

pub use rules::{CategorySpec, BUILTIN_CATEGORIES, WIX, WORDPRESS};

use crate::config::Config;
use crate::ConfigError;
use regex::bytes::{Regex, RegexBuilder};

/// Compiles a fingerprint pattern
///
/// Patterns are case-insensitive and byte-oriented (`\s`, `\b` and classes
/// are ASCII-only), so they also match inside payloads that are not valid UTF-8.
pub fn compile_rule(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .unicode(false)
        .build()
}

/// A named, compiled pattern
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    regex: Regex,
}

impl Rule {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            regex: compile_rule(pattern)?,
        })
    }

    pub fn is_match(&self, payload: &[u8]) -> bool {
        self.regex.is_match(payload)
    }
}

/// A fingerprint category with its ordered rules
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    /// File name prefix of this category's rolling output files
    pub output_prefix: String,
    pub rules: Vec<Rule>,
}

impl Category {
    fn from_spec(spec: &CategorySpec) -> Result<Self, ConfigError> {
        let rules = spec
            .rules
            .iter()
            .map(|(name, pattern)| {
                Rule::new(*name, pattern).map_err(|e| ConfigError::InvalidPattern {
                    name: format!("{}/{}", spec.name, name),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: spec.name.to_string(),
            output_prefix: spec.output_prefix.to_string(),
            rules,
        })
    }

    /// Name of the first matching rule
    pub fn first_match(&self, payload: &[u8]) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.is_match(payload))
            .map(|rule| rule.name.as_str())
    }
}

/// One category hit for a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit<'a> {
    /// Index into [`FingerprintMatcher::categories`]
    pub category: usize,
    pub rule: &'a str,
}

/// Evaluates all enabled categories against payloads
#[derive(Debug, Clone)]
pub struct FingerprintMatcher {
    categories: Vec<Category>,
}

impl FingerprintMatcher {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Builds the enabled built-in categories followed by the custom ones
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut categories = Vec::new();

        if config.categories.wordpress {
            categories.push(Category::from_spec(&WORDPRESS)?);
        }
        if config.categories.wix {
            categories.push(Category::from_spec(&WIX)?);
        }

        for entry in &config.fingerprints {
            let rules = entry
                .rules
                .iter()
                .map(|rule| {
                    Rule::new(rule.name.clone(), &rule.pattern).map_err(|e| {
                        ConfigError::InvalidPattern {
                            name: format!("{}/{}", entry.name, rule.name),
                            message: e.to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            categories.push(Category {
                name: entry.name.clone(),
                output_prefix: entry.output_prefix.clone(),
                rules,
            });
        }

        Ok(Self::new(categories))
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Returns at most one hit per category, in category order
    pub fn matches(&self, payload: &[u8]) -> Vec<Hit<'_>> {
        self.categories
            .iter()
            .enumerate()
            .filter_map(|(idx, category)| {
                category.first_match(payload).map(|rule| Hit {
                    category: idx,
                    rule,
                })
            })
            .collect()
    }
}
