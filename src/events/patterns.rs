// src/events/patterns.rs

//! Event pattern compiler and multi-pattern matcher.
//!
//! Pattern syntax, always matched against the whole line:
//! - `#*#` matches any run of text without capturing.
//! - `#N#` (digits) captures positionally under the name `N`.
//! - `{name}` captures under `name`.
//! - `{{` / `}}` are literal braces; everything else is literal text.

use std::collections::HashSet;

use regex::{Regex, RegexSet};
use tracing::{debug, warn};

use crate::errors::EventError;

/// A single pattern compiled to an anchored regex.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl CompiledPattern {
    pub fn compile(pattern: &str) -> Result<Self, EventError> {
        let invalid = |reason: &str| EventError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern.is_empty() {
            return Err(invalid("pattern is empty"));
        }

        let mut expr = String::from("(?s)^");
        let mut names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut literal = String::new();

        let chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '{' if chars.get(i + 1) == Some(&'{') => {
                    literal.push('{');
                    i += 2;
                }
                '}' if chars.get(i + 1) == Some(&'}') => {
                    literal.push('}');
                    i += 2;
                }
                '{' => {
                    let close = chars[i + 1..]
                        .iter()
                        .position(|&ch| ch == '}')
                        .ok_or_else(|| invalid("unterminated '{'"))?;
                    let name: String = chars[i + 1..i + 1 + close].iter().collect();
                    if name.is_empty() {
                        return Err(invalid("empty capture name"));
                    }
                    if !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
                        return Err(invalid(&format!("bad capture name '{name}'")));
                    }
                    push_capture(&mut expr, &mut literal, &mut names, &mut seen, name)
                        .map_err(|reason| invalid(&reason))?;
                    i += close + 2;
                }
                '}' => return Err(invalid("unmatched '}'")),
                '#' => {
                    if let Some(consumed) = parse_hash_token(&chars[i..]) {
                        match consumed {
                            HashToken::Wildcard => {
                                flush_literal(&mut expr, &mut literal);
                                expr.push_str("(?:.*?)");
                                i += 3;
                            }
                            HashToken::Positional(name, len) => {
                                push_capture(&mut expr, &mut literal, &mut names, &mut seen, name)
                                    .map_err(|reason| invalid(&reason))?;
                                i += len;
                            }
                        }
                    } else {
                        literal.push('#');
                        i += 1;
                    }
                }
                other => {
                    literal.push(other);
                    i += 1;
                }
            }
        }

        flush_literal(&mut expr, &mut literal);
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| invalid(&e.to_string()))?;
        debug!(pattern, regex = %expr, captures = names.len(), "compiled event pattern");

        Ok(Self {
            source: pattern.to_string(),
            regex,
            names,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn capture_names(&self) -> &[String] {
        &self.names
    }

    fn regex_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Match a whole line, returning captures in pattern order.
    pub fn captures(&self, line: &str) -> Option<CapturedArgs> {
        let caps = self.regex.captures(line)?;
        let values = self
            .names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let value = caps.get(idx + 1).map_or("", |m| m.as_str());
                (name.clone(), value.to_string())
            })
            .collect();
        Some(CapturedArgs { values })
    }
}

enum HashToken {
    Wildcard,
    /// Capture name and number of chars consumed.
    Positional(String, usize),
}

fn parse_hash_token(chars: &[char]) -> Option<HashToken> {
    if chars.len() >= 3 && chars[1] == '*' && chars[2] == '#' {
        return Some(HashToken::Wildcard);
    }
    let digits = chars[1..].iter().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && chars.get(1 + digits) == Some(&'#') {
        let name: String = chars[1..1 + digits].iter().collect();
        return Some(HashToken::Positional(name, digits + 2));
    }
    None
}

fn flush_literal(expr: &mut String, literal: &mut String) {
    if !literal.is_empty() {
        expr.push_str(&regex::escape(literal));
        literal.clear();
    }
}

fn push_capture(
    expr: &mut String,
    literal: &mut String,
    names: &mut Vec<String>,
    seen: &mut HashSet<String>,
    name: String,
) -> Result<(), String> {
    if !seen.insert(name.clone()) {
        return Err(format!("duplicate capture '{name}'"));
    }
    flush_literal(expr, literal);
    expr.push_str("(.*?)");
    names.push(name);
    Ok(())
}

/// Captured substrings of one match, ordered by appearance in the pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedArgs {
    values: Vec<(String, String)>,
}

impl CapturedArgs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn values(&self) -> Vec<&str> {
        self.values.iter().map(|(_, v)| v.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered set of compiled patterns matched together against one line.
///
/// Candidate patterns are found with a `RegexSet`, rebuilt lazily after any
/// change; if the set cannot be built every pattern is tried in turn.
#[derive(Debug, Default)]
pub struct PatternMatcher {
    patterns: Vec<CompiledPattern>,
    set: Option<RegexSet>,
    dirty: bool,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn push(&mut self, pattern: CompiledPattern) {
        self.patterns.push(pattern);
        self.dirty = true;
    }

    /// Swap the pattern at `index`, keeping its position.
    pub fn replace(&mut self, index: usize, pattern: CompiledPattern) {
        if let Some(slot) = self.patterns.get_mut(index) {
            *slot = pattern;
            self.dirty = true;
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<CompiledPattern> {
        if index < self.patterns.len() {
            self.dirty = true;
            Some(self.patterns.remove(index))
        } else {
            None
        }
    }

    /// All patterns matching `line`, as `(index, captures)` in insertion order.
    pub fn matches(&mut self, line: &str) -> Vec<(usize, CapturedArgs)> {
        if self.patterns.is_empty() {
            return Vec::new();
        }
        self.rebuild_if_dirty();

        let candidates: Vec<usize> = match &self.set {
            Some(set) => set.matches(line).into_iter().collect(),
            None => (0..self.patterns.len()).collect(),
        };

        candidates
            .into_iter()
            .filter_map(|idx| self.patterns[idx].captures(line).map(|caps| (idx, caps)))
            .collect()
    }

    fn rebuild_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        match RegexSet::new(self.patterns.iter().map(|p| p.regex_str())) {
            Ok(set) => self.set = Some(set),
            Err(e) => {
                warn!(error = %e, "could not build pattern set; falling back to linear scan");
                self.set = None;
            }
        }
    }
}
