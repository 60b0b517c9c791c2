// src/exec/patterns.rs

//! Incremental success/failure pattern matching over process output.
//!
//! Every pattern is matched against the *whole* line: `DONE` matches the line
//! `DONE` but not `ALL DONE`. Patterns are compiled once, up front, wrapped in
//! `^(?:...)$`.

use regex::Regex;

use crate::errors::{CmdrunnerError, Result};

/// Compile a pattern with whole-line semantics.
pub fn compile_full_line(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| CmdrunnerError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile_full_line(p)).collect()
}

/// Match state for one invocation.
///
/// The evaluator is fed the cumulative log and remembers how far it got, so
/// handing it the same lines twice never records a match twice.
#[derive(Debug, Clone)]
pub struct PatternEvaluator {
    output_filter: Vec<Regex>,
    success: Vec<Regex>,
    failure: Vec<Regex>,
    processed: usize,
    matched_output: Vec<String>,
    success_matches: Vec<String>,
    failure_matches: Vec<String>,
}

impl PatternEvaluator {
    pub fn new(
        output_regex: &[String],
        success_patterns: &[String],
        failure_patterns: &[String],
    ) -> Result<Self> {
        Ok(Self {
            output_filter: compile_all(output_regex)?,
            success: compile_all(success_patterns)?,
            failure: compile_all(failure_patterns)?,
            processed: 0,
            matched_output: Vec::new(),
            success_matches: Vec::new(),
            failure_matches: Vec::new(),
        })
    }

    /// Evaluate every line of `cumulative` not seen by a previous call.
    ///
    /// `cumulative` must only ever grow between calls.
    pub fn evaluate<S: AsRef<str>>(&mut self, cumulative: &[S]) {
        let start = self.processed.min(cumulative.len());
        for line in &cumulative[start..] {
            let line = line.as_ref();

            if self.output_filter.iter().any(|re| re.is_match(line)) {
                self.matched_output.push(line.to_string());
            }
            if self.success.iter().any(|re| re.is_match(line)) {
                self.success_matches.push(line.to_string());
            }
            if self.failure.iter().any(|re| re.is_match(line)) {
                self.failure_matches.push(line.to_string());
            }
        }
        self.processed = cumulative.len().max(self.processed);
    }

    pub fn pattern_found(&self) -> bool {
        !self.success_matches.is_empty()
    }

    pub fn failure_found(&self) -> bool {
        !self.failure_matches.is_empty()
    }

    /// Either side matched.
    pub fn is_complete(&self) -> bool {
        self.pattern_found() || self.failure_found()
    }

    /// A success pattern matched and no failure pattern did.
    pub fn is_success_only(&self) -> bool {
        self.pattern_found() && !self.failure_found()
    }

    pub fn has_success_patterns(&self) -> bool {
        !self.success.is_empty()
    }

    pub fn has_output_filter(&self) -> bool {
        !self.output_filter.is_empty()
    }

    pub fn success_matches(&self) -> &[String] {
        &self.success_matches
    }

    pub fn failure_matches(&self) -> &[String] {
        &self.failure_matches
    }

    /// Lines that passed the output filter (empty without a filter).
    pub fn matched_output(&self) -> &[String] {
        &self.matched_output
    }
}
