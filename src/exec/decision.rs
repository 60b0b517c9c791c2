// src/exec/decision.rs

//! Final success/failure verdict for a finished run.
//!
//! Precedence, first match wins:
//! 1. a failure pattern matched
//! 2. a success pattern matched
//! 3. exit code 0 and no success patterns configured
//! 4. nothing resolved and the process exited by itself
//! 5. the wait expired with the process still running

use std::time::Duration;

use super::patterns::PatternEvaluator;
use super::request::FailureKind;

/// Inputs of the verdict that don't live in the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput {
    pub exit_code: i32,
    /// The process ended on its own rather than being stopped by the runner
    /// after the wait expired.
    pub exited: bool,
    pub strict_success_patterns: bool,
    pub pattern_wait: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub success: bool,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
}

impl Decision {
    fn success() -> Self {
        Self {
            success: true,
            error: None,
            failure: None,
        }
    }

    fn failure(kind: FailureKind, error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            failure: Some(kind),
        }
    }
}

pub fn decide(patterns: &PatternEvaluator, input: DecisionInput) -> Decision {
    if patterns.failure_found() {
        let error = if patterns.pattern_found() {
            "Process completed but found some failures"
        } else {
            "Failure pattern found in input"
        };
        return Decision::failure(FailureKind::FailurePattern, error.to_string());
    }

    if patterns.pattern_found() {
        return Decision::success();
    }

    if input.exit_code == 0 && !patterns.has_success_patterns() {
        return Decision::success();
    }

    if !patterns.is_complete() && input.exited {
        if input.exit_code != 0 {
            return Decision::failure(
                FailureKind::NonZeroExit,
                format!("Process exited with non-zero status: {}", input.exit_code),
            );
        }
        if input.strict_success_patterns && patterns.has_success_patterns() {
            return Decision::failure(
                FailureKind::PatternMismatch,
                "Process completed but success pattern not found in output".to_string(),
            );
        }
        return Decision::success();
    }

    let error = format!(
        "Pattern wait timed out after {} seconds",
        input.pattern_wait.as_secs()
    );
    if patterns.is_success_only() {
        Decision {
            success: true,
            error: Some(error),
            failure: None,
        }
    } else {
        Decision::failure(FailureKind::Timeout, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator(success: &[&str], failure: &[&str], lines: &[&str]) -> PatternEvaluator {
        let success: Vec<String> = success.iter().map(|s| s.to_string()).collect();
        let failure: Vec<String> = failure.iter().map(|s| s.to_string()).collect();
        let mut eval = PatternEvaluator::new(&[], &success, &failure).unwrap();
        eval.evaluate(lines);
        eval
    }

    fn exited(exit_code: i32) -> DecisionInput {
        DecisionInput {
            exit_code,
            exited: true,
            strict_success_patterns: true,
            pattern_wait: Duration::from_secs(30),
        }
    }

    fn timed_out() -> DecisionInput {
        DecisionInput {
            exit_code: -1,
            exited: false,
            strict_success_patterns: true,
            pattern_wait: Duration::from_secs(30),
        }
    }

    #[test]
    fn failure_pattern_wins_over_success_pattern() {
        let eval = evaluator(&["OK"], &["BAD"], &["BAD", "OK"]);
        let d = decide(&eval, exited(0));
        assert!(!d.success);
        assert_eq!(d.error.as_deref(), Some("Process completed but found some failures"));
        assert_eq!(d.failure, Some(FailureKind::FailurePattern));
    }

    #[test]
    fn failure_pattern_alone() {
        let eval = evaluator(&["OK"], &["BAD"], &["BAD"]);
        let d = decide(&eval, exited(0));
        assert!(!d.success);
        assert_eq!(d.error.as_deref(), Some("Failure pattern found in input"));
    }

    #[test]
    fn success_pattern_wins_over_exit_code() {
        let eval = evaluator(&["OK"], &[], &["OK"]);
        let d = decide(&eval, exited(3));
        assert_eq!(d, Decision::success());
    }

    #[test]
    fn clean_exit_without_success_patterns() {
        let eval = evaluator(&[], &["BAD"], &["fine"]);
        assert_eq!(decide(&eval, exited(0)), Decision::success());
    }

    #[test]
    fn non_zero_exit_without_patterns() {
        let eval = evaluator(&[], &[], &["oops"]);
        let d = decide(&eval, exited(2));
        assert!(!d.success);
        assert_eq!(d.error.as_deref(), Some("Process exited with non-zero status: 2"));
        assert_eq!(d.failure, Some(FailureKind::NonZeroExit));
    }

    #[test]
    fn strict_mode_requires_configured_success_pattern() {
        let eval = evaluator(&["DONE"], &[], &["nothing here"]);
        let d = decide(&eval, exited(0));
        assert!(!d.success);
        assert_eq!(
            d.error.as_deref(),
            Some("Process completed but success pattern not found in output")
        );
        assert_eq!(d.failure, Some(FailureKind::PatternMismatch));
    }

    #[test]
    fn lenient_mode_accepts_clean_exit_without_success_pattern() {
        let eval = evaluator(&["DONE"], &[], &["nothing here"]);
        let input = DecisionInput {
            strict_success_patterns: false,
            ..exited(0)
        };
        assert_eq!(decide(&eval, input), Decision::success());
    }

    #[test]
    fn expired_wait_is_a_timeout() {
        let eval = evaluator(&["DONE"], &[], &["still going"]);
        let d = decide(&eval, timed_out());
        assert!(!d.success);
        assert_eq!(d.error.as_deref(), Some("Pattern wait timed out after 30 seconds"));
        assert_eq!(d.failure, Some(FailureKind::Timeout));
    }

    #[test]
    fn expired_wait_without_patterns_is_a_timeout() {
        let eval = evaluator(&[], &[], &[]);
        let d = decide(&eval, timed_out());
        assert!(!d.success);
        assert!(d.error.unwrap().contains("timed out"));
    }
}
