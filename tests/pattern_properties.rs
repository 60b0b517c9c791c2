use proptest::prelude::*;

use cmdrunner::exec::patterns::PatternEvaluator;

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

proptest! {
    #[test]
    fn re_evaluating_the_same_lines_never_duplicates_matches(
        lines in proptest::collection::vec(word(), 0..20),
        target in word(),
    ) {
        let mut eval = PatternEvaluator::new(&[], &[target.clone()], &[]).unwrap();
        eval.evaluate(lines.as_slice());
        let first = eval.success_matches().to_vec();
        eval.evaluate(lines.as_slice());

        prop_assert_eq!(eval.success_matches(), first.as_slice());
        let expected = lines.iter().filter(|l| **l == target).count();
        prop_assert_eq!(first.len(), expected);
    }

    #[test]
    fn incremental_and_one_shot_evaluation_agree(
        lines in proptest::collection::vec(word(), 0..20),
        split in 0usize..20,
        target in word(),
    ) {
        let split = split.min(lines.len());

        let mut incremental = PatternEvaluator::new(&[], &[], &[target.clone()]).unwrap();
        incremental.evaluate(&lines[..split]);
        incremental.evaluate(lines.as_slice());

        let mut one_shot = PatternEvaluator::new(&[], &[], &[target]).unwrap();
        one_shot.evaluate(lines.as_slice());

        prop_assert_eq!(incremental.failure_matches(), one_shot.failure_matches());
    }

    #[test]
    fn failure_match_means_not_success_only(
        before in proptest::collection::vec(word(), 0..10),
        after in proptest::collection::vec(word(), 0..10),
    ) {
        let mut lines = before;
        lines.push("OK".to_string());
        lines.push("BOOM".to_string());
        lines.extend(after);

        let mut eval = PatternEvaluator::new(
            &[],
            &["OK".to_string()],
            &["BOOM".to_string()],
        )
        .unwrap();
        eval.evaluate(lines.as_slice());

        prop_assert!(eval.failure_found());
        prop_assert!(eval.is_complete());
        prop_assert!(!eval.is_success_only());
    }

    #[test]
    fn patterns_match_whole_lines_only(
        prefix in word(),
        target in word(),
    ) {
        let line = format!("{prefix} {target}");
        let mut eval = PatternEvaluator::new(&[], &[target.clone()], &[]).unwrap();
        eval.evaluate(&[line]);
        prop_assert!(!eval.pattern_found());

        eval.evaluate(&[format!("{prefix} {target}"), target]);
        prop_assert!(eval.pattern_found());
    }
}
