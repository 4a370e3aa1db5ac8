//! Property-based tests for the ledger, target selection, plan building and
//! input validation.

use proptest::prelude::*;

use autodeploy_cli::domain::config::validate_domain;
use autodeploy_cli::domain::history::{HistoryLedger, MAX_HISTORY, RunStatus};
use autodeploy_cli::domain::plan;
use autodeploy_cli::domain::profile::AppKind;
use autodeploy_cli::domain::step::Action;
use autodeploy_cli::domain::template::shell_quote;

use crate::fakes::{profile, record};

fn status() -> impl Strategy<Value = RunStatus> {
    prop_oneof![Just(RunStatus::Success), Just(RunStatus::Failed)]
}

fn kind() -> impl Strategy<Value = AppKind> {
    prop::sample::select(AppKind::ALL.to_vec())
}

proptest! {
    /// The ledger never exceeds its bound and the newest record is first.
    #[test]
    fn prop_ledger_is_bounded_and_newest_first(statuses in prop::collection::vec(status(), 0..60)) {
        let mut ledger = HistoryLedger::default();
        for (i, status) in statuses.iter().enumerate() {
            ledger.append(record(&format!("c{i}"), *status, 0));
            prop_assert!(ledger.len() <= MAX_HISTORY);
            let head = format!("c{i}");
            prop_assert_eq!(&ledger.records()[0].commit, &head);
        }
        prop_assert_eq!(ledger.len(), statuses.len().min(MAX_HISTORY));
    }

    /// Without an explicit version the target is the second most recent
    /// success, and none exists with fewer than two successes.
    #[test]
    fn prop_rollback_target_is_second_success(statuses in prop::collection::vec(status(), 0..20)) {
        let records = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| record(&format!("c{i}"), *s, 0))
            .collect();
        let ledger = HistoryLedger::from_records(records);
        let successes: Vec<String> = ledger
            .records()
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.commit.clone())
            .collect();

        match ledger.select_rollback_target(None) {
            Ok(target) => prop_assert_eq!(Some(&target), successes.get(1)),
            Err(_) => prop_assert!(successes.len() < 2),
        }
    }

    /// An explicit version always wins, whatever the history holds.
    #[test]
    fn prop_explicit_version_wins(commit in "[0-9a-f]{7,40}", statuses in prop::collection::vec(status(), 0..5)) {
        let records = statuses.iter().map(|s| record("c", *s, 0)).collect();
        let ledger = HistoryLedger::from_records(records);
        prop_assert_eq!(ledger.select_rollback_target(Some(commit.as_str())).ok(), Some(commit));
    }

    /// Plans are a pure function of profile and action.
    #[test]
    fn prop_plan_is_deterministic(kind in kind(), branch in "[a-z][a-z0-9-]{0,15}") {
        let profile = profile(kind);
        let action = Action::Deploy { remote: "origin".to_string(), branch };
        prop_assert_eq!(plan::build(&profile, &action), plan::build(&profile, &action));
    }

    /// Quoted values never leave a bare shell metacharacter behind.
    #[test]
    fn prop_shell_quote_is_inert(value in ".{0,40}") {
        let quoted = shell_quote(&value);
        let plain = quoted.chars().all(|c| c.is_ascii_alphanumeric() || "_-./:@%+=,".contains(c));
        prop_assert!(plain || (quoted.starts_with('\'') && quoted.ends_with('\'')));
    }

    /// Anything with whitespace or shell syntax is not a domain.
    #[test]
    fn prop_domains_reject_shell_syntax(
        left in "[a-z]{1,10}",
        sep in prop::sample::select(vec![" ", ";", "&", "|", "$", "`", "/", "'"]),
        right in "[a-z]{1,10}",
    ) {
        let candidate = format!("{left}{sep}{right}.com");
        prop_assert!(validate_domain(&candidate).is_err(), "accepted {candidate}");
    }
}

#[test]
fn test_rollback_target_skips_failed_head() {
    let ledger = HistoryLedger::from_records(vec![
        record("c3", RunStatus::Failed, 1),
        record("c2", RunStatus::Success, 2),
        record("c1", RunStatus::Success, 3),
    ]);
    assert_eq!(ledger.select_rollback_target(None).ok().as_deref(), Some("c1"));
}
