//! Property-Based Tests for the optimizer
//!
//! Uses proptest for run-level invariants and unit totality.
//!
//! These tests verify:
//! - One report entry per distinct selected task, in selection order
//! - Monotonic progress ending at (n, n)
//! - Rejection of empty and out-of-range selections
//! - Every catalog unit returns an outcome under arbitrary host conditions
//! - Enum string round-trips (parse → to_string → parse)

mod common;

use proptest::prelude::*;
use std::sync::Arc;

use common::{RecordingRunner, Sandbox, context};
use turbo_optimizer::command_runner::CommandOutput;
use turbo_optimizer::engine::{Engine, EngineOptions, SchedulingPolicy};
use turbo_optimizer::error::EngineError;
use turbo_optimizer::outcome::{FailureKind, Outcome};
use turbo_optimizer::registry::TaskRegistry;
use turbo_optimizer::run_state::RunPhase;
use turbo_optimizer::system::{Elevation, SystemPaths};
use turbo_optimizer::task::{TaskDescriptor, TaskUnit};
use turbo_optimizer::tasks::default_registry;

const REGISTRY_LEN: usize = 8;

/// Synthetic registry: every even index is parallel-affine, every third fails.
fn synthetic_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    for i in 0..REGISTRY_LEN {
        registry
            .register(
                TaskDescriptor::new(format!("task-{}", i), "synthetic").parallel(i % 2 == 0),
                move || {
                    if i % 3 == 0 {
                        Outcome::failure(FailureKind::CommandFailed, format!("task-{} failed", i))
                    } else {
                        Outcome::success(format!("task-{} ok", i))
                    }
                },
            )
            .unwrap();
    }
    registry
}

fn policy_strategy() -> impl Strategy<Value = SchedulingPolicy> {
    prop_oneof![
        Just(SchedulingPolicy::Sequential),
        Just(SchedulingPolicy::Affinity),
    ]
}

fn first_occurrences(indices: &[usize]) -> Vec<usize> {
    let mut out = Vec::new();
    for &i in indices {
        if !out.contains(&i) {
            out.push(i);
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Report has one entry per distinct index, in first-occurrence order
    #[test]
    fn report_follows_selection(
        indices in prop::collection::vec(0..REGISTRY_LEN, 1..12),
        policy in policy_strategy(),
        max_workers in 1usize..6,
    ) {
        let engine = Engine::new(
            Arc::new(synthetic_registry()),
            EngineOptions { policy, max_workers },
        );

        let mut completed = Vec::new();
        let report = engine
            .run_blocking(&indices, |p| completed.push((p.completed, p.total)))
            .unwrap();

        let expected = first_occurrences(&indices);
        let order: Vec<usize> = report.entries.iter().map(|e| e.index).collect();
        prop_assert_eq!(&order, &expected);
        prop_assert_eq!(report.phase, RunPhase::Completed);
        prop_assert!(!report.cancelled);

        let n = expected.len();
        let counts: Vec<usize> = completed.iter().map(|&(c, _)| c).collect();
        prop_assert_eq!(counts, (1..=n).collect::<Vec<_>>());
        prop_assert!(completed.iter().all(|&(_, total)| total == n));
    }

    /// Any out-of-range index rejects the whole request
    #[test]
    fn out_of_range_selection_rejected(
        mut indices in prop::collection::vec(0..REGISTRY_LEN, 0..6),
        bad in REGISTRY_LEN..100,
        at in any::<prop::sample::Index>(),
    ) {
        let pos = at.index(indices.len() + 1);
        indices.insert(pos, bad);

        let engine = Engine::new(Arc::new(synthetic_registry()), EngineOptions::default());
        let result = engine.request_run(&indices);
        prop_assert!(matches!(result, Err(EngineError::InvalidSelection(_))));
        prop_assert!(!engine.is_running());
    }

    /// Same selection, same registry: same task-name sequence
    #[test]
    fn repeated_runs_match(
        indices in prop::collection::vec(0..REGISTRY_LEN, 1..8),
        policy in policy_strategy(),
    ) {
        let engine = Engine::new(
            Arc::new(synthetic_registry()),
            EngineOptions { policy, ..EngineOptions::default() },
        );
        let first = engine.run_blocking(&indices, |_| {}).unwrap();
        let second = engine.run_blocking(&indices, |_| {}).unwrap();
        prop_assert_eq!(first.task_names(), second.task_names());
    }

    /// Every catalog unit returns an outcome whatever the host looks like
    #[test]
    fn catalog_units_are_total(
        elevated in any::<bool>(),
        dry_run in any::<bool>(),
        with_temp in any::<bool>(),
        with_windows in any::<bool>(),
        exit_code in prop_oneof![Just(0), 1..5000i32],
        missing_tools in any::<bool>(),
    ) {
        let sandbox = Sandbox::new();
        let paths = SystemPaths {
            temp_dir: sandbox.paths.temp_dir.clone().filter(|_| with_temp),
            windows_dir: sandbox.paths.windows_dir.clone().filter(|_| with_windows),
        };

        let mut runner = RecordingRunner::new();
        for line in [
            "dism /online /cleanup-image /startcomponentcleanup /norestart",
            "sfc /verifyonly",
            "netsh winsock reset",
            "sc stop DiagTrack",
        ] {
            runner = if missing_tools {
                runner.missing(line)
            } else {
                runner.respond(line, CommandOutput::failed(exit_code, "scripted"))
            };
        }

        let elevation = if elevated { Elevation::Elevated } else { Elevation::Standard };
        let ctx = context(elevation, paths, dry_run, Arc::new(runner));
        let registry = default_registry(&ctx).unwrap();

        for i in 0..registry.len() {
            let outcome = registry.unit_for(i).unwrap().execute();
            prop_assert!(!outcome.message().is_empty());
            if !elevated && [1, 3, 4, 6, 7].contains(&i) {
                prop_assert_eq!(outcome, Outcome::access_denied());
            }
        }
    }

    /// FailureKind: to_string → parse round-trip is identity
    #[test]
    fn failure_kind_roundtrip(kind in prop_oneof![
        Just(FailureKind::PermissionDenied),
        Just(FailureKind::NotFound),
        Just(FailureKind::MissingEnvironment),
        Just(FailureKind::CommandFailed),
        Just(FailureKind::Cancelled),
    ]) {
        let parsed: FailureKind = kind.to_string().parse().expect("Should parse");
        prop_assert_eq!(kind, parsed);
    }
}
