//! Drain, reap and full-run tests against fake processes

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{id, launched, registry, replay, SignalLog};
use stress::traits::{MockProcessHandle, MockProcessLauncher};
use stress::{
    DelayBounds, Drain, DrainPolicy, ExitOutcome, FaultDistribution, FaultSignal, InjectionConfig, LaunchPlan,
    LaunchedProcess, ProcessState, RunSummary, StressError, StressRunner,
};
use tempfile::tempdir;

fn plan(dir: &std::path::Path, process_count: u32) -> LaunchPlan {
    LaunchPlan {
        process_count,
        hosts_file: dir.join("hosts"),
        config_files: vec![dir.join("config")],
        output_dir: dir.to_path_buf(),
    }
}

fn fake_launcher(log: &SignalLog) -> MockProcessLauncher {
    let log = log.clone();
    let mut launcher = MockProcessLauncher::new();
    launcher
        .expect_launch()
        .times(1)
        .returning(move |plan| Ok(launched(plan.process_count, &log)));
    launcher
}

#[tokio::test]
async fn test_resume_leaves_no_process_stopped() {
    let log = SignalLog::default();
    let registry = registry(4, &log);

    for n in [1, 3] {
        let mut slot = registry.get(id(n)).unwrap().lock().await;
        assert!(slot.transition(ProcessState::Stopped).unwrap().is_applied());
    }

    let resumed = Drain::new(Arc::clone(&registry)).resume_stopped().await.unwrap();

    assert_eq!(resumed, vec![id(1), id(3)]);
    assert_eq!(registry.count_in(ProcessState::Stopped).await, 0);
    assert_eq!(log.per_process()[&id(1)], vec![FaultSignal::Stop, FaultSignal::Continue]);
}

#[tokio::test]
async fn test_survivor_termination_bypasses_budget_and_skips_terminated() {
    let log = SignalLog::default();
    let registry = registry(3, &log);

    registry
        .get(id(2))
        .unwrap()
        .lock()
        .await
        .transition(ProcessState::Terminated)
        .unwrap();
    registry
        .get(id(3))
        .unwrap()
        .lock()
        .await
        .transition(ProcessState::Stopped)
        .unwrap();

    let terminated = Drain::new(Arc::clone(&registry)).terminate_survivors().await.unwrap();

    assert_eq!(terminated, vec![id(1), id(3)]);
    assert_eq!(registry.count_in(ProcessState::Terminated).await, 3);
    assert_eq!(log.per_process()[&id(2)], vec![FaultSignal::Terminate]);
    assert_eq!(
        log.per_process()[&id(3)],
        vec![FaultSignal::Stop, FaultSignal::Continue, FaultSignal::Terminate]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reap_reports_every_process_in_order() {
    let log = SignalLog::default();
    let registry = registry(6, &log);
    let drain = Drain::new(Arc::clone(&registry));

    registry
        .get(id(4))
        .unwrap()
        .lock()
        .await
        .transition(ProcessState::Terminated)
        .unwrap();

    let reports = drain.reap().await.unwrap();

    let ids: Vec<_> = reports.iter().map(|r| r.logical_id).collect();
    assert_eq!(ids, (1..=6).map(id).collect::<Vec<_>>());
    assert_eq!(reports[3].outcome, ExitOutcome::signaled(15));
    assert_eq!(reports[0].outcome, ExitOutcome::code(0));
}

#[tokio::test]
async fn test_full_run_terminates_everything_and_writes_summary() {
    let dir = tempdir().unwrap();
    let log = SignalLog::default();

    let injection = InjectionConfig {
        concurrency: 3,
        attempts: 10,
        distribution: FaultDistribution::new(0.4, 0.4, 0.2).unwrap(),
        delay: DelayBounds::none(),
        max_iterations: None,
    };

    let runner = StressRunner::new(
        fake_launcher(&log),
        plan(dir.path(), 5),
        injection,
        DrainPolicy::Timeout(Duration::ZERO),
    )
    .with_seed(Some(9));

    let summary = runner.run_until(std::future::pending()).await.unwrap();

    assert_eq!(summary.processes, 5);
    assert_eq!(summary.termination_limit, 2);
    assert!(summary.injected_terminations <= 2);
    assert_eq!(summary.injection.seed, 9);
    assert_eq!(summary.injection.successes(), 30);
    assert_eq!(summary.exits.len(), 5);
    assert!(summary.exits.iter().all(|exit| exit.outcome == ExitOutcome::signaled(15)));

    for history in log.per_process().values() {
        assert_eq!(replay(history), ProcessState::Terminated);
    }
    assert_eq!(log.kills().len(), 5, "every process killed on the way out");

    let written = RunSummary::read_from(&dir.path().join("stress-summary.json")).await.unwrap();
    assert_eq!(written, summary);
}

#[tokio::test]
async fn test_interrupt_kills_every_process() {
    let dir = tempdir().unwrap();
    let log = SignalLog::default();

    let injection = InjectionConfig {
        concurrency: 2,
        attempts: 100,
        distribution: FaultDistribution::default(),
        delay: DelayBounds::from_millis(10_000, 10_000),
        max_iterations: None,
    };

    let runner = StressRunner::new(
        fake_launcher(&log),
        plan(dir.path(), 3),
        injection,
        DrainPolicy::AwaitOperator,
    );

    let result = runner
        .run_until(tokio::time::sleep(Duration::from_millis(50)))
        .await;

    assert_matches!(result, Err(StressError::Interrupted));
    let mut killed = log.kills();
    killed.sort();
    assert_eq!(killed, vec![id(1), id(2), id(3)]);
    assert!(!dir.path().join("stress-summary.json").exists());
}

#[tokio::test]
async fn test_failing_worker_surfaces_error_and_processes_are_killed() {
    let dir = tempdir().unwrap();

    let mut launcher = MockProcessLauncher::new();
    launcher.expect_launch().times(1).returning(|_| {
        let mut handle = MockProcessHandle::new();
        handle.expect_pid().return_const(Some(1u32));
        handle.expect_deliver().returning(|signal| {
            Err(StressError::SignalFailed {
                logical_id: shared::LogicalId::new(1).unwrap(),
                signal,
                reason: "EPERM".to_string(),
            })
        });
        handle.expect_kill().times(1).returning(|| Ok(()));

        Ok(vec![LaunchedProcess {
            logical_id: shared::LogicalId::new(1).unwrap(),
            handle: Box::new(handle),
        }])
    });

    let injection = InjectionConfig {
        concurrency: 1,
        attempts: 1,
        distribution: FaultDistribution::new(1.0, 0.0, 0.0).unwrap(),
        delay: DelayBounds::none(),
        max_iterations: None,
    };

    let runner = StressRunner::new(launcher, plan(dir.path(), 1), injection, DrainPolicy::Timeout(Duration::ZERO));
    let result = runner.run_until(std::future::pending()).await;

    assert_matches!(result, Err(StressError::SignalFailed { .. }));
}

#[tokio::test]
async fn test_launch_failure_is_returned_unchanged() {
    let dir = tempdir().unwrap();
    let mut launcher = MockProcessLauncher::new();
    launcher.expect_launch().returning(|_| {
        Err(StressError::BinaryNotFound {
            runscript: "/impl/run.sh".into(),
        })
    });

    let runner = StressRunner::new(
        launcher,
        plan(dir.path(), 3),
        InjectionConfig::default(),
        DrainPolicy::Timeout(Duration::ZERO),
    );

    let error = runner.run_until(std::future::pending()).await.unwrap_err();
    assert!(error.is_configuration());
}
