mod common;

use std::sync::Arc;

use chunk_adapters::{CollectingListener, IteratorItemReader};
use chunk_core::{BatchError, BatchStatus, ExecutionMetadataStore, ExitCode, FlagInterruptionPolicy,
                 InMemoryExecutionStore, StepBuilder, StepConfig, StepExecution, StepHarness};
use common::{ids, panicking_uppercase, people, person_step, slow_uppercase, transactional_sink, uppercase, FailingReader,
             Person};
use uuid::Uuid;

fn harness() -> (StepHarness, Arc<InMemoryExecutionStore>) {
    let store = Arc::new(InMemoryExecutionStore::new());
    (StepHarness::new(store.clone()), store)
}

#[test]
fn concurrent_step_processes_every_chunk() {
    let (harness, store) = harness();
    let (builder, writer, tm) = person_step(StepConfig::new("step", 2).with_workers(3), 6, uppercase(&[]));
    let mut step = builder.build_concurrent().expect("valid step");
    let mut se = StepExecution::new("step", Uuid::new_v4());

    harness.execute(&mut step, &mut se).expect("step should complete");

    assert_eq!(se.status(), BatchStatus::Completed);
    assert_eq!(se.exit_status().code, ExitCode::Completed);
    assert_eq!(se.read_count(), 6);
    assert_eq!(se.write_count(), 6);
    assert_eq!(se.commit_count(), 4);
    assert_eq!(se.rollback_count(), 0);
    assert_eq!(tm.commit_count(), 4);

    let mut written = ids(&writer.items());
    written.sort_unstable();
    assert_eq!(written, vec![1, 2, 3, 4, 5, 6]);

    // un único flush durante la estrategia + el final del harness
    assert_eq!(store.context_update_count(), 2);
    assert_eq!(store.get_step_execution_context(se.id).unwrap().get_u64("personItemReader.read.count"),
               Some(6));
}

#[test]
fn failed_task_does_not_cancel_the_others() {
    let (harness, store) = harness();
    let (builder, writer, tm) = person_step(StepConfig::new("step", 2).with_workers(2), 6, uppercase(&[3]));
    let mut step = builder.build_concurrent().unwrap();
    let mut se = StepExecution::new("step", Uuid::new_v4());

    let err = harness.execute(&mut step, &mut se).unwrap_err();

    assert!(matches!(err, BatchError::Worker(_)));
    assert_eq!(se.status(), BatchStatus::Failed);
    assert_eq!(se.exit_status().code, ExitCode::Failed);
    assert!(se.exit_status().description.contains("Unable to process item Person { id: 3"));
    assert_eq!(se.read_count(), 6);
    assert_eq!(se.write_count(), 4);
    assert_eq!(se.commit_count(), 3);
    assert_eq!(se.rollback_count(), 1);
    assert_eq!(tm.rollback_count(), 1);

    let mut written = ids(&writer.items());
    written.sort_unstable();
    assert_eq!(written, vec![1, 2, 5, 6]);

    let stored = store.get_step_execution(se.id).unwrap().unwrap();
    assert_eq!(stored.status(), BatchStatus::Failed);
    assert_eq!(stored.rollback_count(), 1);
}

#[test]
fn contributions_are_aggregated_in_read_order() {
    let (harness, _store) = harness();
    // el primer chunk termina último; aun así su fallo se registra primero
    let (builder, _writer, _tm) = person_step(StepConfig::new("step", 2).with_workers(4),
                                              6,
                                              slow_uppercase(&[1, 5], &[1]));
    let mut step = builder.build_concurrent().unwrap();
    let mut se = StepExecution::new("step", Uuid::new_v4());

    assert!(harness.execute(&mut step, &mut se).is_err());

    let failures = se.failures();
    assert!(failures.len() >= 2);
    assert!(failures[0].contains("id: 1"), "first failure: {}", failures[0]);
    assert!(failures[1].contains("id: 5"), "second failure: {}", failures[1]);
    assert_eq!(se.rollback_count(), 2);
    assert_eq!(se.commit_count(), 2);
}

#[test]
fn chunk_hooks_fire_on_worker_threads() {
    let (harness, _store) = harness();
    let listener = Arc::new(CollectingListener::new());
    let (builder, _writer, _tm) = person_step(StepConfig::new("step", 2).with_workers(2), 4, uppercase(&[]));
    let mut step = builder.listener(listener.clone()).build_concurrent().unwrap();
    let mut se = StepExecution::new("step", Uuid::new_v4());

    harness.execute(&mut step, &mut se).unwrap();

    // [1,2] [3,4] y el chunk vacío final
    assert_eq!(listener.events_starting_with("before_chunk").len(), 3);
    assert_eq!(listener.events_starting_with("after_chunk").len(), 3);
    assert_eq!(listener.events_starting_with("after_read").len(), 4);
}

#[test]
fn interruption_before_first_chunk_stops_the_step() {
    let (harness, store) = harness();
    let policy = FlagInterruptionPolicy::new();
    policy.handle().interrupt();
    let (writer, tm) = transactional_sink();
    let mut step = StepBuilder::<Person, Person>::new(StepConfig::new("step", 2).with_workers(2),
                                                      Box::new(IteratorItemReader::new(people(4))),
                                                      uppercase(&[]),
                                                      writer.clone()).transaction_manager(tm)
                                                                     .interruption_policy(Arc::new(policy))
                                                                     .build_concurrent()
                                                                     .unwrap();
    let mut se = StepExecution::new("step", Uuid::new_v4());

    let err = harness.execute(&mut step, &mut se).unwrap_err();

    assert!(err.is_interrupted());
    assert_eq!(se.status(), BatchStatus::Stopped);
    assert_eq!(se.exit_status().code, ExitCode::Stopped);
    assert_eq!(se.read_count(), 0);
    assert!(writer.is_empty());
    assert_eq!(store.get_step_execution(se.id).unwrap().unwrap().status(), BatchStatus::Stopped);
}

#[test]
fn zero_workers_is_rejected() {
    let (builder, _writer, _tm) = person_step(StepConfig::new("step", 2).with_workers(0), 1, uppercase(&[]));
    assert!(matches!(builder.build_concurrent(), Err(BatchError::Config(_))));
}

#[test]
fn source_failure_waits_for_in_flight_chunks() {
    let (harness, store) = harness();
    let listener = Arc::new(CollectingListener::new());
    let (writer, tm) = transactional_sink();
    let mut step = StepBuilder::<Person, Person>::new(StepConfig::new("step", 2).with_workers(2),
                                                      Box::new(FailingReader::new(6, 5)),
                                                      uppercase(&[]),
                                                      writer.clone()).transaction_manager(tm.clone())
                                                                     .listener(listener.clone())
                                                                     .build_concurrent()
                                                                     .unwrap();
    let mut se = StepExecution::new("step", Uuid::new_v4());

    let err = harness.execute(&mut step, &mut se).unwrap_err();

    assert_eq!(err.root_cause(), &BatchError::Read("Unable to read item 5".into()));
    assert_eq!(se.status(), BatchStatus::Failed);
    assert_eq!(se.exit_status().code, ExitCode::Failed);
    assert_eq!(se.read_count(), 4);
    assert_eq!(se.write_count(), 4);
    assert_eq!(se.commit_count(), 2);
    assert_eq!(se.rollback_count(), 1);
    assert_eq!(tm.commit_count(), 2);
    assert_eq!(listener.events_starting_with("on_read_error").len(), 1);

    let mut written = ids(&writer.items());
    written.sort_unstable();
    assert_eq!(written, vec![1, 2, 3, 4]);
    assert_eq!(store.get_step_execution(se.id).unwrap().unwrap().status(), BatchStatus::Failed);
}

#[test]
fn worker_panic_fails_only_its_chunk() {
    let (harness, _store) = harness();
    let (builder, writer, tm) = person_step(StepConfig::new("step", 2).with_workers(2), 6, panicking_uppercase(&[3]));
    let mut step = builder.build_concurrent().unwrap();
    let mut se = StepExecution::new("step", Uuid::new_v4());

    let err = harness.execute(&mut step, &mut se).unwrap_err();

    assert!(matches!(err, BatchError::Worker(_)));
    assert_eq!(se.status(), BatchStatus::Failed);
    assert!(se.exit_status().description.contains("worker panicked: corrupt record 3"),
            "description: {}",
            se.exit_status().description);
    assert_eq!(se.commit_count(), 3);
    assert_eq!(se.rollback_count(), 1);
    assert_eq!(tm.rollback_count(), 1);
    assert_eq!(tm.active_count(), 0);

    let mut written = ids(&writer.items());
    written.sort_unstable();
    assert_eq!(written, vec![1, 2, 5, 6]);
    assert_eq!(writer.pending_transactions(), 0);
}
