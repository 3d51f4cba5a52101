mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use docmig::{
    Direction, DocumentStore, DuplicateVersionPolicy, InMemoryStore, LogLevel, MemoryLogger, Migration, MigrationDescriptor,
    MigrationError, OverrideResolver, Result, RunOptions, Runner,
};
use serde_json::json;
use support::{Fail, FailingCommitStore, Fixture, applied, doc_id};

fn runner(store: &InMemoryStore) -> Runner {
    Runner::new(Arc::new(store.clone()))
}

fn options(fixture: &Fixture) -> RunOptions {
    RunOptions::new().with_source(fixture.source())
}

fn three_in_shuffled_order() -> Fixture {
    Fixture::new()
        .add("Third", 3, &[])
        .add("First", 1, &[])
        .add("Second", 2, &[])
}

#[tokio::test]
async fn up_applies_in_ascending_version_order() {
    let fixture = three_in_shuffled_order();
    let store = InMemoryStore::new();

    let report = runner(&store).run(&options(&fixture)).await.unwrap();

    assert_eq!(fixture.calls(), vec!["First:up", "Second:up", "Third:up"]);
    assert_eq!(applied(&store), vec!["First", "Second", "Third"]);
    let names: Vec<&str> = report.applied.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["First", "Second", "Third"]);
    assert!(store.contains(&doc_id("Second")));
    assert!(store.contains("migration_records/second"));
}

#[tokio::test]
async fn second_up_run_changes_nothing() {
    let fixture = three_in_shuffled_order();
    let store = InMemoryStore::new();

    runner(&store).run(&options(&fixture)).await.unwrap();
    let ids_after_first = store.ids();
    fixture.clear_calls();

    let report = runner(&store).run(&options(&fixture)).await.unwrap();

    assert!(fixture.calls().is_empty());
    assert!(report.is_noop());
    assert_eq!(report.skipped, vec!["First", "Second", "Third"]);
    assert_eq!(store.ids(), ids_after_first);
}

#[tokio::test]
async fn down_reverts_in_descending_order_and_clears_markers() {
    let fixture = three_in_shuffled_order();
    let store = InMemoryStore::new();

    runner(&store).run(&options(&fixture)).await.unwrap();
    fixture.clear_calls();

    let report = runner(&store).run(&options(&fixture).down()).await.unwrap();

    assert_eq!(fixture.calls(), vec!["Third:down", "Second:down", "First:down"]);
    assert_eq!(report.reverted.len(), 3);
    assert!(applied(&store).is_empty());
    assert!(store.ids().is_empty());
}

#[tokio::test]
async fn profile_restricted_migration_waits_for_its_profile() {
    let fixture = Fixture::new()
        .add("Schema", 1, &[])
        .add("ProdSeed", 2, &["prod"])
        .add("Cleanup", 3, &[]);
    let store = InMemoryStore::new();

    runner(&store).run(&options(&fixture)).await.unwrap();
    assert_eq!(fixture.calls(), vec!["Schema:up", "Cleanup:up"]);
    assert_eq!(applied(&store), vec!["Schema", "Cleanup"]);
    assert!(!store.contains("migration_records/prod_seed"));

    fixture.clear_calls();
    let report = runner(&store).run(&options(&fixture).with_profile("PROD")).await.unwrap();

    assert_eq!(fixture.calls(), vec!["ProdSeed:up"]);
    assert_eq!(report.skipped, vec!["Schema", "Cleanup"]);
    assert_eq!(applied(&store), vec!["Schema", "ProdSeed", "Cleanup"]);
}

#[tokio::test]
async fn ineligible_migrations_are_never_built() {
    let fixture = Fixture::new().add("Everywhere", 1, &[]).add("StagingOnly", 2, &["staging"]);
    let store = InMemoryStore::new();

    runner(&store).run(&options(&fixture).with_profile("prod")).await.unwrap();

    assert_eq!(fixture.built(), vec!["Everywhere"]);
}

#[tokio::test]
async fn to_version_stops_after_target() {
    let fixture = Fixture::new()
        .add("One", 1, &[])
        .add("Two", 2, &[])
        .add("Three", 3, &[])
        .add("Four", 4, &[]);
    let store = InMemoryStore::new();

    let report = runner(&store).run(&options(&fixture).to_version(2)).await.unwrap();

    assert_eq!(fixture.calls(), vec!["One:up", "Two:up"]);
    assert_eq!(report.stopped_at, Some(2));
    assert_eq!(applied(&store), vec!["One", "Two"]);

    fixture.clear_calls();
    runner(&store).run(&options(&fixture)).await.unwrap();
    assert_eq!(fixture.calls(), vec!["Three:up", "Four:up"]);
}

#[tokio::test]
async fn to_version_stops_even_when_target_was_already_applied() {
    let fixture = Fixture::new().add("One", 1, &[]).add("Two", 2, &[]).add("Three", 3, &[]);
    let store = InMemoryStore::new();

    runner(&store).run(&options(&fixture).to_version(2)).await.unwrap();
    fixture.clear_calls();

    let report = runner(&store).run(&options(&fixture).to_version(2)).await.unwrap();

    assert!(fixture.calls().is_empty());
    assert_eq!(report.skipped, vec!["One", "Two"]);
    assert_eq!(report.stopped_at, Some(2));
    assert!(!applied(&store).contains(&"Three".to_string()));
}

#[tokio::test]
async fn to_version_missing_from_plan_runs_everything() {
    let fixture = Fixture::new().add("One", 1, &[]).add("Three", 3, &[]);
    let store = InMemoryStore::new();

    let report = runner(&store).run(&options(&fixture).to_version(2)).await.unwrap();

    assert_eq!(fixture.calls(), vec!["One:up", "Three:up"]);
    assert_eq!(report.stopped_at, None);

    fixture.clear_calls();
    runner(&store).run(&options(&fixture).down().to_version(2)).await.unwrap();
    assert_eq!(fixture.calls(), vec!["Three:down", "One:down"]);
}

#[tokio::test]
async fn to_version_filtered_out_by_profile_does_not_stop_the_run() {
    let fixture = Fixture::new()
        .add("One", 1, &[])
        .add("ProdOnly", 2, &["prod"])
        .add("Three", 3, &[]);
    let store = InMemoryStore::new();

    let report = runner(&store).run(&options(&fixture).to_version(2)).await.unwrap();

    assert_eq!(fixture.calls(), vec!["One:up", "Three:up"]);
    assert_eq!(report.stopped_at, None);
}

#[tokio::test]
async fn down_to_version_reverts_down_to_and_including_target() {
    let fixture = Fixture::new().add("One", 1, &[]).add("Two", 2, &[]).add("Three", 3, &[]);
    let store = InMemoryStore::new();

    runner(&store).run(&options(&fixture)).await.unwrap();
    fixture.clear_calls();

    let report = runner(&store).run(&options(&fixture).down().to_version(2)).await.unwrap();

    assert_eq!(fixture.calls(), vec!["Three:down", "Two:down"]);
    assert_eq!(report.stopped_at, Some(2));
    assert_eq!(applied(&store), vec!["One"]);
}

#[tokio::test]
async fn failing_up_rolls_back_its_scope_and_aborts_the_run() {
    let fixture = Fixture::new()
        .add("First", 1, &[])
        .add_with("Broken", 2, &[], Fail::Up)
        .add("Third", 3, &[]);
    let store = InMemoryStore::new();
    let logger = Arc::new(MemoryLogger::new());

    let err = runner(&store)
        .run(&options(&fixture).with_logger(logger.clone()))
        .await
        .unwrap_err();

    assert!(err.is_logic_error());
    match &err {
        MigrationError::Execution {
            migration, direction, ..
        } => {
            assert_eq!(migration, "Broken");
            assert_eq!(*direction, Direction::Up);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("up exploded"));

    // earlier commit survives, the failed migration leaves nothing behind
    assert_eq!(applied(&store), vec!["First"]);
    assert!(!store.contains(&doc_id("Broken")));
    assert_eq!(fixture.calls(), vec!["First:up", "Broken:up"]);
    assert!(logger.contains("Broken: Up migration failed"));
    assert!(!logger.contains("Broken: Up migration completed"));
}

#[tokio::test]
async fn failing_down_keeps_the_marker() {
    let fixture = Fixture::new().add("First", 1, &[]).add_with("Sticky", 2, &[], Fail::Down);
    let store = InMemoryStore::new();

    runner(&store).run(&options(&fixture)).await.unwrap();

    let err = runner(&store).run(&options(&fixture).down()).await.unwrap_err();

    assert!(matches!(err, MigrationError::Execution { direction: Direction::Down, .. }));
    assert_eq!(applied(&store), vec!["First", "Sticky"]);
    assert!(store.contains(&doc_id("Sticky")));
}

#[tokio::test]
async fn commit_failure_discards_migration_writes_and_marker() {
    let fixture = Fixture::new().add("First", 1, &[]).add("Second", 2, &[]).add("Third", 3, &[]);
    let inner = InMemoryStore::new();
    let store = Arc::new(FailingCommitStore::new(inner.clone(), 2));
    let logger = Arc::new(MemoryLogger::new());

    let err = Runner::new(store.clone())
        .run(&options(&fixture).with_logger(logger.clone()))
        .await
        .unwrap_err();

    assert!(err.is_commit_error());
    assert!(matches!(&err, MigrationError::Commit { migration, .. } if migration == "Second"));
    assert_eq!(store.commit_attempts(), 2);
    assert_eq!(applied(&inner), vec!["First"]);
    assert!(!inner.contains(&doc_id("Second")));
    assert_eq!(fixture.calls(), vec!["First:up", "Second:up"]);
    assert!(!logger.contains("Second: Up migration completed"));
}

#[tokio::test]
async fn down_without_marker_still_runs_and_warns() {
    let fixture = Fixture::new().add("Never", 1, &[]);
    let store = InMemoryStore::new();
    let logger = Arc::new(MemoryLogger::new());

    let report = runner(&store)
        .run(&options(&fixture).down().with_logger(logger.clone()))
        .await
        .unwrap();

    assert_eq!(fixture.calls(), vec!["Never:down"]);
    assert_eq!(report.reverted.len(), 1);
    assert!(store.ids().is_empty());
    assert!(
        logger
            .entries()
            .iter()
            .any(|entry| entry.level == LogLevel::Warning && entry.message.contains("Never"))
    );
}

#[tokio::test]
async fn progress_lines_follow_execution() {
    let fixture = Fixture::new().add("Alpha", 1, &[]).add("Beta", 2, &[]);
    let store = InMemoryStore::new();
    let logger = Arc::new(MemoryLogger::new());

    runner(&store).run(&options(&fixture).with_logger(logger.clone())).await.unwrap();

    assert_eq!(
        logger.messages(),
        vec![
            "Alpha: Up migration started",
            "Alpha: Up migration completed",
            "Beta: Up migration started",
            "Beta: Up migration completed",
        ]
    );
}

#[tokio::test]
async fn resolution_is_lazy() {
    let fixture = Fixture::new().add("One", 1, &[]).add("Unbuildable", 5, &[]);
    let store = InMemoryStore::new();
    let resolved = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&resolved);
    let resolver = move |descriptor: &MigrationDescriptor| -> Result<Box<dyn Migration>> {
        counter.fetch_add(1, Ordering::SeqCst);
        if descriptor.name() == "Unbuildable" {
            return Err(MigrationError::other("missing dependency"));
        }
        Ok(descriptor.instantiate())
    };

    let report = runner(&store)
        .run(&options(&fixture).with_resolver(resolver).to_version(1))
        .await
        .unwrap();

    assert_eq!(resolved.load(Ordering::SeqCst), 1);
    assert_eq!(report.applied.len(), 1);
}

#[tokio::test]
async fn resolver_failure_aborts_without_touching_later_migrations() {
    let fixture = Fixture::new().add("One", 1, &[]).add("Unbuildable", 2, &[]).add("Three", 3, &[]);
    let store = InMemoryStore::new();
    let resolver = |descriptor: &MigrationDescriptor| -> Result<Box<dyn Migration>> {
        if descriptor.name() == "Unbuildable" {
            return Err(MigrationError::other("missing dependency"));
        }
        Ok(descriptor.instantiate())
    };

    let err = runner(&store)
        .run(&options(&fixture).with_resolver(resolver))
        .await
        .unwrap_err();

    assert!(matches!(&err, MigrationError::Resolve { migration, .. } if migration == "Unbuildable"));
    assert_eq!(applied(&store), vec!["One"]);
    assert_eq!(fixture.calls(), vec!["One:up"]);
}

#[tokio::test]
async fn override_resolver_injects_instances() {
    let fixture = Fixture::new().add("Injected", 1, &[]);
    let replacement = Fixture::new();
    let store = InMemoryStore::new();

    let factory = replacement.factory("Injected", support::Fail::Never);
    let resolver = OverrideResolver::new().with("Injected", move || factory());

    runner(&store)
        .run(&options(&fixture).with_resolver(resolver))
        .await
        .unwrap();

    assert!(fixture.calls().is_empty());
    assert_eq!(replacement.calls(), vec!["Injected:up"]);
    assert_eq!(applied(&store), vec!["Injected"]);
}

#[tokio::test]
async fn duplicate_versions_warn_and_keep_discovery_order() {
    let fixture = Fixture::new().add("Later", 2, &[]).add("Early", 1, &[]).add("AlsoTwo", 2, &[]);
    let store = InMemoryStore::new();
    let logger = Arc::new(MemoryLogger::new());

    runner(&store).run(&options(&fixture).with_logger(logger.clone())).await.unwrap();

    assert_eq!(fixture.calls(), vec!["Early:up", "Later:up", "AlsoTwo:up"]);
    assert!(logger.contains("both declare version 2"));

    fixture.clear_calls();
    runner(&store).run(&options(&fixture).down()).await.unwrap();
    assert_eq!(fixture.calls(), vec!["AlsoTwo:down", "Later:down", "Early:down"]);
}

#[tokio::test]
async fn duplicate_versions_can_be_rejected() {
    let fixture = Fixture::new().add("Later", 2, &[]).add("AlsoTwo", 2, &[]);
    let store = InMemoryStore::new();

    let err = runner(&store)
        .run(&options(&fixture).with_duplicate_versions(DuplicateVersionPolicy::Reject))
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::DuplicateVersion { version: 2, .. }));
    assert!(fixture.calls().is_empty());
    assert!(store.ids().is_empty());
}

#[tokio::test]
async fn candidates_without_metadata_are_excluded() {
    let fixture = Fixture::new().add("Versioned", 1, &[]).add_unversioned("Helper");
    let store = InMemoryStore::new();

    let plan = runner(&store).plan(&options(&fixture)).unwrap();
    let names: Vec<&str> = plan.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["Versioned"]);

    runner(&store).run(&options(&fixture)).await.unwrap();
    assert_eq!(fixture.calls(), vec!["Versioned:up"]);
}

#[tokio::test]
async fn plan_has_no_side_effects() {
    let fixture = three_in_shuffled_order();
    let store = InMemoryStore::new();

    let plan = runner(&store).plan(&options(&fixture).down()).unwrap();

    let versions: Vec<i64> = plan.iter().map(|d| d.version()).collect();
    assert_eq!(versions, vec![3, 2, 1]);
    assert!(fixture.built().is_empty());
    assert!(store.ids().is_empty());
}

#[tokio::test]
async fn marker_ids_follow_store_separator() {
    let fixture = Fixture::new().add("AddUserIndex", 1, &[]);
    let store = InMemoryStore::new().with_separator(':');

    let report = docmig::run(Arc::new(store.clone()), &options(&fixture)).await.unwrap();

    assert_eq!(report.applied[0].marker_id, "migration_records:add_user_index");
    assert!(store.contains("migration_records:add_user_index"));
}

#[tokio::test]
async fn marker_records_version_and_name() {
    let fixture = Fixture::new().add("Seed", 7, &[]);
    let store = InMemoryStore::new();

    runner(&store).run(&options(&fixture)).await.unwrap();

    let markers = store.markers();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].name, "Seed");
    assert_eq!(markers[0].version, 7);
    assert_eq!(markers[0].id, "migration_records/seed");
}

#[tokio::test]
async fn marker_holding_only_an_id_counts_as_applied() {
    let fixture = Fixture::new().add("First", 1, &[]).add("Second", 2, &[]);
    let store = InMemoryStore::new();

    let mut scope = store.open_scope().await.unwrap();
    scope.store("migration_records/first", json!({ "id": "migration_records/first" }));
    scope.commit().await.unwrap();

    let report = runner(&store).run(&options(&fixture)).await.unwrap();

    assert_eq!(fixture.calls(), vec!["Second:up"]);
    assert_eq!(report.skipped, vec!["First"]);

    fixture.clear_calls();
    runner(&store).run(&options(&fixture).down()).await.unwrap();

    assert_eq!(fixture.calls(), vec!["Second:down", "First:down"]);
    assert!(!store.contains("migration_records/first"));
}
