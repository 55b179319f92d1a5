//! End-to-end checks of lost updates versus token-guarded saves

use rowver_core::{ChangeSet, Field, Fields, Price, Record, RecordId, VersionedRecord};
use rowver_db::Store;
use rowver_session::{
    attempt_save, contend, reload, run, save_record, DemoConfig, LocalCopy, ScenarioConfig,
    Stage,
};
use std::collections::HashSet;

fn widget() -> Fields {
    Fields::new("Widget", 100, Price::from_cents(1000))
}

#[test]
fn bare_disjoint_writes_both_survive() {
    let store = Store::in_memory().unwrap();
    let report = run(&store, &ScenarioConfig::no_overlap()).unwrap();

    assert!(report.outcome.is_applied());
    assert_eq!(
        report.final_fields,
        Fields::new("Widget Pro", 75, Price::from_cents(1250))
    );
}

#[test]
fn bare_overlapping_write_is_lost_silently() {
    let store = Store::in_memory().unwrap();
    let report = run(&store, &ScenarioConfig::overlap()).unwrap();

    assert!(report.outcome.is_applied());
    assert_eq!(report.final_fields.stock, 1000);

    // the external value was persisted, then overwritten without any signal
    let external = report.snapshots.at(Stage::AfterExternalWrite).unwrap();
    assert_eq!(external.stock(), Some(75));
}

#[test]
fn versioned_save_after_external_write_conflicts() {
    let store = Store::in_memory().unwrap();
    let report = run(&store, &ScenarioConfig::versioned()).unwrap();

    let conflict = report.outcome.conflict().expect("expected a conflict");
    assert_ne!(conflict.expected, conflict.actual);
    assert_eq!(conflict.current.fields.stock, 50);
    assert!(conflict.attempted.contains(Field::Name));
    assert!(conflict.attempted.contains(Field::Price));
    assert_eq!(report.final_fields.stock, 50);
    assert_eq!(report.final_fields.name, "Widget");
}

#[test]
fn default_demo_runs_on_one_store() {
    let store = Store::in_memory().unwrap();
    let config = DemoConfig::default();

    let outcomes: Vec<bool> = config
        .scenarios
        .iter()
        .map(|s| run(&store, s).unwrap().outcome.is_applied())
        .collect();

    assert_eq!(outcomes, vec![true, true, false]);
}

#[test]
fn every_write_gets_a_new_token() {
    let store = Store::in_memory().unwrap();
    let seed = store.reset_versioned(RecordId(1), &widget()).unwrap();

    let mut seen = HashSet::new();
    seen.insert(seed.token);
    for stock in 0..20 {
        let row = store
            .write_versioned(RecordId(1), &ChangeSet::new().set_stock(stock))
            .unwrap();
        assert!(seen.insert(row.token), "token reused at write {}", stock);
    }

    // a reset does not rewind the clock either
    let reset = store.reset_versioned(RecordId(1), &widget()).unwrap();
    assert!(seen.insert(reset.token));
}

#[test]
fn at_most_one_of_many_concurrent_saves_applies() {
    let store = Store::in_memory().unwrap();
    store.reset_versioned(RecordId(1), &widget()).unwrap();

    for _ in 0..5 {
        let report = contend(&store, RecordId(1), 6).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.conflicts, 5);
    }
}

#[test]
fn same_token_cannot_be_used_twice() {
    let store = Store::in_memory().unwrap();
    store.reset_versioned(RecordId(1), &widget()).unwrap();

    let mut copy = LocalCopy::<VersionedRecord>::load(&store, RecordId(1)).unwrap();
    copy.set_stock(90);

    assert!(attempt_save(&store, &copy).is_ok());
    let err = attempt_save(&store, &copy).unwrap_err();
    assert!(err.is_conflict());

    let row = store.read_versioned(RecordId(1)).unwrap().unwrap();
    assert_eq!(row.fields.stock, 90);
}

#[test]
fn reload_and_retry_keeps_both_writes() {
    let store = Store::in_memory().unwrap();
    store.reset_versioned(RecordId(1), &widget()).unwrap();

    let mut copy = LocalCopy::<VersionedRecord>::load(&store, RecordId(1)).unwrap();
    copy.set_price(Price::from_cents(1250));
    store
        .write_versioned(RecordId(1), &ChangeSet::new().set_stock(50))
        .unwrap();

    let err = attempt_save(&store, &copy).unwrap_err();
    let mut fresh = reload(&store, err.conflict().unwrap()).unwrap();
    fresh.apply(&copy.changes());
    let applied = attempt_save(&store, &fresh).unwrap();

    assert_eq!(
        applied.record.fields,
        Fields::new("Widget", 50, Price::from_cents(1250))
    );
}

#[test]
fn bare_save_without_edits_writes_nothing() {
    let store = Store::in_memory().unwrap();
    store.reset_records(RecordId(1), &widget()).unwrap();

    let copy = LocalCopy::<Record>::load(&store, RecordId(1)).unwrap();
    store
        .write_record(RecordId(1), &ChangeSet::new().set_stock(75))
        .unwrap();

    let saved = save_record(&store, &copy).unwrap();
    assert_eq!(saved.fields.stock, 75);
}

#[test]
fn file_backed_store_keeps_tokens_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.db");

    let first = {
        let store = Store::open(&path).unwrap();
        store.reset_versioned(RecordId(1), &widget()).unwrap()
    };

    let store = Store::open(&path).unwrap();
    let row = store.read_versioned(RecordId(1)).unwrap().unwrap();
    assert_eq!(row.token, first.token);

    let next = store
        .write_versioned(RecordId(1), &ChangeSet::new().set_stock(1))
        .unwrap();
    assert_ne!(next.token, first.token);
}
