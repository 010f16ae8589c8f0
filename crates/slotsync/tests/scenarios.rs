//! End-to-end scenarios across contexts, media and codecs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use slotsync::{
    CborCodec, Context, EnvelopeKind, JsonCodec, MigrationOutcome, SlotState, Storage, WatchConfig,
};
use slotsync_testkit::generators::{key, legacy_document, legacy_text, Profile};
use slotsync_testkit::{NotifyCounter, OriginFixture, SqliteFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Settings {
    volume: u8,
    muted: bool,
    labels: BTreeMap<String, String>,
}

// =============================================================================
// PAYLOAD TYPES
// =============================================================================

#[test]
fn test_common_payload_types() {
    let context = Context::in_memory();

    let text = context.bind("text", None::<String>);
    text.write(&"hello".to_string()).unwrap();
    assert_eq!(text.read().as_deref(), Some("hello"));

    let int = context.bind("int", None::<i32>);
    int.write(&-12).unwrap();
    assert_eq!(int.read(), Some(-12));

    let float = context.bind("float", None::<f64>);
    float.write(&3.25).unwrap();
    assert_eq!(float.read(), Some(3.25));

    let flag = context.bind("flag", Some(true));
    flag.write(&false).unwrap();
    assert_eq!(flag.read(), Some(false));

    let list = context.bind("list", None::<Vec<u32>>);
    list.write(&vec![1, 2, 3]).unwrap();
    assert_eq!(list.read(), Some(vec![1, 2, 3]));

    let settings = Settings {
        volume: 7,
        muted: false,
        labels: BTreeMap::from([("lang".to_string(), "en".to_string())]),
    };
    let object = context.bind("object", None::<Settings>);
    object.write(&settings).unwrap();
    assert_eq!(object.read(), Some(settings));
}

#[test]
fn test_nullable_payload_is_distinct_from_clear() {
    let context = Context::in_memory();
    let nullable = context.bind("maybe", Some(Some(1_u8)));

    nullable.write(&None).unwrap();
    assert_eq!(nullable.read(), Some(None));
    assert_eq!(nullable.read_state(), SlotState::Value(None));

    nullable.clear().unwrap();
    assert_eq!(nullable.read(), None);
    assert_eq!(nullable.read_state(), SlotState::Cleared);
}

// =============================================================================
// READ CONTRACT
// =============================================================================

#[test]
fn test_counter_scenario() {
    let context = Context::in_memory();
    let counter = context.bind("counter", Some(0));

    counter.write(&5).unwrap();
    assert_eq!(counter.read(), Some(5));

    counter.clear().unwrap();
    assert_eq!(counter.read(), None);

    let rebound = context.bind("counter", Some(0));
    assert_eq!(rebound.read(), None);
}

#[test]
fn test_absent_key_reads_initial_value() {
    let context = Context::in_memory();
    assert_eq!(context.bind("missing", Some("default".to_string())).read().as_deref(), Some("default"));
    assert_eq!(context.bind("missing", None::<String>).read(), None);
    assert!(context.storage().get_item("missing").unwrap().is_none());
}

#[test]
fn test_clear_overrides_default() {
    let context = Context::in_memory();
    let binding = context.bind("test2", Some("value".to_string()));
    assert_eq!(binding.read().as_deref(), Some("value"));

    binding.clear().unwrap();
    assert_eq!(binding.read(), None);
    assert_eq!(
        context.storage().get_item("test2").unwrap().as_deref(),
        Some(r#"{"type":"cleared"}"#)
    );
}

#[test]
fn test_corrupt_slot_resilience() {
    init_tracing();
    let fixture = OriginFixture::new(1);
    fixture.seed("prefs", r#"{"type":"value","value":{"volume":"loud"}}"#);

    let prefs = fixture.tab(0).bind(
        "prefs",
        Some(Settings {
            volume: 1,
            muted: true,
            labels: BTreeMap::new(),
        }),
    );
    assert_eq!(
        prefs.migration(),
        &MigrationOutcome::AlreadyEnveloped(EnvelopeKind::Value)
    );
    assert!(prefs.read_state().is_corrupt());
    assert_eq!(prefs.read().map(|s| s.volume), Some(1));
}

// =============================================================================
// MIGRATION
// =============================================================================

#[test]
fn test_legacy_plain_string_is_migrated() {
    init_tracing();
    let fixture = OriginFixture::new(1);
    fixture.seed("name", "Ada Lovelace");

    let name = fixture.tab(0).bind("name", None::<String>);
    assert_eq!(name.migration(), &MigrationOutcome::WrappedVerbatim);
    assert_eq!(name.read().as_deref(), Some("Ada Lovelace"));
    assert_eq!(
        fixture.raw("name").as_deref(),
        Some(r#"{"type":"value","value":"Ada Lovelace"}"#)
    );
}

#[test]
fn test_legacy_number_is_migrated() {
    let fixture = OriginFixture::new(1);
    fixture.seed("visits", "17");

    let visits = fixture.tab(0).bind("visits", Some(0_u64));
    assert_eq!(visits.migration(), &MigrationOutcome::WrappedDocument);
    assert_eq!(visits.read(), Some(17));
}

#[test]
fn test_migration_runs_per_binding_and_only_rewrites_once() {
    let fixture = OriginFixture::new(2);
    fixture.seed("k", "[1,2]");

    let first = fixture.tab(0).bind("k", None::<Vec<u8>>);
    let second = fixture.tab(1).bind("k", None::<Vec<u8>>);
    assert_eq!(first.migration(), &MigrationOutcome::WrappedDocument);
    assert_eq!(
        second.migration(),
        &MigrationOutcome::AlreadyEnveloped(EnvelopeKind::Value)
    );
    assert_eq!(second.read(), Some(vec![1, 2]));
}

#[test]
fn test_cbor_context_migrates_legacy_text() {
    let context = Context::in_memory().with_codec(CborCodec);
    context.storage().set_item("name", "legacy").unwrap();

    let name = context.bind("name", None::<String>);
    assert_eq!(name.migration(), &MigrationOutcome::WrappedVerbatim);
    assert_eq!(name.read().as_deref(), Some("legacy"));
}

// =============================================================================
// CHANGE PROPAGATION
// =============================================================================

#[test]
fn test_same_context_bindings_stay_in_sync() {
    let context = Context::in_memory();
    let a = context.bind("shared", None::<u32>);
    let b = context.bind("shared", None::<u32>);

    let seen_by_b = NotifyCounter::new();
    let _sub = b.subscribe(seen_by_b.callback());

    a.write(&1).unwrap();
    assert_eq!(seen_by_b.count(), 1);
    assert_eq!(b.read(), Some(1));

    let other = context.bind("other", None::<u32>);
    other.write(&2).unwrap();
    assert_eq!(seen_by_b.count(), 1);
}

#[test]
fn test_cross_context_propagation() {
    let fixture = OriginFixture::new(3);
    let writer = fixture.tab(0).bind("theme", Some("light".to_string()));
    let reader = fixture.tab(1).bind("theme", Some("light".to_string()));
    let bystander = fixture.tab(2).bind("volume", Some(1_u8));

    let seen_by_writer = NotifyCounter::new();
    let seen_by_reader = NotifyCounter::new();
    let seen_by_bystander = NotifyCounter::new();
    let _w = writer.subscribe(seen_by_writer.callback());
    let _r = reader.subscribe(seen_by_reader.callback());
    let _b = bystander.subscribe(seen_by_bystander.callback());

    writer.write(&"dark".to_string()).unwrap();

    // Same-context signal for the writer, native signal for the reader.
    assert_eq!(seen_by_writer.count(), 1);
    assert_eq!(seen_by_reader.count(), 1);
    assert_eq!(seen_by_bystander.count(), 0);
    assert_eq!(reader.read().as_deref(), Some("dark"));
}

#[test]
fn test_live_value_follows_other_tab() {
    let fixture = OriginFixture::new(2);
    let live = fixture.tab(1).bind("n", Some(0_i64)).live();
    assert_eq!(live.get(), Some(0));

    let writer = fixture.tab(0).bind("n", Some(0_i64));
    writer.write(&9).unwrap();
    assert!(live.is_stale());
    assert_eq!(live.get(), Some(9));

    writer.clear().unwrap();
    assert_eq!(live.get(), None);
    assert_eq!(live.version(), 3);
}

#[test]
fn test_unsubscribe_releases_listeners() {
    let fixture = OriginFixture::new(2);
    let writer = fixture.tab(0).bind("k", None::<u8>);
    let reader = fixture.tab(1).bind("k", None::<u8>);

    let seen = NotifyCounter::new();
    let subscription = reader.subscribe(seen.callback());
    assert!(subscription.unsubscribe());
    assert!(!subscription.unsubscribe());

    writer.write(&1).unwrap();
    assert_eq!(seen.count(), 0);
}

#[test]
fn test_sqlite_processes_sync_through_change_log() {
    let fixture = SqliteFixture::new();
    let (proc_a, _watch_a) = fixture.process(0xa);
    let (proc_b, watch_b) = fixture.process(0xb);

    let writer = proc_a.bind("counter", Some(0_i32));
    let live = proc_b.bind("counter", Some(0_i32)).live();
    assert_eq!(live.get(), Some(0));

    writer.write(&5).unwrap();
    assert_eq!(live.get(), Some(0));

    watch_b.poll().unwrap();
    assert_eq!(live.get(), Some(5));

    writer.clear().unwrap();
    watch_b.poll().unwrap();
    assert_eq!(live.get(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sqlite_background_watcher() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slots.db");
    let config = WatchConfig {
        poll_interval: Duration::from_millis(10),
        ..WatchConfig::default()
    };

    let (proc_a, _) = Context::open_sqlite(&path, config.clone()).unwrap();
    let (proc_b, watcher) = Context::open_sqlite(&path, config).unwrap();
    let _task = watcher.spawn().unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let reader = proc_b.bind("status", None::<String>);
    let _sub = reader.subscribe(move || {
        let _ = tx.send(());
    });

    proc_a
        .bind("status", None::<String>)
        .write(&"ready".to_string())
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no change delivered")
        .unwrap();
    assert_eq!(reader.read().as_deref(), Some("ready"));
}

#[test]
fn test_storage_trait_objects_are_interchangeable() {
    let contexts: Vec<Context<dyn Storage>> = vec![
        Context::from_shared(
            Arc::new(slotsync::MemoryStorage::new()) as Arc<dyn Storage>,
            Arc::new(slotsync::bus::ListenerRegistry::new()),
        ),
        Context::from_shared(
            Arc::new(slotsync::SqliteStorage::open_memory().unwrap()) as Arc<dyn Storage>,
            Arc::new(slotsync::bus::ListenerRegistry::new()),
        ),
    ];

    for context in &contexts {
        let binding = context.bind("k", Some(1_u8));
        binding.write(&2).unwrap();
        assert_eq!(binding.read(), Some(2));
    }
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn test_write_then_read(key in key(), profile: Profile) {
        let context = Context::in_memory();
        let binding = context.bind(key, None::<Profile>);
        binding.write(&profile).unwrap();
        prop_assert_eq!(binding.read(), Some(profile));
    }

    #[test]
    fn test_write_then_read_cbor(profile: Profile) {
        let context = Context::in_memory().with_codec(CborCodec);
        let binding = context.bind("profile", None::<Profile>);
        binding.write(&profile).unwrap();
        prop_assert_eq!(binding.read(), Some(profile));
    }

    #[test]
    fn test_migration_is_idempotent(raw in legacy_text()) {
        let context = Context::in_memory();
        let storage = context.storage();
        storage.set_item("k", &raw).unwrap();

        let first = slotsync::migrate(storage.as_ref(), &JsonCodec, "k");
        let after_first = storage.get_item("k").unwrap();
        let second = slotsync::migrate(storage.as_ref(), &JsonCodec, "k");

        prop_assert!(!second.rewrote());
        prop_assert_eq!(storage.get_item("k").unwrap(), after_first);
        let failed = matches!(first, MigrationOutcome::Failed { .. });
        prop_assert!(!failed, "first migration failed: {:?}", first);
    }

    #[test]
    fn test_migration_preserves_documents(doc in legacy_document()) {
        let context = Context::in_memory();
        context.storage().set_item("k", &doc.to_string()).unwrap();

        let binding = context.bind("k", None::<serde_json::Value>);
        prop_assert!(
            binding.migration().rewrote()
                || matches!(binding.migration(), MigrationOutcome::AlreadyEnveloped(_))
        );
        if binding.migration().rewrote() {
            prop_assert_eq!(binding.read(), Some(doc));
        }
    }
}
