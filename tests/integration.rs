//! Integration tests for the collection store.

use prism::{
    Filter, Patch, PropertyPath, PutRequest, Range, Sort, Store, StoreError, SubscriptionConfig,
    Update,
};
use serde_json::{json, Value};
use std::time::Duration;

fn seeded() -> Store<Value> {
    Store::memory_with(vec![
        json!({"id": "1", "v": 1}),
        json!({"id": "2", "v": 2}),
    ])
    .unwrap()
}

// --- Core contract ---

#[test]
fn test_add_then_get_returns_equal_item() {
    let store = Store::memory();
    let item = json!({"id": "a", "nested": {"x": [1, 2]}, "v": 1});
    store.add_one(item.clone()).unwrap();

    assert_eq!(store.get_one("a").unwrap(), item);
    // position in fetch() matches
    let fetched = store.fetch().unwrap();
    assert_eq!(fetched[0], item);
}

#[test]
fn test_add_assigns_generated_ids() {
    let store = Store::memory();
    let added = store.add_one(json!({"v": 1})).unwrap();
    let id = added["id"].as_str().unwrap().to_string();

    assert_eq!(store.get_one(id.as_str()).unwrap()["v"], 1);
}

#[test]
fn test_duplicate_add_fails_and_keeps_first() {
    let store = Store::memory();
    store.add_one(json!({"id": "1", "v": 1})).unwrap();

    let err = store.add_one(json!({"id": "1", "v": 99})).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId(id) if id.as_str() == "1"));

    assert_eq!(store.get_one("1").unwrap()["v"], 1);
}

#[test]
fn test_patch_put_scenario() {
    // root store with [{id:1,v:1},{id:2,v:2}]; put a patch setting v=9
    let store = seeded();
    let handle = store.subscribe(SubscriptionConfig::default());
    let version_before = store.version();

    store.put_patch("1", Patch::new().set("v", 9)).unwrap();

    assert_eq!(store.get_one("1").unwrap(), json!({"id": "1", "v": 9}));
    assert_eq!(store.version(), version_before + 1);

    let events = handle.recv_timeout(Duration::from_millis(100)).unwrap();
    assert_eq!(events.len(), 1);
    let Update::Updated { diff, .. } = &events[0] else {
        panic!("expected Updated event");
    };
    assert_eq!(diff.to_string(), "set(v,9)");
    // the diff reconstructs the change
    assert_eq!(
        diff.apply(&json!({"id": "1", "v": 1})).unwrap(),
        json!({"id": "1", "v": 9})
    );
}

#[test]
fn test_put_mixed_batch_is_one_transaction() {
    let store = seeded();
    let handle = store.subscribe(SubscriptionConfig::default());

    // one update, one add, in a single call
    let results = store
        .put(vec![
            PutRequest::Item(json!({"id": "1", "v": 10})),
            PutRequest::Item(json!({"id": "3", "v": 3})),
        ])
        .unwrap();
    assert_eq!(results.len(), 2);

    let events = handle.recv_timeout(Duration::from_millis(100)).unwrap();
    assert_eq!(events.len(), 1);
    let Update::Batch(inner) = &events[0] else {
        panic!("expected one Batch event for a mixed put");
    };
    assert!(matches!(inner[0], Update::Updated { .. }));
    assert!(matches!(inner[1], Update::Added { .. }));
}

#[test]
fn test_put_merges_patches_for_one_id() {
    let store = seeded();
    store
        .put(vec![PutRequest::Patches(vec![
            ("1".into(), Patch::new().set("v", 5)),
            ("1".into(), Patch::new().set("w", true)),
        ])])
        .unwrap();

    assert_eq!(store.get_one("1").unwrap(), json!({"id": "1", "v": 5, "w": true}));
    // two patch entries, one id: a single mutation
    assert_eq!(store.version(), 1);
}

#[test]
fn test_delete_reindexes_followers() {
    let store = Store::memory();
    for i in 0..5 {
        store.add_one(json!({"id": i.to_string(), "v": i})).unwrap();
    }

    store.delete_one("1").unwrap();
    store.delete_one("3").unwrap();

    let data = store.fetch().unwrap();
    assert_eq!(data.len(), 3);
    // every remaining id still resolves to its item
    for item in &data {
        let id = item["id"].as_str().unwrap();
        assert_eq!(&store.get_one(id).unwrap(), item);
    }
}

// --- Query composition ---

#[test]
fn test_filter_sort_range_composition_is_associative() {
    let items: Vec<Value> = (0..10)
        .map(|i| json!({"id": i.to_string(), "v": (i * 7) % 10}))
        .collect();
    let store = Store::memory_with(items.clone()).unwrap();

    let chained = store
        .filter(Filter::gt("v", 2))
        .sort(Sort::by("v"))
        .range(1, 3)
        .fetch()
        .unwrap();

    let filter: Filter<Value> = Filter::gt("v", 2);
    let sort: Sort<Value> = Sort::by("v");
    let range = Range::new(1, 3);
    let nested = range.apply(&sort.apply(&filter.apply(&items)));

    assert_eq!(chained, nested);

    // and independently of how the derivation calls were chained
    let step_by_step = store
        .filter(Filter::gt("v", 2))
        .sort(Sort::by("v"));
    assert_eq!(step_by_step.range(1, 3).fetch().unwrap(), nested);
}

#[test]
fn test_view_caches_until_source_version_moves() {
    let store = seeded();
    let view = store.sort(Sort::by_desc("v"));

    let first = view.fetch().unwrap();
    assert_eq!(view.version(), store.version());
    // cache hit: same result, no source change
    assert_eq!(view.fetch().unwrap(), first);

    store.add_one(json!({"id": "3", "v": 3})).unwrap();
    let second = view.fetch().unwrap();
    assert_eq!(second[0]["v"], 3);
}

#[test]
fn test_derived_views_never_mutate_the_receiver() {
    let store = seeded();
    let filtered = store.filter(Filter::gt("v", 1));
    let _narrower = filtered.filter(Filter::lt("v", 100));

    assert_eq!(store.queries().len(), 0);
    assert_eq!(filtered.queries().len(), 1);
}

#[test]
fn test_custom_predicate_view_is_not_serializable() {
    let store = seeded();
    let view = store.filter(Filter::custom(|item: &Value| item["v"] == 2));

    assert_eq!(view.fetch().unwrap().len(), 1);
    assert!(matches!(
        view.query_string(),
        Err(StoreError::NotSerializable(_))
    ));
}

// --- Typed items ---

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct Task {
    id: String,
    title: String,
    done: bool,
    priority: i64,
}

#[test]
fn test_typed_item_workflow() {
    let store: Store<Task> = Store::memory_with(vec![
        Task {
            id: "t1".into(),
            title: "write docs".into(),
            done: false,
            priority: 2,
        },
        Task {
            id: "t2".into(),
            title: "fix bug".into(),
            done: false,
            priority: 5,
        },
    ])
    .unwrap();

    let urgent = store
        .filter(Filter::eq("done", false))
        .sort(Sort::by_desc("priority"));
    let fetched = urgent.fetch().unwrap();
    assert_eq!(fetched[0].id, "t2");

    store
        .put_patch("t2", Patch::new().set("done", true))
        .unwrap();
    assert!(store.get_one("t2").unwrap().done);
    assert_eq!(urgent.fetch().unwrap().len(), 1);
}

#[test]
fn test_nested_property_path_queries() {
    let store = Store::memory_with(vec![
        json!({"id": "1", "meta": {"score": 10}}),
        json!({"id": "2", "meta": {"score": 30}}),
        json!({"id": "3", "meta": {}}),
    ])
    .unwrap();

    let view = store
        .filter(Filter::gte(PropertyPath::parse("meta.score"), 10))
        .sort(Sort::by_desc("meta.score"));
    let fetched = view.fetch().unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0]["id"], "2");
}

// --- Subscriptions ---

#[test]
fn test_one_notification_per_logical_operation() {
    let store = Store::memory();
    let handle = store.subscribe(SubscriptionConfig::default());

    store
        .add(vec![json!({"id": "1"}), json!({"id": "2"})])
        .unwrap();

    // a single notification with two Added events, in order
    let events = handle.recv_timeout(Duration::from_millis(100)).unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Update::Added { index: 0, .. }));
    assert!(matches!(&events[1], Update::Added { index: 1, .. }));
    assert!(handle.try_recv().is_err());
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let store = Store::memory();
    let handle = store.subscribe(SubscriptionConfig::default());
    store.unsubscribe(handle.id);

    store.add_one(json!({"id": "1"})).unwrap();
    assert!(handle.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_callback_observer_sees_events() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let store = Store::memory();
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_by_callback = Arc::clone(&seen);
    store.observe(move |events: &[Update<Value>]| {
        seen_by_callback.fetch_add(events.len(), Ordering::SeqCst);
    });

    store.add_one(json!({"id": "1"})).unwrap();
    store.delete_one("1").unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}
