use super::*;
use crate::{
    error::{ErrorClass, ErrorOrigin},
    test_support::{LINE_ITEM, ORDER, ORDER_MODEL, fixture_store, line_item, order},
};
use std::rc::Rc;

// Record every published change as `signal:entity:keys`.
fn trace_signals(store: &MemoryStore) -> Rc<RefCell<Vec<String>>> {
    let trace = Rc::new(RefCell::new(Vec::new()));

    for signal in Signal::ALL {
        let trace = Rc::clone(&trace);
        store.signals().connect(signal, None, move |_, event| {
            let keys: Vec<String> = event.keys.iter().map(ToString::to_string).collect();
            trace
                .borrow_mut()
                .push(format!("{}:{}:{}", event.signal, event.entity, keys.join(",")));
            Ok(())
        });
    }

    trace
}

#[test]
fn save_fires_pre_then_post_around_the_write() {
    let store = fixture_store();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let pre_seen = Rc::clone(&seen);
    store
        .signals()
        .connect(Signal::PreSave, Some(ORDER), move |store: &MemoryStore, event| {
            let stored = store.filter_by_key(event.entity, event.keys)?;
            pre_seen.borrow_mut().push(("pre", stored.len()));
            Ok(())
        });
    let post_seen = Rc::clone(&seen);
    store
        .signals()
        .connect(Signal::PostSave, Some(ORDER), move |store: &MemoryStore, event| {
            let stored = store.filter_by_key(event.entity, event.keys)?;
            post_seen.borrow_mut().push(("post", stored.len()));
            Ok(())
        });

    store.save(ORDER, order(1, "a")).unwrap();

    assert_eq!(*seen.borrow(), vec![("pre", 0), ("post", 1)]);
}

#[test]
fn sender_filter_limits_delivery() {
    let store = fixture_store();
    let trace = trace_signals(&store);
    let orders_only = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&orders_only);
    store
        .signals()
        .connect(Signal::PostSave, Some(ORDER), move |_, _| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

    store.save(LINE_ITEM, line_item(10, 1, 1, 1)).unwrap();
    store.save(ORDER, order(1, "a")).unwrap();

    assert_eq!(*orders_only.borrow(), 1);
    assert_eq!(
        *trace.borrow(),
        vec![
            "pre_save:LineItem:10",
            "post_save:LineItem:10",
            "pre_save:Order:1",
            "post_save:Order:1",
        ]
    );
}

#[test]
fn pre_save_instance_handler_edits_the_written_row() {
    let store = fixture_store();
    store.signals().connect_pre_save(ORDER, |_, row: &mut Record| {
        row.set_field("item_count", Value::Uint(7))
    });

    store.save(ORDER, order(1, "a")).unwrap();

    let row = store.get(ORDER, &Key::Uint(1)).unwrap().unwrap();
    assert_eq!(row.field("item_count"), Some(&Value::Uint(7)));
}

#[test]
fn delete_of_missing_row_fires_nothing() {
    let store = fixture_store();
    let trace = trace_signals(&store);

    assert!(!store.delete(ORDER, &Key::Uint(9)).unwrap());
    assert!(trace.borrow().is_empty());
}

#[test]
fn delete_fires_pre_and_post_delete() {
    let store = fixture_store();
    store.save(ORDER, order(1, "a")).unwrap();
    let trace = trace_signals(&store);

    assert!(store.delete(ORDER, &Key::Uint(1)).unwrap());

    assert_eq!(store.count(ORDER).unwrap(), 0);
    assert_eq!(
        *trace.borrow(),
        vec!["pre_delete:Order:1", "post_delete:Order:1"]
    );
}

#[test]
fn bulk_update_fires_only_bulk_channels_for_existing_rows() {
    let store = fixture_store();
    store.save(ORDER, order(1, "a")).unwrap();
    store.save(ORDER, order(2, "b")).unwrap();
    let trace = trace_signals(&store);
    let keys = BTreeSet::from([Key::Uint(1), Key::Uint(2), Key::Uint(3)]);

    let updated = store.update_where(ORDER, &keys, "name", "z").unwrap();

    assert_eq!(updated, 2);
    assert_eq!(
        *trace.borrow(),
        vec!["pre_bulk_update:Order:1,2", "post_bulk_update:Order:1,2"]
    );
    let row = store.get(ORDER, &Key::Uint(2)).unwrap().unwrap();
    assert_eq!(row.field("name"), Some(&Value::from("z")));
}

#[test]
fn handlers_may_save_reentrantly() {
    let store = fixture_store();
    store
        .signals()
        .connect(Signal::PostSave, Some(LINE_ITEM), |store: &MemoryStore, _| {
            store.save(ORDER, order(1, "created by handler"))
        });

    store.save(LINE_ITEM, line_item(10, 1, 1, 1)).unwrap();

    assert_eq!(store.count(ORDER).unwrap(), 1);
}

#[test]
fn handler_errors_abort_the_save_unchanged() {
    let store = fixture_store();
    let refusal = InternalError::store_unsupported("refused");
    let expected = refusal.clone();
    store
        .signals()
        .connect(Signal::PreSave, Some(ORDER), move |_, _| Err(refusal.clone()));

    let err = store.save(ORDER, order(1, "a")).unwrap_err();

    assert_eq!(err, expected);
    assert_eq!(store.count(ORDER).unwrap(), 0);
}

#[test]
fn undeclared_fields_are_rejected() {
    let store = fixture_store();

    let err = store
        .save(ORDER, order(1, "a").with("colour", "red"))
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Unsupported);
    assert_eq!(err.origin, ErrorOrigin::Store);
}

#[test]
fn values_must_fit_the_declared_kind() {
    let store = fixture_store();
    store.save(LINE_ITEM, line_item(10, 1, 1, 1)).unwrap();

    let err = store
        .save(LINE_ITEM, line_item(11, 1, 1, 1).with("order", 1u64))
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Unsupported);

    let err = store
        .update_where(LINE_ITEM, &BTreeSet::from([Key::Uint(10)]), "qty", "two")
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Unsupported);
    assert_eq!(store.count(LINE_ITEM).unwrap(), 1);

    store
        .save(LINE_ITEM, line_item(12, 1, 1, 1).with("order", Value::Null))
        .unwrap();
}

#[test]
fn subscriptions_are_counted_per_channel() {
    let store = fixture_store();
    store.signals().connect(Signal::PostSave, Some(ORDER), |_, _| Ok(()));
    store.signals().connect(Signal::PostSave, None, |_, _| Ok(()));
    store.signals().connect(Signal::PreDelete, None, |_, _| Ok(()));

    assert_eq!(store.signals().subscriber_count(Signal::PostSave), 2);
    assert_eq!(store.signals().subscriber_count(Signal::PreDelete), 1);
    assert_eq!(store.signals().subscriber_count(Signal::PreSave), 0);
}

#[test]
fn every_channel_pairs_with_its_counterpart() {
    for signal in Signal::ALL {
        let other = signal.counterpart();

        assert_ne!(signal.is_pre(), other.is_pre());
        assert_eq!(other.counterpart(), signal);
    }
}

#[test]
fn unknown_entity_is_not_found() {
    let store = fixture_store();

    let err = store.all_rows("Invoice").unwrap_err();

    assert!(err.is_not_found());
}

#[test]
fn entity_registers_once() {
    let store = fixture_store();

    let err = store.register_entity(&ORDER_MODEL).unwrap_err();

    assert!(err.is_conflict());
}

#[test]
fn filter_by_reference_matches_single_and_list_references() {
    let store = fixture_store();
    store.save(LINE_ITEM, line_item(10, 1, 1, 1)).unwrap();
    store.save(LINE_ITEM, line_item(11, 2, 1, 1)).unwrap();
    store
        .save(ORDER, order(1, "a").with("tags", vec![Key::Uint(5), Key::Uint(6)]))
        .unwrap();

    let items = store
        .filter_by_reference(LINE_ITEM, "order", &BTreeSet::from([Key::Uint(1)]))
        .unwrap();
    let orders = store
        .filter_by_reference(ORDER, "tags", &BTreeSet::from([Key::Uint(6)]))
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key(), Key::Uint(10));
    assert_eq!(orders.len(), 1);
    assert!(
        store
            .filter_by_reference(ORDER, "tags", &BTreeSet::new())
            .unwrap()
            .is_empty()
    );
}
