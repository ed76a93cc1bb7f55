//! Shared fixtures: a small shop schema (orders, line items, tags) and a
//! pair of mutually dependent entities for cycle tests.

use crate::{
    config::DenormConfig,
    db::store::{MemoryStore, Record},
    denorm::{
        DenormBuilder, DenormRegistry, ForeignKey, Identity, ManyToMany, ReverseForeignKey,
    },
    error::InternalError,
    key::Key,
    model::{
        entity::EntityModel,
        field::{FieldKind, FieldModel},
    },
    traits::{FieldAccess, RowStore},
    value::Value,
};
use std::collections::BTreeSet;

pub(crate) const ORDER: &str = "Order";
pub(crate) const LINE_ITEM: &str = "LineItem";
pub(crate) const TAG: &str = "Tag";
pub(crate) const LEFT: &str = "Left";
pub(crate) const RIGHT: &str = "Right";
pub(crate) const COUNTER: &str = "Counter";
pub(crate) const CUSTOMER: &str = "Customer";

pub(crate) const ITEM_COUNT: FieldModel = FieldModel::new("item_count", FieldKind::Uint);
pub(crate) const TOTAL: FieldModel = FieldModel::new("total", FieldKind::Uint);
pub(crate) const TAG_LABELS: FieldModel = FieldModel::new("tag_labels", FieldKind::Text);
pub(crate) const ORDER_NAME: FieldModel = FieldModel::new("order_name", FieldKind::Text);
pub(crate) const USAGE: FieldModel = FieldModel::new("usage", FieldKind::Uint);
pub(crate) const MIRROR: FieldModel = FieldModel::new("mirror", FieldKind::Uint);
pub(crate) const ECHO: FieldModel = FieldModel::new("echo", FieldKind::Uint);
pub(crate) const TICKS: FieldModel = FieldModel::new("ticks", FieldKind::Uint);

pub(crate) static ORDER_MODEL: EntityModel = EntityModel {
    name: ORDER,
    fields: &[
        FieldModel::new("name", FieldKind::Text),
        FieldModel::new("tags", FieldKind::RefList(TAG)),
        FieldModel::new("customer", FieldKind::Ref(CUSTOMER)),
        ITEM_COUNT,
        TOTAL,
        TAG_LABELS,
    ],
};

pub(crate) static LINE_ITEM_MODEL: EntityModel = EntityModel {
    name: LINE_ITEM,
    fields: &[
        FieldModel::new("order", FieldKind::Ref(ORDER)),
        FieldModel::new("customer", FieldKind::Ref(CUSTOMER)),
        FieldModel::new("qty", FieldKind::Uint),
        FieldModel::new("price", FieldKind::Uint),
        ORDER_NAME,
    ],
};

pub(crate) static TAG_MODEL: EntityModel = EntityModel {
    name: TAG,
    fields: &[FieldModel::new("label", FieldKind::Text), USAGE],
};

pub(crate) static LEFT_MODEL: EntityModel = EntityModel {
    name: LEFT,
    fields: &[
        FieldModel::new("partner", FieldKind::Ref(RIGHT)),
        FieldModel::new("seed", FieldKind::Uint),
        MIRROR,
        ECHO,
    ],
};

pub(crate) static RIGHT_MODEL: EntityModel = EntityModel {
    name: RIGHT,
    fields: &[
        FieldModel::new("partner", FieldKind::Ref(LEFT)),
        FieldModel::new("seed", FieldKind::Uint),
        MIRROR,
        ECHO,
    ],
};

pub(crate) static COUNTER_MODEL: EntityModel = EntityModel {
    name: COUNTER,
    fields: &[TICKS],
};

pub(crate) static CUSTOMER_MODEL: EntityModel = EntityModel {
    name: CUSTOMER,
    fields: &[ITEM_COUNT],
};

/// Store with every fixture entity registered.
pub(crate) fn fixture_store() -> MemoryStore {
    let store = MemoryStore::new();
    for model in [
        &ORDER_MODEL,
        &LINE_ITEM_MODEL,
        &TAG_MODEL,
        &LEFT_MODEL,
        &RIGHT_MODEL,
        &COUNTER_MODEL,
        &CUSTOMER_MODEL,
    ] {
        store
            .register_entity(model)
            .expect("fixture entity should register once");
    }

    store
}

pub(crate) fn registry() -> DenormRegistry<MemoryStore> {
    DenormRegistry::new(DenormConfig::default())
}

// ---------------------------------------------------------------------------
// Rule declarations
// ---------------------------------------------------------------------------

/// `Order.item_count`: number of line items pointing at the order.
pub(crate) fn item_count_rule() -> DenormBuilder<MemoryStore> {
    DenormBuilder::new(ORDER, ITEM_COUNT)
        .compute(|store: &MemoryStore, order: &Record| {
            Ok(Value::Uint(referencing(store, LINE_ITEM, "order", &order.key())?.len() as u64))
        })
        .depends_on(ReverseForeignKey::new(LINE_ITEM, "order"))
}

/// `Customer.item_count`: line items billed to the customer. Orders also
/// name a customer, so order saves reach this rule as well.
pub(crate) fn customer_item_count_rule() -> DenormBuilder<MemoryStore> {
    DenormBuilder::new(CUSTOMER, ITEM_COUNT)
        .compute(|store: &MemoryStore, customer: &Record| {
            let items = referencing(store, LINE_ITEM, "customer", &customer.key())?;

            Ok(Value::Uint(items.len() as u64))
        })
        .depends_on(ReverseForeignKey::new(ORDER, "customer"))
        .depends_on(ReverseForeignKey::new(LINE_ITEM, "customer"))
}

/// `Order.total`: sum of `qty * price` over the order's line items.
pub(crate) fn total_rule() -> DenormBuilder<MemoryStore> {
    DenormBuilder::new(ORDER, TOTAL)
        .compute(|store: &MemoryStore, order: &Record| {
            let total = referencing(store, LINE_ITEM, "order", &order.key())?
                .iter()
                .map(|item| uint(item, "qty") * uint(item, "price"))
                .sum::<u64>();

            Ok(Value::Uint(total))
        })
        .depends_on(ReverseForeignKey::new(LINE_ITEM, "order"))
}

/// `LineItem.order_name`: copy of the referenced order's name.
pub(crate) fn order_name_rule() -> DenormBuilder<MemoryStore> {
    DenormBuilder::new(LINE_ITEM, ORDER_NAME)
        .compute(|store: &MemoryStore, item: &Record| {
            let Some(order_key) = item.field("order").and_then(Value::as_key) else {
                return Ok(Value::Null);
            };

            Ok(store
                .get(ORDER, order_key)?
                .and_then(|order| order.get_field("name"))
                .unwrap_or_default())
        })
        .depends_on(ForeignKey::new(ORDER, "order"))
}

/// `Order.tag_labels`: sorted, comma-joined labels of the order's tags.
pub(crate) fn tag_labels_rule() -> DenormBuilder<MemoryStore> {
    DenormBuilder::new(ORDER, TAG_LABELS)
        .compute(|store: &MemoryStore, order: &Record| {
            let keys: BTreeSet<Key> = order
                .field("tags")
                .map(Value::referenced_keys)
                .unwrap_or_default()
                .into_iter()
                .collect();
            let mut labels: Vec<String> = store
                .filter_by_key(TAG, &keys)?
                .iter()
                .filter_map(|tag| tag.field("label").and_then(Value::as_text))
                .map(str::to_string)
                .collect();
            labels.sort();

            Ok(Value::Text(labels.join(",")))
        })
        .depends_on(ManyToMany::owning(TAG, "tags"))
}

/// `Tag.usage`: number of orders listing the tag.
pub(crate) fn usage_rule() -> DenormBuilder<MemoryStore> {
    DenormBuilder::new(TAG, USAGE)
        .compute(|store: &MemoryStore, tag: &Record| {
            Ok(Value::Uint(referencing(store, ORDER, "tags", &tag.key())?.len() as u64))
        })
        .depends_on(ManyToMany::reverse(ORDER, "tags"))
}

/// `<entity>.mirror`: the partner's seed.
pub(crate) fn mirror_rule(entity: &'static str, partner: &'static str) -> DenormBuilder<MemoryStore> {
    DenormBuilder::new(entity, MIRROR)
        .compute(move |store: &MemoryStore, row: &Record| {
            Ok(Value::Uint(partner_uint(store, partner, row, "seed")?))
        })
        .depends_on(ForeignKey::new(partner, "partner"))
}

/// `<entity>.echo`: max of own seed and the partner's echo.
pub(crate) fn echo_rule(entity: &'static str, partner: &'static str) -> DenormBuilder<MemoryStore> {
    DenormBuilder::new(entity, ECHO)
        .compute(move |store: &MemoryStore, row: &Record| {
            let theirs = partner_uint(store, partner, row, "echo")?;

            Ok(Value::Uint(theirs.max(uint(row, "seed"))))
        })
        .depends_on(ForeignKey::new(partner, "partner"))
}

/// `Counter.ticks`: one more than the stored value; never converges.
pub(crate) fn ticks_rule() -> DenormBuilder<MemoryStore> {
    DenormBuilder::new(COUNTER, TICKS)
        .compute(|_store: &MemoryStore, row: &Record| Ok(Value::Uint(uint(row, "ticks") + 1)))
        .depends_on(Identity::new())
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

pub(crate) fn referencing(
    store: &MemoryStore,
    entity: &str,
    field: &str,
    key: &Key,
) -> Result<Vec<Record>, InternalError> {
    store.filter_by_reference(entity, field, &BTreeSet::from([key.clone()]))
}

pub(crate) fn uint(row: &Record, field: &str) -> u64 {
    row.field(field).and_then(Value::as_uint).unwrap_or_default()
}

fn partner_uint(
    store: &MemoryStore,
    partner: &str,
    row: &Record,
    field: &str,
) -> Result<u64, InternalError> {
    let Some(key) = row.field("partner").and_then(Value::as_key) else {
        return Ok(0);
    };

    Ok(store
        .get(partner, key)?
        .map(|other| uint(&other, field))
        .unwrap_or_default())
}

/// Read one stored field, panicking when the row is missing.
pub(crate) fn stored(store: &MemoryStore, entity: &str, key: u64, field: &str) -> Value {
    store
        .get(entity, &Key::Uint(key))
        .expect("fixture read should succeed")
        .unwrap_or_else(|| panic!("{entity} {key} should exist"))
        .get_field(field)
        .unwrap_or_default()
}

pub(crate) fn order(key: u64, name: &str) -> Record {
    Record::new(key).with("name", name)
}

pub(crate) fn line_item(key: u64, order: u64, qty: u64, price: u64) -> Record {
    Record::new(key)
        .with("order", Key::Uint(order))
        .with("qty", qty)
        .with("price", price)
}
