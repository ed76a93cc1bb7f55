use crate::{
    config::DenormConfig,
    db::signal::{ChangeEvent, Signal},
    denorm::{ImpactSet, RegistryError, resolver::Resolver},
    error::InternalError,
    key::Key,
    model::field::FieldModel,
    obs::sink::{self, DenormEvent},
    traits::{FieldAccess, RowStore},
    value::Value,
};
use std::{cell::RefCell, collections::BTreeSet, fmt, rc::Rc};

/// Value computation for one row of the owning entity.
pub type ComputeFn<S> = Box<dyn Fn(&S, &<S as RowStore>::Row) -> Result<Value, InternalError>>;

///
/// DenormBuilder
///
/// Declaration of one denormalized field: the plain field, the function
/// computing it, and the resolvers naming what it depends on.
/// Turned into a live `Denorm` by `DenormRegistry::register`.
///

pub struct DenormBuilder<S: RowStore> {
    entity: &'static str,
    field: FieldModel,
    compute: Option<ComputeFn<S>>,
    resolvers: Vec<Box<dyn Resolver<S>>>,
}

impl<S: RowStore> DenormBuilder<S> {
    #[must_use]
    pub fn new(entity: &'static str, field: FieldModel) -> Self {
        Self {
            entity,
            field,
            compute: None,
            resolvers: Vec::new(),
        }
    }

    /// Set the value function.
    #[must_use]
    pub fn compute(
        mut self,
        f: impl Fn(&S, &S::Row) -> Result<Value, InternalError> + 'static,
    ) -> Self {
        self.compute = Some(Box::new(f));
        self
    }

    /// Append one dependency resolver.
    #[must_use]
    pub fn depends_on(mut self, resolver: impl Resolver<S> + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub const fn field(&self) -> FieldModel {
        self.field
    }

    // Bind resolvers to the owning entity and freeze the rule.
    pub(crate) fn build(self, config: &DenormConfig) -> Result<Denorm<S>, InternalError> {
        let Self {
            entity,
            field,
            compute,
            mut resolvers,
        } = self;

        let compute = compute.ok_or(RegistryError::MissingCompute {
            entity,
            field: field.name,
        })?;

        for resolver in &mut resolvers {
            resolver.setup(entity)?;
        }

        Ok(Denorm {
            entity,
            field,
            compute,
            resolvers,
            updating: RefCell::new(BTreeSet::new()),
            pending: RefCell::new(Vec::new()),
            auto_update: config.auto_update,
            metrics: config.metrics,
        })
    }
}

///
/// Denorm
///
/// Live rule owning one denormalized field on one entity.
///
/// ## Cycle guard
/// `updating` holds the keys whose recomputed value is being saved right
/// now. While a key is in it, that row is neither recomputed by `apply` nor
/// refreshed by the pre-save hook, which is what stops cyclic dependency
/// graphs from recursing forever. A row only writes when its value actually
/// changed, so cascades end once values stop moving.
///
/// ## Pending impact
/// The pre-change handler pushes the impact set computed against the old
/// state, tagged with the change it belongs to; the matching post-change
/// handler takes that entry back, unions in the new-state impact and
/// applies it. Changes nest while cascades run, so entries form a stack and
/// a nested change never sees or consumes its parent's entry.
///

pub struct Denorm<S: RowStore> {
    entity: &'static str,
    field: FieldModel,
    compute: ComputeFn<S>,
    resolvers: Vec<Box<dyn Resolver<S>>>,
    updating: RefCell<BTreeSet<Key>>,
    pending: RefCell<Vec<PendingImpact>>,
    auto_update: bool,
    metrics: bool,
}

impl<S: RowStore> Denorm<S> {
    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub const fn field(&self) -> &FieldModel {
        &self.field
    }

    /// Entities whose changes can affect this rule: the owning entity plus
    /// every resolver source.
    #[must_use]
    pub fn sources(&self) -> BTreeSet<&'static str> {
        std::iter::once(self.entity)
            .chain(self.resolvers.iter().map(|resolver| resolver.source()))
            .filter(|source| !source.is_empty())
            .collect()
    }

    /// True while `key` is having its recomputed value saved.
    #[must_use]
    pub fn is_updating(&self, key: &Key) -> bool {
        self.updating.borrow().contains(key)
    }

    /// Number of changes whose pre-change impact is waiting for the
    /// matching post-change.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Union of every matching resolver's result for `rows` of `entity`,
    /// plus the rows themselves when `entity` is the owning entity.
    pub fn impact_set(
        &self,
        store: &S,
        entity: &str,
        rows: &[S::Row],
    ) -> Result<ImpactSet, InternalError> {
        let mut impact = ImpactSet::new();
        if rows.is_empty() {
            return Ok(impact);
        }

        if entity == self.entity {
            impact.extend(rows.iter().map(FieldAccess::key));
        }

        for resolver in self.resolvers.iter().filter(|r| r.source() == entity) {
            impact.union(resolver.resolve(store, rows)?);
        }

        Ok(impact)
    }

    /// Capture the impact set against the state before a mutation.
    pub fn on_pre_change(&self, store: &S, event: &ChangeEvent<'_>) -> Result<(), InternalError> {
        if !self.auto_update {
            return Ok(());
        }

        let rows = store.filter_by_key(event.entity, event.keys)?;
        let impact = self.impact_set(store, event.entity, &rows)?;
        self.record_impact(event.signal, &impact);

        self.pending.borrow_mut().push(PendingImpact {
            signal: event.signal,
            entity: event.entity,
            keys: event.keys.clone(),
            impact,
        });

        Ok(())
    }

    /// Union the post-mutation impact set into the pending one and apply it.
    pub fn on_post_change(&self, store: &S, event: &ChangeEvent<'_>) -> Result<(), InternalError> {
        if !self.auto_update {
            return Ok(());
        }

        let rows = store.filter_by_key(event.entity, event.keys)?;
        let post = self.impact_set(store, event.entity, &rows)?;
        self.record_impact(event.signal, &post);

        let mut impact = self.take_pending(event).unwrap_or_default();
        impact.union(post);

        self.apply(store, &impact)
    }

    /// Write the computed value onto an owning row about to be saved
    /// directly, so the save carries it without a second write.
    pub fn on_self_pre_save(&self, store: &S, row: &mut S::Row) -> Result<(), InternalError> {
        if !self.auto_update || self.is_updating(&row.key()) {
            return Ok(());
        }

        let value = self.compute_value(store, row)?;
        row.set_field(self.field.name, value)
    }

    /// Recompute every row in `impact`, saving only rows whose value changed.
    pub fn apply(&self, store: &S, impact: &ImpactSet) -> Result<(), InternalError> {
        for key in impact {
            if self.is_updating(key) {
                self.record(DenormEvent::SkipInFlight {
                    entity: self.entity,
                    field: self.field.name,
                });
                continue;
            }

            // reload so earlier writes in this cascade are visible
            let Some(mut row) = store.get(self.entity, key)? else {
                continue;
            };

            self.record(DenormEvent::Recompute {
                entity: self.entity,
                field: self.field.name,
            });
            let value = self.compute_value(store, &row)?;
            let current = row.get_field(self.field.name).unwrap_or_default();
            if current == value {
                self.record(DenormEvent::SkipUnchanged {
                    entity: self.entity,
                    field: self.field.name,
                });
                continue;
            }

            let _guard = UpdatingGuard::enter(&self.updating, key.clone());
            row.set_field(self.field.name, value)?;
            store.save(self.entity, row)?;

            self.record(DenormEvent::Write {
                entity: self.entity,
                field: self.field.name,
            });
        }

        Ok(())
    }

    /// Recompute every stored row of the owning entity.
    pub fn rebuild(&self, store: &S) -> Result<(), InternalError> {
        let impact: ImpactSet = store
            .all_rows(self.entity)?
            .iter()
            .map(FieldAccess::key)
            .collect();

        self.record(DenormEvent::Rebuild {
            entity: self.entity,
            field: self.field.name,
            rows: impact.len() as u64,
        });

        self.apply(store, &impact)
    }

    // Run the compute function, rejecting values the field cannot hold.
    fn compute_value(&self, store: &S, row: &S::Row) -> Result<Value, InternalError> {
        let value = (self.compute)(store, row)?;
        if self.field.kind.accepts(&value) {
            return Ok(value);
        }

        Err(InternalError::rule_invariant(format!(
            "computed value does not fit {}.{} ({:?}): {value:?}",
            self.entity, self.field.name, self.field.kind
        )))
    }

    // Remove and return the pre-change entry closed by `event`. Entries
    // pushed after it belong to nested changes that were aborted before
    // their post phase, so they are dropped with it.
    fn take_pending(&self, event: &ChangeEvent<'_>) -> Option<ImpactSet> {
        let mut pending = self.pending.borrow_mut();
        let index = pending.iter().rposition(|entry| entry.closes(event))?;
        let entry = pending.drain(index..).next();

        entry.map(|entry| entry.impact)
    }

    fn record_impact(&self, signal: Signal, impact: &ImpactSet) {
        self.record(DenormEvent::ImpactResolved {
            entity: self.entity,
            field: self.field.name,
            signal,
            rows: impact.len() as u64,
        });
    }

    fn record(&self, event: DenormEvent) {
        if self.metrics {
            sink::record(event);
        }
    }
}

impl<S: RowStore + 'static> Denorm<S> {
    // Subscribe this rule to the store's lifecycle channels.
    pub(crate) fn connect(self: &Rc<Self>, store: &S) {
        let bus = store.signals();

        for source in self.sources() {
            for signal in Signal::ALL {
                let rule = Rc::clone(self);
                if signal.is_pre() {
                    bus.connect(signal, Some(source), move |store, event| {
                        rule.on_pre_change(store, event)
                    });
                } else {
                    bus.connect(signal, Some(source), move |store, event| {
                        rule.on_post_change(store, event)
                    });
                }
            }
        }

        let rule = Rc::clone(self);
        bus.connect_pre_save(self.entity, move |store, row| {
            rule.on_self_pre_save(store, row)
        });
    }
}

impl<S: RowStore> fmt::Debug for Denorm<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Denorm")
            .field("entity", &self.entity)
            .field("field", &self.field.name)
            .field("resolvers", &self.resolvers.len())
            .field("updating", &self.updating.borrow())
            .field("pending", &self.pending.borrow().len())
            .finish_non_exhaustive()
    }
}

///
/// PendingImpact
/// Old-state impact of one change, waiting for that change's post phase.
///

struct PendingImpact {
    signal: Signal,
    entity: &'static str,
    keys: BTreeSet<Key>,
    impact: ImpactSet,
}

impl PendingImpact {
    fn closes(&self, event: &ChangeEvent<'_>) -> bool {
        self.signal.counterpart() == event.signal
            && self.entity == event.entity
            && &self.keys == event.keys
    }
}

///
/// UpdatingGuard
///
/// Holds one key in a rule's updating-set for the duration of its save.
/// Removal happens on drop, so a failed save does not strand the key.
///

struct UpdatingGuard<'a> {
    updating: &'a RefCell<BTreeSet<Key>>,
    key: Key,
}

impl<'a> UpdatingGuard<'a> {
    fn enter(updating: &'a RefCell<BTreeSet<Key>>, key: Key) -> Self {
        updating.borrow_mut().insert(key.clone());

        Self { updating, key }
    }
}

impl Drop for UpdatingGuard<'_> {
    fn drop(&mut self) {
        self.updating.borrow_mut().remove(&self.key);
    }
}
