use crate::{error::InternalError, key::Key, traits::RowStore};
use std::{cell::RefCell, collections::BTreeSet, fmt, rc::Rc};

///
/// Signal
///
/// Lifecycle channels published by a row store.
/// Bulk channels exist because set-level updates never fire per-row hooks.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Signal {
    PreSave,
    PostSave,
    PreDelete,
    PostDelete,
    PreBulkUpdate,
    PostBulkUpdate,
}

impl Signal {
    pub const ALL: [Self; 6] = [
        Self::PreSave,
        Self::PostSave,
        Self::PreDelete,
        Self::PostDelete,
        Self::PreBulkUpdate,
        Self::PostBulkUpdate,
    ];

    /// True for channels fired before the change is applied.
    #[must_use]
    pub const fn is_pre(self) -> bool {
        matches!(self, Self::PreSave | Self::PreDelete | Self::PreBulkUpdate)
    }

    /// Channel on the other side of the same change.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::PreSave => Self::PostSave,
            Self::PostSave => Self::PreSave,
            Self::PreDelete => Self::PostDelete,
            Self::PostDelete => Self::PreDelete,
            Self::PreBulkUpdate => Self::PostBulkUpdate,
            Self::PostBulkUpdate => Self::PreBulkUpdate,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PreSave => "pre_save",
            Self::PostSave => "post_save",
            Self::PreDelete => "pre_delete",
            Self::PostDelete => "post_delete",
            Self::PreBulkUpdate => "pre_bulk_update",
            Self::PostBulkUpdate => "post_bulk_update",
        };
        write!(f, "{label}")
    }
}

///
/// ChangeEvent
/// One published change: channel, sending entity, and affected row keys.
///

#[derive(Clone, Copy, Debug)]
pub struct ChangeEvent<'a> {
    pub signal: Signal,
    pub entity: &'static str,
    pub keys: &'a BTreeSet<Key>,
}

impl<'a> ChangeEvent<'a> {
    #[must_use]
    pub const fn new(signal: Signal, entity: &'static str, keys: &'a BTreeSet<Key>) -> Self {
        Self {
            signal,
            entity,
            keys,
        }
    }
}

/// Handler receiving change events.
pub type ChangeHandler<S> = Rc<dyn Fn(&S, &ChangeEvent<'_>) -> Result<(), InternalError>>;

/// Handler that may edit a row right before it is written.
pub type InstanceHandler<S> =
    Rc<dyn Fn(&S, &mut <S as RowStore>::Row) -> Result<(), InternalError>>;

struct ChangeSubscription<S: RowStore> {
    signal: Signal,
    sender: Option<&'static str>,
    handler: ChangeHandler<S>,
}

struct InstanceSubscription<S: RowStore> {
    sender: &'static str,
    handler: InstanceHandler<S>,
}

///
/// SignalBus
///
/// Publish/subscribe channel owned by a row store.
///
/// Handlers run synchronously in connection order and may save rows, which
/// publishes again before the outer dispatch returns. The subscription list
/// is snapshotted before dispatch, so re-entrant publishing never observes
/// a live borrow. The first handler error aborts the dispatch.
///

pub struct SignalBus<S: RowStore> {
    change: RefCell<Vec<ChangeSubscription<S>>>,
    pre_save: RefCell<Vec<InstanceSubscription<S>>>,
}

impl<S: RowStore> SignalBus<S> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            change: RefCell::new(Vec::new()),
            pre_save: RefCell::new(Vec::new()),
        }
    }

    /// Subscribe to one channel. `sender = None` receives every entity.
    pub fn connect<F>(&self, signal: Signal, sender: Option<&'static str>, handler: F)
    where
        F: Fn(&S, &ChangeEvent<'_>) -> Result<(), InternalError> + 'static,
    {
        self.change.borrow_mut().push(ChangeSubscription {
            signal,
            sender,
            handler: Rc::new(handler),
        });
    }

    /// Subscribe to pre-save instance edits for one entity.
    pub fn connect_pre_save<F>(&self, sender: &'static str, handler: F)
    where
        F: Fn(&S, &mut S::Row) -> Result<(), InternalError> + 'static,
    {
        self.pre_save.borrow_mut().push(InstanceSubscription {
            sender,
            handler: Rc::new(handler),
        });
    }

    /// Dispatch one change event to its subscribers.
    pub fn publish(&self, store: &S, event: &ChangeEvent<'_>) -> Result<(), InternalError> {
        let handlers: Vec<ChangeHandler<S>> = self
            .change
            .borrow()
            .iter()
            .filter(|sub| sub.signal == event.signal)
            .filter(|sub| sub.sender.is_none_or(|sender| sender == event.entity))
            .map(|sub| Rc::clone(&sub.handler))
            .collect();

        for handler in handlers {
            handler(store, event)?;
        }

        Ok(())
    }

    /// Let pre-save instance handlers edit `row` before it is written.
    pub fn publish_pre_save(
        &self,
        store: &S,
        entity: &'static str,
        row: &mut S::Row,
    ) -> Result<(), InternalError> {
        let handlers: Vec<InstanceHandler<S>> = self
            .pre_save
            .borrow()
            .iter()
            .filter(|sub| sub.sender == entity)
            .map(|sub| Rc::clone(&sub.handler))
            .collect();

        for handler in handlers {
            handler(store, row)?;
        }

        Ok(())
    }

    /// Number of change subscriptions on one channel.
    #[must_use]
    pub fn subscriber_count(&self, signal: Signal) -> usize {
        self.change
            .borrow()
            .iter()
            .filter(|sub| sub.signal == signal)
            .count()
    }
}

impl<S: RowStore> Default for SignalBus<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RowStore> fmt::Debug for SignalBus<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("change", &self.change.borrow().len())
            .field("pre_save", &self.pre_save.borrow().len())
            .finish()
    }
}
