use crate::value::Value;
use derive_more::Deref;

///
/// FieldModel
/// Plain field declaration as the row store sees it.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldModel {
    /// Field name as used by `FieldAccess`.
    pub name: &'static str,
    /// Shape of the stored value.
    pub kind: FieldKind,
}

impl FieldModel {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

///
/// FieldKind
///
/// Minimal runtime shape of a field. `Ref` and `RefList` name the entity
/// the reference points at.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Bool,
    Int,
    Uint,
    Float,
    Text,
    Key,
    Ref(&'static str),
    RefList(&'static str),
}

impl FieldKind {
    /// Entity targeted by a reference field, if any.
    #[must_use]
    pub const fn target(&self) -> Option<&'static str> {
        match self {
            Self::Ref(target) | Self::RefList(target) => Some(target),
            _ => None,
        }
    }

    /// True when `value` may be stored in a field of this kind.
    /// `Null` fits every kind.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }

        match self {
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::Int => value.as_int().is_some(),
            Self::Uint => value.as_uint().is_some(),
            Self::Float => matches!(value, Value::Float(_)),
            Self::Text => value.as_text().is_some(),
            Self::Key | Self::Ref(_) => value.as_key().is_some(),
            Self::RefList(_) => value
                .as_list()
                .is_some_and(|items| items.iter().all(|item| item.as_key().is_some())),
        }
    }
}

///
/// DenormalizedField
///
/// Field-like handle returned by rule registration.
/// Dereferences to the wrapped `FieldModel`, so it can stand in wherever a
/// plain declaration is expected.
///

#[derive(Clone, Copy, Debug, Deref, Eq, PartialEq)]
pub struct DenormalizedField {
    #[deref]
    field: FieldModel,
    entity: &'static str,
}

impl DenormalizedField {
    #[must_use]
    pub const fn new(entity: &'static str, field: FieldModel) -> Self {
        Self { field, entity }
    }

    /// Entity the denormalized field lives on.
    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

}
