use crate::model::field::FieldModel;

///
/// EntityModel
/// Minimal runtime model for one entity, declared as static data.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Stable entity name used for routing rows and signals.
    pub name: &'static str,
    /// Ordered field list. The primary key travels on the row itself.
    pub fields: &'static [FieldModel],
}

impl EntityModel {
    /// Look up a declared field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldModel> {
        self.fields.iter().find(|field| field.name == name)
    }
}
