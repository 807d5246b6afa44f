pub mod memory;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by the record store. The UI never lets these escape the
/// event loop; they are surfaced as error popups with the message intact.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("{0}")]
    Integrity(String),
    #[error("{0}")]
    Update(String),
}

/// Addresses one model within one app.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelHandle {
    pub app: String,
    pub name: String,
}

impl ModelHandle {
    pub fn new(app: &str, name: &str) -> Self {
        Self {
            app: app.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Store-generated key; never shown in create forms.
    Auto,
    #[default]
    Text,
    Password,
}

/// Typed field metadata; carries everything the UI needs to read or write
/// the field through the store, so no reflection happens on either side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
}

impl FieldDescriptor {
    pub fn is_auto(&self) -> bool {
        self.kind == FieldKind::Auto
    }
}

/// Name of the primary-key field: the first store-generated field, or
/// "id" when a model declares none.
pub fn pk_field(fields: &[FieldDescriptor]) -> &str {
    fields
        .iter()
        .find(|f| f.is_auto())
        .map(|f| f.name.as_str())
        .unwrap_or("id")
}

/// One stored record: primary key, display label, field values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub pk: String,
    pub label: String,
    pub values: BTreeMap<String, String>,
}

impl Record {
    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }
}

/// Boundary to the external record store. The UI holds only the handles it
/// was given for the current selection and goes through this trait for
/// every read and write.
pub trait DataSource {
    /// App identifiers, ordered for display.
    fn list_apps(&self) -> Vec<String>;

    /// Models belonging to one app.
    fn list_models(&self, app: &str) -> Vec<ModelHandle>;

    /// Field descriptors in declaration order.
    fn list_fields(&self, model: &ModelHandle) -> Vec<FieldDescriptor>;

    /// All records of a model, in store order.
    fn list_records(&self, model: &ModelHandle) -> Vec<Record>;

    fn get_record(&self, model: &ModelHandle, pk: &str) -> Option<Record> {
        self.list_records(model).into_iter().find(|r| r.pk == pk)
    }

    /// Create a record from accumulated field values. Constraint
    /// violations come back as `DataError::Integrity`.
    fn create_record(
        &mut self,
        model: &ModelHandle,
        values: &[(String, String)],
    ) -> Result<Record, DataError>;

    /// Write one field of one record.
    fn update_field(
        &mut self,
        model: &ModelHandle,
        pk: &str,
        field: &str,
        value: &str,
    ) -> Result<(), DataError>;
}
