use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{pk_field, DataError, DataSource, FieldDescriptor, ModelHandle, Record};

/// On-disk dataset shape accepted by `--data`.
#[derive(Debug, Deserialize)]
struct DatasetFile {
    apps: Vec<AppDef>,
}

#[derive(Debug, Deserialize)]
struct AppDef {
    name: String,
    models: Vec<ModelDef>,
}

#[derive(Debug, Deserialize)]
struct ModelDef {
    name: String,
    #[serde(default)]
    label_field: Option<String>,
    fields: Vec<FieldDescriptor>,
    #[serde(default)]
    records: Vec<BTreeMap<String, String>>,
}

struct StoredModel {
    handle: ModelHandle,
    fields: Vec<FieldDescriptor>,
    label_field: Option<String>,
    rows: Vec<BTreeMap<String, String>>,
    next_pk: u64,
}

impl StoredModel {
    fn pk_name(&self) -> &str {
        pk_field(&self.fields)
    }

    fn label_for(&self, row: &BTreeMap<String, String>) -> String {
        self.label_field
            .as_deref()
            .and_then(|f| row.get(f))
            .or_else(|| row.get(self.pk_name()))
            .cloned()
            .unwrap_or_default()
    }

    fn record_for(&self, row: &BTreeMap<String, String>) -> Record {
        Record {
            pk: row.get(self.pk_name()).cloned().unwrap_or_default(),
            label: self.label_for(row),
            values: row.clone(),
        }
    }
}

/// In-memory record store backing the binary and the tests.
///
/// Enforces the constraints a relational backend would: required fields,
/// unique fields, fixed choice sets. Violations surface as
/// `DataError::Integrity` on create and `DataError::Update` on edit.
#[derive(Default)]
pub struct MemorySource {
    models: Vec<StoredModel>,
}

impl MemorySource {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: DatasetFile = serde_json::from_str(json).context("parsing dataset")?;
        let mut source = Self::default();
        for app in file.apps {
            for model in app.models {
                source.add_model(
                    ModelHandle::new(&app.name, &model.name),
                    model.fields,
                    model.label_field,
                    model.records,
                );
            }
        }
        Ok(source)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading dataset {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn add_model(
        &mut self,
        handle: ModelHandle,
        fields: Vec<FieldDescriptor>,
        label_field: Option<String>,
        rows: Vec<BTreeMap<String, String>>,
    ) {
        // Seed the pk counter past any pre-supplied numeric keys.
        let pk_name = pk_field(&fields).to_string();
        let next_pk = rows
            .iter()
            .filter_map(|r| r.get(&pk_name))
            .filter_map(|v| v.parse::<u64>().ok())
            .max()
            .map(|n| n + 1)
            .unwrap_or(1);
        self.models.push(StoredModel {
            handle,
            fields,
            label_field,
            rows,
            next_pk,
        });
    }

    /// Demo dataset used when no `--data` file is given.
    pub fn sample() -> Self {
        let dataset = include_str!("sample.json");
        Self::from_json(dataset).expect("bundled sample dataset is valid")
    }

    fn model(&self, handle: &ModelHandle) -> Option<&StoredModel> {
        self.models.iter().find(|m| &m.handle == handle)
    }

    fn model_mut(&mut self, handle: &ModelHandle) -> Option<&mut StoredModel> {
        self.models.iter_mut().find(|m| &m.handle == handle)
    }
}

impl DataSource for MemorySource {
    fn list_apps(&self) -> Vec<String> {
        let mut apps: Vec<String> = self.models.iter().map(|m| m.handle.app.clone()).collect();
        apps.sort();
        apps.dedup();
        apps
    }

    fn list_models(&self, app: &str) -> Vec<ModelHandle> {
        let mut handles: Vec<ModelHandle> = self
            .models
            .iter()
            .filter(|m| m.handle.app == app)
            .map(|m| m.handle.clone())
            .collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }

    fn list_fields(&self, model: &ModelHandle) -> Vec<FieldDescriptor> {
        self.model(model).map(|m| m.fields.clone()).unwrap_or_default()
    }

    fn list_records(&self, model: &ModelHandle) -> Vec<Record> {
        let Some(m) = self.model(model) else {
            return Vec::new();
        };
        m.rows.iter().map(|row| m.record_for(row)).collect()
    }

    fn create_record(
        &mut self,
        model: &ModelHandle,
        values: &[(String, String)],
    ) -> Result<Record, DataError> {
        let Some(m) = self.model_mut(model) else {
            return Err(DataError::Integrity(format!(
                "unknown model {}.{}",
                model.app, model.name
            )));
        };

        let mut row: BTreeMap<String, String> = values
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .cloned()
            .collect();

        for field in &m.fields {
            let value = row.get(&field.name);
            if field.required && !field.is_auto() && value.is_none() {
                return Err(DataError::Integrity(format!(
                    "NOT NULL constraint failed: {}",
                    field.name
                )));
            }
            if let (Some(value), Some(choices)) = (value, &field.choices) {
                if !choices.contains(value) {
                    return Err(DataError::Integrity(format!(
                        "invalid choice for {}: {value}",
                        field.name
                    )));
                }
            }
            if let Some(value) = value {
                if field.unique && m.rows.iter().any(|r| r.get(&field.name) == Some(value)) {
                    return Err(DataError::Integrity(format!(
                        "duplicate key: {}={value}",
                        field.name
                    )));
                }
            }
        }

        let pk_name = m.pk_name().to_string();
        match row.get(&pk_name) {
            Some(pk) => {
                if m.rows.iter().any(|r| r.get(&pk_name) == Some(pk)) {
                    return Err(DataError::Integrity(format!("duplicate key: {pk_name}={pk}")));
                }
            }
            None => {
                row.insert(pk_name, m.next_pk.to_string());
                m.next_pk += 1;
            }
        }

        let record = m.record_for(&row);
        m.rows.push(row);
        Ok(record)
    }

    fn update_field(
        &mut self,
        model: &ModelHandle,
        pk: &str,
        field: &str,
        value: &str,
    ) -> Result<(), DataError> {
        let Some(m) = self.model_mut(model) else {
            return Err(DataError::Update(format!(
                "unknown model {}.{}",
                model.app, model.name
            )));
        };

        let Some(descriptor) = m.fields.iter().find(|f| f.name == field).cloned() else {
            return Err(DataError::Update(format!("unknown field: {field}")));
        };
        if descriptor.is_auto() {
            return Err(DataError::Update(format!(
                "cannot update generated field: {field}"
            )));
        }
        if let Some(choices) = &descriptor.choices {
            if !choices.contains(&value.to_string()) {
                return Err(DataError::Update(format!(
                    "invalid choice for {field}: {value}"
                )));
            }
        }

        let pk_name = m.pk_name().to_string();
        if descriptor.unique
            && m.rows
                .iter()
                .any(|r| r.get(field).map(String::as_str) == Some(value) && r.get(&pk_name).map(String::as_str) != Some(pk))
        {
            return Err(DataError::Update(format!("duplicate key: {field}={value}")));
        }

        let Some(row) = m
            .rows
            .iter_mut()
            .find(|r| r.get(&pk_name).map(String::as_str) == Some(pk))
        else {
            return Err(DataError::Update(format!("record not found: {pk_name}={pk}")));
        };
        row.insert(field.to_string(), value.to_string());
        Ok(())
    }
}
