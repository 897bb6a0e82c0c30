use crate::value::{FromValue, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type FieldMap = HashMap<String, Value, ahash::RandomState>;

/// A schema-loose record: primary key, engine-assigned id, relevance score and
/// named, typed fields.
///
/// Three field predicates are independent: [`Doc::has`] (entry exists, null
/// included), [`Doc::has_value`] (entry exists and is not null) and
/// [`Doc::is_null`] (entry exists and is null).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    pk: String,
    doc_id: u64,
    score: f32,
    fields: FieldMap,
}

impl Doc {
    pub fn new(pk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn pk(&self) -> &str {
        &self.pk
    }

    pub fn set_pk(&mut self, pk: impl Into<String>) {
        self.pk = pk.into();
    }

    #[inline]
    pub fn doc_id(&self) -> u64 {
        self.doc_id
    }

    pub fn set_doc_id(&mut self, doc_id: u64) {
        self.doc_id = doc_id;
    }

    #[inline]
    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn set_score(&mut self, score: f32) {
        self.score = score;
    }

    /// Set a field, replacing any previous value and type.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Mark a field present but null.
    pub fn set_null(&mut self, name: impl Into<String>) {
        self.fields.insert(name.into(), Value::Null);
    }

    /// Non-null value of a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Raw entry of a field, including an explicit null.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Typed read. Absent, null and tag mismatch all yield `None`.
    pub fn get_as<'a, T: FromValue<'a>>(&'a self, name: &str) -> Option<T> {
        self.get(name).and_then(T::from_value)
    }

    #[inline]
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[inline]
    pub fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[inline]
    pub fn is_null(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(Value::Null))
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Snapshot of field names, sorted so output is stable across runs.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fields.keys().cloned().collect();
        names.sort();
        names
    }

    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }

    pub(crate) fn retain_fields<F: FnMut(&str, &Value) -> bool>(&mut self, mut keep: F) {
        self.fields.retain(|k, v| keep(k, v));
    }

    /// Approximate heap bytes held by this document.
    pub fn heap_size(&self) -> usize {
        self.pk.capacity()
            + self
                .fields
                .iter()
                .map(|(k, v)| k.capacity() + std::mem::size_of::<Value>() + v.heap_size())
                .sum::<usize>()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut fields = serde_json::Map::new();
        for name in self.field_names() {
            if let Some(value) = self.fields.get(&name) {
                fields.insert(name, value.to_json());
            }
        }
        serde_json::json!({
            "pk": self.pk,
            "doc_id": self.doc_id,
            "score": self.score,
            "fields": fields,
        })
    }
}
